mod ad_connect;
mod admins;
mod dependency;
mod exposure;
mod krbtgt;
mod laps;
mod legacy_auth;
mod redirect_uri;
mod tenant_admins;
mod trusts;

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::catalog::{Catalog, CatalogBuilder};
use super::metadata::RuleMetadata;
use super::rationale::TemplateBundle;
use super::threshold::Threshold;
use crate::error::{DirRiskError, Result};
use crate::facts::graph::{ObjectRisk, Typology};
use crate::facts::{CompromiseGraph, FactKind, HealthcheckFacts, TenantFacts};

pub use ad_connect::parse_sync_version;
pub use dependency::DependencyRule;
pub use exposure::ExposedObjectsRule;

/// Rationale templates shipped with the built-in rules.
const BUILTIN_RATIONALE: &str = include_str!("rationale.toml");

/// Tunable parameters of the built-in rules (`[rules]` in `.dirrisk.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSettings {
    /// Lowest directory-sync version considered safe.
    #[serde(default = "default_min_sync_version")]
    pub min_sync_version: String,
    #[serde(default = "default_krbtgt_max_age_days")]
    pub krbtgt_max_age_days: i64,
    #[serde(default = "default_inactive_admin_days")]
    pub inactive_admin_days: i64,
    #[serde(default = "default_max_global_admins")]
    pub max_global_admins: u64,
    /// Extra rationale bundle overlaid on the built-in one.
    #[serde(default)]
    pub templates: Option<PathBuf>,
}

fn default_min_sync_version() -> String {
    "2.0.0".into()
}

fn default_krbtgt_max_age_days() -> i64 {
    40
}

fn default_inactive_admin_days() -> i64 {
    180
}

fn default_max_global_admins() -> u64 {
    5
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            min_sync_version: default_min_sync_version(),
            krbtgt_max_age_days: default_krbtgt_max_age_days(),
            inactive_admin_days: default_inactive_admin_days(),
            max_global_admins: default_max_global_admins(),
            templates: None,
        }
    }
}

/// The three built-in catalogs, one per fact shape.
pub struct Catalogs {
    pub healthcheck: Catalog<HealthcheckFacts>,
    pub tenant: Catalog<TenantFacts>,
    pub graph: Catalog<CompromiseGraph>,
}

impl Catalogs {
    /// Register every built-in rule. Any declaration error aborts the build.
    pub fn build(settings: &RuleSettings) -> Result<Self> {
        let min_sync_version = semver::Version::parse(&settings.min_sync_version).map_err(|e| {
            DirRiskError::Config(format!(
                "invalid min_sync_version '{}': {e}",
                settings.min_sync_version
            ))
        })?;
        let days = |n: i64, name: &str| {
            chrono::Duration::try_days(n)
                .filter(|_| n >= 0)
                .ok_or_else(|| DirRiskError::Config(format!("{name} out of range: {n}")))
        };

        let mut healthcheck = CatalogBuilder::<HealthcheckFacts>::new();
        healthcheck.register(
            ad_connect::metadata()?,
            ad_connect::AdConnectVersionRule { min_sync_version },
        )?;
        healthcheck.register(
            krbtgt::metadata()?,
            krbtgt::KrbtgtPasswordAgeRule {
                max_age: days(settings.krbtgt_max_age_days, "krbtgt_max_age_days")?,
            },
        )?;
        healthcheck.register(
            admins::inactive_metadata()?,
            admins::InactiveAdminsRule {
                max_inactivity: days(settings.inactive_admin_days, "inactive_admin_days")?,
            },
        )?;
        healthcheck.register(
            admins::never_expires_metadata()?,
            admins::AdminPasswordNeverExpiresRule,
        )?;
        healthcheck.register(laps::metadata()?, laps::LapsNotInstalledRule)?;
        healthcheck.register(trusts::metadata()?, trusts::TrustSidFilteringRule)?;

        let mut tenant = CatalogBuilder::<TenantFacts>::new();
        tenant.register(
            tenant_admins::without_mfa_metadata()?,
            tenant_admins::GlobalAdminWithoutMfaRule,
        )?;
        tenant.register(
            tenant_admins::too_many_metadata()?,
            tenant_admins::TooManyGlobalAdminsRule {
                max: settings.max_global_admins,
            },
        )?;
        tenant.register(legacy_auth::metadata()?, legacy_auth::LegacyAuthNotBlockedRule)?;
        tenant.register(redirect_uri::metadata()?, redirect_uri::InsecureRedirectUriRule)?;

        let mut graph = CatalogBuilder::<CompromiseGraph>::new();
        graph.register_graph(
            exposure::critical_exposed_metadata()?,
            ExposedObjectsRule::new(ObjectRisk::Critical, Threshold::Any),
        )?;
        graph.register_graph(
            exposure::high_exposed_many_metadata()?,
            ExposedObjectsRule::new(ObjectRisk::High, Threshold::MoreThan(100)),
        )?;
        graph.register_graph(
            dependency::privileged_metadata()?,
            DependencyRule::new(
                &[Typology::PrivilegedAccount, Typology::Infrastructure],
                Threshold::MoreThan(0),
            ),
        )?;
        graph.register_graph(
            dependency::users_metadata()?,
            DependencyRule::new(&[Typology::User], Threshold::MoreThan(5)),
        )?;

        Ok(Self {
            healthcheck: healthcheck.build(),
            tenant: tenant.build(),
            graph: graph.build(),
        })
    }

    /// Resolve an identifier across all three catalogs.
    pub fn resolve(&self, id: &str) -> Result<&RuleMetadata> {
        if let Some(meta) = self
            .healthcheck
            .get(id)
            .or_else(|| self.tenant.get(id))
            .or_else(|| self.graph.get(id))
        {
            return Ok(meta);
        }

        let suggestion = [
            self.healthcheck.suggest(id),
            self.tenant.suggest(id),
            self.graph.suggest(id),
        ]
        .into_iter()
        .flatten()
        .min_by_key(|candidate| levenshtein::levenshtein(&id.to_lowercase(), &candidate.to_lowercase()))
        .map(str::to_string);

        Err(DirRiskError::UnknownRule {
            id: id.to_string(),
            suggestion,
        })
    }

    /// Metadata of every rule for one fact shape, in registration order.
    pub fn rules_for(&self, kind: FactKind) -> Vec<&RuleMetadata> {
        match kind {
            FactKind::Healthcheck => metadata_of(&self.healthcheck),
            FactKind::Tenant => metadata_of(&self.tenant),
            FactKind::CompromiseGraph => metadata_of(&self.graph),
        }
    }

    /// Check every explicit template reference against `templates`.
    pub fn check_templates(&self, templates: &TemplateBundle) -> Result<()> {
        self.healthcheck.check_templates(templates)?;
        self.tenant.check_templates(templates)?;
        self.graph.check_templates(templates)
    }
}

fn metadata_of<F>(catalog: &Catalog<F>) -> Vec<&RuleMetadata> {
    catalog.all_rules().iter().map(|e| e.metadata()).collect()
}

/// Process-wide catalogs built from default settings on first use.
pub fn default_catalogs() -> Result<&'static Catalogs> {
    static CATALOGS: OnceCell<Catalogs> = OnceCell::new();
    CATALOGS.get_or_try_init(|| Catalogs::build(&RuleSettings::default()))
}

/// Built-in rationale bundle, optionally overlaid with the bundle named in settings.
pub fn templates(settings: &RuleSettings) -> Result<TemplateBundle> {
    let mut bundle = TemplateBundle::from_toml(BUILTIN_RATIONALE)?;
    if let Some(path) = &settings.templates {
        tracing::debug!(path = %path.display(), "loading rationale overlay");
        bundle.overlay(TemplateBundle::load(path)?);
    }
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::metadata::{Classification, ComputationMode};

    #[test]
    fn default_catalogs_build() {
        let catalogs = default_catalogs().unwrap();
        assert_eq!(catalogs.healthcheck.len(), 6);
        assert_eq!(catalogs.tenant.len(), 4);
        assert_eq!(catalogs.graph.len(), 4);
    }

    #[test]
    fn builtin_templates_cover_explicit_references() {
        let catalogs = default_catalogs().unwrap();
        let bundle = templates(&RuleSettings::default()).unwrap();
        catalogs.check_templates(&bundle).unwrap();
    }

    #[test]
    fn identifiers_are_unique_across_catalogs() {
        let catalogs = default_catalogs().unwrap();
        let mut ids: Vec<&str> = [
            FactKind::Healthcheck,
            FactKind::Tenant,
            FactKind::CompromiseGraph,
        ]
        .into_iter()
        .flat_map(|k| catalogs.rules_for(k))
        .map(|m| m.id())
        .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn graph_rules_are_objective_classified() {
        let catalogs = default_catalogs().unwrap();
        for meta in catalogs.rules_for(FactKind::CompromiseGraph) {
            assert!(matches!(meta.classification(), Classification::Objective(_)));
            assert_eq!(meta.mode(), ComputationMode::Objective);
        }
    }

    #[test]
    fn resolve_across_catalogs() {
        let catalogs = default_catalogs().unwrap();
        assert_eq!(catalogs.resolve("ADConnectVersion1").unwrap().weight(), 10);
        assert!(catalogs.resolve("P-DependencyPrivileged").is_ok());
        match catalogs.resolve("LapsNotInstaled") {
            Err(DirRiskError::UnknownRule { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("LapsNotInstalled"));
            }
            other => panic!("unexpected: {:?}", other.map(|m| m.id().to_string())),
        }
    }

    #[test]
    fn invalid_min_version_is_a_config_error() {
        let settings = RuleSettings {
            min_sync_version: "two".into(),
            ..RuleSettings::default()
        };
        assert!(matches!(
            Catalogs::build(&settings),
            Err(DirRiskError::Config(_))
        ));
    }

    #[test]
    fn overlay_bundle_replaces_builtin_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.toml");
        std::fs::write(&path, "[templates]\nLapsNotInstalled = \"custom {count}\"\n").unwrap();
        let settings = RuleSettings {
            templates: Some(path),
            ..RuleSettings::default()
        };
        let bundle = templates(&settings).unwrap();
        use crate::rules::rationale::TemplateSource;
        assert_eq!(bundle.template("LapsNotInstalled"), Some("custom {count}"));
        assert!(bundle.template("ADConnectVersion1").is_some());
    }
}
