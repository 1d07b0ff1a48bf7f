use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;

use crate::error::Result;
use crate::facts::HealthcheckFacts;
use crate::rules::metadata::{Category, Computation, FrameworkReference, RiskModel, RuleMetadata};
use crate::rules::{Rule, RuleContext, RuleError, RuleResult, Signal};

/// ADConnectVersion1: outdated directory synchronisation server
///
/// Flags an enabled sync server whose product version is below the
/// configured safe minimum. Only the first three version components
/// take part in the comparison.
pub struct AdConnectVersionRule {
    pub min_sync_version: Version,
}

static VERSION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\.(\d+)(?:\.(\d+))?").unwrap());

/// Parse a four-part product version ("1.4.2.0") into a comparable version.
pub fn parse_sync_version(raw: &str) -> Option<Version> {
    let caps = VERSION_PREFIX.captures(raw)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

pub(super) fn metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("ADConnectVersion1")
        .category(Category::StaleObjects)
        .model(RiskModel::VulnerabilityManagement)
        .computation(Computation::on_presence(10))
        .maturity(3)
        .reference(FrameworkReference::mitre("T1068"))
        .introduced_in(2, 10)
        .title("The directory synchronisation server is outdated")
        .description(
            "The server synchronising the on-premises directory with the cloud tenant \
             runs a version with known vulnerabilities.",
        )
        .solution(
            "Upgrade the synchronisation server to the latest supported release. \
             Enable automatic upgrade where possible.",
        )
        .documentation("https://learn.microsoft.com/entra/identity/hybrid/connect/reference-connect-version-history")
        .technical_explanation(
            "Version 1.x of the synchronisation agent is out of support and several \
             privilege escalation issues affecting it were fixed only in 2.x. \
             The sync account holds replication rights on the domain, so the \
             server is a tier 0 asset.",
        )
        .build()
}

impl Rule<HealthcheckFacts> for AdConnectVersionRule {
    fn evaluate(&self, facts: &HealthcheckFacts, ctx: &mut RuleContext) -> RuleResult {
        let Some(sync) = facts.sync.as_ref().filter(|s| s.is_enabled()) else {
            return Ok(Signal::NoSignal);
        };

        let version = parse_sync_version(&sync.version).ok_or_else(|| {
            RuleError::MalformedFacts(format!("unparseable sync version '{}'", sync.version))
        })?;
        if version < self.min_sync_version {
            ctx.record_detail(sync.version.clone());
        }
        Ok(Signal::NoSignal)
    }
}
