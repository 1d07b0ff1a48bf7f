use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::builtin::RuleSettings;
use crate::rules::policy::Policy;

/// Top-level configuration from `.dirrisk.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub rules: RuleSettings,
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    ///
    /// A relative `rules.templates` path is resolved against the config
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        if let (Some(templates), Some(dir)) = (&config.rules.templates, path.parent()) {
            if templates.is_relative() {
                config.rules.templates = Some(dir.join(templates));
            }
        }
        Ok(config)
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# dirrisk configuration

[policy]
# A global score strictly above this value fails the run (0-100).
fail_above = 50

# Rule IDs to ignore entirely.
# ignore_rules = ["InsecureRedirectUri"]

# Drop findings of rules above this maturity level (1-5).
max_maturity = 5

# Per-rule weight overrides.
# [policy.weight_overrides]
# "TooManyGlobalAdmins" = 0

[rules]
# Lowest directory synchronisation version considered safe.
min_sync_version = "2.0.0"
krbtgt_max_age_days = 40
inactive_admin_days = 180
max_global_admins = 5

# Extra rationale templates overlaid on the built-in ones.
# templates = "rationale.toml"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join(".dirrisk.toml")).unwrap();
        assert_eq!(config.policy.fail_above, 50);
        assert_eq!(config.rules.min_sync_version, "2.0.0");
    }

    #[test]
    fn starter_config_parses() {
        let config: Config = toml::from_str(Config::starter_toml()).unwrap();
        assert_eq!(config.policy.max_maturity, 5);
        assert_eq!(config.rules.krbtgt_max_age_days, 40);
        assert!(config.rules.templates.is_none());
    }

    #[test]
    fn relative_template_path_is_resolved_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".dirrisk.toml");
        std::fs::write(
            &path,
            "[policy]\nfail_above = 20\nignore_rules = [\"LapsNotInstalled\"]\n\n[rules]\ntemplates = \"extra.toml\"\n",
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.policy.fail_above, 20);
        assert!(config.policy.ignore_rules.contains("LapsNotInstalled"));
        assert_eq!(config.rules.templates, Some(dir.path().join("extra.toml")));
    }
}
