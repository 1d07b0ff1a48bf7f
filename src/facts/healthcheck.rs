use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// On-premises domain health-check snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthcheckFacts {
    pub domain_fqdn: String,
    /// When the collector produced this snapshot; age-based rules measure against it.
    pub generated_at: DateTime<Utc>,
    /// Directory synchronisation (AD Connect) state, when a sync server was found.
    #[serde(default)]
    pub sync: Option<SyncFacts>,
    #[serde(default)]
    pub krbtgt_last_change: Option<DateTime<Utc>>,
    #[serde(default)]
    pub laps_installed: bool,
    #[serde(default)]
    pub privileged_accounts: Vec<PrivilegedAccount>,
    #[serde(default)]
    pub trusts: Vec<Trust>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFacts {
    /// Raw status string as reported by the sync server ("Enabled", "Disabled").
    pub status: String,
    /// Four-part product version, e.g. "1.4.2.0".
    pub version: String,
    #[serde(default)]
    pub server: Option<String>,
}

impl SyncFacts {
    pub fn is_enabled(&self) -> bool {
        self.status.eq_ignore_ascii_case("enabled")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivilegedAccount {
    pub sam_account_name: String,
    #[serde(default)]
    pub distinguished_name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub last_logon: Option<DateTime<Utc>>,
    #[serde(default)]
    pub password_never_expires: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trust {
    pub partner: String,
    pub direction: TrustDirection,
    #[serde(default)]
    pub sid_filtering: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustDirection {
    Inbound,
    Outbound,
    Bidirectional,
}

impl TrustDirection {
    /// Whether the local domain trusts the partner (and therefore accepts its SIDs).
    pub fn trusts_partner(self) -> bool {
        matches!(self, Self::Outbound | Self::Bidirectional)
    }
}

fn default_true() -> bool {
    true
}
