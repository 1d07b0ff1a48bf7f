use serde::{Deserialize, Serialize};

/// Cloud tenant policy snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantFacts {
    pub tenant_id: String,
    pub tenant_name: String,
    #[serde(default)]
    pub security_defaults_enabled: bool,
    #[serde(default)]
    pub conditional_access: Vec<ConditionalAccessPolicy>,
    #[serde(default)]
    pub global_admins: Vec<CloudAdmin>,
    #[serde(default)]
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalAccessPolicy {
    pub name: String,
    #[serde(default)]
    pub state: PolicyState,
    /// Client app types the policy applies to ("exchangeActiveSync", "other", "browser"...).
    #[serde(default)]
    pub client_app_types: Vec<String>,
    #[serde(default)]
    pub block: bool,
}

impl ConditionalAccessPolicy {
    pub fn blocks_legacy_auth(&self) -> bool {
        self.state == PolicyState::Enabled
            && self.block
            && self.client_app_types.iter().any(|t| {
                t.eq_ignore_ascii_case("exchangeActiveSync") || t.eq_ignore_ascii_case("other")
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyState {
    Enabled,
    #[default]
    Disabled,
    ReportOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudAdmin {
    pub user_principal_name: String,
    #[serde(default)]
    pub mfa_registered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub display_name: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}
