//! Static tenant configuration.

use serde::{Deserialize, Serialize};

/// Seven days.
pub const DEFAULT_SESSION_DURATION_SECS: i64 = 7 * 24 * 3600;
/// Tenant used for the bare application domain and localhost.
pub const DEFAULT_TENANT_ID: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TenantSettings {
    /// Domain attribute for this tenant's cookies.
    pub cookie_domain: Option<String>,
    pub session_duration_secs: i64,
    /// Users of other tenants may act inside this one.
    pub allow_cross_tenant: bool,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            cookie_domain: None,
            session_duration_secs: DEFAULT_SESSION_DURATION_SECS,
            allow_cross_tenant: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TenantConfig {
    pub id: String,
    pub domain: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    pub name: String,
    #[serde(default)]
    pub settings: TenantSettings,
    /// User ids belonging to this tenant.
    #[serde(default)]
    pub members: Vec<String>,
}

impl TenantConfig {
    pub fn default_tenant(domain: &str) -> Self {
        Self {
            id: DEFAULT_TENANT_ID.to_string(),
            domain: domain.to_string(),
            subdomain: None,
            name: "Default".to_string(),
            settings: TenantSettings::default(),
            members: Vec::new(),
        }
    }
}
