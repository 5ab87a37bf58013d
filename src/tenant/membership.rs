//! User → tenant membership lookups.

use std::collections::{HashMap, HashSet};

use crate::tenant::registry::TenantConfig;

/// Source of truth for which users belong to which tenant.
///
/// Implement over a database or directory service in production; the
/// static store covers config-defined deployments and tests.
pub trait MembershipStore: Send + Sync {
    fn is_member(&self, tenant_id: &str, user_id: &str) -> bool;
}

/// Membership from the `members` lists in the tenant registry.
#[derive(Debug, Clone, Default)]
pub struct StaticMembership {
    members: HashMap<String, HashSet<String>>,
}

impl StaticMembership {
    pub fn from_registry(registry: &[TenantConfig]) -> Self {
        let members = registry
            .iter()
            .map(|t| (t.id.clone(), t.members.iter().cloned().collect()))
            .collect();
        Self { members }
    }
}

impl MembershipStore for StaticMembership {
    fn is_member(&self, tenant_id: &str, user_id: &str) -> bool {
        self.members
            .get(tenant_id)
            .is_some_and(|users| users.contains(user_id))
    }
}
