//! Role-based route policy.
//!
//! Pure decision function over (role, path, tenant context). The route
//! names themselves come from configuration.

use crate::config::schema::RoutePolicyConfig;
use crate::routing::manifest::Manifest;
use crate::routing::matcher::PrefixSet;
use crate::session::Role;

/// Outcome of a role check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    /// Silent re-route to a page the role may see.
    Redirect(String),
    /// Outright denial; carries a short reason for logs.
    Deny(&'static str),
}

/// Compiled route policy. Immutable after construction.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    gated: PrefixSet,
    public: PrefixSet,
    client_allowed: PrefixSet,
    super_admin_only: PrefixSet,
    client_home: String,
    insufficient_permissions_redirect: String,
    admin_profile_path: String,
    sign_in_path: String,
}

impl RoutePolicy {
    pub fn new(config: &RoutePolicyConfig, manifest: &Manifest) -> Self {
        let public = config
            .public_prefixes
            .iter()
            .map(String::as_str)
            .chain(manifest.public_paths());

        Self {
            gated: PrefixSet::new(config.matcher.iter().cloned()),
            public: PrefixSet::new(public.map(str::to_string)),
            client_allowed: PrefixSet::new(config.client_allowed_prefixes.iter().cloned()),
            super_admin_only: PrefixSet::new(config.super_admin_prefixes.iter().cloned()),
            client_home: config.client_home.clone(),
            insufficient_permissions_redirect: config.insufficient_permissions_redirect.clone(),
            admin_profile_path: config.admin_profile_path.clone(),
            sign_in_path: config.sign_in_path.clone(),
        }
    }

    /// Whether the gatekeeper applies to this path at all.
    pub fn is_gated(&self, path: &str) -> bool {
        self.gated.is_empty() || self.gated.matches(path)
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.matches(path)
    }

    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    /// Decide whether `role` may reach `path`.
    ///
    /// API paths never redirect; they deny instead.
    pub fn authorize(&self, role: Role, path: &str, has_tenant: bool, is_api: bool) -> Access {
        match role {
            Role::SuperAdmin => Access::Allow,
            Role::Client => {
                if !self.client_allowed.matches(path) {
                    return if is_api {
                        Access::Deny("client_route_forbidden")
                    } else {
                        Access::Redirect(self.client_home.clone())
                    };
                }
                if !has_tenant {
                    return Access::Deny("tenant_required");
                }
                Access::Allow
            }
            Role::Admin | Role::Employee => {
                if self.super_admin_only.matches(path) {
                    return if is_api {
                        Access::Deny("super_admin_only")
                    } else {
                        Access::Redirect(self.insufficient_permissions_redirect.clone())
                    };
                }
                if !has_tenant && path != self.admin_profile_path {
                    return Access::Deny("tenant_required");
                }
                Access::Allow
            }
        }
    }
}
