//! Tenant subsystem.
//!
//! # Data Flow
//! ```text
//! Host / x-tenant-id / nm_tenant
//!     → service.rs (resolve + sanitize tenant id)
//!     → registry.rs (static TenantConfig lookup; unknown → None)
//!     → membership.rs (user ↔ tenant check)
//! ```

pub mod membership;
pub mod registry;
pub mod service;

pub use membership::{MembershipStore, StaticMembership};
pub use registry::{TenantConfig, TenantSettings, DEFAULT_SESSION_DURATION_SECS, DEFAULT_TENANT_ID};
pub use service::{
    request_host, sanitize_tenant_id, scoped_cookie_name, TenantService, TENANT_ID_HEADER, TENANT_NAME_HEADER,
};
