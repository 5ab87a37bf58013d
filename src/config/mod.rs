//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gatekeeper.toml + GATEKEEPER_* env
//!     → loader.rs (parse, env overrides, manifest merge)
//!     → validation.rs (semantic checks)
//!     → GatekeeperConfig (validated, immutable)
//!     → services built once at startup, shared via Arc
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → gatekeeper rebuilt and swapped atomically (secrets and limiter kept)
//! ```

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AdminConfig, EnvironmentConfig, GatekeeperConfig, ListenerConfig, ManifestConfig,
    ObservabilityConfig, RateLimitConfig, RoutePolicyConfig, SecretsConfig, SecurityConfig,
    SessionConfig, TenantsConfig, TimeoutConfig, PLACEHOLDER_SECRET,
};
