//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatekeeperConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::routing::manifest::{Manifest, ManifestError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Invalid environment variable {name}: {value}")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply
/// environment overrides and merge the manifest file.
pub fn load_config(path: &Path) -> Result<GatekeeperConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatekeeperConfig = toml::from_str(&content)?;
    finalize(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Build configuration from defaults plus environment overrides.
pub fn load_from_env() -> Result<GatekeeperConfig, ConfigError> {
    let mut config = GatekeeperConfig::default();
    finalize(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

fn finalize<F>(config: &mut GatekeeperConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(config, env)?;

    if let Some(manifest_path) = config.manifest.path.clone() {
        let file_manifest = Manifest::load(Path::new(&manifest_path))?;
        config.manifest.inline.merge(file_manifest);
    }

    validate_config(config).map_err(ConfigError::Validation)
}

/// Apply `GATEKEEPER_*` environment variables over file values.
///
/// Variables are read once at process start; the lookup is injected so
/// tests do not touch the real environment.
pub fn apply_env_overrides<F>(config: &mut GatekeeperConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = env("GATEKEEPER_ENV") {
        config.environment.production = value.eq_ignore_ascii_case("production");
    }
    if let Some(value) = env("GATEKEEPER_FORCE_HTTPS") {
        config.environment.force_https = parse_bool("GATEKEEPER_FORCE_HTTPS", &value)?;
    }
    if let Some(value) = env("GATEKEEPER_SESSION_SECRET") {
        config.secrets.session_secret = value;
    }
    if let Some(value) = env("GATEKEEPER_CSRF_SECRET") {
        config.secrets.csrf_secret = value;
    }
    if let Some(value) = env("GATEKEEPER_RATE_LIMIT_MAX") {
        config.rate_limit.max_requests = value.parse().map_err(|_| ConfigError::Env {
            name: "GATEKEEPER_RATE_LIMIT_MAX",
            value: value.clone(),
        })?;
    }
    if let Some(value) = env("GATEKEEPER_RATE_LIMIT_WINDOW_MS") {
        config.rate_limit.window_ms = value.parse().map_err(|_| ConfigError::Env {
            name: "GATEKEEPER_RATE_LIMIT_WINDOW_MS",
            value: value.clone(),
        })?;
    }
    if let Some(value) = env("GATEKEEPER_ADMIN_API_KEY") {
        config.admin.api_key = value;
    }
    if let Some(value) = env("GATEKEEPER_BIND_ADDRESS") {
        config.listener.bind_address = value;
    }
    Ok(())
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            name,
            value: value.to_string(),
        }),
    }
}
