//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics and returns every
//! problem found rather than only the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::{GatekeeperConfig, PLACEHOLDER_SECRET};
use crate::tenant::sanitize_tenant_id;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a configuration. Pure function of its input.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    validate_secrets(config, &mut errors);
    validate_session(config, &mut errors);

    let rl = &config.rate_limit;
    if rl.enabled {
        if rl.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be > 0"));
        }
        if rl.window_ms == 0 {
            errors.push(ValidationError::new("rate_limit.window_ms", "must be > 0"));
        }
        if !rl.api_prefix.starts_with('/') {
            errors.push(ValidationError::new("rate_limit.api_prefix", "must start with '/'"));
        }
    }
    if rl.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be > 0"));
    }

    validate_tenants(config, &mut errors);
    validate_routes(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_secrets(config: &GatekeeperConfig, errors: &mut Vec<ValidationError>) {
    let secrets = &config.secrets;
    for (field, value) in [
        ("secrets.session_secret", &secrets.session_secret),
        ("secrets.csrf_secret", &secrets.csrf_secret),
    ] {
        if value.is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        } else if config.environment.production && value == PLACEHOLDER_SECRET {
            errors.push(ValidationError::new(field, "placeholder secret used in production"));
        }
    }

    if config.environment.production
        && config.admin.enabled
        && config.admin.api_key == PLACEHOLDER_SECRET
    {
        errors.push(ValidationError::new(
            "admin.api_key",
            "placeholder API key used in production",
        ));
    }
}

fn validate_session(config: &GatekeeperConfig, errors: &mut Vec<ValidationError>) {
    let session = &config.session;
    if session.ttl_secs <= 0 {
        errors.push(ValidationError::new("session.ttl_secs", "must be > 0"));
    }
    if session.max_age_secs < session.ttl_secs {
        errors.push(ValidationError::new(
            "session.max_age_secs",
            "must be >= session.ttl_secs",
        ));
    }
    if session.csrf_ttl_secs <= 0 {
        errors.push(ValidationError::new("session.csrf_ttl_secs", "must be > 0"));
    }
    if !(session.refresh_after_ratio > 0.0 && session.refresh_after_ratio <= 1.0) {
        errors.push(ValidationError::new(
            "session.refresh_after_ratio",
            "must be in (0, 1]",
        ));
    }
}

fn validate_tenants(config: &GatekeeperConfig, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for (i, tenant) in config.tenants.registry.iter().enumerate() {
        let field = format!("tenants.registry[{i}]");
        if tenant.id.is_empty() || sanitize_tenant_id(&tenant.id) != tenant.id {
            errors.push(ValidationError::new(
                format!("{field}.id"),
                format!("'{}' must be lowercase [a-z0-9-_]", tenant.id),
            ));
        }
        if !seen.insert(tenant.id.as_str()) {
            errors.push(ValidationError::new(
                format!("{field}.id"),
                format!("duplicate tenant id '{}'", tenant.id),
            ));
        }
        if tenant.domain.is_empty() {
            errors.push(ValidationError::new(format!("{field}.domain"), "must not be empty"));
        }
        if tenant.settings.session_duration_secs <= 0 {
            errors.push(ValidationError::new(
                format!("{field}.settings.session_duration_secs"),
                "must be > 0",
            ));
        }
    }

    for (domain, tenant) in &config.tenants.custom_domains {
        if !config.tenants.registry.iter().any(|t| &t.id == tenant) {
            errors.push(ValidationError::new(
                format!("tenants.custom_domains.{domain}"),
                format!("references unknown tenant '{tenant}'"),
            ));
        }
    }
}

fn validate_routes(config: &GatekeeperConfig, errors: &mut Vec<ValidationError>) {
    let routes = &config.routes;
    let prefix_lists = [
        ("routes.matcher", &routes.matcher),
        ("routes.public_prefixes", &routes.public_prefixes),
        ("routes.client_allowed_prefixes", &routes.client_allowed_prefixes),
        ("routes.super_admin_prefixes", &routes.super_admin_prefixes),
    ];
    for (field, list) in prefix_lists {
        for prefix in list.iter().filter(|p| !p.starts_with('/')) {
            errors.push(ValidationError::new(
                field,
                format!("'{prefix}' must start with '/'"),
            ));
        }
    }

    for (field, path) in [
        ("routes.client_home", &routes.client_home),
        ("routes.sign_in_path", &routes.sign_in_path),
        ("routes.admin_profile_path", &routes.admin_profile_path),
        (
            "routes.insufficient_permissions_redirect",
            &routes.insufficient_permissions_redirect,
        ),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(field, format!("'{path}' must start with '/'")));
        }
    }

    let manifest = &config.manifest.inline;
    for (from, to) in manifest.redirects.iter().chain(manifest.aliases.iter()) {
        if !from.starts_with('/') {
            errors.push(ValidationError::new(
                "manifest",
                format!("source path '{from}' must start with '/'"),
            ));
        }
        if from == to {
            errors.push(ValidationError::new(
                "manifest",
                format!("'{from}' maps to itself"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatekeeperConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatekeeperConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.rate_limit.max_requests = 0;
        config.session.max_age_secs = 1;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"rate_limit.max_requests"));
        assert!(fields.contains(&"session.max_age_secs"));
    }

    #[test]
    fn test_placeholder_secret_rejected_in_production() {
        let mut config = GatekeeperConfig::default();
        config.environment.production = true;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "secrets.session_secret"));

        config.secrets.session_secret = "a".repeat(32);
        config.secrets.csrf_secret = "b".repeat(32);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_tenant_ids_checked() {
        let mut config = GatekeeperConfig::default();
        let mut dup = config.tenants.registry[0].clone();
        dup.domain = "other.example.com".into();
        config.tenants.registry.push(dup);
        config
            .tenants
            .custom_domains
            .insert("cargo.shipper.io".into(), "ghost".into());

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("duplicate")));
        assert!(errors.iter().any(|e| e.message.contains("unknown tenant 'ghost'")));
    }
}
