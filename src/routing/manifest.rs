//! Redirect/alias manifest.
//!
//! Static `{ redirects, aliases, routes }` mapping consumed read-only by the
//! gatekeeper. Lookups are exact-path.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Error type for manifest loading.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error reading manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A named route declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManifestRoute {
    pub path: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Manifest {
    /// Public path → redirect target.
    pub redirects: HashMap<String, String>,
    /// Public path → internal path served in its place.
    pub aliases: HashMap<String, String>,
    /// Route name → declaration.
    pub routes: HashMap<String, ManifestRoute>,
}

/// What the manifest says about a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Redirect(&'a str),
    Rewrite(&'a str),
    Unchanged,
}

impl Manifest {
    /// Load a JSON manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Merge `other` over `self`; entries in `other` win.
    pub fn merge(&mut self, other: Manifest) {
        self.redirects.extend(other.redirects);
        self.aliases.extend(other.aliases);
        self.routes.extend(other.routes);
    }

    /// Redirects take precedence over aliases.
    pub fn resolve(&self, path: &str) -> Resolution<'_> {
        if let Some(target) = self.redirects.get(path) {
            return Resolution::Redirect(target);
        }
        if let Some(target) = self.aliases.get(path) {
            return Resolution::Rewrite(target);
        }
        Resolution::Unchanged
    }

    /// Paths of routes declared `public`.
    pub fn public_paths(&self) -> impl Iterator<Item = &str> {
        self.routes
            .values()
            .filter(|r| r.public)
            .map(|r| r.path.as_str())
    }
}
