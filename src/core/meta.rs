//! Shared build metadata handed to every plugin phase.

use std::env;

use serde::{Deserialize, Serialize};

/// Port assumed for the localhost origin fallback.
pub const DEFAULT_DEV_PORT: u16 = 1337;

/// Site-wide metadata: deployed origin, base path, and their
/// concatenation.
///
/// Sourced from environment/config outside the engine; the engine
/// itself only threads it through to plugins unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMeta {
    /// Deployed origin, e.g. `https://example.com`.
    pub origin: String,
    /// Path the site is mounted under, empty for the root.
    pub base_path: String,
    /// Always `origin + base_path`.
    pub base_url: String,
}

impl SiteMeta {
    /// Build metadata from an origin and base path.
    pub fn new(origin: impl Into<String>, base_path: impl Into<String>) -> Self {
        let origin = origin.into();
        let base_path = base_path.into();
        let base_url = format!("{origin}{base_path}");
        Self {
            origin,
            base_path,
            base_url,
        }
    }

    /// Read metadata from `FERRITE_ORIGIN` / `FERRITE_BASE_PATH`,
    /// falling back to a localhost origin on [`DEFAULT_DEV_PORT`].
    pub fn from_env() -> Self {
        let origin = env::var("FERRITE_ORIGIN")
            .unwrap_or_else(|_| format!("http://localhost:{DEFAULT_DEV_PORT}"));
        let base_path = env::var("FERRITE_BASE_PATH").unwrap_or_default();
        Self::new(origin, base_path)
    }
}
