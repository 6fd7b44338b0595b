//! Project configuration file (`trellis.toml`).
//!
//! The file holds the stage options at the top level and the global
//! template variables under `[metadata]`:
//!
//! ```toml
//! layouts = "layouts"
//! partials = "partials"
//!
//! [metadata]
//! site_name = "My Site"
//! base_url = "https://example.com"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::options::StageOptions;

/// Default name of the configuration file inside a source directory.
pub const CONFIG_FILE_NAME: &str = "trellis.toml";

/// Contents of a `trellis.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(flatten)]
    pub options: StageOptions,

    /// Global variables available to every template.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ProjectConfig {
    /// Load the configuration for a source directory.
    ///
    /// Uses `explicit` when given (which must exist); otherwise
    /// `trellis.toml` inside `source_dir` if present, or the defaults.
    pub async fn load(source_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path).await,
            None => {
                let path = Self::default_path(source_dir);
                if fs::try_exists(&path).await.unwrap_or(false) {
                    Self::load_from(&path).await
                } else {
                    debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, source_dir.display());
                    Ok(Self::default())
                }
            }
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    pub fn default_path(source_dir: &Path) -> PathBuf {
        source_dir.join(CONFIG_FILE_NAME)
    }
}
