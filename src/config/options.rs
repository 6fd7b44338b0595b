//! Options recognised by the template stage.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pattern::default_pattern;

fn default_extension() -> String {
    ".hbs".to_string()
}

fn default_output_extension() -> String {
    ".html".to_string()
}

/// Configuration of one template stage.
///
/// Every field has a default, so an empty TOML table is a valid configuration:
///
/// ```toml
/// pattern = "pages/**/*.hbs"
/// extension = ".hbs"
/// layouts = "layouts"
/// partials = "partials"
/// helpers = "helpers"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageOptions {
    /// Glob selecting the files to process. Defaults to every file ending with `extension`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Suffix identifying template files; also stripped when renaming and
    /// when resolving layout names.
    pub extension: String,

    /// Suffix given to rendered templates.
    pub output_extension: String,

    /// Directory of partials, registered before rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partials: Option<PathBuf>,

    /// Directory of helper modules, registered before rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helpers: Option<PathBuf>,

    /// Directory of layouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layouts: Option<PathBuf>,

    /// Maximum number of files rendered at once. Defaults to the available parallelism.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            pattern: None,
            extension: default_extension(),
            output_extension: default_output_extension(),
            partials: None,
            helpers: None,
            layouts: None,
            jobs: None,
        }
    }
}

impl StageOptions {
    /// The effective selection pattern.
    pub fn effective_pattern(&self) -> String {
        self.pattern.clone().unwrap_or_else(|| default_pattern(&self.extension))
    }

    /// The effective render concurrency, at least one.
    pub fn effective_jobs(&self) -> usize {
        self.jobs
            .unwrap_or_else(|| std::thread::available_parallelism().map(usize::from).unwrap_or(4))
            .max(1)
    }

    /// Resolve a configured resource directory against the host's base directory.
    pub fn resolve_dir(base_dir: &Path, dir: Option<&Path>) -> Option<PathBuf> {
        dir.map(|dir| if dir.is_absolute() { dir.to_path_buf() } else { base_dir.join(dir) })
    }
}
