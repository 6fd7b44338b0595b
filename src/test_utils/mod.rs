//! Test utilities for trellis
//!
//! Helpers shared by unit and integration tests: once-guarded logging and a
//! small on-disk site fixture.
//!
//! # Example
//!
//! ```rust,no_run
//! use trellis_cli::test_utils::SiteFixture;
//!
//! let site = SiteFixture::new()
//!     .unwrap()
//!     .layout("base.hbs", "<html>{{ contents }}</html>")
//!     .unwrap();
//! assert!(site.path().join("layouts/base.hbs").exists());
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`. With neither, logging stays
/// off. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=trellis_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A temporary site directory with `layouts/`, `partials/` and `helpers/`
/// subdirectories created on demand.
pub struct SiteFixture {
    temp_dir: TempDir,
}

impl SiteFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn file(self, relative: &str, contents: &str) -> Result<Self> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(self)
    }

    pub fn layout(self, name: &str, source: &str) -> Result<Self> {
        self.file(&format!("layouts/{name}"), source)
    }

    pub fn partial(self, name: &str, source: &str) -> Result<Self> {
        self.file(&format!("partials/{name}"), source)
    }

    pub fn helper(self, name: &str, source: &str) -> Result<Self> {
        self.file(&format!("helpers/{name}"), source)
    }

    /// Absolute path of a subdirectory of the fixture.
    pub fn dir(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }
}
