//! Glob-based file selection.
//!
//! The template stage only processes the files of the virtual file set whose
//! path matches a configured glob. Paths are `/`-separated and relative to
//! the host's base directory; `*` is allowed to cross directory separators,
//! so `*.hbs` and `**/*.hbs` select the same files.
//!
//! # Examples
//!
//! ```rust,no_run
//! use trellis_cli::pattern::PatternMatcher;
//!
//! # fn example() -> Result<(), trellis_cli::core::StageError> {
//! let matcher = PatternMatcher::new("posts/*.hbs")?;
//!
//! assert!(matcher.matches("posts/hello.hbs"));
//! assert!(!matcher.matches("pages/about.hbs"));
//! # Ok(())
//! # }
//! ```

use glob::{MatchOptions, Pattern};
use tracing::{debug, trace};

use crate::core::StageError;
use crate::files::FileSet;

/// Default selection pattern for a template extension: every file ending with it.
pub fn default_pattern(extension: &str) -> String {
    format!("**/*{extension}")
}

/// Compiled glob used to select files from a [`FileSet`].
///
/// `PatternMatcher` is cheap to clone and can be shared between tasks.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Pattern,
    original_pattern: String,
    options: MatchOptions,
}

impl PatternMatcher {
    /// Compile a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::InvalidPattern`] when the pattern is not valid glob syntax.
    pub fn new(pattern_str: &str) -> Result<Self, StageError> {
        let pattern = Pattern::new(pattern_str).map_err(|e| StageError::InvalidPattern {
            pattern: pattern_str.to_string(),
            reason: e.msg.to_string(),
        })?;

        Ok(Self {
            pattern,
            original_pattern: pattern_str.to_string(),
            options: MatchOptions::new(),
        })
    }

    /// Check whether a virtual path matches the pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches_with(path, self.options)
    }

    /// Return the matching paths, in input order.
    pub fn select<'a, I>(&self, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        paths
            .into_iter()
            .filter(|path| {
                let matched = self.matches(path);
                trace!("Pattern '{}' {} '{}'", self.original_pattern, if matched { "matches" } else { "skips" }, path);
                matched
            })
            .map(str::to_string)
            .collect()
    }

    /// The pattern as written in the configuration.
    pub fn pattern(&self) -> &str {
        &self.original_pattern
    }
}

/// Select the files of `files` matching `pattern`.
///
/// # Errors
///
/// An empty selection is a configuration error ([`StageError::NoMatchingFiles`]):
/// a stage that was asked to run but found nothing to do is assumed to be
/// misconfigured.
pub fn select_files(files: &FileSet, pattern: &str) -> Result<Vec<String>, StageError> {
    let matcher = PatternMatcher::new(pattern)?;
    let selected = matcher.select(files.paths());

    debug!("Pattern '{}' selected {} of {} files", pattern, selected.len(), files.len());

    if selected.is_empty() {
        return Err(StageError::NoMatchingFiles {
            pattern: pattern.to_string(),
        });
    }

    Ok(selected)
}
