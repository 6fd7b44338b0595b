//! Error handling for Trellis.
//!
//! [`StageError`] enumerates every way a template stage run can fail. All
//! variants are fatal to the run; [`StageError::kind`] groups them into the
//! four failure classes reported to the host: configuration problems,
//! missing resources, template failures and I/O failures.
//!
//! At the CLI boundary errors travel as [`anyhow::Error`] and are converted
//! with [`user_friendly_error`] into an [`ErrorContext`] carrying a
//! suggestion and details for the terminal.

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::templating::TemplateError;

/// Failure class of a [`StageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The stage is misconfigured (bad pattern, nothing selected, ambiguous layout).
    Configuration,
    /// A file references a layout that was never loaded.
    MissingResource,
    /// Template syntax or render-time failure.
    Template,
    /// Unexpected filesystem failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::MissingResource => "missing resource",
            ErrorKind::Template => "template error",
            ErrorKind::Io => "I/O error",
        };
        f.write_str(name)
    }
}

/// The main error type for template stage operations.
#[derive(Error, Debug)]
pub enum StageError {
    /// The selection pattern did not match a single file.
    #[error("Pattern '{pattern}' did not match any files")]
    NoMatchingFiles {
        pattern: String,
    },

    /// The selection pattern is not a valid glob.
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    /// A file's `layout` field holds something other than a layout name.
    #[error("Invalid layout directive in '{file}': expected a layout name, found {found}")]
    InvalidLayoutDirective {
        file: String,
        found: String,
    },

    /// Several layout files reduce to the same base name.
    #[error(
        "Layout '{layout}' referenced by '{file}' is ambiguous: {}",
        candidates.join(", ")
    )]
    AmbiguousLayout {
        layout: String,
        file: String,
        candidates: Vec<String>,
    },

    /// A file references a layout that is not loaded.
    #[error("Layout '{layout}' not found for file '{file}'")]
    LayoutNotFound {
        layout: String,
        file: String,
        suggestion: Option<String>,
    },

    /// Template compilation or rendering failed.
    #[error("Failed to render '{file}': {source}")]
    Template {
        file: String,
        #[source]
        source: TemplateError,
    },

    /// A partial file does not parse.
    #[error("Failed to load partial '{name}' from {}: {source}", path.display())]
    PartialLoad {
        name: String,
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    /// A helper module could not be turned into a callable.
    #[error("Failed to load helper '{name}' from {}: {reason}", path.display())]
    HelperLoad {
        name: String,
        path: PathBuf,
        reason: String,
    },

    /// A filesystem operation failed.
    #[error("File system error: {operation} ({})", path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A render task panicked or was cancelled by the runtime.
    #[error("Render task for '{file}' failed: {reason}")]
    TaskFailed {
        file: String,
        reason: String,
    },
}

impl StageError {
    /// Classify the error into one of the four run-level failure classes.
    ///
    /// [`StageError::TaskFailed`] counts as a template failure: render tasks
    /// only evaluate templates and helpers, so a panic there comes from one.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            StageError::NoMatchingFiles {
                ..
            }
            | StageError::InvalidPattern {
                ..
            }
            | StageError::InvalidLayoutDirective {
                ..
            }
            | StageError::AmbiguousLayout {
                ..
            } => ErrorKind::Configuration,
            StageError::LayoutNotFound {
                ..
            } => ErrorKind::MissingResource,
            StageError::Template {
                ..
            }
            | StageError::PartialLoad {
                ..
            }
            | StageError::HelperLoad {
                ..
            }
            | StageError::TaskFailed {
                ..
            } => ErrorKind::Template,
            StageError::Io {
                ..
            } => ErrorKind::Io,
        }
    }

    /// Build an [`StageError::Io`] for `operation` on `path`.
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StageError::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }
}

/// User-facing error with optional suggestion and details.
#[derive(Debug)]
pub struct ErrorContext {
    /// The rendered error message, including its cause chain
    pub message: String,
    /// Failure class, when the error originated in the stage
    pub kind: Option<ErrorKind>,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
            suggestion: None,
            details: None,
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions for the terminal.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = message_with_chain(&error);

    if let Some(stage_error) = error.chain().find_map(|e| e.downcast_ref::<StageError>()) {
        return create_error_context(stage_error, message);
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(message)
            .with_kind(ErrorKind::Configuration)
            .with_suggestion("Check the TOML syntax in your trellis.toml file")
            .with_details(toml_error.to_string());
    }

    if let Some(io_error) = error.chain().find_map(|e| e.downcast_ref::<std::io::Error>()) {
        let ctx = ErrorContext::new(message).with_kind(ErrorKind::Io);
        return match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                ctx.with_suggestion("Check file ownership and permissions")
            }
            std::io::ErrorKind::NotFound => {
                ctx.with_suggestion("Check that the file or directory exists and the path is correct")
            }
            _ => ctx,
        };
    }

    ErrorContext::new(message)
}

fn create_error_context(error: &StageError, message: String) -> ErrorContext {
    let ctx = ErrorContext::new(message).with_kind(error.kind());
    match error {
        StageError::NoMatchingFiles {
            ..
        } => ctx
            .with_suggestion("Check the `pattern` option; it is matched against paths relative to the source directory")
            .with_details("An empty selection is treated as a misconfiguration rather than a no-op"),
        StageError::InvalidPattern {
            ..
        } => ctx.with_suggestion("Use glob syntax such as '**/*.hbs' or 'posts/*.hbs'"),
        StageError::InvalidLayoutDirective {
            ..
        } => ctx.with_suggestion("Set `layout` to the name of a file in the layouts directory, or remove it"),
        StageError::AmbiguousLayout {
            ..
        } => ctx.with_suggestion("Rename one of the layout files so that every base name is unique"),
        StageError::LayoutNotFound {
            suggestion,
            ..
        } => match suggestion {
            Some(name) => ctx.with_suggestion(format!("Did you mean layout '{name}'?")),
            None => ctx.with_suggestion("Check the `layouts` option and the layout name in the file's frontmatter"),
        },
        StageError::Template {
            source,
            ..
        } => ctx
            .with_details(source.format_with_context())
            .with_suggestion(
                "Check template syntax: variables use {{ var }}, control flow uses {% %}, \
                 partials use {% include \"name\" %}",
            ),
        StageError::PartialLoad {
            source,
            ..
        } => ctx
            .with_details(source.format_with_context())
            .with_suggestion("Fix the syntax of the partial file; every partial is parsed before any page renders"),
        StageError::HelperLoad {
            ..
        } => ctx.with_suggestion("Helper modules are Tera templates rendered with the call's arguments"),
        StageError::Io {
            ..
        }
        | StageError::TaskFailed {
            ..
        } => ctx,
    }
}

fn message_with_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();

    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    message
}
