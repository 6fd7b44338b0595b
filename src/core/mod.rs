//! Core error types for trellis.
//!
//! - [`StageError`]: every failure the template stage can report, each mapped to
//!   an [`ErrorKind`]
//! - [`ErrorContext`] / [`user_friendly_error`]: terminal presentation of
//!   errors with suggestions, used by the CLI

pub mod error;

pub use error::{ErrorContext, ErrorKind, StageError, user_friendly_error};
