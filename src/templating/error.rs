//! Structured template errors.
//!
//! Tera reports failures as a chain of nested errors that mention internal
//! template names. This module turns them into a small set of variants that
//! name the user-facing template (a page, a layout, a partial or a helper)
//! and carry enough context for a helpful message.

use std::fmt;

/// Errors raised while compiling or rendering a template.
#[derive(Debug)]
pub enum TemplateError {
    /// A variable referenced by the template is not present in the context.
    VariableNotFound {
        variable: String,
        template: String,
        available_variables: Box<Vec<String>>,
        suggestions: Box<Vec<String>>,
    },

    /// The template source could not be parsed.
    SyntaxError {
        template: String,
        message: String,
    },

    /// Rendering failed for any other reason (failing helper, type mismatch, ...).
    RenderFailed {
        template: String,
        message: String,
    },

    /// The template source is not valid UTF-8.
    InvalidUtf8 {
        template: String,
    },
}

impl TemplateError {
    /// The user-facing name of the template the error belongs to.
    pub fn template(&self) -> &str {
        match self {
            TemplateError::VariableNotFound {
                template,
                ..
            }
            | TemplateError::SyntaxError {
                template,
                ..
            }
            | TemplateError::RenderFailed {
                template,
                ..
            }
            | TemplateError::InvalidUtf8 {
                template,
            } => template,
        }
    }

    /// Generate a multi-line message including suggestions, for terminal output.
    pub fn format_with_context(&self) -> String {
        match self {
            TemplateError::VariableNotFound {
                variable,
                template,
                available_variables,
                suggestions,
            } => {
                let mut msg = format!("Variable '{variable}' is not defined in {template}\n");
                if !suggestions.is_empty() {
                    msg.push_str(&format!("Did you mean: {}\n", suggestions.join(", ")));
                }
                if !available_variables.is_empty() {
                    msg.push_str(&format!(
                        "Available variables: {}\n",
                        available_variables.join(", ")
                    ));
                }
                msg
            }
            other => format!("{other}\n"),
        }
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::VariableNotFound {
                variable,
                template,
                suggestions,
                ..
            } => {
                write!(f, "Template variable not found in {template}: '{variable}'")?;
                if let Some(first) = suggestions.first() {
                    write!(f, " (did you mean '{first}'?)")?;
                }
                Ok(())
            }
            TemplateError::SyntaxError {
                template,
                message,
            } => write!(f, "Template syntax error in {template}: {message}"),
            TemplateError::RenderFailed {
                template,
                message,
            } => write!(f, "Failed to render {template}: {message}"),
            TemplateError::InvalidUtf8 {
                template,
            } => write!(f, "{template} is not valid UTF-8 and cannot be rendered as a template"),
        }
    }
}

impl std::error::Error for TemplateError {}
