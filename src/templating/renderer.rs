//! Template engine built on Tera.
//!
//! [`TemplateEngine`] is the immutable, run-scoped engine produced by
//! [`TemplateRegistry::build`](super::TemplateRegistry::build). It holds the
//! registered partials and helpers; every [`TemplateEngine::compile`] call
//! clones it and adds one more template, so compiled templates never touch
//! shared state and can be rendered from any thread.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera};

use super::error::TemplateError;

/// Maximum allowed Levenshtein distance as a percentage of target length for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Immutable template engine shared by all render tasks of a run.
#[derive(Clone)]
pub struct TemplateEngine {
    tera: Tera,
    partials: BTreeSet<String>,
    helpers: BTreeSet<String>,
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("partials", &self.partials)
            .field("helpers", &self.helpers)
            .finish()
    }
}

/// A template compiled against a [`TemplateEngine`], ready to render.
#[derive(Clone)]
pub struct CompiledTemplate {
    tera: Tera,
    name: String,
    label: String,
}

impl std::fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTemplate").field("label", &self.label).finish()
    }
}

impl TemplateEngine {
    pub(crate) fn new(tera: Tera, partials: BTreeSet<String>, helpers: BTreeSet<String>) -> Self {
        Self {
            tera,
            partials,
            helpers,
        }
    }

    /// Compile `source` as a template.
    ///
    /// `label` names the template in error messages (for example
    /// `page 'index.hbs'` or `layout 'base'`).
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::SyntaxError`] when the source does not parse.
    pub fn compile(&self, label: &str, source: &str) -> Result<CompiledTemplate, TemplateError> {
        let name = internal_name(label);
        let mut tera = self.tera.clone();
        tera.add_raw_template(&name, source).map_err(|e| TemplateError::SyntaxError {
            template: label.to_string(),
            message: format_tera_error(&e, &name, label),
        })?;

        Ok(CompiledTemplate {
            tera,
            name,
            label: label.to_string(),
        })
    }

    pub fn has_partial(&self, name: &str) -> bool {
        self.partials.contains(name)
    }

    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains(name)
    }
}

impl CompiledTemplate {
    /// Render the template against a variable context.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::VariableNotFound`] with suggestions when the
    /// template references an undefined variable, and
    /// [`TemplateError::RenderFailed`] for any other render-time failure.
    pub fn render(&self, context: &Map<String, Value>) -> Result<String, TemplateError> {
        let tera_context =
            TeraContext::from_serialize(context).map_err(|e| TemplateError::RenderFailed {
                template: self.label.clone(),
                message: format_tera_error(&e, &self.name, &self.label),
            })?;

        self.tera
            .render(&self.name, &tera_context)
            .map_err(|e| parse_render_error(&e, &self.name, &self.label, context))
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Internal Tera name for a compiled template.
///
/// The prefix keeps compiled pages and layouts from shadowing partial names.
fn internal_name(label: &str) -> String {
    format!("__trellis__/{label}")
}

fn parse_render_error(
    error: &tera::Error,
    name: &str,
    label: &str,
    context: &Map<String, Value>,
) -> TemplateError {
    for message in error_chain(error) {
        if let Some(variable) = extract_variable_name(&message) {
            let available_variables: Vec<String> = context.keys().cloned().collect();
            let suggestions = find_similar_variables(&variable, &available_variables);
            return TemplateError::VariableNotFound {
                variable,
                template: label.to_string(),
                available_variables: Box::new(available_variables),
                suggestions: Box::new(suggestions),
            };
        }
    }

    TemplateError::RenderFailed {
        template: label.to_string(),
        message: format_tera_error(error, name, label),
    }
}

fn error_chain(error: &tera::Error) -> Vec<String> {
    use std::error::Error;

    let mut messages = vec![error.to_string()];
    let mut current: Option<&dyn Error> = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }
    messages
}

fn extract_variable_name(error_msg: &str) -> Option<String> {
    static VARIABLE_NOT_FOUND: OnceLock<Option<Regex>> = OnceLock::new();
    let re = VARIABLE_NOT_FOUND
        .get_or_init(|| Regex::new(r"Variable `([^`]+)` not found").ok())
        .as_ref()?;
    re.captures(error_msg).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
}

fn find_similar_variables(target: &str, available: &[String]) -> Vec<String> {
    // Only the top-level segment of a dotted path is a context key.
    let head = target.split('.').next().unwrap_or(target);

    let mut scored: Vec<_> =
        available.iter().map(|var| (var.clone(), levenshtein(head, var))).collect();
    scored.sort_by_key(|(_, dist)| *dist);

    scored
        .into_iter()
        .filter(|(_, dist)| *dist <= head.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .take(3)
        .map(|(var, _)| var)
        .collect()
}

/// Flatten a Tera error chain into one message.
pub(crate) fn describe_tera_error(error: &tera::Error) -> String {
    error_chain(error).join(": ")
}

/// Flatten a Tera error chain into one message, replacing the internal
/// template name with its user-facing label.
pub fn format_tera_error(error: &tera::Error, name: &str, label: &str) -> String {
    let quoted = format!("'{name}'");
    let messages: Vec<String> = error_chain(error)
        .into_iter()
        .map(|msg| {
            msg.replace(&format!("Failed to render {quoted}"), "")
                .replace(&format!("Failed to parse {quoted}"), "")
                .replace(&format!("while rendering {quoted}"), "")
                .replace(&quoted, label)
                .trim()
                .to_string()
        })
        .filter(|msg| !msg.is_empty())
        .collect();

    if messages.is_empty() {
        "unknown template error".to_string()
    } else {
        messages.join(": ")
    }
}
