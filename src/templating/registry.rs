//! Run-scoped registry of partials and helpers.
//!
//! A fresh [`TemplateRegistry`] is filled at the start of every run and then
//! frozen into a [`TemplateEngine`]. Nothing is registered process-wide, so
//! two runs (or two tests) never observe each other's partials or helpers.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tera::Tera;
use tracing::debug;

use super::error::TemplateError;
use super::renderer::{TemplateEngine, describe_tera_error};

/// A helper callable from templates as `{{ name(arg=value) }}`.
pub type HelperFn = Arc<dyn Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync>;

/// Builder collecting the partials and helpers of one run.
#[derive(Default)]
pub struct TemplateRegistry {
    partials: BTreeMap<String, String>,
    helpers: BTreeMap<String, HelperFn>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("partials", &self.partials.keys().collect::<Vec<_>>())
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a partial, invocable as `{% include "name" %}`.
    ///
    /// Registering the same name twice replaces the earlier source.
    pub fn register_partial(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.partials.insert(name.into(), source.into());
    }

    /// Parse a single partial on its own.
    ///
    /// References to other partials are not resolved here; that happens in
    /// [`build`](Self::build) once every partial is known.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::SyntaxError`] naming the partial when its
    /// source does not parse.
    pub fn check_partial(name: &str, source: &str) -> Result<(), TemplateError> {
        tera::Template::new(name, None, source).map(|_| ()).map_err(|e| TemplateError::SyntaxError {
            template: format!("partial '{name}'"),
            message: describe_tera_error(&e),
        })
    }

    /// Register a helper function.
    pub fn register_helper(&mut self, name: impl Into<String>, helper: HelperFn) {
        self.helpers.insert(name.into(), helper);
    }

    /// Freeze the registry into an engine.
    ///
    /// All partials are parsed together so they may include or extend one
    /// another regardless of registration order.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::SyntaxError`] when a partial does not parse.
    pub fn build(self) -> Result<TemplateEngine, TemplateError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(self.partials.iter().map(|(name, source)| (name.as_str(), source.as_str())))
            .map_err(|e| TemplateError::SyntaxError {
                template: "partials".to_string(),
                message: describe_tera_error(&e),
            })?;

        for (name, helper) in &self.helpers {
            let helper = Arc::clone(helper);
            tera.register_function(name, move |args: &HashMap<String, Value>| helper(args));
        }

        debug!(
            "Built template engine with {} partial(s) and {} helper(s)",
            self.partials.len(),
            self.helpers.len()
        );

        Ok(TemplateEngine::new(
            tera,
            self.partials.into_keys().collect::<BTreeSet<_>>(),
            self.helpers.into_keys().collect::<BTreeSet<_>>(),
        ))
    }
}
