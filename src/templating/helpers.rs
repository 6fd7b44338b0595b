//! Helper module loading.
//!
//! The template stage never knows how a helper is implemented: it hands each
//! helper module found on disk to a [`HelperLoader`] and registers the
//! returned [`HelperFn`] under the module's name. The default loader,
//! [`TemplateHelperLoader`], treats a helper module as a small Tera body that
//! is rendered with the call's keyword arguments:
//!
//! ```text
//! helpers/badge.helper:
//!   <span class="badge badge-{{ kind | default(value="info") }}">{{ text }}</span>
//!
//! page.hbs:
//!   {{ badge(text="new", kind="success") }}
//! ```
//!
//! Hosts that want native helpers can register Rust closures directly with
//! [`TemplateStage::with_helper`](crate::stage::TemplateStage::with_helper) or
//! supply their own loader.

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tera::{Context as TeraContext, Tera};

use super::registry::HelperFn;
use super::renderer::describe_tera_error;
use crate::core::StageError;

/// Turns a helper module into a callable.
pub trait HelperLoader: Send + Sync {
    /// Load the helper `name` whose module lives at `path` with the given source.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::HelperLoad`] when the module cannot be turned into
    /// a callable.
    fn load(&self, name: &str, path: &Path, source: &str) -> Result<HelperFn, StageError>;
}

/// Loads helper modules written as Tera bodies.
///
/// The rendered body is returned as a string with surrounding whitespace
/// trimmed, so helper files may end with a newline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateHelperLoader;

const HELPER_TEMPLATE: &str = "helper";

impl HelperLoader for TemplateHelperLoader {
    fn load(&self, name: &str, path: &Path, source: &str) -> Result<HelperFn, StageError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(HELPER_TEMPLATE, source).map_err(|e| StageError::HelperLoad {
            name: name.to_string(),
            path: path.to_path_buf(),
            reason: describe_tera_error(&e),
        })?;

        let tera = Arc::new(tera);
        Ok(Arc::new(move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let mut context = TeraContext::new();
            for (key, value) in args {
                context.insert(key.as_str(), value);
            }
            let rendered = tera.render(HELPER_TEMPLATE, &context)?;
            Ok(Value::String(rendered.trim().to_string()))
        }))
    }
}
