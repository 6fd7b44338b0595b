//! Context merging for one compile step.
//!
//! The outermost compile of a file sees the global metadata with the file's
//! own locals layered on top. The `layout` directive is split off before a
//! template is rendered and never reaches the nested compile. A layout is
//! rendered against the full, unsplit context plus the rendered inner text
//! bound to `contents`.

use serde_json::{Map, Value};

use crate::core::StageError;

/// Key holding the layout directive in a file's locals.
pub const LAYOUT_KEY: &str = "layout";

/// Key the rendered inner text is bound to in a layout's context.
pub const CONTENTS_KEY: &str = "contents";

/// Merge global metadata with a file's locals. Locals win on conflicts.
pub fn initial_context(metadata: &Map<String, Value>, locals: &Map<String, Value>) -> Map<String, Value> {
    let mut context = metadata.clone();
    for (key, value) in locals {
        context.insert(key.clone(), value.clone());
    }
    context
}

/// Split the layout directive out of a context.
///
/// A non-empty string names the layout. `null`, `false` and the empty string
/// explicitly disable layouts.
///
/// # Errors
///
/// Returns [`StageError::InvalidLayoutDirective`] for any other value.
pub fn split_layout(
    file: &str,
    mut context: Map<String, Value>,
) -> Result<(Option<String>, Map<String, Value>), StageError> {
    let layout = match context.remove(LAYOUT_KEY) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(name)) if name.is_empty() => None,
        Some(Value::String(name)) => Some(name),
        Some(other) => {
            return Err(StageError::InvalidLayoutDirective {
                file: file.to_string(),
                found: value_kind(&other).to_string(),
            });
        }
    };
    Ok((layout, context))
}

/// Context for rendering a layout around already rendered `contents`.
pub fn layout_context(original: &Map<String, Value>, contents: String) -> Map<String, Value> {
    let mut context = original.clone();
    context.insert(CONTENTS_KEY.to_string(), Value::String(contents));
    context
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
