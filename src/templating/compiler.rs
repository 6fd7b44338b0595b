//! Recursive page compiler.
//!
//! A selected file is rendered in at most two passes:
//!
//! 1. If it names a layout and is itself a template (its name ends with the
//!    configured extension), its body is compiled against its own context,
//!    minus the `layout` directive.
//! 2. The layout is compiled and rendered against the file's full context
//!    with the result of step 1 (or the raw contents, for non-template files)
//!    bound to `contents`.
//!
//! Without a layout, template files render once against their context and
//! every other file passes through byte-for-byte.

use serde_json::{Map, Value};
use strsim::levenshtein;
use tracing::debug;

use super::context::{layout_context, split_layout};
use super::error::TemplateError;
use super::renderer::TemplateEngine;
use crate::core::StageError;
use crate::files::has_extension;
use crate::resources::{LayoutLookup, LayoutMap};

/// Immutable inputs shared by every compile of a run.
#[derive(Debug, Clone, Default)]
pub struct RenderSettings {
    /// Global metadata, already including the injected working directory.
    pub metadata: Map<String, Value>,
    /// Suffix identifying template files, e.g. `.hbs`.
    pub extension: String,
    /// Loaded layouts keyed by base name.
    pub layouts: LayoutMap,
}

impl RenderSettings {
    /// Whether `filename` is a template by extension.
    pub fn is_template(&self, filename: &str) -> bool {
        has_extension(filename, &self.extension)
    }

    /// Base name of a layout reference: the configured extension is stripped if present.
    pub fn layout_key<'a>(&self, layout: &'a str) -> &'a str {
        layout.strip_suffix(self.extension.as_str()).filter(|key| !key.is_empty()).unwrap_or(layout)
    }

    fn resolve_layout(&self, layout: &str, filename: &str) -> Result<(&str, String), StageError> {
        let key = self.layout_key(layout);
        match self.layouts.lookup(key) {
            LayoutLookup::Found(source) => Ok((source, key.to_string())),
            LayoutLookup::Ambiguous(paths) => Err(StageError::AmbiguousLayout {
                layout: key.to_string(),
                file: filename.to_string(),
                candidates: paths.iter().map(|p| p.display().to_string()).collect(),
            }),
            LayoutLookup::Missing => Err(StageError::LayoutNotFound {
                layout: key.to_string(),
                file: filename.to_string(),
                suggestion: closest_name(key, self.layouts.names()),
            }),
        }
    }
}

fn closest_name<'a>(target: &str, names: impl Iterator<Item = &'a str>) -> Option<String> {
    names
        .map(|name| (levenshtein(target, name), name))
        .filter(|(dist, _)| *dist <= target.len().max(2) / 2)
        .min_by_key(|(dist, _)| *dist)
        .map(|(_, name)| name.to_string())
}

/// Compiles files against the settings and engine of one run.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    settings: &'a RenderSettings,
    engine: &'a TemplateEngine,
}

impl<'a> Compiler<'a> {
    pub const fn new(settings: &'a RenderSettings, engine: &'a TemplateEngine) -> Self {
        Self {
            settings,
            engine,
        }
    }

    /// Render one file.
    ///
    /// `context` is the merged variable context for this level; at the
    /// outermost call it is the global metadata overlaid with the file's locals.
    ///
    /// # Errors
    ///
    /// - [`StageError::LayoutNotFound`] / [`StageError::AmbiguousLayout`] when the
    ///   named layout cannot be resolved
    /// - [`StageError::InvalidLayoutDirective`] when `layout` is not a name
    /// - [`StageError::Template`] for syntax, render and UTF-8 failures
    pub fn compile(
        &self,
        filename: &str,
        raw: &[u8],
        context: Map<String, Value>,
    ) -> Result<Vec<u8>, StageError> {
        let (layout, locals) = split_layout(filename, context.clone())?;

        match layout {
            Some(layout) => {
                let (source, key) = self.settings.resolve_layout(&layout, filename)?;
                let template = self
                    .engine
                    .compile(&format!("layout '{key}'"), source)
                    .map_err(|source| template_error(filename, source))?;

                let inner = if self.settings.is_template(filename) {
                    debug!("Compiling '{}' before wrapping it in layout '{}'", filename, key);
                    self.compile(filename, raw, locals)?
                } else {
                    debug!("Wrapping non-template '{}' in layout '{}'", filename, key);
                    raw.to_vec()
                };
                let inner = into_text(filename, inner)?;

                let rendered = template
                    .render(&layout_context(&context, inner))
                    .map_err(|source| template_error(filename, source))?;
                Ok(rendered.into_bytes())
            }
            None if self.settings.is_template(filename) => {
                debug!("Compiling '{}'", filename);
                let source = std::str::from_utf8(raw).map_err(|_| {
                    template_error(
                        filename,
                        TemplateError::InvalidUtf8 {
                            template: page_label(filename),
                        },
                    )
                })?;
                let rendered = self
                    .engine
                    .compile(&page_label(filename), source)
                    .and_then(|template| template.render(&locals))
                    .map_err(|source| template_error(filename, source))?;
                Ok(rendered.into_bytes())
            }
            None => {
                debug!("Passing '{}' through unchanged", filename);
                Ok(raw.to_vec())
            }
        }
    }
}

fn page_label(filename: &str) -> String {
    format!("page '{filename}'")
}

fn template_error(filename: &str, source: TemplateError) -> StageError {
    StageError::Template {
        file: filename.to_string(),
        source,
    }
}

fn into_text(filename: &str, bytes: Vec<u8>) -> Result<String, StageError> {
    String::from_utf8(bytes).map_err(|_| {
        template_error(
            filename,
            TemplateError::InvalidUtf8 {
                template: page_label(filename),
            },
        )
    })
}
