//! Tera-based page templating with layouts, partials and helpers.
//!
//! This module holds the core of the template stage:
//!
//! - [`context`]: merging of global metadata and per-file locals, and the
//!   handling of the `layout` directive
//! - [`compiler`]: the recursive compile that renders a page and wraps it in
//!   its layout
//! - [`registry`] / [`renderer`]: the run-scoped Tera engine with registered
//!   partials and helpers
//! - [`helpers`]: loading helper modules into callables
//!
//! # Template Syntax
//!
//! Pages, layouts, partials and helper modules all use Tera syntax:
//!
//! - Variable substitution: `{{ title }}`
//! - Conditionals and loops: `{% if draft %}...{% endif %}`, `{% for tag in tags %}...{% endfor %}`
//! - Partials: `{% include "header" %}`
//! - Helpers: `{{ badge(text="new") }}`
//!
//! Output is never HTML-escaped, so a layout can inject its rendered page
//! with a plain `{{ contents }}`.
//!
//! Referencing a variable that is not in the context is a render error, not
//! empty output. A layout shared by pages that do not all set a value has to
//! say so with a fallback:
//!
//! ```text
//! <title>{{ title | default(value="") }}</title>
//! {% if description is defined %}<meta name="description" content="{{ description }}">{% endif %}
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use serde_json::{Map, json};
//! use trellis_cli::resources::LayoutMap;
//! use trellis_cli::templating::{Compiler, RenderSettings, TemplateRegistry};
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut layouts = LayoutMap::new();
//! layouts.insert("base", "layouts/base.hbs", "<body>{{ contents }}</body>".to_string());
//!
//! let settings = RenderSettings {
//!     metadata: Map::new(),
//!     extension: ".hbs".to_string(),
//!     layouts,
//! };
//! let engine = TemplateRegistry::new().build()?;
//!
//! let mut context = Map::new();
//! context.insert("layout".to_string(), json!("base"));
//! context.insert("title".to_string(), json!("Hello"));
//!
//! let html = Compiler::new(&settings, &engine).compile("index.hbs", b"<h1>{{ title }}</h1>", context)?;
//! assert_eq!(html, b"<body><h1>Hello</h1></body>");
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod context;
pub mod error;
pub mod helpers;
pub mod registry;
pub mod renderer;

pub use compiler::{Compiler, RenderSettings};
pub use context::{CONTENTS_KEY, LAYOUT_KEY, initial_context, layout_context, split_layout};
pub use error::TemplateError;
pub use helpers::{HelperLoader, TemplateHelperLoader};
pub use registry::{HelperFn, TemplateRegistry};
pub use renderer::{CompiledTemplate, TemplateEngine};
