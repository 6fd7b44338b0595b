//! trellis - page templating with layouts, partials and helpers
//!
//! trellis is a template stage for static-site style build pipelines. Given an
//! in-memory set of files, it renders every selected template file with a
//! context built from global metadata and the file's own variables, wraps the
//! result in the layout the file names, and renames rendered templates to
//! their output extension.
//!
//! # Architecture Overview
//!
//! A run of the stage is a single pass over a [`files::FileSet`]:
//!
//! 1. Select files with a glob pattern ([`pattern`])
//! 2. Load layouts, partials and helpers from disk ([`resources`])
//! 3. Register partials and helpers into a run-scoped engine ([`templating`])
//! 4. Compile every selected file concurrently ([`templating::Compiler`])
//! 5. Write the outputs back and rename them ([`stage`])
//!
//! A failed run leaves the file set untouched.
//!
//! # Core Modules
//!
//! - [`stage`] - The pipeline entry point, [`stage::TemplateStage`]
//! - [`templating`] - Context merging, the recursive compile and the Tera engine
//! - [`resources`] - Loading layouts, partials and helper modules
//! - [`files`] - The virtual file set and output renaming
//! - [`pattern`] - Glob selection of files
//! - [`config`] - Stage options and the `trellis.toml` project file
//! - [`core`] - Error types and user-facing error formatting
//!
//! ## Host Modules
//! - [`cli`] - The `trellis` command-line host
//! - [`frontmatter`] - YAML frontmatter extraction for files read from disk
//!
//! # Example
//!
//! ```rust,no_run
//! use trellis_cli::config::StageOptions;
//! use trellis_cli::files::{FileSet, VirtualFile};
//! use trellis_cli::stage::{HostContext, TemplateStage};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut files = FileSet::new();
//! files.insert("index.hbs", VirtualFile::new("<h1>{{ title }}</h1>").local("title", "Home"));
//!
//! let stage = TemplateStage::new(StageOptions::default());
//! stage.run(&mut files, &HostContext::new("site")).await?;
//!
//! assert_eq!(files.get("index.html").unwrap().contents, b"<h1>Home</h1>");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod files;
pub mod frontmatter;
pub mod pattern;
pub mod resources;
pub mod stage;
pub mod templating;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
