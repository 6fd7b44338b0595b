//! Configuration for the template stage and the CLI host.
//!
//! - [`StageOptions`]: the options recognised by the stage itself
//!   (`pattern`, `extension`, `partials`, `helpers`, `layouts`, ...)
//! - [`ProjectConfig`]: a `trellis.toml` file combining stage options with
//!   global template metadata

mod options;
mod project;

pub use options::StageOptions;
pub use project::{CONFIG_FILE_NAME, ProjectConfig};
