//! YAML frontmatter extraction for source files read by the CLI.
//!
//! A file that starts with a `---` delimited YAML block has that block turned
//! into the file's local variables; the remainder becomes its contents.
//!
//! ```text
//! ---
//! title: Home
//! layout: base
//! ---
//! <h1>{{ title }}</h1>
//! ```

use anyhow::{Context, Result, bail};
use gray_matter::Matter;
use gray_matter::engine::YAML;
use serde_json::{Map, Value};

use crate::files::VirtualFile;

/// Split `content` into its frontmatter variables and body.
///
/// Content without frontmatter yields no variables and the content unchanged.
///
/// # Errors
///
/// Fails when the frontmatter is not valid YAML or is not a mapping.
pub fn split(content: &str) -> Result<(Map<String, Value>, String)> {
    let matter = Matter::<YAML>::new();
    let parsed = matter.parse::<serde_yaml::Value>(content)?;

    let Some(data) = parsed.data else {
        return Ok((Map::new(), content.to_string()));
    };

    let locals = match serde_json::to_value(&data).context("Frontmatter is not representable as JSON")? {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => bail!("Frontmatter must be a mapping, found {}", crate::templating::context::value_kind(&other)),
    };

    let body = parsed.content;
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(&body)
        .to_string();

    Ok((locals, body))
}

/// Build a [`VirtualFile`] from raw bytes, extracting frontmatter when the
/// bytes are UTF-8. Binary content is kept as-is with no variables.
pub fn load_file(path: &str, bytes: Vec<u8>) -> Result<VirtualFile> {
    match String::from_utf8(bytes) {
        Ok(text) => {
            let (locals, body) =
                split(&text).with_context(|| format!("Failed to parse frontmatter in '{path}'"))?;
            Ok(VirtualFile::with_locals(body, locals))
        }
        Err(e) => Ok(VirtualFile::new(e.into_bytes())),
    }
}
