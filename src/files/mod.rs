//! In-memory virtual file set.
//!
//! The host pipeline owns a [`FileSet`]: a mapping from `/`-separated virtual
//! paths to [`VirtualFile`]s. Each file carries its raw `contents` and the
//! local variables produced upstream (typically from frontmatter). The
//! template stage rewrites `contents` in place and may move rendered files
//! to a new path with [`rename_outputs`].

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::collections::btree_map;
use tracing::{debug, warn};

/// A single file of the virtual file set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualFile {
    /// Raw file contents. Rewritten in place by the template stage.
    pub contents: Vec<u8>,
    /// Per-file variables (frontmatter and anything else set upstream).
    pub locals: Map<String, Value>,
}

impl VirtualFile {
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: contents.into(),
            locals: Map::new(),
        }
    }

    pub fn with_locals(contents: impl Into<Vec<u8>>, locals: Map<String, Value>) -> Self {
        Self {
            contents: contents.into(),
            locals,
        }
    }

    /// Builder-style setter for a single local variable.
    #[must_use]
    pub fn local(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.locals.insert(key.into(), value.into());
        self
    }

    /// The contents as UTF-8 text, if they are valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }
}

/// Ordered mapping from virtual path to [`VirtualFile`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSet {
    files: BTreeMap<String, VirtualFile>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, file: VirtualFile) -> Option<VirtualFile> {
        self.files.insert(path.into(), file)
    }

    pub fn get(&self, path: &str) -> Option<&VirtualFile> {
        self.files.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut VirtualFile> {
        self.files.get_mut(path)
    }

    pub fn remove(&mut self, path: &str) -> Option<VirtualFile> {
        self.files.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// All paths, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, VirtualFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Move the entry at `from` to `to`, replacing any entry already at `to`.
    ///
    /// Returns `false` when there is no entry at `from`.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        match self.files.remove(from) {
            Some(file) => {
                if self.files.insert(to.to_string(), file).is_some() {
                    warn!("Renaming '{}' overwrote existing file '{}'", from, to);
                }
                true
            }
            None => false,
        }
    }
}

impl<S: Into<String>> FromIterator<(S, VirtualFile)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (S, VirtualFile)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(|(path, file)| (path.into(), file)).collect(),
        }
    }
}

impl IntoIterator for FileSet {
    type Item = (String, VirtualFile);
    type IntoIter = btree_map::IntoIter<String, VirtualFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = (&'a String, &'a VirtualFile);
    type IntoIter = btree_map::Iter<'a, String, VirtualFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Whether the final path segment of `path` ends with `extension`.
pub fn has_extension(path: &str, extension: &str) -> bool {
    file_name(path).ends_with(extension)
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Compute the output path of a template file.
///
/// The directory is kept, `extension` is stripped from the file name and
/// `output_extension` appended. Returns `None` when the file name does not
/// end with `extension`.
pub fn output_path(path: &str, extension: &str, output_extension: &str) -> Option<String> {
    let name = file_name(path);
    let base = name.strip_suffix(extension)?;
    let dir = &path[..path.len() - name.len()];
    Some(format!("{dir}{base}{output_extension}"))
}

/// Move every rendered template in `selected` to its output path.
///
/// Files whose name does not end with `extension`, or whose output path equals
/// the current path, are left untouched. Returns the `(old, new)` pairs that
/// were moved, in the order of `selected`.
pub fn rename_outputs<S: AsRef<str>>(
    files: &mut FileSet,
    selected: &[S],
    extension: &str,
    output_extension: &str,
) -> Vec<(String, String)> {
    let mut renamed = Vec::new();

    for path in selected {
        let path = path.as_ref();
        let Some(new_path) = output_path(path, extension, output_extension) else {
            continue;
        };
        if new_path == path {
            continue;
        }
        if files.rename(path, &new_path) {
            debug!("Renamed '{}' -> '{}'", path, new_path);
            renamed.push((path.to_string(), new_path));
        }
    }

    renamed
}
