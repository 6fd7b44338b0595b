//! Loading of auxiliary template resources from disk.
//!
//! Layouts, partials and helpers each live in their own directory. They are
//! read into memory once per run, keyed by base name. A directory that is not
//! configured or does not exist yields an empty set; entries that are
//! directories are skipped. Any other read failure is fatal for the run.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use trellis_cli::resources::{SuffixFilter, load_directory};
//!
//! # async fn example() -> Result<(), trellis_cli::core::StageError> {
//! let partials = load_directory(Some(Path::new("partials")), &SuffixFilter::only(".hbs")).await?;
//! for (name, partial) in &partials {
//!     println!("{name}: {} bytes", partial.source.len());
//! }
//! # Ok(())
//! # }
//! ```

use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, trace};

use crate::core::StageError;

/// File suffix of helper modules, independent of the template extension.
pub const HELPER_SUFFIX: &str = ".helper";

/// Which directory entries a load accepts, and how their names are derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuffixFilter {
    /// Accept every file; the name is the file stem (last extension removed).
    Any,
    /// Accept files ending with the suffix; the name is the file name without it.
    Only(String),
}

impl SuffixFilter {
    pub fn only(suffix: impl Into<String>) -> Self {
        SuffixFilter::Only(suffix.into())
    }

    /// Resource name for a file name, or `None` when the filter rejects it.
    pub fn resource_name(&self, file_name: &str) -> Option<String> {
        match self {
            SuffixFilter::Any => {
                let stem = Path::new(file_name).file_stem()?.to_str()?;
                Some(stem.to_string())
            }
            SuffixFilter::Only(suffix) => {
                let name = file_name.strip_suffix(suffix.as_str())?;
                if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                }
            }
        }
    }
}

/// A resource file read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub path: PathBuf,
    pub source: String,
}

/// Read every accepted file of a directory, concurrently.
///
/// Returns resources keyed by name. When two files reduce to the same name,
/// the result keeps the one whose path sorts first; use [`load_layouts`] when
/// collisions must be detected.
///
/// # Errors
///
/// Returns [`StageError::Io`] when the directory cannot be listed for a
/// reason other than not existing, or when an accepted file cannot be read.
pub async fn load_directory(
    path: Option<&Path>,
    filter: &SuffixFilter,
) -> Result<BTreeMap<String, Resource>, StageError> {
    let mut resources = BTreeMap::new();
    for resource in read_resources(path, filter).await? {
        resources.entry(resource.name.clone()).or_insert(resource);
    }
    Ok(resources)
}

async fn read_resources(
    path: Option<&Path>,
    filter: &SuffixFilter,
) -> Result<Vec<Resource>, StageError> {
    let Some(dir) = path else {
        return Ok(Vec::new());
    };

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Resource directory {} does not exist, nothing to load", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(StageError::io("list resource directory", dir, e)),
    };

    let mut candidates = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StageError::io("list resource directory", dir, e))?
    {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            trace!("Skipping non UTF-8 entry name in {}", dir.display());
            continue;
        };
        if file_name.starts_with('.') {
            continue;
        }
        if let Some(name) = filter.resource_name(file_name) {
            candidates.push((name, entry.path()));
        }
    }
    candidates.sort_by(|a, b| a.1.cmp(&b.1));

    let reads = candidates.into_iter().map(|(name, path)| read_resource(name, path));

    let loaded: Vec<Resource> = try_join_all(reads).await?.into_iter().flatten().collect();
    debug!("Loaded {} resource(s) from {}", loaded.len(), dir.display());
    Ok(loaded)
}

async fn read_resource(name: String, path: PathBuf) -> Result<Option<Resource>, StageError> {
    let metadata =
        fs::metadata(&path).await.map_err(|e| StageError::io("inspect resource", &path, e))?;
    if metadata.is_dir() {
        trace!("Skipping directory entry {}", path.display());
        return Ok(None);
    }
    match fs::read_to_string(&path).await {
        Ok(source) => Ok(Some(Resource {
            name,
            path,
            source,
        })),
        Err(e) if e.kind() == io::ErrorKind::IsADirectory => Ok(None),
        Err(e) => Err(StageError::io("read resource", &path, e)),
    }
}

/// Layout sources keyed by base name.
///
/// Built once per run and immutable afterwards. Names claimed by more than one
/// file are kept aside as collisions and reported when referenced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutMap {
    layouts: BTreeMap<String, (PathBuf, String)>,
    collisions: BTreeMap<String, Vec<PathBuf>>,
}

/// Outcome of a [`LayoutMap`] lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum LayoutLookup<'a> {
    Found(&'a str),
    Ambiguous(&'a [PathBuf]),
    Missing,
}

impl LayoutMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layout. Adding a second source under the same name turns the
    /// name into a collision.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>, source: String) {
        let name = name.into();
        let path = path.into();
        if let Some(paths) = self.collisions.get_mut(&name) {
            paths.push(path);
            return;
        }
        if let Some((first, _)) = self.layouts.remove(&name) {
            self.collisions.insert(name, vec![first, path]);
            return;
        }
        self.layouts.insert(name, (path, source));
    }

    pub fn lookup(&self, name: &str) -> LayoutLookup<'_> {
        if let Some(paths) = self.collisions.get(name) {
            return LayoutLookup::Ambiguous(paths);
        }
        match self.layouts.get(name) {
            Some((_, source)) => LayoutLookup::Found(source),
            None => LayoutLookup::Missing,
        }
    }

    /// Names of all unambiguous layouts.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty() && self.collisions.is_empty()
    }
}

impl FromIterator<Resource> for LayoutMap {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        let mut map = LayoutMap::new();
        for resource in iter {
            map.insert(resource.name, resource.path, resource.source);
        }
        map
    }
}

/// Load a layouts directory. Every file is accepted and keyed by its stem.
pub async fn load_layouts(path: Option<&Path>) -> Result<LayoutMap, StageError> {
    let resources = read_resources(path, &SuffixFilter::Any).await?;
    Ok(resources.into_iter().collect())
}
