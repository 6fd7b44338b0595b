//! The `build` command: render a source directory into a destination directory.
//!
//! 1. Load `trellis.toml` (or `--config`) and apply flag overrides.
//! 2. Walk SOURCE into a [`FileSet`], turning YAML frontmatter into locals.
//!    The config file, the configured resource directories and DEST (when it
//!    lies inside SOURCE) are not part of the set.
//! 3. Run the template stage with SOURCE as base directory.
//! 4. Write every file of the resulting set below DEST.

use anyhow::{Context, Result, anyhow};
use clap::Args;
use colored::Colorize;
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use super::CliConfig;
use crate::config::{ProjectConfig, StageOptions};
use crate::files::FileSet;
use crate::frontmatter;
use crate::stage::{HostContext, RunSummary, TemplateStage};

/// Render SOURCE into DEST.
#[derive(Args, Debug, Clone)]
pub struct BuildCommand {
    /// Source directory
    pub source: PathBuf,

    /// Destination directory
    pub dest: PathBuf,

    /// Configuration file (defaults to SOURCE/trellis.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Glob selecting the files to process
    #[arg(long)]
    pub pattern: Option<String>,

    /// Suffix identifying template files
    #[arg(long)]
    pub extension: Option<String>,

    /// Suffix given to rendered templates
    #[arg(long)]
    pub output_extension: Option<String>,

    /// Layouts directory, relative to SOURCE
    #[arg(long)]
    pub layouts: Option<PathBuf>,

    /// Partials directory, relative to SOURCE
    #[arg(long)]
    pub partials: Option<PathBuf>,

    /// Helpers directory, relative to SOURCE
    #[arg(long)]
    pub helpers: Option<PathBuf>,

    /// Global template variable; VALUE is parsed as JSON when possible
    #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub metadata: Vec<(String, Value)>,

    /// Maximum number of files rendered at once
    #[arg(long)]
    pub jobs: Option<usize>,
}

/// Parse a `KEY=VALUE` pair. `VALUE` is JSON when it parses as such, else a string.
fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, found '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

impl BuildCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        if !fs::metadata(&self.source).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(anyhow!("Source directory '{}' does not exist", self.source.display()));
        }

        let project = ProjectConfig::load(&self.source, self.config.as_deref()).await?;
        let (options, metadata) = self.apply_overrides(project);

        let excluded = self.excluded_paths(&options);
        let mut files = read_source(&self.source, &excluded).await?;
        debug!("Read {} file(s) from {}", files.len(), self.source.display());

        let host = HostContext {
            base_dir: self.source.clone(),
            metadata,
        };
        let summary = TemplateStage::new(options).run(&mut files, &host).await?;

        write_output(&self.dest, &files).await?;

        if !config.quiet {
            print_summary(&summary, files.len(), &self.dest);
        }
        Ok(())
    }

    fn apply_overrides(&self, project: ProjectConfig) -> (StageOptions, Map<String, Value>) {
        let ProjectConfig {
            mut options,
            mut metadata,
        } = project;

        if let Some(pattern) = &self.pattern {
            options.pattern = Some(pattern.clone());
        }
        if let Some(extension) = &self.extension {
            options.extension = extension.clone();
        }
        if let Some(output_extension) = &self.output_extension {
            options.output_extension = output_extension.clone();
        }
        if let Some(layouts) = &self.layouts {
            options.layouts = Some(layouts.clone());
        }
        if let Some(partials) = &self.partials {
            options.partials = Some(partials.clone());
        }
        if let Some(helpers) = &self.helpers {
            options.helpers = Some(helpers.clone());
        }
        if let Some(jobs) = self.jobs {
            options.jobs = Some(jobs);
        }
        for (key, value) in &self.metadata {
            metadata.insert(key.clone(), value.clone());
        }

        (options, metadata)
    }

    fn excluded_paths(&self, options: &StageOptions) -> Vec<PathBuf> {
        let mut excluded = vec![
            self.config.clone().unwrap_or_else(|| ProjectConfig::default_path(&self.source)),
            self.dest.clone(),
        ];
        for dir in [&options.layouts, &options.partials, &options.helpers] {
            excluded.extend(StageOptions::resolve_dir(&self.source, dir.as_deref()));
        }
        excluded
    }
}

/// Read every file below `source` into a [`FileSet`], skipping `excluded`
/// paths and everything below them.
pub async fn read_source(source: &Path, excluded: &[PathBuf]) -> Result<FileSet> {
    let excluded: Vec<PathBuf> = excluded.iter().map(|p| normalize(p)).collect();

    let mut entries = Vec::new();
    for entry in WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !excluded.contains(&normalize(e.path())))
    {
        let entry = entry.with_context(|| format!("Failed to walk {}", source.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source)
            .with_context(|| format!("{} is outside {}", entry.path().display(), source.display()))?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push((key, entry.into_path()));
    }

    let files = try_join_all(entries.into_iter().map(|(key, path)| async move {
        let bytes = fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file = frontmatter::load_file(&key, bytes)?;
        Ok::<_, anyhow::Error>((key, file))
    }))
    .await?;

    Ok(files.into_iter().collect())
}

/// Write every file of `files` below `dest`, creating directories as needed.
pub async fn write_output(dest: &Path, files: &FileSet) -> Result<()> {
    try_join_all(files.iter().map(|(key, file)| async move {
        let path = dest.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, &file.contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }))
    .await?;
    Ok(())
}

/// Drop `.` components so `./public` and `public` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components().filter(|c| !matches!(c, Component::CurDir)).collect()
}

fn print_summary(summary: &RunSummary, written: usize, dest: &Path) {
    println!(
        "{} Rendered {} file(s), {} passed through, {} written to {}",
        "✓".green(),
        summary.rendered.len(),
        summary.passthrough.len(),
        written,
        dest.display()
    );
}
