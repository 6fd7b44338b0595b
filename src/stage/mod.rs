//! The template stage: selection, resource loading, rendering and renaming.
//!
//! [`TemplateStage::run`] is invoked once per build by the host pipeline:
//!
//! 1. Select the files matching the configured pattern (an empty selection is
//!    an error).
//! 2. Load layouts, partials and helpers concurrently, relative to the host's
//!    base directory, and freeze partials and helpers into a run-scoped
//!    [`TemplateEngine`].
//! 3. Build the shared [`RenderSettings`].
//! 4. Render every selected file concurrently on the blocking pool. The first
//!    failure aborts the run.
//! 5. Only once every render succeeded, write the outputs back and rename
//!    rendered templates to the output extension.
//!
//! Outputs are buffered until all renders succeed, so a failed run leaves the
//! file set exactly as it was.

use futures::{StreamExt, TryStreamExt, stream};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::StageOptions;
use crate::core::StageError;
use crate::files::{FileSet, rename_outputs};
use crate::pattern::select_files;
use crate::resources::{HELPER_SUFFIX, LayoutMap, Resource, SuffixFilter, load_directory, load_layouts};
use crate::templating::{
    Compiler, HelperFn, HelperLoader, RenderSettings, TemplateEngine, TemplateHelperLoader,
    TemplateRegistry, initial_context,
};

/// Metadata key injected with the host's base directory.
pub const DIRECTORY_KEY: &str = "directory";

/// What the host pipeline exposes to the stage besides the file set.
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    /// Working directory of the pipeline; resource directories resolve against it.
    pub base_dir: PathBuf,
    /// Global template variables.
    pub metadata: Map<String, Value>,
}

impl HostContext {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Selected files that were compiled or wrapped in a layout, in path order.
    pub rendered: Vec<String>,
    /// Selected files returned byte-identical, in path order.
    pub passthrough: Vec<String>,
    /// `(old, new)` path of every renamed file.
    pub renamed: Vec<(String, String)>,
}

/// A configured template stage.
pub struct TemplateStage {
    options: StageOptions,
    helper_loader: Arc<dyn HelperLoader>,
    native_helpers: BTreeMap<String, HelperFn>,
}

impl std::fmt::Debug for TemplateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateStage")
            .field("options", &self.options)
            .field("native_helpers", &self.native_helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TemplateStage {
    pub fn new(options: StageOptions) -> Self {
        Self {
            options,
            helper_loader: Arc::new(TemplateHelperLoader),
            native_helpers: BTreeMap::new(),
        }
    }

    /// Use a custom loader for helper modules found in the helpers directory.
    #[must_use]
    pub fn with_helper_loader(mut self, loader: Arc<dyn HelperLoader>) -> Self {
        self.helper_loader = loader;
        self
    }

    /// Register a native helper for every run. Helper modules on disk with the
    /// same name take precedence.
    #[must_use]
    pub fn with_helper(mut self, name: impl Into<String>, helper: HelperFn) -> Self {
        self.native_helpers.insert(name.into(), helper);
        self
    }

    /// Run the stage over `files`.
    ///
    /// # Errors
    ///
    /// Any [`StageError`] aborts the run. On error no file of `files` has been
    /// modified.
    pub async fn run(&self, files: &mut FileSet, host: &HostContext) -> Result<RunSummary, StageError> {
        let pattern = self.options.effective_pattern();
        let selected = select_files(files, &pattern)?;

        let layouts_dir = StageOptions::resolve_dir(&host.base_dir, self.options.layouts.as_deref());
        let partials_dir = StageOptions::resolve_dir(&host.base_dir, self.options.partials.as_deref());
        let helpers_dir = StageOptions::resolve_dir(&host.base_dir, self.options.helpers.as_deref());

        let partial_filter = SuffixFilter::only(self.options.extension.clone());
        let helper_filter = SuffixFilter::only(HELPER_SUFFIX);
        let (layouts, partials, helpers) = tokio::try_join!(
            load_layouts(layouts_dir.as_deref()),
            load_directory(partials_dir.as_deref(), &partial_filter),
            load_directory(helpers_dir.as_deref(), &helper_filter),
        )?;

        let engine = Arc::new(self.build_engine(partials, helpers)?);
        let settings = Arc::new(self.build_settings(host, layouts));

        let mut outputs = self.render_all(files, &selected, &settings, engine).await?;
        outputs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut rendered = Vec::new();
        let mut passthrough = Vec::new();
        for (path, contents) in outputs {
            let Some(file) = files.get_mut(&path) else {
                continue;
            };
            if !settings.is_template(&path) && file.contents == contents {
                passthrough.push(path);
            } else {
                file.contents = contents;
                rendered.push(path);
            }
        }

        let renamed = rename_outputs(
            files,
            &selected,
            &self.options.extension,
            &self.options.output_extension,
        );

        info!(
            "Rendered {} file(s), passed through {}, renamed {}",
            rendered.len(),
            passthrough.len(),
            renamed.len()
        );

        Ok(RunSummary {
            rendered,
            passthrough,
            renamed,
        })
    }

    fn build_engine(
        &self,
        partials: BTreeMap<String, Resource>,
        helpers: BTreeMap<String, Resource>,
    ) -> Result<TemplateEngine, StageError> {
        let mut registry = TemplateRegistry::new();

        for (name, partial) in partials {
            debug!("Registering partial '{}' from {}", name, partial.path.display());
            TemplateRegistry::check_partial(&name, &partial.source).map_err(|source| {
                StageError::PartialLoad {
                    name: name.clone(),
                    path: partial.path.clone(),
                    source,
                }
            })?;
            registry.register_partial(name, partial.source);
        }

        for (name, helper) in &self.native_helpers {
            registry.register_helper(name.clone(), Arc::clone(helper));
        }
        for (name, helper) in helpers {
            debug!("Registering helper '{}' from {}", name, helper.path.display());
            let callable = self.helper_loader.load(&name, &helper.path, &helper.source)?;
            registry.register_helper(name, callable);
        }

        registry.build().map_err(|source| StageError::Template {
            file: "partials".to_string(),
            source,
        })
    }

    fn build_settings(&self, host: &HostContext, layouts: LayoutMap) -> RenderSettings {
        let mut metadata = host.metadata.clone();
        metadata.insert(
            DIRECTORY_KEY.to_string(),
            Value::String(host.base_dir.to_string_lossy().into_owned()),
        );

        RenderSettings {
            metadata,
            extension: self.options.extension.clone(),
            layouts,
        }
    }

    async fn render_all(
        &self,
        files: &FileSet,
        selected: &[String],
        settings: &Arc<RenderSettings>,
        engine: Arc<TemplateEngine>,
    ) -> Result<Vec<(String, Vec<u8>)>, StageError> {
        let jobs = self.options.effective_jobs();
        debug!("Rendering {} file(s) with up to {} concurrent job(s)", selected.len(), jobs);

        let tasks = selected.iter().filter_map(|path| {
            let file = files.get(path)?;
            let path = path.clone();
            let raw = file.contents.clone();
            let context = initial_context(&settings.metadata, &file.locals);
            let settings = Arc::clone(settings);
            let engine = Arc::clone(&engine);
            Some(async move {
                let task_path = path.clone();
                tokio::task::spawn_blocking(move || {
                    let rendered = Compiler::new(&settings, &engine).compile(&task_path, &raw, context)?;
                    Ok::<_, StageError>((task_path, rendered))
                })
                .await
                .map_err(|e| StageError::TaskFailed {
                    file: path,
                    reason: e.to_string(),
                })?
            })
        });

        stream::iter(tasks).buffer_unordered(jobs).try_collect().await
    }
}

/// Run a stage with `options` over `files`.
pub async fn run(
    options: StageOptions,
    files: &mut FileSet,
    host: &HostContext,
) -> Result<RunSummary, StageError> {
    TemplateStage::new(options).run(files, host).await
}

/// Convenience for hosts that only know a base directory.
pub async fn run_in(
    options: StageOptions,
    files: &mut FileSet,
    base_dir: &Path,
) -> Result<RunSummary, StageError> {
    run(options, files, &HostContext::new(base_dir)).await
}
