//! Partials, helpers and resource directory edge cases.

use anyhow::Result;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use trellis_cli::config::StageOptions;
use trellis_cli::core::StageError;
use trellis_cli::files::{FileSet, VirtualFile};
use trellis_cli::stage::{HostContext, TemplateStage};
use trellis_cli::templating::{HelperFn, HelperLoader};
use trellis_cli::test_utils::{SiteFixture, init_test_logging};

fn all_resources() -> StageOptions {
    StageOptions {
        layouts: Some(PathBuf::from("layouts")),
        partials: Some(PathBuf::from("partials")),
        helpers: Some(PathBuf::from("helpers")),
        ..StageOptions::default()
    }
}

#[tokio::test]
async fn test_nonexistent_resource_directories_are_empty() -> Result<()> {
    init_test_logging(None);
    let site = SiteFixture::new()?;

    let mut files: FileSet = [("page.hbs", VirtualFile::new("plain"))].into_iter().collect();

    TemplateStage::new(all_resources()).run(&mut files, &HostContext::new(site.path())).await?;

    assert_eq!(files.get("page.html").unwrap().text(), Some("plain"));
    Ok(())
}

#[tokio::test]
async fn test_subdirectories_in_resource_directories_are_skipped() -> Result<()> {
    let site = SiteFixture::new()?
        .partial("footer.hbs", "(footer)")?
        .partial("nested/inner.hbs", "(inner)")?
        .layout("base.hbs", "<{{ contents }}>")?
        .layout("old/base2.hbs", "never loaded")?;

    let mut files: FileSet = [(
        "page.hbs",
        VirtualFile::new("body{% include \"footer\" %}").local("layout", "base"),
    )]
    .into_iter()
    .collect();

    TemplateStage::new(all_resources()).run(&mut files, &HostContext::new(site.path())).await?;

    assert_eq!(files.get("page.html").unwrap().text(), Some("<body(footer)>"));
    Ok(())
}

#[tokio::test]
async fn test_partials_share_page_context() -> Result<()> {
    let site = SiteFixture::new()?.partial("header.hbs", "<h1>{{ title }} | {{ site }}</h1>")?;

    let mut files: FileSet =
        [("index.hbs", VirtualFile::new("{% include \"header\" %}").local("title", "Home"))]
            .into_iter()
            .collect();
    let host = HostContext::new(site.path())
        .with_metadata(json!({ "site": "Example" }).as_object().cloned().unwrap_or_default());

    TemplateStage::new(all_resources()).run(&mut files, &host).await?;

    assert_eq!(files.get("index.html").unwrap().text(), Some("<h1>Home | Example</h1>"));
    Ok(())
}

#[tokio::test]
async fn test_partials_usable_from_layouts() -> Result<()> {
    let site = SiteFixture::new()?
        .partial("nav.hbs", "[nav]")?
        .layout("base.hbs", "{% include \"nav\" %}{{ contents }}")?;

    let mut files: FileSet =
        [("a.hbs", VirtualFile::new("A").local("layout", "base"))].into_iter().collect();

    TemplateStage::new(all_resources()).run(&mut files, &HostContext::new(site.path())).await?;

    assert_eq!(files.get("a.html").unwrap().text(), Some("[nav]A"));
    Ok(())
}

#[tokio::test]
async fn test_only_extension_files_are_partials() -> Result<()> {
    let site = SiteFixture::new()?.partial("notes.txt", "not a partial")?;

    let mut files: FileSet =
        [("a.hbs", VirtualFile::new("{% include \"notes\" %}"))].into_iter().collect();

    let err = TemplateStage::new(all_resources())
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, StageError::Template { .. }));
    Ok(())
}

#[tokio::test]
async fn test_malformed_partial_names_partial_file() -> Result<()> {
    let site = SiteFixture::new()?.partial("footer.hbs", "ok")?.partial("nav.hbs", "<nav>{% for %}</nav>")?;

    let mut files: FileSet = [("a.hbs", VirtualFile::new("a"))].into_iter().collect();

    let err = TemplateStage::new(all_resources())
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, StageError::PartialLoad { ref name, .. } if name == "nav"), "{err}");
    let message = err.to_string();
    assert!(message.starts_with("Failed to load partial 'nav'"), "{message}");
    assert!(message.contains("nav.hbs"), "{message}");
    assert!(!message.contains("'partials'"), "{message}");
    assert!(files.contains("a.hbs"));
    Ok(())
}

#[tokio::test]
async fn test_helper_modules_are_callable() -> Result<()> {
    let site = SiteFixture::new()?
        .helper("badge.helper", "<span class=\"{{ kind | default(value=\"info\") }}\">{{ text }}</span>\n")?;

    let mut files: FileSet = [(
        "a.hbs",
        VirtualFile::new("{{ badge(text=\"new\") }} {{ badge(text=title, kind=\"ok\") }}").local("title", "T"),
    )]
    .into_iter()
    .collect();

    TemplateStage::new(all_resources()).run(&mut files, &HostContext::new(site.path())).await?;

    assert_eq!(
        files.get("a.html").unwrap().text(),
        Some("<span class=\"info\">new</span> <span class=\"ok\">T</span>")
    );
    Ok(())
}

#[tokio::test]
async fn test_malformed_helper_fails_the_run() -> Result<()> {
    let site = SiteFixture::new()?.helper("broken.helper", "{% for %}")?;

    let mut files: FileSet = [("a.hbs", VirtualFile::new("a"))].into_iter().collect();

    let err = TemplateStage::new(all_resources())
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, StageError::HelperLoad { ref name, .. } if name == "broken"));
    assert!(files.contains("a.hbs"));
    Ok(())
}

#[tokio::test]
async fn test_helper_module_overrides_native_helper() -> Result<()> {
    let site = SiteFixture::new()?.helper("shout.helper", "{{ text | upper }}")?;

    let native: HelperFn = Arc::new(|_: &HashMap<String, Value>| -> tera::Result<Value> {
        Ok(json!("native"))
    });
    let stage = TemplateStage::new(all_resources()).with_helper("shout", native.clone());
    let other = TemplateStage::new(StageOptions::default()).with_helper("shout", native);

    let mut files: FileSet =
        [("a.hbs", VirtualFile::new("{{ shout(text=\"hi\") }}"))].into_iter().collect();
    stage.run(&mut files, &HostContext::new(site.path())).await?;
    assert_eq!(files.get("a.html").unwrap().text(), Some("HI"));

    let mut files: FileSet =
        [("a.hbs", VirtualFile::new("{{ shout(text=\"hi\") }}"))].into_iter().collect();
    other.run(&mut files, &HostContext::new(site.path())).await?;
    assert_eq!(files.get("a.html").unwrap().text(), Some("native"));
    Ok(())
}

/// Treats every helper module as a constant string.
struct ConstantLoader;

impl HelperLoader for ConstantLoader {
    fn load(&self, name: &str, _path: &Path, source: &str) -> Result<HelperFn, StageError> {
        let value = format!("{name}={}", source.trim());
        Ok(Arc::new(move |_: &HashMap<String, Value>| -> tera::Result<Value> {
            Ok(Value::String(value.clone()))
        }))
    }
}

#[tokio::test]
async fn test_custom_helper_loader() -> Result<()> {
    let site = SiteFixture::new()?.helper("version.helper", "1.2.3\n")?;

    let mut files: FileSet = [("a.hbs", VirtualFile::new("{{ version() }}"))].into_iter().collect();

    TemplateStage::new(all_resources())
        .with_helper_loader(Arc::new(ConstantLoader))
        .run(&mut files, &HostContext::new(site.path()))
        .await?;

    assert_eq!(files.get("a.html").unwrap().text(), Some("version=1.2.3"));
    Ok(())
}

#[tokio::test]
async fn test_hidden_resource_files_are_ignored() -> Result<()> {
    let site = SiteFixture::new()?
        .partial(".draft.hbs", "hidden")?
        .layout(".swap.hbs", "hidden")?;

    let mut files: FileSet =
        [("a.hbs", VirtualFile::new("x").local("layout", ".swap"))].into_iter().collect();

    let err = TemplateStage::new(all_resources())
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, StageError::LayoutNotFound { .. }));
    Ok(())
}
