//! Run-level failures. Every failing run must leave the file set untouched.

use anyhow::Result;
use std::path::PathBuf;

use trellis_cli::config::StageOptions;
use trellis_cli::core::{ErrorKind, StageError, user_friendly_error};
use trellis_cli::files::{FileSet, VirtualFile};
use trellis_cli::stage::{HostContext, TemplateStage};
use trellis_cli::templating::TemplateError;
use trellis_cli::test_utils::{SiteFixture, init_test_logging};

fn with_layouts() -> StageOptions {
    StageOptions {
        layouts: Some(PathBuf::from("layouts")),
        ..StageOptions::default()
    }
}

#[tokio::test]
async fn test_missing_layout_names_layout_and_file() -> Result<()> {
    init_test_logging(None);
    let site = SiteFixture::new()?.layout("base.hbs", "{{ contents }}")?;

    let mut files: FileSet = [
        ("ok.hbs", VirtualFile::new("fine")),
        ("posts/broken.hbs", VirtualFile::new("x").local("layout", "bsae")),
    ]
    .into_iter()
    .collect();
    let before = files.clone();

    let err = TemplateStage::new(with_layouts())
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("bsae"), "{message}");
    assert!(message.contains("posts/broken.hbs"), "{message}");
    assert_eq!(err.kind(), ErrorKind::MissingResource);
    assert!(matches!(
        &err,
        StageError::LayoutNotFound { suggestion: Some(s), .. } if s == "base"
    ));
    assert_eq!(files, before, "no file may be renamed or rewritten");

    let ctx = user_friendly_error(err.into());
    assert_eq!(ctx.suggestion.as_deref(), Some("Did you mean layout 'base'?"));
    Ok(())
}

#[tokio::test]
async fn test_missing_layouts_directory_with_layout_reference() -> Result<()> {
    let site = SiteFixture::new()?;

    let mut files: FileSet =
        [("page.hbs", VirtualFile::new("x").local("layout", "base"))].into_iter().collect();

    let err = TemplateStage::new(with_layouts())
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, StageError::LayoutNotFound { suggestion: None, .. }));
    assert!(files.contains("page.hbs"));
    Ok(())
}

#[tokio::test]
async fn test_empty_selection_is_an_error() -> Result<()> {
    let site = SiteFixture::new()?;

    let mut files: FileSet = [("index.hbs", VirtualFile::new("x"))].into_iter().collect();
    let options = StageOptions {
        pattern: Some("foo.bar".to_string()),
        ..StageOptions::default()
    };

    let err = TemplateStage::new(options)
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, StageError::NoMatchingFiles { ref pattern } if pattern == "foo.bar"));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    Ok(())
}

#[tokio::test]
async fn test_empty_file_set_is_an_error() -> Result<()> {
    let site = SiteFixture::new()?;
    let mut files = FileSet::new();

    let result = TemplateStage::new(StageOptions::default())
        .run(&mut files, &HostContext::new(site.path()))
        .await;

    assert!(matches!(result, Err(StageError::NoMatchingFiles { .. })));
    Ok(())
}

#[tokio::test]
async fn test_invalid_pattern() -> Result<()> {
    let site = SiteFixture::new()?;
    let mut files: FileSet = [("a.hbs", VirtualFile::new("x"))].into_iter().collect();
    let options = StageOptions {
        pattern: Some("[unclosed".to_string()),
        ..StageOptions::default()
    };

    let err = TemplateStage::new(options)
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, StageError::InvalidPattern { .. }));
    Ok(())
}

#[tokio::test]
async fn test_syntax_error_aborts_whole_run() -> Result<()> {
    let site = SiteFixture::new()?;

    let mut files: FileSet = (0..10)
        .map(|i| (format!("ok{i}.hbs"), VirtualFile::new("{{ 1 }}")))
        .chain([("bad.hbs".to_string(), VirtualFile::new("{% if %}"))])
        .collect();
    let before = files.clone();

    let err = TemplateStage::new(StageOptions::default())
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Template);
    assert!(err.to_string().contains("bad.hbs"));
    assert_eq!(files, before);
    Ok(())
}

#[tokio::test]
async fn test_undefined_variable_reports_name() -> Result<()> {
    let site = SiteFixture::new()?;

    let mut files: FileSet =
        [("page.hbs", VirtualFile::new("{{ titel }}").local("title", "Home"))].into_iter().collect();

    let err = TemplateStage::new(StageOptions::default())
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    match err {
        StageError::Template {
            file,
            source: TemplateError::VariableNotFound {
                variable,
                suggestions,
                ..
            },
        } => {
            assert_eq!(file, "page.hbs");
            assert_eq!(variable, "titel");
            assert!(suggestions.contains(&"title".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_ambiguous_layout_only_when_referenced() -> Result<()> {
    let site = SiteFixture::new()?
        .layout("base.hbs", "hbs {{ contents }}")?
        .layout("base.html", "html {{ contents }}")?
        .layout("post.hbs", "post {{ contents }}")?;

    let mut fine: FileSet =
        [("a.hbs", VirtualFile::new("a").local("layout", "post"))].into_iter().collect();
    TemplateStage::new(with_layouts()).run(&mut fine, &HostContext::new(site.path())).await?;
    assert_eq!(fine.get("a.html").unwrap().text(), Some("post a"));

    let mut ambiguous: FileSet =
        [("b.hbs", VirtualFile::new("b").local("layout", "base"))].into_iter().collect();
    let err = TemplateStage::new(with_layouts())
        .run(&mut ambiguous, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, StageError::AmbiguousLayout { ref layout, .. } if layout == "base"));
    assert!(ambiguous.contains("b.hbs"));
    Ok(())
}

#[tokio::test]
async fn test_non_string_layout_directive() -> Result<()> {
    let site = SiteFixture::new()?.layout("base.hbs", "{{ contents }}")?;

    let mut files: FileSet =
        [("a.hbs", VirtualFile::new("a").local("layout", 3))].into_iter().collect();

    let err = TemplateStage::new(with_layouts())
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, StageError::InvalidLayoutDirective { .. }));
    Ok(())
}

#[tokio::test]
async fn test_broken_layout_is_template_error() -> Result<()> {
    let site = SiteFixture::new()?.layout("base.hbs", "{{ contents ")?;

    let mut files: FileSet =
        [("a.hbs", VirtualFile::new("a").local("layout", "base"))].into_iter().collect();

    let err = TemplateStage::new(with_layouts())
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Template);
    assert!(err.to_string().contains("layout 'base'"), "{err}");
    Ok(())
}

#[tokio::test]
async fn test_non_utf8_template_is_template_error() -> Result<()> {
    let site = SiteFixture::new()?;

    let mut files: FileSet =
        [("bin.hbs", VirtualFile::new(vec![0xff, 0xfe, 0xfd]))].into_iter().collect();

    let err = TemplateStage::new(StageOptions::default())
        .run(&mut files, &HostContext::new(site.path()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StageError::Template { source: TemplateError::InvalidUtf8 { .. }, .. }
    ));
    Ok(())
}
