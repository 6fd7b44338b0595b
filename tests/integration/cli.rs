//! The `trellis build` command end to end.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

use trellis_cli::test_utils::SiteFixture;

fn trellis() -> Command {
    let mut cmd = Command::cargo_bin("trellis").expect("trellis binary is built");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn sample_site() -> Result<SiteFixture> {
    SiteFixture::new()?
        .file(
            "trellis.toml",
            r#"
layouts = "layouts"
partials = "partials"

[metadata]
site = "Example"
"#,
        )?
        .layout("base.hbs", "<html><title>{{ title }} - {{ site }}</title>{{ contents }}</html>")?
        .partial("nav.hbs", "<nav/>")?
        .file("index.hbs", "---\ntitle: Home\nlayout: base\n---\n{% include \"nav\" %}<h1>{{ title }}</h1>")?
        .file("blog/post.hbs", "---\ntitle: Post\n---\n<p>{{ title }}</p>")?
        .file("style.css", "body {}")
}

#[test]
fn test_build_renders_site() -> Result<()> {
    let site = sample_site()?;
    let out = tempfile::tempdir()?;

    trellis().arg("build").arg(site.path()).arg(out.path()).assert().success();

    let index = fs::read_to_string(out.path().join("index.html"))?;
    assert_eq!(index.trim(), "<html><title>Home - Example</title><nav/><h1>Home</h1></html>");
    let post = fs::read_to_string(out.path().join("blog/post.html"))?;
    assert_eq!(post.trim(), "<p>Post</p>");
    assert_eq!(fs::read_to_string(out.path().join("style.css"))?, "body {}");

    assert!(!out.path().join("index.hbs").exists());
    assert!(!out.path().join("trellis.toml").exists());
    assert!(!out.path().join("layouts").exists());
    assert!(!out.path().join("partials").exists());
    Ok(())
}

#[test]
fn test_build_metadata_flag_overrides_config() -> Result<()> {
    let site = sample_site()?;
    let out = tempfile::tempdir()?;

    trellis()
        .arg("build")
        .arg(site.path())
        .arg(out.path())
        .args(["--metadata", "site=Override", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let index = fs::read_to_string(out.path().join("index.html"))?;
    assert!(index.contains("Home - Override"), "{index}");
    Ok(())
}

#[test]
fn test_build_prints_summary() -> Result<()> {
    let site = sample_site()?;
    let out = tempfile::tempdir()?;

    trellis()
        .arg("build")
        .arg(site.path())
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 2 file(s)"));
    Ok(())
}

#[test]
fn test_build_missing_layout_fails_with_suggestion() -> Result<()> {
    let site = sample_site()?.file("about.hbs", "---\nlayout: bsae\n---\nabout")?;
    let out = tempfile::tempdir()?;

    trellis()
        .arg("build")
        .arg(site.path())
        .arg(out.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Layout 'bsae' not found for file 'about.hbs'"))
        .stderr(predicate::str::contains("Did you mean layout 'base'?"));

    assert!(!out.path().join("index.html").exists());
    Ok(())
}

#[test]
fn test_build_pattern_without_matches_fails() -> Result<()> {
    let site = sample_site()?;
    let out = tempfile::tempdir()?;

    trellis()
        .arg("build")
        .arg(site.path())
        .arg(out.path())
        .args(["--pattern", "foo.bar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("did not match any files"));
    Ok(())
}

#[test]
fn test_build_invalid_config_fails() -> Result<()> {
    let site = SiteFixture::new()?.file("trellis.toml", "layouts = [")?.file("a.hbs", "a")?;
    let out = tempfile::tempdir()?;

    trellis()
        .arg("build")
        .arg(site.path())
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
    Ok(())
}

#[test]
fn test_build_missing_source_fails() -> Result<()> {
    let out = tempfile::tempdir()?;

    trellis()
        .arg("build")
        .arg(out.path().join("nope"))
        .arg(out.path().join("public"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
fn test_help_lists_build() {
    trellis()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"));
}
