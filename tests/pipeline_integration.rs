use pstasks::config::{ConfigDocument, ProjectLayout, RunContext};
use pstasks::pipeline::build_graph;
use pstasks::tools::{ArchiveRequest, BundleRequest, MockToolRunner, TransferRequest};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0xFF, 0xFE];

const STAGING_CONFIG: &str = r#"{
  "default_deploy_target": "staging",
  "staging": {
    "deploy_credentials": { "host": "x", "user": "deployer" },
    "api_url": "https://api.example.com",
    "ps_url": "https://ps.example.com"
  }
}"#;

/// Lays out a minimal plugin project with stale build output to clean up.
fn scaffold_project(root: &Path) {
    fs::create_dir_all(root.join("plugin/web_root/images")).unwrap();
    fs::create_dir_all(root.join("queries_root")).unwrap();
    fs::write(
        root.join("plugin/web_root/index.html"),
        "<script>const api = '<!-- @echo API_URL -->';</script>\n",
    )
    .unwrap();
    fs::write(
        root.join("plugin/web_root/config.js"),
        "var psUrl = '/* @echo PS_URL */';\n",
    )
    .unwrap();
    fs::write(root.join("plugin/web_root/images/logo.png"), PNG_BYTES).unwrap();
    fs::write(root.join("queries_root/report.sql"), "select 1;\n").unwrap();

    // Stale output from a previous run: clean must remove everything under
    // dist/ except the archive directory.
    fs::create_dir_all(root.join("dist/build")).unwrap();
    fs::write(root.join("dist/stale.txt"), "old").unwrap();
    fs::write(root.join("dist/old.zip"), "old archive").unwrap();
    fs::write(root.join("dist/build/previous.zip"), "kept").unwrap();
}

fn context_for(root: &Path, active: &str) -> RunContext {
    let doc: ConfigDocument = serde_json::from_str(STAGING_CONFIG).unwrap();
    RunContext::new(active.to_string(), doc, ProjectLayout::rooted_at(root))
}

#[tokio::test]
async fn package_preset_preprocesses_builds_and_archives() {
    let project = tempdir().unwrap();
    scaffold_project(project.path());
    let ctx = context_for(project.path(), "staging");
    let web_root = ctx.layout.web_root_dir.clone();
    let archive_path = ctx.layout.archive_path();

    let mut tools = MockToolRunner::new();
    tools
        .expect_bundle()
        .times(1)
        .withf(move |req: &BundleRequest| req.output_dir == web_root)
        .returning(|_| Ok(()));
    tools
        .expect_optimize_images()
        .times(1)
        .withf(|dir: &PathBuf| dir.ends_with("web_root/images"))
        .returning(|_| Ok(()));
    tools
        .expect_archive()
        .times(1)
        .withf(move |req: &ArchiveRequest| {
            req.output == archive_path
                && !req.files.is_empty()
                && req.files.contains(&PathBuf::from("web_root/index.html"))
                && req
                    .files
                    .iter()
                    .all(|f| f.extension().map_or(true, |ext| ext != "zip"))
                && req.files.iter().all(|f| !f.starts_with("build"))
        })
        .returning(|_| Ok(()));

    build_graph(Arc::new(tools), false)
        .run_target("zip", &ctx)
        .await
        .expect("package preset should succeed");

    let dist = &ctx.layout.dist_dir;
    let index = fs::read_to_string(dist.join("web_root/index.html")).unwrap();
    assert!(
        index.contains("https://api.example.com"),
        "API_URL should be substituted, got: {index}"
    );
    assert!(!index.contains("@echo"), "directive should be consumed");
    let config_js = fs::read_to_string(dist.join("web_root/config.js")).unwrap();
    assert!(config_js.contains("https://ps.example.com"));

    // Binary assets pass through untouched.
    assert_eq!(
        fs::read(dist.join("web_root/images/logo.png")).unwrap(),
        PNG_BYTES
    );
    // Query files land beside the plugin tree contents.
    assert!(dist.join("report.sql").exists());

    // Clean kept the archive directory but removed everything else.
    assert!(dist.join("build/previous.zip").exists());
    assert!(!dist.join("stale.txt").exists());
    assert!(!dist.join("old.zip").exists());
}

#[tokio::test]
async fn deploy_preset_transfers_built_assets_with_environment_credentials() {
    let project = tempdir().unwrap();
    scaffold_project(project.path());
    let ctx = context_for(project.path(), "staging");
    let web_root = ctx.layout.web_root_dir.clone();

    let mut tools = MockToolRunner::new();
    // The bundler drops its output into dist/web_root/scripts like the real
    // tool would, so the deploy step has something to pick up.
    tools.expect_bundle().times(1).returning(|req| {
        fs::create_dir_all(req.output_dir.join("scripts")).unwrap();
        fs::write(req.output_dir.join("scripts/app.js"), "bundled").unwrap();
        Ok(())
    });
    tools
        .expect_optimize_images()
        .times(1)
        .returning(|_| Ok(()));
    tools
        .expect_transfer()
        .times(1)
        .withf(move |req: &TransferRequest| {
            req.credentials.host == "x"
                && req.credentials.user.as_deref() == Some("deployer")
                && req.base_dir == web_root
                && req.files.contains(&PathBuf::from("scripts/app.js"))
                && req.files.contains(&PathBuf::from("images/logo.png"))
        })
        .returning(|_| Ok(()));
    tools.expect_archive().times(1).returning(|_| Ok(()));

    build_graph(Arc::new(tools), true)
        .run_target("zip", &ctx)
        .await
        .expect("deploy preset should succeed");
}

/// An explicit environment missing from the mapping is not an error: the
/// preprocess step passes sources through untouched and the deploy step
/// never invokes the transfer tool.
#[tokio::test]
async fn unknown_environment_soft_skips_preprocess_and_deploy() {
    let project = tempdir().unwrap();
    scaffold_project(project.path());
    let ctx = context_for(project.path(), "prod");

    let mut tools = MockToolRunner::new();
    tools.expect_bundle().times(1).returning(|_| Ok(()));
    tools
        .expect_optimize_images()
        .times(1)
        .returning(|_| Ok(()));
    tools.expect_archive().times(1).returning(|_| Ok(()));
    // No expect_transfer(): the mock fails the test if deploy runs.

    build_graph(Arc::new(tools), true)
        .run_target("zip", &ctx)
        .await
        .expect("run against an undeclared environment should still package");

    let index = fs::read_to_string(ctx.layout.dist_dir.join("web_root/index.html")).unwrap();
    assert!(
        index.contains("<!-- @echo API_URL -->"),
        "pass-through should leave directives intact, got: {index}"
    );
}

/// A failing external tool surfaces as a task failure naming the step, and
/// the zip never runs.
#[tokio::test]
async fn bundler_failure_aborts_the_package_run() {
    let project = tempdir().unwrap();
    scaffold_project(project.path());
    let ctx = context_for(project.path(), "staging");

    let mut tools = MockToolRunner::new();
    tools
        .expect_bundle()
        .times(1)
        .returning(|_| Err("webpack exited with non-zero code: 2".into()));
    tools
        .expect_optimize_images()
        .returning(|_| Ok(()));
    // No expect_archive(): zip must not run after the bundle failure.

    let err = build_graph(Arc::new(tools), false)
        .run_target("zip", &ctx)
        .await
        .expect_err("bundler failure must fail the run");
    let msg = err.to_string();
    assert!(msg.contains("bundle"), "error should name the task: {msg}");
    assert!(msg.contains("webpack"), "tool diagnostic preserved: {msg}");
}
