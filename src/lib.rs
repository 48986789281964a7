pub mod assets;
pub mod bundle;
pub mod clean;
pub mod config;
pub mod deploy;
pub mod files;
pub mod graph;
pub mod load_config;
pub mod package;
pub mod pipeline;
pub mod preprocess;
pub mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{ProjectLayout, RunContext};
use std::path::PathBuf;
use std::sync::Arc;
use tools::{ShellTools, ToolRunner};

#[derive(Parser)]
#[clap(
    name = "pstasks",
    version,
    about = "Package and deploy plugin bundles: preprocess, bundle, zip and SFTP-deploy from one declarative task graph"
)]
pub struct Cli {
    /// Deployment environment, overriding default_deploy_target
    #[clap(long, global = true)]
    pub env: Option<String>,

    /// Directory containing gulp.config.json, overriding the default search
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub task: Task,
}

/// Task names; invoking one runs its full transitive dependency chain.
#[derive(Subcommand, Debug, Clone, Copy)]
pub enum Task {
    /// Remove prior build output, keeping previously produced archives
    Clean,
    /// Copy templated sources into dist, substituting environment URLs
    Preprocess,
    /// Copy image assets into the destination tree and optimize them
    Images,
    /// Bundle project scripts with the external bundler
    Bundle,
    /// Upload built scripts and images to the active environment
    DeployImages,
    /// Archive the destination tree into the distributable zip
    Zip,
    /// Full build: clean, preprocess/images and bundle, then zip
    Package,
    /// Full build plus asset deploy before zipping
    PackageDeploy,
}

impl Task {
    /// Maps the task to its graph flavor and target step id.
    fn plan(self) -> (bool, &'static str) {
        match self {
            Task::Clean => (false, "clean"),
            Task::Preprocess => (false, "preprocess"),
            Task::Images => (false, "images"),
            Task::Bundle => (false, "bundle"),
            Task::DeployImages => (true, "deploy-images"),
            Task::Zip | Task::Package => (false, "zip"),
            Task::PackageDeploy => (true, "zip"),
        }
    }
}

/// Async CLI entrypoint, extracted for integration tests and main().
pub async fn run(cli: Cli) -> Result<()> {
    let env_root = std::env::var_os(load_config::ROOT_ENV_VAR).map(PathBuf::from);
    let resolved = load_config::resolve(cli.config.as_deref(), env_root.as_deref())?;
    resolved.document.trace_loaded();

    let active = config::select_active_environment(cli.env.as_deref(), &resolved.document)?;
    let ctx = RunContext::new(active, resolved.document, ProjectLayout::rooted_at("."));
    ctx.trace_loaded();

    let tools: Arc<dyn ToolRunner> = Arc::new(ShellTools);
    run_task(cli.task, &ctx, tools).await
}

/// Run a single named task (and its dependency chain) against the context.
pub async fn run_task(task: Task, ctx: &RunContext, tools: Arc<dyn ToolRunner>) -> Result<()> {
    let (with_deploy, target) = task.plan();
    let graph = pipeline::build_graph(tools, with_deploy);
    graph.run_target(target, ctx).await?;
    Ok(())
}
