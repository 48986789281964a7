//! The `deploy-images` step: push built scripts and images to the active
//! environment's remote target.
//!
//! The step is gated on the active environment being present in the
//! configuration mapping; when it is not, the step is a logged no-op so a
//! build against an undeclared environment still packages cleanly.

use crate::config::RunContext;
use crate::files::walk_files;
use crate::graph::Step;
use crate::tools::{ToolRunner, TransferRequest};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct DeployImages {
    tools: Arc<dyn ToolRunner>,
}

impl DeployImages {
    pub fn new(tools: Arc<dyn ToolRunner>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Step for DeployImages {
    fn id(&self) -> &str {
        "deploy-images"
    }

    async fn run(&self, ctx: &RunContext) -> Result<()> {
        let Some(env) = ctx.environment() else {
            info!(
                environment = %ctx.active_environment,
                "Active environment not present in configuration, skipping deploy"
            );
            return Ok(());
        };

        let web_root = &ctx.layout.web_root_dir;
        let mut files: Vec<PathBuf> = Vec::new();
        for subdir in ["scripts", "images"] {
            for file in walk_files(&web_root.join(subdir))? {
                if let Ok(rel) = file.strip_prefix(web_root) {
                    files.push(rel.to_path_buf());
                }
            }
        }
        if files.is_empty() {
            info!(path = %web_root.display(), "Nothing to deploy");
            return Ok(());
        }

        info!(
            environment = %ctx.active_environment,
            host = %env.deploy_credentials.host,
            files = files.len(),
            "Deploying built assets"
        );
        self.tools
            .transfer(TransferRequest {
                base_dir: web_root.clone(),
                files,
                credentials: env.deploy_credentials.clone(),
            })
            .await
            .map_err(|e| anyhow!("deploy failed: {e}"))
    }
}
