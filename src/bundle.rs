//! The `bundle` step: invoke the external script bundler against the project
//! sources, emitting into the destination web root.

use crate::config::RunContext;
use crate::graph::Step;
use crate::tools::{BundleRequest, ToolRunner};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct Bundle {
    tools: Arc<dyn ToolRunner>,
}

impl Bundle {
    pub fn new(tools: Arc<dyn ToolRunner>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Step for Bundle {
    fn id(&self) -> &str {
        "bundle"
    }

    async fn run(&self, ctx: &RunContext) -> Result<()> {
        let layout = &ctx.layout;
        let req = BundleRequest {
            project_dir: layout.project_dir.clone(),
            config_file: layout.bundler_config.clone(),
            output_dir: layout.web_root_dir.clone(),
        };
        info!(
            config = %req.config_file.display(),
            output = %req.output_dir.display(),
            "Bundling scripts"
        );
        self.tools
            .bundle(req)
            .await
            .map_err(|e| anyhow!("script bundling failed: {e}"))
    }
}
