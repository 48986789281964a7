//! The `images` step: copy image assets into the destination tree and hand
//! them to the external optimizer.

use crate::config::RunContext;
use crate::files::{copy_file, walk_files};
use crate::graph::Step;
use crate::tools::ToolRunner;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct Assets {
    tools: Arc<dyn ToolRunner>,
}

impl Assets {
    pub fn new(tools: Arc<dyn ToolRunner>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Step for Assets {
    fn id(&self) -> &str {
        "images"
    }

    async fn run(&self, ctx: &RunContext) -> Result<()> {
        let layout = &ctx.layout;
        let source = &layout.image_source_dir;
        if !source.exists() {
            info!(path = %source.display(), "No image sources, skipping");
            return Ok(());
        }

        let dest_dir = layout.image_dest_dir();
        let files = walk_files(source)?;
        for file in &files {
            let rel = file.strip_prefix(source)?;
            copy_file(file, &dest_dir.join(rel))
                .with_context(|| format!("failed to copy {}", file.display()))?;
        }
        info!(files = files.len(), dest = %dest_dir.display(), "Copied image assets");

        if files.is_empty() {
            return Ok(());
        }
        self.tools
            .optimize_images(dest_dir)
            .await
            .map_err(|e| anyhow!("image optimization failed: {e}"))
    }
}
