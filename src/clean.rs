//! The `clean` step: guarantee a fresh destination tree.

use crate::config::RunContext;
use crate::graph::Step;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use tracing::{debug, info};

/// Removes everything under `dist/` except the archive directory, so
/// previously produced archives survive between runs.
pub struct Clean;

#[async_trait]
impl Step for Clean {
    fn id(&self) -> &str {
        "clean"
    }

    async fn run(&self, ctx: &RunContext) -> Result<()> {
        let layout = &ctx.layout;
        let dist = &layout.dist_dir;
        if !dist.exists() {
            fs::create_dir_all(dist)
                .with_context(|| format!("failed to create {}", dist.display()))?;
            info!(path = %dist.display(), "Created empty destination tree");
            return Ok(());
        }

        let mut removed = 0usize;
        for entry_res in
            fs::read_dir(dist).with_context(|| format!("failed to read {}", dist.display()))?
        {
            let path = entry_res?.path();
            if path == layout.archive_dir {
                debug!(path = %path.display(), "Keeping previously produced archives");
                continue;
            }
            if path.is_dir() {
                fs::remove_dir_all(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
            } else {
                fs::remove_file(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
            }
            removed += 1;
        }
        info!(path = %dist.display(), removed, "Cleaned destination tree");
        Ok(())
    }
}
