//! The `zip` step: archive the destination tree into the distributable
//! artifact, excluding previously produced archives and the archive output
//! directory itself.

use crate::config::RunContext;
use crate::files::walk_files;
use crate::graph::Step;
use crate::tools::{ArchiveRequest, ToolRunner};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Select the archive inputs: every file under `dist`, relative to it, except
/// anything inside the archive directory and any pre-existing `*.zip`. The
/// produced archive can therefore never contain itself.
pub fn select_archive_inputs(dist: &Path, archive_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let files = walk_files(dist)?;
    Ok(files
        .into_iter()
        .filter(|f| !f.starts_with(archive_dir))
        .filter(|f| f.extension().map_or(true, |ext| ext != "zip"))
        .filter_map(|f| f.strip_prefix(dist).ok().map(Path::to_path_buf))
        .collect())
}

pub struct Package {
    tools: Arc<dyn ToolRunner>,
}

impl Package {
    pub fn new(tools: Arc<dyn ToolRunner>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Step for Package {
    fn id(&self) -> &str {
        "zip"
    }

    async fn run(&self, ctx: &RunContext) -> Result<()> {
        let layout = &ctx.layout;
        let files = select_archive_inputs(&layout.dist_dir, &layout.archive_dir)?;
        let output = layout.archive_path();
        fs::create_dir_all(&layout.archive_dir)
            .with_context(|| format!("failed to create {}", layout.archive_dir.display()))?;
        info!(files = files.len(), output = %output.display(), "Creating archive");
        self.tools
            .archive(ArchiveRequest {
                base_dir: layout.dist_dir.clone(),
                files,
                output,
            })
            .await
            .map_err(|e| anyhow!("archive creation failed: {e}"))
    }
}
