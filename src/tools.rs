//! External tool seam for the build steps.
//!
//! Every non-trivial operation — script bundling, image optimization, archive
//! creation and file transfer — is delegated to an external tool. The steps
//! only compute arguments; [`ToolRunner`] is the single trait behind which
//! those tools live, so tests can substitute a `mockall` mock while
//! production code shells out via [`ShellTools`].

use crate::config::DeployCredentials;
use async_trait::async_trait;
use mockall::automock;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, error, info};

/// Error type for tool invocations (boxed, the tool's diagnostic is passed
/// through untransformed).
pub type ToolError = Box<dyn std::error::Error + Send + Sync>;

/// Arguments for the script bundler.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    pub project_dir: PathBuf,
    pub config_file: PathBuf,
    pub output_dir: PathBuf,
}

/// Arguments for the archiver. `files` are relative to `base_dir`; the
/// caller is responsible for excluding `output` from the list.
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub base_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Arguments for the file-transfer tool. `files` are relative to `base_dir`
/// and mirror the remote directory structure.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub base_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub credentials: DeployCredentials,
}

/// Trait for invoking the external build tools.
///
/// Implemented by [`ShellTools`] in production and by a generated mock in
/// tests. All methods are async and return boxed errors so each tool's own
/// diagnostic survives unchanged.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the script bundler, emitting bundled output into the destination.
    async fn bundle(&self, req: BundleRequest) -> Result<(), ToolError>;

    /// Optimize all images under `dir` in place.
    async fn optimize_images(&self, dir: PathBuf) -> Result<(), ToolError>;

    /// Create the distributable archive from the given file list.
    async fn archive(&self, req: ArchiveRequest) -> Result<(), ToolError>;

    /// Upload the given files to the remote target.
    async fn transfer(&self, req: TransferRequest) -> Result<(), ToolError>;
}

/// Production implementation: shells out to the respective CLI tools.
pub struct ShellTools;

#[async_trait]
impl ToolRunner for ShellTools {
    async fn bundle(&self, req: BundleRequest) -> Result<(), ToolError> {
        let mut cmd = Command::new("npx");
        cmd.arg("webpack")
            .arg("--config")
            .arg(&req.config_file)
            .arg("--output-path")
            .arg(&req.output_dir)
            .current_dir(&req.project_dir);
        run_tool("webpack", cmd)
    }

    async fn optimize_images(&self, dir: PathBuf) -> Result<(), ToolError> {
        let mut cmd = Command::new("npx");
        cmd.arg("imagemin")
            .arg(format!("{}/**/*", dir.display()))
            .arg(format!("--out-dir={}", dir.display()));
        run_tool("imagemin", cmd)
    }

    async fn archive(&self, req: ArchiveRequest) -> Result<(), ToolError> {
        let mut cmd = Command::new("zip");
        cmd.current_dir(&req.base_dir).arg(&req.output);
        for file in &req.files {
            cmd.arg(file);
        }
        run_tool("zip", cmd)
    }

    async fn transfer(&self, req: TransferRequest) -> Result<(), ToolError> {
        let creds = &req.credentials;
        let remote_root = creds.remote_path.as_deref().unwrap_or(".");

        // sftp batch file: ensure remote directories, then upload each file.
        let mut batch = tempfile::NamedTempFile::new()?;
        let mut seen_dirs = std::collections::BTreeSet::new();
        for file in &req.files {
            if let Some(parent) = file.parent() {
                if !parent.as_os_str().is_empty() && seen_dirs.insert(parent.to_path_buf()) {
                    writeln!(batch, "-mkdir {}/{}", remote_root, parent.display())?;
                }
            }
            writeln!(
                batch,
                "put {} {}/{}",
                req.base_dir.join(file).display(),
                remote_root,
                file.display()
            )?;
        }
        batch.flush()?;

        let destination = match &creds.user {
            Some(user) => format!("{user}@{}", creds.host),
            None => creds.host.clone(),
        };
        let mut cmd = match &creds.pass {
            Some(pass) => {
                let mut cmd = Command::new("sshpass");
                cmd.arg("-p").arg(pass).arg("sftp");
                cmd
            }
            None => Command::new("sftp"),
        };
        cmd.arg("-P")
            .arg(creds.port.unwrap_or(22).to_string())
            .arg("-b")
            .arg(batch.path())
            .arg(&destination);
        info!(
            host = %creds.host,
            files = req.files.len(),
            remote_path = remote_root,
            "Uploading files over sftp"
        );
        run_tool("sftp", cmd)
    }
}

/// Launch a tool and translate its exit status; a non-zero exit and a failed
/// launch are distinct diagnostics.
fn run_tool(label: &str, mut cmd: Command) -> Result<(), ToolError> {
    debug!(tool = label, command = ?cmd, "Invoking external tool");
    match cmd.status() {
        Ok(s) if s.success() => {
            info!(tool = label, "External tool finished");
            Ok(())
        }
        Ok(s) => {
            error!(tool = label, status = ?s, "External tool exited with non-zero code");
            Err(format!("{label} exited with non-zero code: {s}").into())
        }
        Err(e) => {
            error!(tool = label, error = ?e, "Failed to launch external tool");
            Err(Box::new(e))
        }
    }
}
