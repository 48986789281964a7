//! Configuration document, project layout and the immutable run context.
//!
//! The configuration document is a JSON mapping from environment name to an
//! [`EnvironmentRecord`], plus a top-level `default_deploy_target` naming the
//! environment to use when `--env` is not given. The [`RunContext`] bundles
//! the parsed document with the selected environment and the project layout;
//! it is constructed once at startup and passed by reference into every task.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub default_deploy_target: Option<String>,
    #[serde(flatten)]
    pub environments: BTreeMap<String, EnvironmentRecord>,
}

impl ConfigDocument {
    pub fn environment(&self, name: &str) -> Option<&EnvironmentRecord> {
        self.environments.get(name)
    }

    pub fn trace_loaded(&self) {
        info!(
            default_deploy_target = self.default_deploy_target.as_deref().unwrap_or("<none>"),
            environments = self.environments.len(),
            "Loaded configuration document"
        );
        debug!(?self, "Configuration document (full debug)");
    }
}

/// Per-environment deployment settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentRecord {
    pub deploy_credentials: DeployCredentials,
    #[serde(default)]
    pub ps_url: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub sams_url: Option<String>,
}

/// Credentials handed to the file-transfer tool, verbatim from the document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeployCredentials {
    pub host: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
    #[serde(default, alias = "remotePath")]
    pub remote_path: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Fixed source and destination paths of a plugin project.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub project_dir: PathBuf,
    /// Roots whose contents are copied (and preprocessed) into `dist/`.
    pub source_dirs: Vec<PathBuf>,
    pub image_source_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub web_root_dir: PathBuf,
    /// Archive output directory, spared by `clean` and excluded from zipping.
    pub archive_dir: PathBuf,
    pub archive_name: String,
    pub bundler_config: PathBuf,
}

impl ProjectLayout {
    pub fn rooted_at(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let dist_dir = project_dir.join("dist");
        Self {
            source_dirs: vec![project_dir.join("plugin"), project_dir.join("queries_root")],
            image_source_dir: project_dir.join("plugin/web_root/images"),
            web_root_dir: dist_dir.join("web_root"),
            archive_dir: dist_dir.join("build"),
            archive_name: "plugin.zip".to_string(),
            bundler_config: project_dir.join("webpack.prod.babel.js"),
            dist_dir,
            project_dir,
        }
    }

    pub fn archive_path(&self) -> PathBuf {
        self.archive_dir.join(&self.archive_name)
    }

    pub fn image_dest_dir(&self) -> PathBuf {
        self.web_root_dir.join("images")
    }
}

/// Immutable per-invocation state, read by every task.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub active_environment: String,
    pub config: ConfigDocument,
    pub layout: ProjectLayout,
}

impl RunContext {
    pub fn new(active_environment: String, config: ConfigDocument, layout: ProjectLayout) -> Self {
        Self {
            active_environment,
            config,
            layout,
        }
    }

    /// The active environment's record, or `None` when the selected name is
    /// not a key of the configuration mapping (tasks soft-skip on `None`).
    pub fn environment(&self) -> Option<&EnvironmentRecord> {
        self.config.environment(&self.active_environment)
    }

    pub fn trace_loaded(&self) {
        info!(
            environment = %self.active_environment,
            known = self.environment().is_some(),
            dist = %self.layout.dist_dir.display(),
            "Run context constructed"
        );
    }
}

#[derive(Debug)]
pub enum ContextError {
    /// Neither `--env` nor `default_deploy_target` was provided.
    DeployTargetUnresolved,
    /// `default_deploy_target` names an environment missing from the mapping.
    UnknownDefaultTarget(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::DeployTargetUnresolved => write!(
                f,
                "no deploy target provided in cli options or the default_deploy_target config option"
            ),
            ContextError::UnknownDefaultTarget(name) => write!(
                f,
                "default_deploy_target {name:?} is not an environment in the configuration"
            ),
        }
    }
}

impl std::error::Error for ContextError {}

/// Picks the environment for this run: an explicit `--env` wins, otherwise
/// `default_deploy_target`. An explicit name absent from the mapping is
/// accepted (environment-specific tasks skip themselves), but a default that
/// points at a missing environment is a configuration error.
pub fn select_active_environment(
    explicit: Option<&str>,
    config: &ConfigDocument,
) -> Result<String, ContextError> {
    if let Some(name) = explicit {
        info!(environment = name, "Using environment from --env option");
        return Ok(name.to_string());
    }
    match &config.default_deploy_target {
        Some(name) if config.environments.contains_key(name) => {
            info!(environment = %name, "Using default_deploy_target from configuration");
            Ok(name.clone())
        }
        Some(name) => Err(ContextError::UnknownDefaultTarget(name.clone())),
        None => Err(ContextError::DeployTargetUnresolved),
    }
}
