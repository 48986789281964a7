//! Three-tier configuration resolution.
//!
//! Returns the configuration document by checking three sources in order:
//!  1. A `--config` directory given on the command line; any failure here is
//!     fatal, since silently falling back would hide a user error.
//!  2. A `gulp.config.json` in the project folder; failure falls through.
//!  3. The directory named by the `PSTASKS_ROOT` environment variable; if the
//!     variable is unset this tier reports "no source configured", and a read
//!     failure is logged and falls through to the terminal error.
//!
//! First success wins and no merging happens across tiers. Each tier yields
//! an explicit [`TierOutcome`] so a skipped tier is distinguishable from an
//! errored one, and every attempt is logged for the operator.

use crate::config::ConfigDocument;
use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub const CONFIG_FILENAME: &str = "gulp.config.json";
pub const ROOT_ENV_VAR: &str = "PSTASKS_ROOT";

/// Which tier produced the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    ExplicitPath(PathBuf),
    ProjectLocal(PathBuf),
    EnvRoot(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub document: ConfigDocument,
    pub source: ConfigSource,
}

/// Outcome of a single resolution tier.
#[derive(Debug)]
pub enum TierOutcome {
    Loaded(ConfigDocument),
    /// The tier's file does not exist; try the next tier.
    Skipped,
    /// The tier's file exists but could not be read or parsed.
    Errored(anyhow::Error),
}

#[derive(Debug)]
pub enum ResolveError {
    /// Tier 1 was requested explicitly and failed.
    Explicit {
        path: PathBuf,
        source: anyhow::Error,
    },
    /// Tiers 1 and 2 yielded nothing and the root env var is unset.
    NoSourceConfigured,
    /// All three tiers were attempted and none produced a document.
    NotFound,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Explicit { path, source } => write!(
                f,
                "failed to load {} requested via --config: {source:#}",
                path.display()
            ),
            ResolveError::NoSourceConfigured => write!(
                f,
                "unable to locate {CONFIG_FILENAME}: {ROOT_ENV_VAR} env var not set and no higher-priority source available"
            ),
            ResolveError::NotFound => write!(
                f,
                "could not load {CONFIG_FILENAME}: all three loading methods failed"
            ),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Explicit { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Resolve against the current working directory. See [`resolve_in`].
pub fn resolve(
    explicit: Option<&Path>,
    env_root: Option<&Path>,
) -> Result<ResolvedConfig, ResolveError> {
    resolve_in(Path::new("."), explicit, env_root)
}

/// Resolve the configuration document for a project rooted at `project_dir`.
///
/// `explicit` is the `--config` option and `env_root` the already-read value
/// of [`ROOT_ENV_VAR`]; both are plain values so callers (and tests) control
/// all ambient state.
pub fn resolve_in(
    project_dir: &Path,
    explicit: Option<&Path>,
    env_root: Option<&Path>,
) -> Result<ResolvedConfig, ResolveError> {
    if let Some(dir) = explicit {
        let path = dir.join(CONFIG_FILENAME);
        return match read_document(&path) {
            Ok(document) => {
                info!(path = %path.display(), "Using {CONFIG_FILENAME} found at --config path");
                Ok(ResolvedConfig {
                    document,
                    source: ConfigSource::ExplicitPath(dir.to_path_buf()),
                })
            }
            Err(source) => {
                error!(path = %path.display(), error = ?source, "Failed to load explicitly requested configuration");
                Err(ResolveError::Explicit { path, source })
            }
        };
    }

    let local = project_dir.join(CONFIG_FILENAME);
    match attempt(&local) {
        TierOutcome::Loaded(document) => {
            info!(path = %local.display(), "Using {CONFIG_FILENAME} found in project folder");
            return Ok(ResolvedConfig {
                document,
                source: ConfigSource::ProjectLocal(local),
            });
        }
        TierOutcome::Skipped => {
            debug!(path = %local.display(), "No project-local configuration file")
        }
        TierOutcome::Errored(e) => {
            warn!(path = %local.display(), error = ?e, "Project-local configuration unreadable, falling through")
        }
    }

    let Some(root) = env_root else {
        error!("Unable to locate config: {ROOT_ENV_VAR} env var not set");
        return Err(ResolveError::NoSourceConfigured);
    };
    let path = root.join(CONFIG_FILENAME);
    match attempt(&path) {
        TierOutcome::Loaded(document) => {
            info!(path = %path.display(), "Using {CONFIG_FILENAME} in {ROOT_ENV_VAR}");
            Ok(ResolvedConfig {
                document,
                source: ConfigSource::EnvRoot(path),
            })
        }
        TierOutcome::Skipped => {
            error!(path = %path.display(), "No {CONFIG_FILENAME} under {ROOT_ENV_VAR}");
            Err(ResolveError::NotFound)
        }
        TierOutcome::Errored(e) => {
            error!(path = %path.display(), error = ?e, "Error reading {CONFIG_FILENAME} under {ROOT_ENV_VAR}");
            Err(ResolveError::NotFound)
        }
    }
}

/// Attempt one tier, classifying "file absent" separately from real errors.
fn attempt(path: &Path) -> TierOutcome {
    match fs::read_to_string(path) {
        Ok(content) => match parse_document(&content, path) {
            Ok(document) => TierOutcome::Loaded(document),
            Err(e) => TierOutcome::Errored(e),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => TierOutcome::Skipped,
        Err(e) => TierOutcome::Errored(
            anyhow::Error::new(e).context(format!("failed to read {}", path.display())),
        ),
    }
}

fn read_document(path: &Path) -> Result<ConfigDocument> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_document(&content, path)
}

fn parse_document(content: &str, path: &Path) -> Result<ConfigDocument> {
    serde_json::from_str(content).with_context(|| format!("failed to parse {}", path.display()))
}
