//! The `preprocess` step: copy templated sources into the destination tree,
//! substituting environment-specific URL placeholders.
//!
//! Placeholders use `@echo` directives inside HTML or block comments, e.g.
//! `<!-- @echo API_URL -->` or `/* @echo PS_URL */`. The substitution values
//! come from the active environment's record; when the active environment is
//! not present in the configuration mapping the step degrades to a plain
//! copy instead of failing.

use crate::config::{EnvironmentRecord, RunContext};
use crate::files::{copy_file, walk_files};
use crate::graph::Step;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

fn directive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<!--\s*@echo\s+(\w+)\s*-->|/\*\s*@echo\s+(\w+)\s*\*/")
            .expect("directive pattern is valid")
    })
}

/// Substitution context for an environment: only the URLs it actually
/// declares are available to directives.
pub fn substitution_context(env: &EnvironmentRecord) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    if let Some(url) = &env.ps_url {
        vars.insert("PS_URL".to_string(), url.clone());
    }
    if let Some(url) = &env.api_url {
        vars.insert("API_URL".to_string(), url.clone());
    }
    if let Some(url) = &env.sams_url {
        vars.insert("SAMS_URL".to_string(), url.clone());
    }
    vars
}

/// Replace every `@echo` directive whose name is known; unknown names are
/// left untouched so missing values stay visible in the output.
pub fn substitute(input: &str, vars: &BTreeMap<String, String>) -> String {
    directive_pattern()
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match vars.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

pub struct Preprocess;

#[async_trait]
impl Step for Preprocess {
    fn id(&self) -> &str {
        "preprocess"
    }

    async fn run(&self, ctx: &RunContext) -> Result<()> {
        let layout = &ctx.layout;
        let vars = match ctx.environment() {
            Some(env) => substitution_context(env),
            None => {
                info!(
                    environment = %ctx.active_environment,
                    "Active environment not present in configuration, copying sources without substitution"
                );
                BTreeMap::new()
            }
        };

        let mut processed = 0usize;
        for source_root in &layout.source_dirs {
            if !source_root.exists() {
                debug!(path = %source_root.display(), "Source root missing, skipping");
                continue;
            }
            for file in walk_files(source_root)? {
                let rel = file.strip_prefix(source_root)?;
                let dest = layout.dist_dir.join(rel);
                process_file(&file, &dest, &vars)?;
                processed += 1;
            }
        }
        info!(files = processed, dest = %layout.dist_dir.display(), "Preprocessed sources");
        Ok(())
    }
}

/// Substitute a text file into place; binary content is copied raw.
fn process_file(src: &Path, dest: &Path, vars: &BTreeMap<String, String>) -> Result<()> {
    match fs::read_to_string(src) {
        Ok(text) => {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(dest, substitute(&text, vars))
                .with_context(|| format!("failed to write {}", dest.display()))?;
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            copy_file(src, dest)
                .with_context(|| format!("failed to copy {}", src.display()))?;
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to read {}", src.display())));
        }
    }
    Ok(())
}
