//! Filesystem helpers shared by the build steps.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Recursively collect all regular files under `root`, sorted for
/// deterministic tool arguments. A missing root yields an empty list.
pub fn walk_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if root.exists() {
        visit_dir(root, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn visit_dir(dir: &Path, results: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry_res in fs::read_dir(dir)? {
        let path = entry_res?.path();
        if path.is_dir() {
            visit_dir(&path, results)?;
        } else if path.is_file() {
            results.push(path);
        }
    }
    Ok(())
}

/// Copy `src` to `dest`, creating parent directories as needed.
pub fn copy_file(src: &Path, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dest)
}
