//! Staging area for clone detection.
//!
//! The detector sees a trimmed copy of the candidate tree: only files
//! matching pytest's discovery names (plus any configured extra globs),
//! with the directory structure preserved. Everything else in the
//! candidate tree is irrelevant to test-clone detection and would only
//! slow the detector down.

use crate::errors::DetectError;
use glob::Pattern;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Subdirectory inside the temp dir holding the staged copy, so the
/// detector's sibling output directories stay inside the temp dir too.
const STAGED_SUBDIR: &str = "staged";

#[derive(Debug)]
pub struct StagedTree {
    /// Owns the temp dir; dropping it removes the staged copy and any
    /// detector output next to it.
    #[allow(dead_code)]
    dir: TempDir,
    root: PathBuf,
}

impl StagedTree {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a staged path from a detector report back to the original tree.
    pub fn unstage(&self, staged: &Path, original_root: &Path) -> Option<PathBuf> {
        staged
            .strip_prefix(&self.root)
            .ok()
            .map(|rel| original_root.join(rel))
    }
}

/// Whether a file name matches pytest's default test discovery rules.
pub fn is_test_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".py") && (name.starts_with("test_") || name.ends_with("_test.py"))
}

/// Copy test files (and extra-glob matches) from `source` into a fresh
/// temp dir, preserving relative paths.
pub fn stage(source: &Path, extra_globs: &[String]) -> Result<StagedTree, DetectError> {
    let patterns = extra_globs
        .iter()
        .map(|g| {
            Pattern::new(g).map_err(|e| DetectError::BadPattern {
                pattern: g.clone(),
                source: e,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let dir = TempDir::new().map_err(|e| DetectError::Stage {
        path: source.to_path_buf(),
        source: e,
    })?;
    let root = dir.path().join(STAGED_SUBDIR);

    let mut staged = 0usize;
    for entry in WalkDir::new(source).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = path.strip_prefix(source).unwrap_or(path);
        let name = path.file_name().map(|n| n.to_string_lossy());
        let included = is_test_file(path)
            || patterns.iter().any(|p| {
                p.matches_path(rel) || name.as_deref().is_some_and(|n| p.matches(n))
            });
        if !included {
            continue;
        }
        let dest = root.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| DetectError::Stage {
                path: dest.clone(),
                source: e,
            })?;
        }
        fs::copy(path, &dest).map_err(|e| DetectError::Stage {
            path: path.to_path_buf(),
            source: e,
        })?;
        staged += 1;
    }
    debug!("staged {staged} file(s) from {} for detection", source.display());
    Ok(StagedTree { dir, root })
}
