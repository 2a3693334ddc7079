//! Unified diff of generated output against what is on disk, for `prowgen diff`.

use std::path::{Path, PathBuf};

use similar::TextDiff;

use crate::error::GenerateError;
use crate::writer::{normalize_line_endings, read_existing};

/// A single generated file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Compare `rendered` with the current content of `path` (empty if absent).
/// `None` when they match. No files are written.
pub fn diff_output(path: &Path, rendered: &str) -> Result<Option<FileDiff>, GenerateError> {
    let rendered = normalize_line_endings(rendered);
    let existing = read_existing(path)?.unwrap_or_default();
    if existing == rendered {
        return Ok(None);
    }

    let old_header = format!("a/{}", path.display());
    let new_header = format!("b/{}", path.display());
    let unified = TextDiff::from_lines(&existing, &rendered)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string();

    Ok(Some(FileDiff {
        path: path.to_path_buf(),
        unified_diff: unified,
    }))
}
