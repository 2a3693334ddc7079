//! Atomic writer for generated artifacts.
//!
//! ## `write_output` protocol
//!
//! 1. Normalise line endings.
//! 2. Compare with the current file → skip if identical.
//! 3. Write to `<path>.prowgen.tmp`.
//! 4. Rename to final path (atomic on POSIX).
//!
//! [`write_outputs`] stages every changed target (steps 1-3) before renaming
//! any of them, so a failed write leaves all targets untouched. A failed
//! rename can still leave earlier targets of the same set updated.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, GenerateError};

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File was skipped because its content matches what is on disk.
    Unchanged { path: PathBuf },
    /// `--dry-run` mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }
}

/// Atomically write `content` to `path` unless it already holds it.
pub fn write_output(
    path: &Path,
    content: &str,
    dry_run: bool,
) -> Result<WriteResult, GenerateError> {
    write_output_with_tmp(path, content, dry_run, &tmp_path(path))
}

/// Write every `(path, content)` target as one set: all changed targets are
/// staged before the first rename.
pub fn write_outputs(
    targets: &[(PathBuf, &str)],
    dry_run: bool,
) -> Result<Vec<WriteResult>, GenerateError> {
    let mut results = Vec::with_capacity(targets.len());
    let mut staged = Vec::new();
    for (path, content) in targets {
        match stage(path, content, dry_run, &tmp_path(path)) {
            Ok((result, pending)) => {
                results.push(result);
                staged.extend(pending);
            }
            Err(err) => {
                discard(&staged);
                return Err(err);
            }
        }
    }
    commit(staged)?;
    Ok(results)
}

fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.prowgen.tmp", path.display()))
}

/// A target whose new content sits in `tmp`, waiting for rename.
struct Staged {
    tmp: PathBuf,
    path: PathBuf,
}

fn write_output_with_tmp(
    path: &Path,
    content: &str,
    dry_run: bool,
    tmp: &Path,
) -> Result<WriteResult, GenerateError> {
    let (result, pending) = stage(path, content, dry_run, tmp)?;
    commit(pending.into_iter().collect())?;
    Ok(result)
}

fn stage(
    path: &Path,
    content: &str,
    dry_run: bool,
    tmp: &Path,
) -> Result<(WriteResult, Option<Staged>), GenerateError> {
    let content = normalize_line_endings(content);

    if read_existing(path)?.as_deref() == Some(content.as_str()) {
        tracing::debug!("unchanged: {}", path.display());
        return Ok((WriteResult::Unchanged { path: path.to_path_buf() }, None));
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        return Ok((WriteResult::WouldWrite { path: path.to_path_buf() }, None));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, &content).map_err(|e| io_err(tmp, e))?;

    let staged = Staged { tmp: tmp.to_path_buf(), path: path.to_path_buf() };
    Ok((WriteResult::Written { path: path.to_path_buf() }, Some(staged)))
}

fn commit(staged: Vec<Staged>) -> Result<(), GenerateError> {
    for (i, entry) in staged.iter().enumerate() {
        if let Err(e) = std::fs::rename(&entry.tmp, &entry.path) {
            discard(&staged[i..]);
            return Err(io_err(&entry.path, e));
        }
        tracing::info!("wrote: {}", entry.path.display());
    }
    Ok(())
}

fn discard(staged: &[Staged]) {
    for entry in staged {
        let _ = std::fs::remove_file(&entry.tmp);
    }
}

/// Current content of `path` with normalised line endings, `None` if absent.
pub(crate) fn read_existing(path: &Path) -> Result<Option<String>, GenerateError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(normalize_line_endings(&content))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

pub(crate) fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn first_write_returns_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("jobs.yaml");
        let result = write_output(&path, "hello", false).unwrap();
        assert!(matches!(result, WriteResult::Written { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn second_write_same_content_returns_unchanged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("jobs.yaml");
        write_output(&path, "same content", false).unwrap();
        let result = write_output(&path, "same content", false).unwrap();
        assert!(matches!(result, WriteResult::Unchanged { .. }));
    }

    #[test]
    fn changed_content_returns_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("jobs.yaml");
        write_output(&path, "v1", false).unwrap();
        let result = write_output(&path, "v2", false).unwrap();
        assert!(matches!(result, WriteResult::Written { .. }));
    }

    #[test]
    fn dry_run_does_not_write_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.yaml");
        let result = write_output(&path, "content", true).unwrap();
        assert!(matches!(result, WriteResult::WouldWrite { .. }));
        assert!(!path.exists(), "dry-run must not create files");
    }

    #[test]
    fn tmp_file_removed_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.yaml");
        write_output(&path, "data", false).unwrap();
        let tmp_path = PathBuf::from(format!("{}.prowgen.tmp", path.display()));
        assert!(!tmp_path.exists(), ".prowgen.tmp must be cleaned up");
    }

    #[test]
    fn failed_target_leaves_whole_set_untouched() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("jobs.yaml");
        fs::write(&first, "old jobs").unwrap();
        // A regular file where the second target's directory should be.
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let second = blocker.join("testgrid.yaml");

        let targets = [(first.clone(), "new jobs"), (second, "groups")];
        assert!(write_outputs(&targets, false).is_err());

        assert_eq!(fs::read_to_string(&first).unwrap(), "old jobs");
        assert!(!tmp_path(&first).exists(), "staged file must be discarded");
    }

    #[test]
    fn write_set_reports_each_target() {
        let tmp = TempDir::new().unwrap();
        let jobs = tmp.path().join("jobs.yaml");
        let testgrid = tmp.path().join("testgrid.yaml");
        fs::write(&testgrid, "groups").unwrap();

        let targets = [(jobs.clone(), "jobs"), (testgrid.clone(), "groups")];
        let results = write_outputs(&targets, false).unwrap();

        assert_eq!(
            results,
            [WriteResult::Written { path: jobs.clone() }, WriteResult::Unchanged { path: testgrid }]
        );
        assert_eq!(fs::read_to_string(&jobs).unwrap(), "jobs");
    }

    #[test]
    fn creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config").join("prow").join("jobs.yaml");
        write_output(&path, "content", false).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn crlf_content_matches_lf_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("normalize.yaml");
        let first = write_output(&path, "line1\r\nline2\r\n", false).unwrap();
        assert!(matches!(first, WriteResult::Written { .. }));
        let second = write_output(&path, "line1\nline2\n", false).unwrap();
        assert!(matches!(second, WriteResult::Unchanged { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "line1\nline2\n");
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();

        let path = readonly_dir.join("jobs.yaml");
        fs::write(&path, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let tmp_dir = TempDir::new().unwrap();
        let tmp_path = tmp_dir.path().join("jobs.yaml.prowgen.tmp");

        let result = write_output_with_tmp(&path, "new content", false, &tmp_path);

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Root may rename into a read-only directory.
        if result.is_err() {
            assert_eq!(fs::read_to_string(&path).unwrap(), "original");
            assert!(!tmp_path.exists(), ".prowgen.tmp should be cleaned up");
        }
    }
}
