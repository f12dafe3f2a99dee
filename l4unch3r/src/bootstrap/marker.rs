//! Marker file provisioning.
//!
//! The marker is a zero-byte file whose existence is the whole signal.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerOutcome {
    AlreadyPresent,
    Created,
    Failed(String),
}

impl MarkerOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for MarkerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyPresent => write!(f, "already present"),
            Self::Created => write!(f, "created"),
            Self::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

/// Create an empty file at `path` unless something is already there.
pub fn ensure_marker(path: &Path) -> MarkerOutcome {
    if path.exists() {
        return MarkerOutcome::AlreadyPresent;
    }

    match create_marker(path) {
        Ok(()) => MarkerOutcome::Created,
        // Lost a race with another creator; same end state.
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => MarkerOutcome::AlreadyPresent,
        Err(err) => MarkerOutcome::Failed(format!("{}: {err}", path.display())),
    }
}

fn create_marker(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    OpenOptions::new().write(true).create_new(true).open(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_empty_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.txt");

        assert_eq!(ensure_marker(&path), MarkerOutcome::Created);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_idempotent_without_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.txt");

        assert!(ensure_marker(&path).is_success());
        let first = fs::metadata(&path).unwrap().modified().unwrap();

        assert_eq!(ensure_marker(&path), MarkerOutcome::AlreadyPresent);
        let second = fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_existing_content_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.txt");
        fs::write(&path, "keep").unwrap();

        assert_eq!(ensure_marker(&path), MarkerOutcome::AlreadyPresent);
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/checker.txt");

        assert_eq!(ensure_marker(&path), MarkerOutcome::Created);
        assert!(path.is_file());
    }

    #[test]
    fn test_failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a parent directory is needed.
        fs::write(dir.path().join("blocker"), "").unwrap();
        let path = dir.path().join("blocker/checker.txt");

        let outcome = ensure_marker(&path);
        assert!(matches!(outcome, MarkerOutcome::Failed(_)));
        assert!(!outcome.is_success());
    }
}
