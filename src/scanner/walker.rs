use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::ext::PathExt;
use crate::monitor::Shutdown;

/// A regular file found under the monitored root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub key: String,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub files: Vec<DiscoveredFile>,
    /// Entries that were not regular files or could not be read.
    pub skipped: usize,
}

/// Walks `root` without following symbolic links.
///
/// Only regular files are returned. Special files are ignored and entries
/// within a directory are visited in name order.
pub fn walk(
    root: &Path,
    excluded: &[PathBuf],
    shutdown: &Shutdown,
) -> Result<WalkOutcome, ScanError> {
    let root = root.canonicalize().context(RootUnavailableSnafu { path: root })?;
    if !root.is_dir() {
        return RootNotDirectorySnafu { path: root }.fail();
    }

    let mut outcome = WalkOutcome::default();
    let entries = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let is_excluded = excluded.iter().any(|excluded| excluded == entry.path());
            if is_excluded {
                debug!("Skipping excluded file {}", entry.path().display());
            }
            !is_excluded
        });

    for entry in entries {
        if shutdown.is_requested() {
            return CancelledSnafu.fail();
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(error) if error.depth() == 0 => {
                return Err(std::io::Error::from(error))
                    .context(RootUnavailableSnafu { path: &root });
            }
            Err(error) => {
                warn!("Skipping unreadable entry: {}", error);
                outcome.skipped += 1;
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            debug!("Skipping non-regular file {}", entry.path().display());
            outcome.skipped += 1;
            continue;
        }

        let path = entry.into_path();
        match path.snapshot_key() {
            Some(key) => outcome.files.push(DiscoveredFile { key, path }),
            None => {
                warn!("Skipping {}: path is not valid UTF-8", path.display());
                outcome.skipped += 1;
            }
        }
    }

    Ok(outcome)
}

#[derive(Debug, Snafu)]
pub enum ScanError {
    #[snafu(display("Monitored root {} is unavailable", path.best_effort_path_display()))]
    RootUnavailableError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Monitored root {} is not a directory", path.best_effort_path_display()))]
    RootNotDirectoryError { path: PathBuf },
    #[snafu(display("Scan was cancelled by a shutdown request"))]
    CancelledError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn canonical_root() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let root = dir.path().canonicalize().expect("Failed to canonicalize");
        (dir, root)
    }

    fn keys(outcome: &WalkOutcome) -> Vec<String> {
        let mut keys: Vec<String> = outcome.files.iter().map(|file| file.key.clone()).collect();
        keys.sort();
        keys
    }

    #[test]
    fn finds_files_in_nested_directories() {
        let (_dir, root) = canonical_root();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("top.txt"), "top").unwrap();
        fs::write(root.join("a/b/deep.txt"), "deep").unwrap();

        let outcome = walk(&root, &[], &Shutdown::new()).unwrap();

        assert_eq!(
            keys(&outcome),
            vec![
                root.join("a/b/deep.txt").display().to_string(),
                root.join("top.txt").display().to_string(),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symbolic_links_are_skipped() {
        let (_dir, root) = canonical_root();
        fs::write(root.join("real.txt"), "real").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("link.txt")).unwrap();
        std::os::unix::fs::symlink(&root, root.join("sub/loop")).unwrap();

        let outcome = walk(&root, &[], &Shutdown::new()).unwrap();

        assert_eq!(
            keys(&outcome),
            vec![root.join("real.txt").display().to_string()]
        );
        assert_eq!(outcome.skipped, 2);
    }

    #[test]
    fn excluded_paths_are_left_out() {
        let (_dir, root) = canonical_root();
        fs::write(root.join("keep.txt"), "keep").unwrap();
        fs::write(root.join("file_hashes.json"), "{}").unwrap();

        let outcome = walk(&root, &[root.join("file_hashes.json")], &Shutdown::new()).unwrap();

        assert_eq!(
            keys(&outcome),
            vec![root.join("keep.txt").display().to_string()]
        );
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_skipped_and_counted() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, root) = canonical_root();
        fs::write(root.join("visible.txt"), "visible").unwrap();
        let locked = root.join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.txt"), "hidden").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let enforced = fs::read_dir(&locked).is_err();

        let outcome = walk(&root, &[], &Shutdown::new()).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if enforced {
            assert_eq!(
                keys(&outcome),
                vec![root.join("visible.txt").display().to_string()]
            );
            assert_eq!(outcome.skipped, 1);
        } else {
            assert_eq!(outcome.files.len(), 2);
            assert_eq!(outcome.skipped, 0);
        }
    }

    #[test]
    fn files_are_listed_in_name_order_within_a_directory() {
        let (_dir, root) = canonical_root();
        for name in ["c.txt", "a.txt", "b.txt"] {
            fs::write(root.join(name), name).unwrap();
        }

        let outcome = walk(&root, &[], &Shutdown::new()).unwrap();

        let names: Vec<_> = outcome
            .files
            .iter()
            .map(|file| file.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let (_dir, root) = canonical_root();

        let result = walk(&root.join("missing"), &[], &Shutdown::new());

        assert!(matches!(result, Err(ScanError::RootUnavailableError { .. })));
    }

    #[test]
    fn file_root_is_an_error() {
        let (_dir, root) = canonical_root();
        fs::write(root.join("file.txt"), "x").unwrap();

        let result = walk(&root.join("file.txt"), &[], &Shutdown::new());

        assert!(matches!(result, Err(ScanError::RootNotDirectoryError { .. })));
    }

    #[test]
    fn shutdown_cancels_the_walk() {
        let (_dir, root) = canonical_root();
        let shutdown = Shutdown::new();
        shutdown.request();

        let result = walk(&root, &[], &shutdown);

        assert!(matches!(result, Err(ScanError::CancelledError)));
    }
}
