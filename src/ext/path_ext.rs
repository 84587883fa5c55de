use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

const TEMP_SUFFIX: &str = ".tmp";

pub fn best_effort_path_display(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical_path) => canonical_path.display().to_string(),
        Err(_) => {
            let absolute_path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                match std::env::current_dir() {
                    Ok(current_dir) => current_dir.join(path),
                    Err(_) => path.to_path_buf(),
                }
            };

            normalize_path(&absolute_path).display().to_string()
        }
    }
}

/// Resolves `.` and `..` lexically, without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !components.is_empty() && !matches!(components.last(), Some(Component::RootDir))
                {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

pub trait PathExt {
    /// Human readable path for logs and error messages.
    fn best_effort_path_display(&self) -> String;

    /// The string key a path is recorded under in a snapshot.
    /// Paths that are not valid UTF-8 have no key.
    fn snapshot_key(&self) -> Option<String>;

    /// Sibling path used while a file is being replaced atomically.
    fn temp_sibling(&self) -> PathBuf;

    /// Absolute form of a path whose final component may not exist yet.
    fn resolve_lenient(&self) -> PathBuf;
}

impl PathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }

    fn snapshot_key(&self) -> Option<String> {
        self.to_str().map(str::to_owned)
    }

    fn temp_sibling(&self) -> PathBuf {
        let mut name = self
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(OsString::new);
        name.push(TEMP_SUFFIX);
        self.with_file_name(name)
    }

    fn resolve_lenient(&self) -> PathBuf {
        if let Ok(canonical) = self.canonicalize() {
            return canonical;
        }
        match (self.parent(), self.file_name()) {
            (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
                match parent.canonicalize() {
                    Ok(parent) => parent.join(name),
                    Err(_) => PathBuf::from(best_effort_path_display(self)),
                }
            }
            _ => PathBuf::from(best_effort_path_display(self)),
        }
    }
}

impl PathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        self.as_path().best_effort_path_display()
    }

    fn snapshot_key(&self) -> Option<String> {
        self.as_path().snapshot_key()
    }

    fn temp_sibling(&self) -> PathBuf {
        self.as_path().temp_sibling()
    }

    fn resolve_lenient(&self) -> PathBuf {
        self.as_path().resolve_lenient()
    }
}
