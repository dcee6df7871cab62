use std::path::{Component, Path, PathBuf};

/// Make `path` absolute against the current directory and collapse `.` and
/// `..` components lexically. Symlinks are not resolved.
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root
                if normalized.parent().is_some() {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// File name shown for a path (falls back to the whole path)
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Directory for per-user runtime files (lock, socket)
pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir().unwrap_or_else(std::env::temp_dir)
}

/// Default location of the persisted session
pub fn default_session_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("pictab").join("session.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_kept() {
        assert_eq!(normalize_path("/tmp/a.png"), PathBuf::from("/tmp/a.png"));
    }

    #[test]
    fn test_dot_components_collapsed() {
        assert_eq!(
            normalize_path("/tmp/./x/../a.png"),
            PathBuf::from("/tmp/a.png")
        );
    }

    #[test]
    fn test_parent_of_root_stays_root() {
        assert_eq!(normalize_path("/../a.png"), PathBuf::from("/a.png"));
    }

    #[test]
    fn test_relative_path_made_absolute() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(normalize_path("a.png"), cwd.join("a.png"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/photos/cat.jpg")), "cat.jpg");
        assert_eq!(display_name(Path::new("/")), "/");
    }
}
