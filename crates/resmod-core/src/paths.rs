//! Path normalization against an explicit base directory.

use std::path::{Component, Path, PathBuf};

/// The process working directory, falling back to `.` when it is unavailable.
#[must_use]
pub fn process_cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Make `path` absolute against `base` and drop `.`/`..` components lexically.
///
/// A leading `~` is expanded to the home directory.
#[must_use]
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let expanded = expand_home(path);
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    dirs_next::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolutize_relative() {
        let base = Path::new("/work/project");
        assert_eq!(
            absolutize(Path::new("fixtures/../generate-node/./generate.js"), base),
            PathBuf::from("/work/project/generate-node/generate.js")
        );
    }

    #[test]
    fn test_absolutize_keeps_absolute() {
        let base = Path::new("/work");
        assert_eq!(
            absolutize(Path::new("/tmp/fixtures"), base),
            PathBuf::from("/tmp/fixtures")
        );
    }

    #[test]
    fn test_absolutize_expands_home() {
        if let Some(home) = dirs_next::home_dir() {
            assert_eq!(absolutize(Path::new("~/x"), Path::new("/work")), home.join("x"));
        }
    }
}
