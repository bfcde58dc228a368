use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Walk up from `start` looking for a file named `file_name`.
///
/// `start` itself is always checked. When `stop` is given, ancestors are only
/// visited while they are strictly inside `stop`, so the walk never escapes it.
#[must_use]
pub fn find_up(start: &Path, file_name: &str, stop: Option<&Path>) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let candidate = dir.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }

        current = dir.parent().filter(|parent| match stop {
            Some(stop) => parent.starts_with(stop) && *parent != stop,
            None => true,
        });
    }

    None
}

/// Returns true if `dir` is a directory with no entries.
///
/// Unreadable or missing directories are not considered empty.
#[must_use]
pub fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none())
}

/// Final path component as an owned string, lossily converted.
#[must_use]
pub fn file_name_lossy(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
