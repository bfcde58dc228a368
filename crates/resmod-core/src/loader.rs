//! Module loading seam.
//!
//! resmod does not execute modules. "Loading" resolves a module path to its
//! entry file and reads it; hosts that can do more plug in their own
//! [`ModuleLoader`].

use crate::error::{Error, Result};
use crate::manifest::{read_manifest, Manifest, ManifestCache, MANIFEST_FILE};
use resmod_util::fs::read_to_string_lossy;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions probed when resolving an entry file (in order).
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".json", ".mjs", ".cjs"];

/// Maximum number of tried paths to record.
pub(crate) const MAX_TRIED_PATHS: usize = 20;

/// A loaded module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedModule {
    /// Resolved entry file.
    pub entry: PathBuf,
    /// Manifest of the package the entry belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Manifest>,
    /// Entry file contents.
    #[serde(skip)]
    pub source: String,
    /// Parsed contents, for JSON entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
}

/// Loads modules for descriptors and companions.
pub trait ModuleLoader: std::fmt::Debug {
    /// Load the module at `path` (a file or a package directory).
    ///
    /// # Errors
    /// Returns an error if `path` has no loadable entry or cannot be read.
    fn load(&self, path: &Path) -> Result<LoadedModule>;
}

/// Outcome of probing a path for an entry file.
#[derive(Debug, Clone, Default)]
pub struct EntryProbe {
    /// Resolved entry file (if successful).
    pub resolved: Option<PathBuf>,
    /// Candidate paths tried (capped).
    pub tried: Vec<PathBuf>,
}

pub(crate) fn add_tried(tried: &mut Vec<PathBuf>, path: &Path) {
    if tried.len() < MAX_TRIED_PATHS {
        tried.push(path.to_path_buf());
    }
}

/// Resolve `base` to a loadable entry file.
///
/// An existing file is its own entry. A directory resolves through its
/// manifest `main` (exact, with extension probing, then `main/index.*`) and
/// finally `index.*`. A missing path is retried with each extension.
#[must_use]
pub fn resolve_entry(
    base: &Path,
    extensions: &[&str],
    cache: Option<&dyn ManifestCache>,
) -> EntryProbe {
    let mut probe = EntryProbe::default();

    if base.is_file() {
        probe.resolved = Some(base.to_path_buf());
        return probe;
    }

    if base.is_dir() {
        probe.resolved = resolve_directory(base, extensions, cache, &mut probe.tried);
        return probe;
    }

    probe.resolved = probe_extensions(base, extensions, &mut probe.tried);
    probe
}

fn probe_extensions(base: &Path, extensions: &[&str], tried: &mut Vec<PathBuf>) -> Option<PathBuf> {
    for ext in extensions {
        let mut with_ext = base.as_os_str().to_owned();
        with_ext.push(ext);
        let with_ext = PathBuf::from(with_ext);
        add_tried(tried, &with_ext);

        if with_ext.is_file() {
            return Some(with_ext);
        }
    }
    None
}

fn probe_index(dir: &Path, extensions: &[&str], tried: &mut Vec<PathBuf>) -> Option<PathBuf> {
    for ext in extensions {
        let index = dir.join(format!("index{ext}"));
        add_tried(tried, &index);

        if index.is_file() {
            return Some(index);
        }
    }
    None
}

fn resolve_directory(
    dir: &Path,
    extensions: &[&str],
    cache: Option<&dyn ManifestCache>,
    tried: &mut Vec<PathBuf>,
) -> Option<PathBuf> {
    let manifest_path = dir.join(MANIFEST_FILE);

    if manifest_path.is_file() {
        add_tried(tried, &manifest_path);

        let main = read_manifest(&manifest_path, cache).and_then(|m| m.main);
        if let Some(main) = main {
            let main_path = dir.join(main);
            add_tried(tried, &main_path);

            if main_path.is_file() {
                return Some(main_path);
            }
            if let Some(found) = probe_extensions(&main_path, extensions, tried) {
                return Some(found);
            }
            if main_path.is_dir() {
                if let Some(found) = probe_index(&main_path, extensions, tried) {
                    return Some(found);
                }
            }
        }
    }

    probe_index(dir, extensions, tried)
}

/// Default loader: resolves the entry file and reads it from disk.
#[derive(Debug, Clone, Default)]
pub struct FsLoader;

impl ModuleLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<LoadedModule> {
        let probe = resolve_entry(path, DEFAULT_EXTENSIONS, None);
        let Some(entry) = probe.resolved else {
            debug!(path = %path.display(), tried = probe.tried.len(), "no loadable entry");
            return Err(Error::other(format!(
                "no loadable entry at {}",
                path.display()
            )));
        };

        let source = read_to_string_lossy(&entry)?;
        let json = if entry.extension().is_some_and(|e| e == "json") {
            Some(serde_json::from_str(&source).map_err(|e| {
                Error::other(format!("invalid JSON in {}: {e}", entry.display()))
            })?)
        } else {
            None
        };

        let package_dir = if path.is_dir() {
            path
        } else {
            entry.parent().unwrap_or(path)
        };
        let manifest = read_manifest(&package_dir.join(MANIFEST_FILE), None);

        Ok(LoadedModule {
            entry,
            manifest,
            source,
            json,
        })
    }
}
