//! Search directory enumeration.
//!
//! The search order is `[explicit paths..., cwd, global package dirs...]`
//! with duplicates removed, first occurrence wins.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

static GLOBAL_DIRS: OnceLock<Vec<PathBuf>> = OnceLock::new();

/// Ordered, de-duplicated directories to search.
#[must_use]
pub fn search_dirs(
    explicit: &[PathBuf],
    cwd: &Path,
    include_global: bool,
    globals: &[PathBuf],
) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut dirs = Vec::new();

    let globals = if include_global { globals } else { &[] };
    for dir in explicit
        .iter()
        .map(PathBuf::as_path)
        .chain(std::iter::once(cwd))
        .chain(globals.iter().map(PathBuf::as_path))
    {
        if seen.insert(dir.to_path_buf()) {
            dirs.push(dir.to_path_buf());
        }
    }

    dirs
}

/// Globally-installed package directories for this process.
///
/// Computed once from the environment and never recomputed.
pub fn global_package_dirs() -> &'static [PathBuf] {
    GLOBAL_DIRS.get_or_init(|| {
        let dirs = GlobalDirSources::from_env().existing_dirs();
        debug!(count = dirs.len(), "detected global package directories");
        dirs
    })
}

/// Inputs for global package directory detection.
#[derive(Debug, Clone, Default)]
pub struct GlobalDirSources {
    /// Raw `NODE_PATH` value.
    pub node_path: Option<OsString>,
    /// npm prefix from `NPM_CONFIG_PREFIX` / `PREFIX`.
    pub prefix: Option<PathBuf>,
    /// Location of the `node` binary.
    pub node_bin: Option<PathBuf>,
    pub home: Option<PathBuf>,
    /// `%APPDATA%` (Windows only).
    pub appdata: Option<PathBuf>,
}

impl GlobalDirSources {
    /// Read the sources from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let prefix = ["NPM_CONFIG_PREFIX", "npm_config_prefix", "PREFIX"]
            .iter()
            .find_map(|key| std::env::var_os(key))
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            node_path: std::env::var_os("NODE_PATH"),
            prefix,
            node_bin: which::which("node").ok(),
            home: dirs_next::home_dir(),
            appdata: std::env::var_os("APPDATA").map(PathBuf::from),
        }
    }

    /// The npm prefix: explicit, else derived from the `node` binary.
    #[must_use]
    pub fn npm_prefix(&self) -> Option<PathBuf> {
        if let Some(prefix) = &self.prefix {
            return Some(prefix.clone());
        }
        let bin_dir = self.node_bin.as_deref()?.parent()?;
        if cfg!(windows) {
            Some(bin_dir.to_path_buf())
        } else {
            bin_dir.parent().map(Path::to_path_buf)
        }
    }

    /// Candidate directories in lookup order, existing or not.
    #[must_use]
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();

        if let Some(node_path) = &self.node_path {
            out.extend(std::env::split_paths(node_path).filter(|p| !p.as_os_str().is_empty()));
        }

        if let Some(prefix) = self.npm_prefix() {
            if cfg!(windows) {
                out.push(prefix.join("node_modules"));
            } else {
                out.push(prefix.join("lib").join("node_modules"));
            }
        }

        if cfg!(windows) {
            if let Some(appdata) = &self.appdata {
                out.push(appdata.join("npm").join("node_modules"));
            }
        }

        if let Some(home) = &self.home {
            out.push(home.join(".npm-global").join("lib").join("node_modules"));
        }

        if cfg!(unix) {
            out.push(PathBuf::from("/usr/local/lib/node_modules"));
            out.push(PathBuf::from("/usr/lib/node_modules"));
        }

        out
    }

    /// Existing candidate directories, de-duplicated in order.
    #[must_use]
    pub fn existing_dirs(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        self.candidates()
            .into_iter()
            .filter(|dir| dir.is_dir())
            .filter(|dir| seen.insert(dir.clone()))
            .collect()
    }
}
