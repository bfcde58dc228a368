//! `package.json` model and parse cache.
//!
//! Manifests are cached with mtime/size stamps so an edited file is reparsed
//! on the next lookup.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// The parts of a package manifest resmod cares about.
///
/// Unknown fields are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Parse manifest JSON.
    ///
    /// # Errors
    /// Returns the serde error if the JSON is malformed or not an object.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

/// File stamp for cache invalidation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestStamp {
    /// Modification time in milliseconds since epoch.
    pub mtime_ms: Option<u64>,
    /// File size in bytes.
    pub size: Option<u64>,
}

impl ManifestStamp {
    /// Create stamp from a path by reading its metadata.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_path(path: &Path) -> Self {
        if let Ok(meta) = path.metadata() {
            let mtime_ms = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64);
            Self {
                mtime_ms,
                size: Some(meta.len()),
            }
        } else {
            Self::default()
        }
    }

    /// Check if the stamp matches the current file state.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.exists() && Self::from_path(path) == *self
    }
}

/// Cached manifest entry.
#[derive(Debug, Clone)]
pub struct CachedManifest {
    pub manifest: Manifest,
    pub stamp: ManifestStamp,
}

/// Cache for parsed manifests, shared by the descriptors of one resolver.
pub trait ManifestCache: std::fmt::Debug {
    /// Look up a cached manifest by path.
    ///
    /// Returns None if not cached or if the stamp is stale.
    fn get(&self, path: &Path) -> Option<Manifest>;

    /// Store a parsed manifest in the cache.
    fn set(&self, path: &Path, manifest: Manifest);

    /// Forget every entry.
    fn clear(&self) {}
}

/// No-op cache implementation (always misses, never stores).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoManifestCache;

impl ManifestCache for NoManifestCache {
    fn get(&self, _path: &Path) -> Option<Manifest> {
        None
    }

    fn set(&self, _path: &Path, _manifest: Manifest) {}
}

/// In-memory, stamp-validated manifest cache.
#[derive(Debug, Default)]
pub struct MemoryManifestCache {
    entries: RefCell<HashMap<PathBuf, CachedManifest>>,
}

impl MemoryManifestCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl ManifestCache for MemoryManifestCache {
    fn get(&self, path: &Path) -> Option<Manifest> {
        let mut entries = self.entries.borrow_mut();
        let cached = entries.get(path)?;
        if cached.stamp.matches(path) {
            debug!(path = %path.display(), "manifest cache hit");
            return Some(cached.manifest.clone());
        }
        entries.remove(path);
        None
    }

    fn set(&self, path: &Path, manifest: Manifest) {
        let stamp = ManifestStamp::from_path(path);
        self.entries
            .borrow_mut()
            .insert(path.to_path_buf(), CachedManifest { manifest, stamp });
    }

    fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

/// Read and parse a manifest, using `cache` if given.
///
/// Missing files are `None`. Malformed files are `None` as well and are
/// reported with a warning; they never abort a resolution.
pub fn read_manifest(path: &Path, cache: Option<&dyn ManifestCache>) -> Option<Manifest> {
    if let Some(c) = cache {
        if let Some(manifest) = c.get(path) {
            return Some(manifest);
        }
    }

    let content = std::fs::read_to_string(path).ok()?;
    let manifest = match Manifest::from_json(&content) {
        Ok(m) => m,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring malformed manifest");
            return None;
        }
    };

    if let Some(c) = cache {
        c.set(path, manifest.clone());
    }

    Some(manifest)
}
