//! Per-instance attribute cache.

use crate::loader::LoadedModule;
use crate::manifest::Manifest;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A cached attribute value.
///
/// `Absent` is a computed result ("looked, found nothing"), which is not the
/// same as the store having no entry for the key.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Absent,
    Bool(bool),
    Text(String),
    Path(PathBuf),
    Manifest(Arc<Manifest>),
    Module(Arc<LoadedModule>),
}

impl AttrValue {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_manifest(&self) -> Option<&Arc<Manifest>> {
        match self {
            Self::Manifest(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_module(&self) -> Option<&Arc<LoadedModule>> {
        match self {
            Self::Module(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<PathBuf> for AttrValue {
    fn from(p: PathBuf) -> Self {
        Self::Path(p)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Manifest> for AttrValue {
    fn from(m: Manifest) -> Self {
        Self::Manifest(Arc::new(m))
    }
}

impl From<LoadedModule> for AttrValue {
    fn from(m: LoadedModule) -> Self {
        Self::Module(Arc::new(m))
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "<absent>"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Manifest(m) => write!(f, "<manifest {}>", m.name.as_deref().unwrap_or("?")),
            Self::Module(m) => write!(f, "<module {}>", m.entry.display()),
        }
    }
}

/// Key/value store backing the derived attributes of one instance.
#[derive(Debug, Clone, Default)]
pub struct AttrStore {
    values: HashMap<&'static str, AttrValue>,
}

impl AttrStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &'static str, value: AttrValue) {
        self.values.insert(key, value);
    }

    /// Stored value, or `None` when `key` has never been set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.values.get(key)
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
