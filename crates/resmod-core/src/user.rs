//! The project resmod is invoked from.

use crate::attrs::{AttrValue, Attrs, ProducerFn};
use crate::error::Result;
use crate::manifest::{read_manifest, Manifest, ManifestCache, NoManifestCache, MANIFEST_FILE};
use resmod_util::fs::{find_up, is_empty_dir};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

const ATTRIBUTES: &[(&str, ProducerFn<UserContext>)] = &[("pkg", pkg)];

/// The invoking project: its root directory and manifest.
pub struct UserContext {
    cwd: PathBuf,
    pkg_path: Option<PathBuf>,
    manifests: Rc<dyn ManifestCache>,
    attrs: Attrs<UserContext>,
}

impl UserContext {
    /// With `findup`, a `cwd` that is not an empty directory is replaced by
    /// the directory of the nearest manifest above it. Otherwise `cwd` is
    /// kept and only `cwd/package.json` is considered.
    pub fn new(cwd: impl Into<PathBuf>, findup: bool) -> Self {
        let cwd = cwd.into();
        let found = if findup && !is_empty_dir(&cwd) {
            find_up(&cwd, MANIFEST_FILE, None)
        } else {
            None
        };

        let (cwd, pkg_path) = match found {
            Some(pkg_path) => {
                let root = pkg_path.parent().map_or_else(|| cwd.clone(), Path::to_path_buf);
                (root, Some(pkg_path))
            }
            None => {
                let local = cwd.join(MANIFEST_FILE);
                let pkg_path = local.is_file().then_some(local);
                (cwd, pkg_path)
            }
        };

        let mut attrs = Attrs::new();
        attrs.install(ATTRIBUTES);
        Self {
            cwd,
            pkg_path,
            manifests: Rc::new(NoManifestCache),
            attrs,
        }
    }

    /// Read the manifest through `manifests` instead of parsing it afresh.
    #[must_use]
    pub fn with_manifests(mut self, manifests: Rc<dyn ManifestCache>) -> Self {
        self.manifests = manifests;
        self
    }

    /// Project root.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    #[must_use]
    pub fn pkg_path(&self) -> Option<&Path> {
        self.pkg_path.as_deref()
    }

    /// The project manifest; empty when there is none.
    pub fn pkg(&self) -> Result<Arc<Manifest>> {
        match self.attrs.get(self, "pkg")? {
            AttrValue::Manifest(m) => Ok(m),
            _ => Ok(Arc::new(Manifest::default())),
        }
    }
}

impl fmt::Debug for UserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserContext")
            .field("cwd", &self.cwd)
            .field("pkg_path", &self.pkg_path)
            .finish_non_exhaustive()
    }
}

fn pkg(user: &UserContext) -> Result<AttrValue> {
    let manifest = user
        .pkg_path
        .as_deref()
        .and_then(|p| read_manifest(p, Some(user.manifests.as_ref())))
        .unwrap_or_default();
    Ok(manifest.into())
}
