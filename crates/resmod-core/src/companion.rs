//! Companion (host) module lookup.
//!
//! A config file is written for a host module such as `generate`. The host
//! is looked up relative to the config file's directory:
//!
//! 1. the directory itself, when its name is the module name
//! 2. `node_modules/<module>` in the directory and each ancestor
//! 3. `<module>` in each global package directory
//!
//! A candidate only counts if it resolves to an entry file.

use crate::attrs::{AttrValue, Attrs, ProducerFn};
use crate::descriptor::DescriptorContext;
use crate::error::Result;
use crate::loader::{add_tried, resolve_entry, LoadedModule, ModuleLoader, DEFAULT_EXTENSIONS};
use crate::manifest::{read_manifest, Manifest, ManifestCache, MANIFEST_FILE};
use resmod_util::fs::file_name_lossy;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a companion lookup.
#[derive(Debug, Clone, Default)]
pub struct ModuleProbe {
    /// Module directory (or file), if found.
    pub resolved: Option<PathBuf>,
    /// Candidates tried (capped).
    pub tried: Vec<PathBuf>,
}

fn is_loadable(path: &Path, cache: Option<&dyn ManifestCache>) -> bool {
    path.exists() && resolve_entry(path, DEFAULT_EXTENSIONS, cache).resolved.is_some()
}

/// Find `module` for a config file whose directory is `cwd`.
#[must_use]
pub fn resolve_module_path(
    module: &str,
    cwd: &Path,
    global_dirs: &[PathBuf],
    cache: Option<&dyn ManifestCache>,
) -> ModuleProbe {
    let mut probe = ModuleProbe::default();

    if file_name_lossy(cwd).as_deref() == Some(module) {
        add_tried(&mut probe.tried, cwd);
        if is_loadable(cwd, cache) {
            probe.resolved = Some(cwd.to_path_buf());
            return probe;
        }
    }

    let local = cwd
        .ancestors()
        .map(|dir| dir.join("node_modules").join(module));
    let global = global_dirs.iter().map(|dir| dir.join(module));

    for candidate in local.chain(global) {
        add_tried(&mut probe.tried, &candidate);
        if is_loadable(&candidate, cache) {
            probe.resolved = Some(candidate);
            return probe;
        }
    }

    probe
}

const ATTRIBUTES: &[(&str, ProducerFn<Companion>)] = &[
    ("path", path),
    ("realpath", realpath),
    ("pkg", pkg),
    ("exports", exports),
];

/// A host module resolved from a directory.
pub struct Companion {
    name: String,
    cwd: PathBuf,
    global_dirs: Vec<PathBuf>,
    manifests: Rc<dyn ManifestCache>,
    loader: Rc<dyn ModuleLoader>,
    attrs: Attrs<Companion>,
}

impl Companion {
    pub fn new(
        name: impl Into<String>,
        cwd: impl Into<PathBuf>,
        global_dirs: Vec<PathBuf>,
        manifests: Rc<dyn ManifestCache>,
        loader: Rc<dyn ModuleLoader>,
    ) -> Self {
        let mut attrs = Attrs::new();
        attrs.install(ATTRIBUTES);
        Self {
            name: name.into(),
            cwd: cwd.into(),
            global_dirs,
            manifests,
            loader,
            attrs,
        }
    }

    /// Companion sharing the caches and loader of a descriptor context.
    pub fn from_context(
        name: impl Into<String>,
        cwd: impl Into<PathBuf>,
        ctx: &DescriptorContext,
    ) -> Self {
        Self::new(
            name,
            cwd,
            ctx.global_dirs.clone(),
            Rc::clone(&ctx.manifests),
            Rc::clone(&ctx.loader),
        )
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory the lookup starts from.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Module location, `None` when not installed.
    pub fn path(&self) -> Result<Option<PathBuf>> {
        Ok(self.attrs.get(self, "path")?.into_path())
    }

    /// Module location with symlinks resolved.
    pub fn realpath(&self) -> Result<Option<PathBuf>> {
        Ok(self.attrs.get(self, "realpath")?.into_path())
    }

    pub fn pkg(&self) -> Result<Option<Arc<Manifest>>> {
        Ok(self.attrs.get(self, "pkg")?.as_manifest().cloned())
    }

    pub fn exports(&self) -> Result<Option<Arc<LoadedModule>>> {
        Ok(self.attrs.get(self, "exports")?.as_module().cloned())
    }

    pub fn is_installed(&self) -> Result<bool> {
        Ok(self.path()?.is_some())
    }
}

impl fmt::Debug for Companion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Companion")
            .field("name", &self.name)
            .field("cwd", &self.cwd)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

fn path(c: &Companion) -> Result<AttrValue> {
    let probe = resolve_module_path(
        &c.name,
        &c.cwd,
        &c.global_dirs,
        Some(c.manifests.as_ref()),
    );
    if probe.resolved.is_none() {
        debug!(module = %c.name, tried = probe.tried.len(), "companion module not installed");
    }
    Ok(probe.resolved.into())
}

fn realpath(c: &Companion) -> Result<AttrValue> {
    let Some(path) = c.path()? else {
        return Ok(AttrValue::Absent);
    };
    Ok(dunce::canonicalize(&path).unwrap_or(path).into())
}

fn pkg(c: &Companion) -> Result<AttrValue> {
    let Some(path) = c.path()? else {
        return Ok(AttrValue::Absent);
    };
    let dir = if path.is_dir() {
        path
    } else {
        path.parent().map(Path::to_path_buf).unwrap_or(path)
    };
    Ok(read_manifest(&dir.join(MANIFEST_FILE), Some(c.manifests.as_ref())).into())
}

fn exports(c: &Companion) -> Result<AttrValue> {
    let Some(path) = c.path()? else {
        return Ok(AttrValue::Absent);
    };
    match c.loader.load(&path) {
        Ok(module) => Ok(module.into()),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "companion module not loadable");
            Ok(AttrValue::Absent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FsLoader;
    use crate::manifest::MemoryManifestCache;
    use std::fs;
    use tempfile::tempdir;

    fn install(dir: &Path, manifest: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("package.json"), manifest).unwrap();
        fs::write(dir.join("index.js"), "module.exports = {};").unwrap();
    }

    #[test]
    fn test_resolves_self() {
        let root = tempdir().unwrap();
        let module = root.path().join("generate");
        install(&module, r#"{"name":"generate"}"#);

        let probe = resolve_module_path("generate", &module, &[], None);
        assert_eq!(probe.resolved, Some(module));
    }

    #[test]
    fn test_resolves_from_ancestor_node_modules() {
        let root = tempdir().unwrap();
        let module = root.path().join("node_modules").join("generate");
        install(&module, r#"{"name":"generate"}"#);
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let probe = resolve_module_path("generate", &nested, &[], None);
        assert_eq!(probe.resolved, Some(module));
        assert!(probe.tried.len() >= 3);
    }

    #[test]
    fn test_local_wins_over_global() {
        let root = tempdir().unwrap();
        let local = root.path().join("project").join("node_modules").join("generate");
        install(&local, "{}");
        let global = root.path().join("global");
        install(&global.join("generate"), "{}");

        let probe = resolve_module_path(
            "generate",
            &root.path().join("project"),
            &[global.clone()],
            None,
        );
        assert_eq!(probe.resolved, Some(local));

        let elsewhere = root.path().join("elsewhere");
        fs::create_dir_all(&elsewhere).unwrap();
        let probe = resolve_module_path("generate", &elsewhere, &[global.clone()], None);
        assert_eq!(probe.resolved, Some(global.join("generate")));
    }

    #[test]
    fn test_empty_module_dir_is_not_loadable() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("node_modules").join("generate")).unwrap();

        let probe = resolve_module_path("generate", root.path(), &[], None);
        assert!(probe.resolved.is_none());
    }

    #[test]
    fn test_companion_attributes() {
        let root = tempdir().unwrap();
        let module = root.path().join("node_modules").join("generate");
        install(&module, r#"{"name":"generate","version":"0.14.0"}"#);

        let companion = Companion::new(
            "generate",
            root.path(),
            Vec::new(),
            Rc::new(MemoryManifestCache::new()),
            Rc::new(FsLoader),
        );
        assert!(companion.is_installed().unwrap());
        assert_eq!(companion.path().unwrap(), Some(module.clone()));
        assert_eq!(
            companion.realpath().unwrap(),
            Some(dunce::canonicalize(&module).unwrap())
        );
        assert_eq!(
            companion.pkg().unwrap().and_then(|p| p.version.clone()).as_deref(),
            Some("0.14.0")
        );
        assert_eq!(
            companion.exports().unwrap().unwrap().entry,
            module.join("index.js")
        );
    }

    #[test]
    fn test_missing_companion() {
        let root = tempdir().unwrap();
        let companion = Companion::from_context(
            "nonexistent-module-xyz",
            root.path(),
            &DescriptorContext::default().with_global_dirs(Vec::new()),
        );
        assert!(!companion.is_installed().unwrap());
        assert!(companion.pkg().unwrap().is_none());
        assert!(companion.exports().unwrap().is_none());
    }
}
