//! Config file descriptors.
//!
//! A [`Descriptor`] describes one config file found on disk. Everything but
//! `path` is derived on first read and cached on the instance:
//!
//! | attribute | reads |
//! |---|---|
//! | `dirname` | `path` |
//! | `cwd` | `dirname` |
//! | `basename` | `cwd` |
//! | `stem`, `extname` | `path` |
//! | `relative` | `path`, `base` |
//! | `pkg_path` | `cwd`, `base` |
//! | `pkg` | `pkg_path` |
//! | `name` | `dirname`, `pkg` |
//! | `alias` | `name` |
//! | `main` | `pkg`, `dirname`, `path` |
//! | `exports` | `main` |
//! | `module_name` | |
//! | `module_path` | `module_name`, `cwd` |
//! | `module` | `module_path` |
//!
//! Writing an attribute replaces only that attribute; dependents computed
//! earlier keep their values until [`Descriptor::reset`].

use crate::attrs::{AttrValue, Attrs, ProducerFn};
use crate::companion::resolve_module_path;
use crate::config::{AliasFn, NamingFn, ResolveOptions};
use crate::error::{Error, Result};
use crate::loader::{FsLoader, LoadedModule, ModuleLoader};
use crate::manifest::{read_manifest, Manifest, ManifestCache, MemoryManifestCache, MANIFEST_FILE};
use crate::paths::{absolutize, process_cwd};
use crate::search::global_package_dirs;
use resmod_util::fs::{file_name_lossy, find_up};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

/// Per-descriptor behavior switches and overrides.
#[derive(Debug, Clone)]
pub struct DescriptorOptions {
    /// Explicit `name`.
    pub name: Option<String>,
    /// Explicit `alias`.
    pub alias: Option<String>,
    /// Explicit `cwd` (defaults to `dirname`).
    pub cwd: Option<PathBuf>,
    pub naming_fn: Option<NamingFn>,
    pub alias_fn: Option<AliasFn>,
    /// Companion module name.
    pub module: Option<String>,
    pub resolve_companion: bool,
    pub require_companion: bool,
    /// Directory treated as the process cwd by the `default` name rule.
    pub process_cwd: PathBuf,
}

impl Default for DescriptorOptions {
    fn default() -> Self {
        Self {
            name: None,
            alias: None,
            cwd: None,
            naming_fn: None,
            alias_fn: None,
            module: None,
            resolve_companion: true,
            require_companion: false,
            process_cwd: process_cwd(),
        }
    }
}

impl From<&ResolveOptions> for DescriptorOptions {
    fn from(opts: &ResolveOptions) -> Self {
        Self {
            name: None,
            alias: None,
            cwd: None,
            naming_fn: opts.naming_fn.clone(),
            alias_fn: opts.alias_fn.clone(),
            module: opts.module.clone(),
            resolve_companion: opts.resolve_companion,
            require_companion: opts.require_companion,
            process_cwd: opts.effective_process_cwd(),
        }
    }
}

/// Everything descriptors of one resolution share.
#[derive(Debug)]
pub struct DescriptorContext {
    pub options: DescriptorOptions,
    pub manifests: Rc<dyn ManifestCache>,
    pub loader: Rc<dyn ModuleLoader>,
    pub global_dirs: Vec<PathBuf>,
}

impl Default for DescriptorContext {
    fn default() -> Self {
        Self::new(DescriptorOptions::default())
    }
}

impl DescriptorContext {
    /// Context with a fresh manifest cache, the filesystem loader and the
    /// detected global package directories.
    #[must_use]
    pub fn new(options: DescriptorOptions) -> Self {
        Self {
            options,
            manifests: Rc::new(MemoryManifestCache::new()),
            loader: Rc::new(FsLoader),
            global_dirs: global_package_dirs().to_vec(),
        }
    }

    #[must_use]
    pub fn with_manifests(mut self, manifests: Rc<dyn ManifestCache>) -> Self {
        self.manifests = manifests;
        self
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Rc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn with_global_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.global_dirs = dirs;
        self
    }
}

const ATTRIBUTES: &[(&str, ProducerFn<Descriptor>)] = &[
    ("base", base),
    ("dirname", dirname),
    ("cwd", cwd),
    ("basename", basename),
    ("stem", stem),
    ("extname", extname),
    ("relative", relative),
    ("pkg_path", pkg_path),
    ("pkg", pkg),
    ("name", name),
    ("alias", alias),
    ("main", main),
    ("exports", exports),
    ("module_name", module_name),
    ("module_path", module_path),
    ("module", module),
];

/// One resolved config file.
pub struct Descriptor {
    ctx: Rc<DescriptorContext>,
    attrs: Attrs<Descriptor>,
}

impl Descriptor {
    /// Descriptor for `path`, absolutized against the process cwd.
    pub fn new(path: impl AsRef<Path>, ctx: Rc<DescriptorContext>) -> Self {
        let descriptor = Self::unrooted(ctx);
        descriptor.set_path(path);
        descriptor
    }

    /// Descriptor without a path; derived reads fail until [`Self::set_path`].
    #[must_use]
    pub fn unrooted(ctx: Rc<DescriptorContext>) -> Self {
        let mut attrs = Attrs::new();
        attrs.require("path");
        attrs.install(ATTRIBUTES);
        Self { ctx, attrs }
    }

    #[must_use]
    pub fn context(&self) -> &Rc<DescriptorContext> {
        &self.ctx
    }

    #[must_use]
    pub fn attrs(&self) -> &Attrs<Descriptor> {
        &self.attrs
    }

    /// Read any attribute.
    ///
    /// # Errors
    /// Precondition, cycle and strict-mode companion errors.
    pub fn get(&self, name: &'static str) -> Result<AttrValue> {
        self.attrs.get(self, name)
    }

    /// Overwrite an attribute.
    pub fn set(&self, name: &'static str, value: impl Into<AttrValue>) {
        self.attrs.set(name, value.into());
    }

    /// Drop a cached attribute so it is derived again on the next read.
    pub fn reset(&self, name: &str) -> bool {
        self.attrs.reset(name)
    }

    pub fn set_path(&self, path: impl AsRef<Path>) {
        let path = absolutize(path.as_ref(), &self.ctx.options.process_cwd);
        self.set("path", path);
    }

    pub fn set_base(&self, base: impl AsRef<Path>) {
        let base = absolutize(base.as_ref(), &self.ctx.options.process_cwd);
        self.set("base", base);
    }

    pub fn set_cwd(&self, cwd: impl AsRef<Path>) {
        let cwd = absolutize(cwd.as_ref(), &self.ctx.options.process_cwd);
        self.set("cwd", cwd);
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.set("name", name.into());
    }

    pub fn set_alias(&self, alias: impl Into<String>) {
        self.set("alias", alias.into());
    }

    /// The config file.
    ///
    /// # Errors
    /// `MissingAttribute` if no path was set.
    pub fn path(&self) -> Result<PathBuf> {
        expect_path(self.get("path")?, "path")
    }

    /// The search root this file was found under.
    pub fn base(&self) -> Result<Option<PathBuf>> {
        Ok(self.get("base")?.into_path())
    }

    pub fn dirname(&self) -> Result<PathBuf> {
        expect_path(self.get("dirname")?, "dirname")
    }

    pub fn cwd(&self) -> Result<PathBuf> {
        expect_path(self.get("cwd")?, "cwd")
    }

    pub fn basename(&self) -> Result<Option<String>> {
        Ok(self.get("basename")?.into_text())
    }

    pub fn stem(&self) -> Result<Option<String>> {
        Ok(self.get("stem")?.into_text())
    }

    /// Extension of `path` with its leading dot.
    pub fn extname(&self) -> Result<Option<String>> {
        Ok(self.get("extname")?.into_text())
    }

    /// `path` relative to `base`.
    pub fn relative(&self) -> Result<Option<PathBuf>> {
        Ok(self.get("relative")?.into_path())
    }

    pub fn pkg_path(&self) -> Result<Option<PathBuf>> {
        Ok(self.get("pkg_path")?.into_path())
    }

    /// Nearest manifest; `None` when missing or malformed.
    pub fn pkg(&self) -> Result<Option<Arc<Manifest>>> {
        Ok(self.get("pkg")?.as_manifest().cloned())
    }

    pub fn name(&self) -> Result<String> {
        expect_text(self.get("name")?, "name")
    }

    pub fn alias(&self) -> Result<String> {
        expect_text(self.get("alias")?, "alias")
    }

    pub fn main(&self) -> Result<PathBuf> {
        expect_path(self.get("main")?, "main")
    }

    /// The config file loaded through the module loader.
    pub fn exports(&self) -> Result<Option<Arc<LoadedModule>>> {
        Ok(self.get("exports")?.as_module().cloned())
    }

    pub fn module_name(&self) -> Result<Option<String>> {
        Ok(self.get("module_name")?.into_text())
    }

    /// Location of the companion module.
    ///
    /// # Errors
    /// `CompanionNotFound` when the companion is required and missing.
    pub fn module_path(&self) -> Result<Option<PathBuf>> {
        Ok(self.get("module_path")?.into_path())
    }

    /// The loaded companion module.
    ///
    /// # Errors
    /// `CompanionNotFound` or `CompanionLoad` when the companion is required.
    pub fn module(&self) -> Result<Option<Arc<LoadedModule>>> {
        Ok(self.get("module")?.as_module().cloned())
    }

    /// True if `value` equals the name, the alias or the path.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.name().is_ok_and(|n| n == value)
            || self.alias().is_ok_and(|a| a == value)
            || self.path().is_ok_and(|p| p == Path::new(value))
    }

    /// Serializable summary of the resolved attributes.
    ///
    /// # Errors
    /// Whatever reading the attributes returns.
    pub fn snapshot(&self) -> Result<DescriptorSnapshot> {
        Ok(DescriptorSnapshot {
            name: self.name()?,
            alias: self.alias()?,
            path: self.path()?,
            base: self.base()?,
            relative: self.relative()?,
            main: self.main()?,
            pkg_path: self.pkg_path()?,
            pkg_name: self.pkg()?.and_then(|p| p.name.clone()),
            module_name: self.module_name()?,
            module_path: self.module_path()?,
        })
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alias = self.alias().unwrap_or_else(|_| "?".to_string());
        match self.path() {
            Ok(path) => write!(f, "<Descriptor {alias} {}>", path.display()),
            Err(_) => write!(f, "<Descriptor {alias}>"),
        }
    }
}

/// Resolved attributes of a descriptor, for printing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptorSnapshot {
    pub name: String,
    pub alias: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative: Option<PathBuf>,
    pub main: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pkg_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pkg_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_path: Option<PathBuf>,
}

fn expect_path(value: AttrValue, name: &str) -> Result<PathBuf> {
    match value {
        AttrValue::Path(p) => Ok(p),
        other => Err(Error::other(format!("`{name}` is not a path: {other}"))),
    }
}

fn expect_text(value: AttrValue, name: &str) -> Result<String> {
    match value {
        AttrValue::Text(s) => Ok(s),
        other => Err(Error::other(format!("`{name}` is not text: {other}"))),
    }
}

fn base(_: &Descriptor) -> Result<AttrValue> {
    Ok(AttrValue::Absent)
}

fn dirname(d: &Descriptor) -> Result<AttrValue> {
    let path = d.path()?;
    if path.is_dir() {
        return Ok(path.into());
    }
    Ok(path.parent().map_or_else(|| path.clone(), Path::to_path_buf).into())
}

fn cwd(d: &Descriptor) -> Result<AttrValue> {
    match &d.ctx.options.cwd {
        Some(cwd) => Ok(absolutize(cwd, &d.ctx.options.process_cwd).into()),
        None => Ok(d.dirname()?.into()),
    }
}

fn basename(d: &Descriptor) -> Result<AttrValue> {
    Ok(file_name_lossy(&d.cwd()?).into())
}

fn stem(d: &Descriptor) -> Result<AttrValue> {
    let path = d.path()?;
    Ok(path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .into())
}

fn extname(d: &Descriptor) -> Result<AttrValue> {
    let path = d.path()?;
    Ok(path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .into())
}

fn relative(d: &Descriptor) -> Result<AttrValue> {
    let path = d.path()?;
    let Some(base) = d.base()? else {
        return Ok(AttrValue::Absent);
    };
    Ok(path
        .strip_prefix(&base)
        .ok()
        .map(Path::to_path_buf)
        .into())
}

fn pkg_path(d: &Descriptor) -> Result<AttrValue> {
    let cwd = d.cwd()?;
    let base = d.base()?;
    Ok(find_up(&cwd, MANIFEST_FILE, base.as_deref()).into())
}

fn pkg(d: &Descriptor) -> Result<AttrValue> {
    let Some(path) = d.pkg_path()? else {
        return Ok(AttrValue::Absent);
    };
    Ok(read_manifest(&path, Some(d.ctx.manifests.as_ref())).into())
}

fn name(d: &Descriptor) -> Result<AttrValue> {
    let opts = &d.ctx.options;
    if let Some(name) = &opts.name {
        return Ok(name.as_str().into());
    }
    if let Some(naming_fn) = &opts.naming_fn {
        return Ok((naming_fn.0)(d).into());
    }

    let dirname = d.dirname()?;
    if dirname == opts.process_cwd {
        return Ok("default".into());
    }
    if let Some(name) = d.pkg()?.and_then(|p| p.name.clone()) {
        return Ok(name.into());
    }
    Ok(file_name_lossy(&dirname).unwrap_or_default().into())
}

/// Everything after the first `-`, or the whole name.
#[must_use]
pub fn default_alias(name: &str) -> &str {
    name.split_once('-').map_or(name, |(_, rest)| rest)
}

fn alias(d: &Descriptor) -> Result<AttrValue> {
    let opts = &d.ctx.options;
    if let Some(alias) = &opts.alias {
        return Ok(alias.as_str().into());
    }
    let name = d.name()?;
    if let Some(alias_fn) = &opts.alias_fn {
        return Ok((alias_fn.0)(&name, d).into());
    }
    Ok(default_alias(&name).into())
}

fn main(d: &Descriptor) -> Result<AttrValue> {
    if let Some(main) = d.pkg()?.and_then(|p| p.main.clone()) {
        return Ok(absolutize(Path::new(&main), &d.dirname()?).into());
    }
    Ok(d.path()?.into())
}

fn exports(d: &Descriptor) -> Result<AttrValue> {
    let main = d.main()?;
    match d.ctx.loader.load(&main) {
        Ok(module) => Ok(module.into()),
        Err(err) => {
            debug!(path = %main.display(), error = %err, "config file not loadable");
            Ok(AttrValue::Absent)
        }
    }
}

fn module_name(d: &Descriptor) -> Result<AttrValue> {
    Ok(d.ctx.options.module.as_deref().into())
}

fn module_path(d: &Descriptor) -> Result<AttrValue> {
    let opts = &d.ctx.options;
    if !opts.resolve_companion {
        return Ok(AttrValue::Absent);
    }
    let Some(module) = d.module_name()? else {
        return Ok(AttrValue::Absent);
    };

    let cwd = d.cwd()?;
    let probe = resolve_module_path(
        &module,
        &cwd,
        &d.ctx.global_dirs,
        Some(d.ctx.manifests.as_ref()),
    );
    if let Some(path) = probe.resolved {
        return Ok(path.into());
    }

    debug!(module = %module, cwd = %cwd.display(), tried = probe.tried.len(), "companion module not found");
    if opts.require_companion {
        return Err(Error::CompanionNotFound {
            module,
            name: d.name()?,
        });
    }
    Ok(AttrValue::Absent)
}

fn module(d: &Descriptor) -> Result<AttrValue> {
    let Some(path) = d.module_path()? else {
        return Ok(AttrValue::Absent);
    };
    match d.ctx.loader.load(&path) {
        Ok(module) => Ok(module.into()),
        Err(err) if d.ctx.options.require_companion => Err(Error::CompanionLoad {
            module: d.module_name()?.unwrap_or_default(),
            name: d.name()?,
            reason: err.to_string(),
        }),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "companion module not loadable");
            Ok(AttrValue::Absent)
        }
    }
}
