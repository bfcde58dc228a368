use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::paths::{absolutize, process_cwd};
use crate::search::{global_package_dirs, search_dirs, Matcher};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Custom `name` derivation.
#[derive(Clone)]
pub struct NamingFn(pub Rc<dyn Fn(&Descriptor) -> String>);

impl NamingFn {
    pub fn new(f: impl Fn(&Descriptor) -> String + 'static) -> Self {
        Self(Rc::new(f))
    }
}

impl fmt::Debug for NamingFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NamingFn(..)")
    }
}

/// Custom `alias` derivation, called with the descriptor's name.
#[derive(Clone)]
pub struct AliasFn(pub Rc<dyn Fn(&str, &Descriptor) -> String>);

impl AliasFn {
    pub fn new(f: impl Fn(&str, &Descriptor) -> String + 'static) -> Self {
        Self(Rc::new(f))
    }
}

impl fmt::Debug for AliasFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AliasFn(..)")
    }
}

fn default_true() -> bool {
    true
}

/// Options for a resolution run.
///
/// Deserializable from a JSON options file; the function-valued options
/// can only be set programmatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Companion (host) module name, e.g. `generate`.
    pub module: Option<String>,

    /// Starting search directory (defaults to the process cwd).
    pub cwd: Option<PathBuf>,

    /// Extra directories searched before `cwd`.
    pub paths: Vec<PathBuf>,

    /// Append globally-installed package directories.
    #[serde(default = "default_true")]
    pub include_global_paths: bool,

    /// Replaces the detected global package directories.
    pub global_paths: Option<Vec<PathBuf>>,

    /// Config file extensions (leading dots optional).
    pub extensions: Option<Vec<String>>,

    pub prefixes: Vec<String>,

    pub suffixes: Vec<String>,

    pub config_name: Option<String>,

    pub config_names: Vec<String>,

    pub config_file: Option<String>,

    /// Glob for the directories that may hold a config file (default `*`).
    pub module_pattern: Option<String>,

    /// Resolve `module_path`/`module` on descriptors.
    #[serde(default = "default_true")]
    pub resolve_companion: bool,

    /// Treat a missing or unloadable companion as an error.
    pub require_companion: bool,

    /// Ignore patterns; the default list is used when absent.
    pub ignore: Option<Vec<String>>,

    /// Descend into matched directories.
    pub recurse: bool,

    /// Positive matcher in its JSON form (string, array, `{"regex": ..}`, `{"contains": ..}`).
    #[serde(rename = "matcher", skip_serializing_if = "Option::is_none")]
    pub matcher_input: Option<Value>,

    /// Directory treated as the process cwd by the `default` name rule.
    pub process_cwd: Option<PathBuf>,

    /// Directory tried last by [`Resolver::resolve_first`](crate::Resolver::resolve_first),
    /// and where the companion is looked up when nothing matches.
    pub fallback: Option<PathBuf>,

    #[serde(skip)]
    pub matcher: Option<Matcher>,

    #[serde(skip)]
    pub naming_fn: Option<NamingFn>,

    #[serde(skip)]
    pub alias_fn: Option<AliasFn>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            module: None,
            cwd: None,
            paths: Vec::new(),
            include_global_paths: true,
            global_paths: None,
            extensions: None,
            prefixes: Vec::new(),
            suffixes: Vec::new(),
            config_name: None,
            config_names: Vec::new(),
            config_file: None,
            module_pattern: None,
            resolve_companion: true,
            require_companion: false,
            ignore: None,
            recurse: false,
            matcher_input: None,
            process_cwd: None,
            fallback: None,
            matcher: None,
            naming_fn: None,
            alias_fn: None,
        }
    }
}

impl ResolveOptions {
    /// Options looking for `config_file` on behalf of `module`.
    #[must_use]
    pub fn new(module: impl Into<String>, config_file: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            config_file: Some(config_file.into()),
            ..Default::default()
        }
    }

    /// Load options from a JSON file.
    ///
    /// # Errors
    /// `ConfigRead` if the file cannot be read, `ConfigParse` if it is not
    /// a valid options object.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `process_cwd` if set, else the real process cwd.
    #[must_use]
    pub fn effective_process_cwd(&self) -> PathBuf {
        let cwd = process_cwd();
        match &self.process_cwd {
            Some(p) => absolutize(p, &cwd),
            None => cwd,
        }
    }

    /// Starting search directory, absolute.
    #[must_use]
    pub fn effective_cwd(&self) -> PathBuf {
        let process_cwd = self.effective_process_cwd();
        match &self.cwd {
            Some(cwd) => absolutize(cwd, &process_cwd),
            None => process_cwd,
        }
    }

    /// `global_paths` if set, else the detected global package directories.
    #[must_use]
    pub fn effective_global_dirs(&self) -> Vec<PathBuf> {
        match &self.global_paths {
            Some(dirs) => {
                let process_cwd = self.effective_process_cwd();
                dirs.iter().map(|d| absolutize(d, &process_cwd)).collect()
            }
            None => global_package_dirs().to_vec(),
        }
    }

    /// Ordered, de-duplicated directories a resolution searches.
    #[must_use]
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let process_cwd = self.effective_process_cwd();
        let explicit: Vec<PathBuf> = self
            .paths
            .iter()
            .map(|p| absolutize(p, &process_cwd))
            .collect();
        search_dirs(
            &explicit,
            &self.effective_cwd(),
            self.include_global_paths,
            &self.effective_global_dirs(),
        )
    }

    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn with_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_global_paths(mut self, include: bool) -> Self {
        self.include_global_paths = include;
        self
    }

    #[must_use]
    pub fn with_global_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.global_paths = Some(dirs.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_config_name(mut self, name: impl Into<String>) -> Self {
        self.config_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_config_file(mut self, file: impl Into<String>) -> Self {
        self.config_file = Some(file.into());
        self
    }

    #[must_use]
    pub fn with_module_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.module_pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn with_resolve_companion(mut self, resolve: bool) -> Self {
        self.resolve_companion = resolve;
        self
    }

    #[must_use]
    pub fn with_require_companion(mut self, require: bool) -> Self {
        self.require_companion = require;
        self
    }

    #[must_use]
    pub fn with_ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    #[must_use]
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_process_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.process_cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn with_naming_fn(mut self, f: impl Fn(&Descriptor) -> String + 'static) -> Self {
        self.naming_fn = Some(NamingFn::new(f));
        self
    }

    #[must_use]
    pub fn with_alias_fn(mut self, f: impl Fn(&str, &Descriptor) -> String + 'static) -> Self {
        self.alias_fn = Some(AliasFn::new(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let opts = ResolveOptions::default();
        assert!(opts.include_global_paths);
        assert!(opts.resolve_companion);
        assert!(!opts.require_companion);
        assert!(!opts.recurse);
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("resmod.json");
        fs::write(
            &path,
            r#"{
                "module": "generate",
                "config_file": "generate.js",
                "paths": ["/tmp/fixtures"],
                "include_global_paths": false,
                "matcher": ["generate-node"]
            }"#,
        )
        .unwrap();

        let opts = ResolveOptions::from_file(&path).unwrap();
        assert_eq!(opts.module.as_deref(), Some("generate"));
        assert_eq!(opts.paths, vec![PathBuf::from("/tmp/fixtures")]);
        assert!(!opts.include_global_paths);
        // unspecified fields keep their defaults
        assert!(opts.resolve_companion);
        assert!(opts.matcher_input.is_some());
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            ResolveOptions::from_file(&missing),
            Err(Error::ConfigRead { .. })
        ));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "[1, 2").unwrap();
        assert!(matches!(
            ResolveOptions::from_file(&bad),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_search_dirs_are_absolute_and_unique() {
        let opts = ResolveOptions::default()
            .with_process_cwd("/work")
            .with_cwd("project")
            .with_paths(["project", "../shared"])
            .with_global_dirs(["/g"]);

        assert_eq!(opts.effective_cwd(), PathBuf::from("/work/project"));
        assert_eq!(
            opts.search_dirs(),
            vec![
                PathBuf::from("/work/project"),
                PathBuf::from("/shared"),
                PathBuf::from("/g"),
            ]
        );
        assert_eq!(
            opts.with_global_paths(false).search_dirs().len(),
            2
        );
    }

    #[test]
    fn test_builder() {
        let opts = ResolveOptions::new("generate", "generate.js")
            .with_paths(["/a", "/b"])
            .with_global_paths(false)
            .with_prefixes(["generate-"])
            .with_recurse(true);
        assert_eq!(opts.config_file.as_deref(), Some("generate.js"));
        assert_eq!(opts.paths.len(), 2);
        assert_eq!(opts.prefixes, vec!["generate-".to_string()]);
        assert!(opts.recurse);
    }
}
