//! Resolution pass.
//!
//! A [`Resolver`] walks its search directories in order and yields one
//! [`Descriptor`] per config file. The walk is lazy: [`Resolver::matches`]
//! reads the filesystem only as the iterator is advanced, and can be
//! called again to restart. Descriptors, ignore verdicts and manifests are
//! cached on the resolver until [`Resolver::clear_cache`].

use crate::companion::Companion;
use crate::config::ResolveOptions;
use crate::descriptor::{Descriptor, DescriptorContext, DescriptorOptions};
use crate::error::{Error, Result};
use crate::loader::ModuleLoader;
use crate::manifest::{ManifestCache, MemoryManifestCache};
use crate::paths::absolutize;
use crate::search::{Ignore, Matcher, SearchPattern};
use crate::user::UserContext;
use resmod_util::fs::file_name_lossy;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// A candidate that could not be resolved.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: Error,
}

/// Result of [`Resolver::resolve`].
#[derive(Debug, Default)]
pub struct Resolution {
    /// Descriptors in discovery order.
    pub descriptors: Vec<Rc<Descriptor>>,
    /// Descriptors by alias; the last one resolved wins.
    pub by_alias: BTreeMap<String, Rc<Descriptor>>,
    /// Candidates that failed; the others are unaffected.
    pub failures: Vec<Failure>,
}

impl Resolution {
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&Rc<Descriptor>> {
        self.by_alias.get(alias)
    }
}

/// Result of [`Resolver::resolve_first`].
#[derive(Debug)]
pub enum FirstMatch {
    Found(Rc<Descriptor>),
    /// Nothing matched in any directory.
    Fallback {
        user: UserContext,
        companion: Option<Companion>,
    },
}

impl FirstMatch {
    /// The matched descriptor, if any.
    #[must_use]
    pub fn descriptor(&self) -> Option<&Rc<Descriptor>> {
        match self {
            Self::Found(d) => Some(d),
            Self::Fallback { .. } => None,
        }
    }
}

/// Finds config files and builds descriptors for them.
#[derive(Debug)]
pub struct Resolver {
    options: ResolveOptions,
    process_cwd: PathBuf,
    cwd: PathBuf,
    dirs: Vec<PathBuf>,
    pattern: SearchPattern,
    matcher: Option<Matcher>,
    ignore: Ignore,
    manifests: Rc<MemoryManifestCache>,
    ctx: Rc<DescriptorContext>,
    descriptors: RefCell<HashMap<PathBuf, Rc<Descriptor>>>,
}

impl Resolver {
    /// # Errors
    /// `MissingConfigName` or `InvalidPattern` for unusable pattern options.
    pub fn new(options: ResolveOptions) -> Result<Self> {
        let pattern = SearchPattern::from_options(&options)?;

        let process_cwd = options.effective_process_cwd();
        let cwd = options.effective_cwd();
        let global_dirs = options.effective_global_dirs();
        let dirs = options.search_dirs();

        let matcher = options
            .matcher
            .clone()
            .or_else(|| options.matcher_input.as_ref().map(Matcher::from_value));
        if let Some(reason) = matcher.as_ref().and_then(Matcher::invalid_reason) {
            warn!(reason, "matcher rejects every candidate");
        }

        let ignore = Ignore::from_option(options.ignore.as_deref());
        let manifests = Rc::new(MemoryManifestCache::new());

        let ctx = DescriptorContext::new(DescriptorOptions::from(&options))
            .with_manifests(Rc::clone(&manifests) as Rc<dyn ManifestCache>)
            .with_global_dirs(global_dirs);

        debug!(
            dirs = dirs.len(),
            module_pattern = pattern.module_pattern(),
            "resolver ready"
        );

        Ok(Self {
            options,
            process_cwd,
            cwd,
            dirs,
            pattern,
            matcher,
            ignore,
            manifests,
            ctx: Rc::new(ctx),
            descriptors: RefCell::new(HashMap::new()),
        })
    }

    /// Use `loader` for descriptor exports and companion modules.
    ///
    /// Drops cached descriptors, which hold the previous loader.
    #[must_use]
    pub fn with_loader(mut self, loader: Rc<dyn ModuleLoader>) -> Self {
        let ctx = DescriptorContext {
            options: self.ctx.options.clone(),
            manifests: Rc::clone(&self.ctx.manifests),
            loader,
            global_dirs: self.ctx.global_dirs.clone(),
        };
        self.ctx = Rc::new(ctx);
        self.descriptors.borrow_mut().clear();
        self
    }

    #[must_use]
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Starting directory.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Search directories in order.
    #[must_use]
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    #[must_use]
    pub fn pattern(&self) -> &SearchPattern {
        &self.pattern
    }

    /// Lazily walk the search directories.
    ///
    /// When the companion is required, a candidate whose companion is
    /// missing or fails to load yields an error; iteration continues after it.
    #[must_use]
    pub fn matches(&self) -> Matches<'_> {
        Matches {
            candidates: self.candidates(),
        }
    }

    /// Matched descriptors without the companion check.
    #[must_use]
    pub fn candidates(&self) -> Candidates<'_> {
        self.candidates_in(self.dirs.clone())
    }

    fn candidates_in(&self, dirs: Vec<PathBuf>) -> Candidates<'_> {
        Candidates {
            resolver: self,
            dirs: dirs.into_iter(),
            walk: None,
            seen: HashSet::new(),
        }
    }

    /// Resolve every candidate.
    ///
    /// Per-candidate errors are collected in `failures`.
    pub fn resolve(&self) -> Resolution {
        let mut resolution = Resolution::default();

        for descriptor in self.candidates() {
            match self.check(&descriptor).and_then(|()| descriptor.alias()) {
                Ok(alias) => {
                    if let Some(previous) = resolution.by_alias.insert(alias, Rc::clone(&descriptor)) {
                        debug!(replaced = %previous, by = %descriptor, "alias collision");
                    }
                    resolution.descriptors.push(descriptor);
                }
                Err(error) => {
                    let path = descriptor.path().unwrap_or_default();
                    warn!(path = %path.display(), error = %error, "skipping candidate");
                    resolution.failures.push(Failure { path, error });
                }
            }
        }

        debug!(
            resolved = resolution.descriptors.len(),
            failed = resolution.failures.len(),
            "resolution finished"
        );
        resolution
    }

    /// The first match.
    ///
    /// # Errors
    /// The first candidate's companion error, if required.
    pub fn first(&self) -> Result<Option<Rc<Descriptor>>> {
        self.matches().next().transpose()
    }

    /// The first match found in `dirs`, searched one at a time, then in the
    /// `fallback` directory. An empty `dirs` means the resolver cwd.
    ///
    /// When nothing matches, the companion is looked up from `fallback`
    /// (or the cwd) so callers can still run the host module.
    ///
    /// # Errors
    /// The first candidate's companion error, if required.
    pub fn resolve_first(&self, dirs: &[PathBuf]) -> Result<FirstMatch> {
        let mut roots: Vec<PathBuf> = if dirs.is_empty() {
            vec![self.cwd.clone()]
        } else {
            dirs.iter().map(|d| absolutize(d, &self.process_cwd)).collect()
        };
        let fallback = self
            .options
            .fallback
            .as_ref()
            .map(|d| absolutize(d, &self.process_cwd));
        roots.extend(fallback.clone());

        for root in roots {
            let mut matches = Matches {
                candidates: self.candidates_in(vec![root]),
            };
            if let Some(found) = matches.next().transpose()? {
                return Ok(FirstMatch::Found(found));
            }
        }

        let cwd = fallback.unwrap_or_else(|| self.cwd.clone());
        debug!(cwd = %cwd.display(), "no config file found, using fallback");
        let companion = self
            .options
            .module
            .as_deref()
            .map(|module| Companion::from_context(module, &cwd, &self.ctx));
        Ok(FirstMatch::Fallback {
            user: self.user(),
            companion,
        })
    }

    /// The resolved descriptor whose name, alias or path is `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Rc<Descriptor>> {
        self.resolve()
            .descriptors
            .into_iter()
            .find(|d| d.is_match(name))
    }

    /// The host module, looked up from the resolver's cwd.
    #[must_use]
    pub fn companion(&self) -> Option<Companion> {
        let module = self.options.module.as_deref()?;
        Some(Companion::from_context(module, &self.cwd, &self.ctx))
    }

    /// The invoking project.
    #[must_use]
    pub fn user(&self) -> UserContext {
        UserContext::new(&self.process_cwd, true)
            .with_manifests(Rc::clone(&self.ctx.manifests))
    }

    /// Forget cached descriptors, ignore verdicts and manifests.
    pub fn clear_cache(&self) {
        self.descriptors.borrow_mut().clear();
        self.ignore.clear();
        self.manifests.clear();
    }

    /// Number of cached descriptors.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.descriptors.borrow().len()
    }

    /// With a required companion, it must be found and must load.
    fn check(&self, descriptor: &Descriptor) -> Result<()> {
        if self.options.require_companion {
            descriptor.module()?;
        }
        Ok(())
    }

    fn walker(&self, base: &Path) -> Option<walkdir::IntoIter> {
        if !base.is_dir() {
            debug!(dir = %base.display(), "search directory does not exist");
            return None;
        }
        let max_depth = if self.options.recurse { usize::MAX } else { 2 };
        Some(
            WalkDir::new(base)
                .min_depth(1)
                .max_depth(max_depth)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter(),
        )
    }

    /// Decide on one walked entry; directories that must not be entered are
    /// skipped on `walk`.
    fn visit(
        &self,
        base: &Path,
        entry: &DirEntry,
        walk: &mut walkdir::IntoIter,
    ) -> Option<Rc<Descriptor>> {
        let path = entry.path();
        let is_dir = entry.file_type().is_dir();

        if self.ignore.is_ignored(path) {
            debug!(path = %path.display(), "ignored");
            if is_dir {
                walk.skip_current_dir();
            }
            return None;
        }

        let file_name = file_name_lossy(path)?;
        if is_dir {
            if !self.pattern.matches_dir(&file_name) {
                walk.skip_current_dir();
            }
            return None;
        }
        if !self.pattern.is_config_file(&file_name) {
            return None;
        }

        let candidate_name = if entry.depth() == 1 {
            file_name
        } else {
            path.parent().and_then(file_name_lossy)?
        };

        let descriptor = self.descriptor(base, path);
        if let Some(matcher) = &self.matcher {
            if !matcher.matches(&candidate_name, &descriptor) {
                debug!(name = %candidate_name, "rejected by matcher");
                return None;
            }
        }

        debug!(name = %candidate_name, path = %path.display(), "matched config file");
        Some(descriptor)
    }

    fn descriptor(&self, base: &Path, path: &Path) -> Rc<Descriptor> {
        if let Some(cached) = self.descriptors.borrow().get(path) {
            return Rc::clone(cached);
        }
        let descriptor = Descriptor::new(path, Rc::clone(&self.ctx));
        descriptor.set_base(base);
        let descriptor = Rc::new(descriptor);
        self.descriptors
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::clone(&descriptor));
        descriptor
    }
}

/// Lazy walk over the search directories, see [`Resolver::candidates`].
pub struct Candidates<'r> {
    resolver: &'r Resolver,
    dirs: std::vec::IntoIter<PathBuf>,
    walk: Option<(PathBuf, walkdir::IntoIter)>,
    /// Config files already yielded; overlapping roots walk some twice.
    seen: HashSet<PathBuf>,
}

impl Iterator for Candidates<'_> {
    type Item = Rc<Descriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some((base, walk)) = self.walk.as_mut() else {
                let base = self.dirs.next()?;
                self.walk = self.resolver.walker(&base).map(|w| (base, w));
                continue;
            };

            let Some(entry) = walk.next() else {
                self.walk = None;
                continue;
            };

            match entry {
                Ok(entry) => {
                    if let Some(descriptor) = self.resolver.visit(base, &entry, walk) {
                        if self.seen.insert(entry.into_path()) {
                            return Some(descriptor);
                        }
                    }
                }
                Err(err) => warn!(error = %err, "skipping unreadable entry"),
            }
        }
    }
}

/// [`Candidates`] with the strict companion check applied.
pub struct Matches<'r> {
    candidates: Candidates<'r>,
}

impl Iterator for Matches<'_> {
    type Item = Result<Rc<Descriptor>>;

    fn next(&mut self) -> Option<Self::Item> {
        let descriptor = self.candidates.next()?;
        let resolver = self.candidates.resolver;
        Some(resolver.check(&descriptor).map(|()| descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn options(fixtures: &Path) -> ResolveOptions {
        ResolveOptions::new("generate", "generate.js")
            .with_paths([fixtures])
            .with_cwd(fixtures)
            .with_global_paths(false)
    }

    #[test]
    fn test_root_and_child_config_files() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("generate.js"), "");
        write(&dir.path().join("generate-a").join("generate.js"), "");
        write(&dir.path().join("generate-b").join("other.js"), "");
        write(&dir.path().join("generate-c").join("deep").join("generate.js"), "");

        let resolver = Resolver::new(options(dir.path())).unwrap();
        let paths: Vec<_> = resolver
            .candidates()
            .map(|d| d.path().unwrap())
            .collect();
        assert_eq!(
            paths,
            vec![
                dir.path().join("generate-a").join("generate.js"),
                dir.path().join("generate.js"),
            ]
        );
    }

    #[test]
    fn test_recurse_descends_into_matched_dirs() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("a").join("b").join("generate.js"), "");

        let resolver =
            Resolver::new(options(dir.path()).with_recurse(true)).unwrap();
        assert_eq!(resolver.candidates().count(), 1);

        let resolver = Resolver::new(
            options(dir.path())
                .with_recurse(true)
                .with_module_pattern("x*"),
        )
        .unwrap();
        assert_eq!(resolver.candidates().count(), 0);
    }

    #[test]
    fn test_descriptors_are_cached() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("generate-a").join("generate.js"), "");

        let resolver = Resolver::new(options(dir.path())).unwrap();
        let first = resolver.first().unwrap().unwrap();
        let again = resolver.first().unwrap().unwrap();
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!(resolver.cached(), 1);

        resolver.clear_cache();
        assert_eq!(resolver.cached(), 0);
        let fresh = resolver.first().unwrap().unwrap();
        assert!(!Rc::ptr_eq(&first, &fresh));
    }

    #[test]
    fn test_alias_collision_last_wins() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("generate-x").join("generate.js"), "");
        write(&dir.path().join("verb-x").join("generate.js"), "");

        let resolution = Resolver::new(options(dir.path())).unwrap().resolve();
        assert_eq!(resolution.len(), 2);
        assert_eq!(resolution.by_alias.len(), 1);
        let winner = resolution.get("x").unwrap();
        assert_eq!(winner.name().unwrap(), "verb-x");
    }

    #[test]
    fn test_matcher_and_ignore() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("generate-a").join("generate.js"), "");
        write(&dir.path().join("generate-b").join("generate.js"), "");
        write(&dir.path().join("tmp").join("generate.js"), "");

        let resolver = Resolver::new(
            options(dir.path()).with_matcher(Matcher::names(["generate-b", "tmp"])),
        )
        .unwrap();
        let names: Vec<_> = resolver
            .resolve()
            .descriptors
            .iter()
            .map(|d| d.name().unwrap())
            .collect();
        assert_eq!(names, vec!["generate-b".to_string()]);
    }

    #[test]
    fn test_invalid_matcher_rejects_everything() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("generate-a").join("generate.js"), "");

        let mut opts = options(dir.path());
        opts.matcher_input = Some(serde_json::json!(42));
        let resolver = Resolver::new(opts).unwrap();
        assert!(resolver.resolve().is_empty());
    }

    #[test]
    fn test_missing_search_dir_is_skipped() {
        let dir = tempdir().unwrap();
        let resolver = Resolver::new(
            options(dir.path()).with_paths([dir.path().join("missing")]),
        )
        .unwrap();
        assert!(resolver.resolve().is_empty());
    }

    #[test]
    fn test_find_and_companion() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("generate-a").join("generate.js"), "");
        write(
            &dir.path().join("node_modules").join("generate").join("index.js"),
            "",
        );

        let resolver = Resolver::new(options(dir.path())).unwrap();
        assert!(resolver.find("a").is_some());
        assert!(resolver.find("generate-a").is_some());
        assert!(resolver.find("nope").is_none());

        let companion = resolver.companion().unwrap();
        assert_eq!(
            companion.path().unwrap(),
            Some(dir.path().join("node_modules").join("generate"))
        );
    }

    #[test]
    fn test_required_companion_that_fails_to_load() {
        let dir = tempdir().unwrap();
        let plugin = dir.path().join("generate-node");
        write(&plugin.join("generate.js"), "");
        let companion = plugin.join("node_modules").join("generate");
        write(&companion.join("package.json"), r#"{"main":"index.json"}"#);
        write(&companion.join("index.json"), "{ not json");

        let resolution = Resolver::new(options(dir.path()).with_require_companion(true))
            .unwrap()
            .resolve();
        assert!(resolution.is_empty());
        assert_eq!(resolution.failures.len(), 1);
        assert_eq!(resolution.failures[0].path, plugin.join("generate.js"));
        assert!(matches!(
            resolution.failures[0].error,
            Error::CompanionLoad { .. }
        ));

        // not required: the candidate resolves and the module is absent
        let resolution = Resolver::new(options(dir.path())).unwrap().resolve();
        assert_eq!(resolution.len(), 1);
        assert!(resolution.descriptors[0].module().unwrap().is_none());
    }

    #[test]
    fn test_overlapping_roots_yield_each_file_once() {
        let dir = tempdir().unwrap();
        let fixtures = dir.path().join("fixtures");
        write(&fixtures.join("generate-a").join("generate.js"), "");

        let resolver = Resolver::new(
            options(&fixtures)
                .with_paths([dir.path().to_path_buf(), fixtures.clone()])
                .with_recurse(true),
        )
        .unwrap();
        assert_eq!(resolver.candidates().count(), 1);
        assert_eq!(resolver.resolve().len(), 1);
    }

    #[test]
    fn test_resolve_first_tries_dirs_in_order() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty");
        fs::create_dir_all(&empty).unwrap();
        let fallback = dir.path().join("fallback");
        write(&fallback.join("generate-b").join("generate.js"), "");

        let resolver = Resolver::new(options(dir.path()).with_fallback(&fallback)).unwrap();
        let first = resolver.resolve_first(&[empty]).unwrap();
        assert_eq!(first.descriptor().unwrap().name().unwrap(), "generate-b");
    }

    #[test]
    fn test_resolve_first_falls_back_to_companion() {
        let dir = tempdir().unwrap();
        let fallback = dir.path().join("fallback");
        let companion = fallback.join("node_modules").join("generate");
        write(&companion.join("index.js"), "");

        let resolver = Resolver::new(options(dir.path()).with_fallback(&fallback)).unwrap();
        match resolver.resolve_first(&[]).unwrap() {
            FirstMatch::Fallback {
                companion: Some(found),
                ..
            } => assert_eq!(found.path().unwrap(), Some(companion)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_user_shares_manifest_cache() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("package.json"), r#"{"name":"my-app"}"#);

        let resolver = Resolver::new(options(dir.path()).with_process_cwd(dir.path())).unwrap();
        let user = resolver.user();
        assert_eq!(user.cwd(), dir.path());
        assert_eq!(user.pkg().unwrap().name.as_deref(), Some("my-app"));
        assert_eq!(resolver.manifests.len(), 1);
    }

    #[test]
    fn test_requires_config_name() {
        let err = Resolver::new(ResolveOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MissingConfigName));
    }
}
