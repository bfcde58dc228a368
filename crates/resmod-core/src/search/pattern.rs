//! Config file-name assembly.
//!
//! Names come from `config_names`, `config_name` and the stem of
//! `config_file`; each is wrapped in every prefix/suffix combination and
//! paired with every extension.

use crate::config::ResolveOptions;
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::path::Path;

/// Extensions used when none are configured.
pub const DEFAULT_CONFIG_EXTENSIONS: &[&str] = &["js", "json", "yml"];

/// Directory pattern used when none is configured.
pub const DEFAULT_MODULE_PATTERN: &str = "*";

/// Compiled search pattern.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    file_names: BTreeSet<String>,
    module_pattern: glob::Pattern,
}

fn strip_dot(ext: &str) -> &str {
    ext.strip_prefix('.').unwrap_or(ext)
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

impl SearchPattern {
    /// Build the pattern from resolution options.
    ///
    /// # Errors
    /// `MissingConfigName` if no config name or file is configured,
    /// `InvalidPattern` if `module_pattern` is not a valid glob.
    pub fn from_options(opts: &ResolveOptions) -> Result<Self> {
        let mut extensions: Vec<String> = match &opts.extensions {
            Some(exts) => exts.iter().map(|e| strip_dot(e).to_string()).collect(),
            None => DEFAULT_CONFIG_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
        };

        let mut names = opts.config_names.clone();
        if let Some(name) = &opts.config_name {
            push_unique(&mut names, name.clone());
        }
        if let Some(file) = &opts.config_file {
            let path = Path::new(file);
            if let Some(stem) = path.file_stem() {
                push_unique(&mut names, stem.to_string_lossy().into_owned());
            }
            if let Some(ext) = path.extension() {
                push_unique(&mut extensions, ext.to_string_lossy().into_owned());
            }
        }

        if names.is_empty() {
            return Err(Error::MissingConfigName);
        }

        let mut file_names = create_names(&names, &opts.prefixes, &opts.suffixes, &extensions);
        if let Some(file) = &opts.config_file {
            file_names.insert(file.clone());
        }

        let raw = opts
            .module_pattern
            .as_deref()
            .unwrap_or(DEFAULT_MODULE_PATTERN);
        let module_pattern = glob::Pattern::new(raw).map_err(|e| Error::InvalidPattern {
            pattern: raw.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            file_names,
            module_pattern,
        })
    }

    /// True if `file_name` is one of the assembled config file names.
    #[must_use]
    pub fn is_config_file(&self, file_name: &str) -> bool {
        self.file_names.contains(file_name)
    }

    /// True if a directory named `dir_name` may hold a config file.
    #[must_use]
    pub fn matches_dir(&self, dir_name: &str) -> bool {
        self.module_pattern.matches(dir_name)
    }

    /// Config file names, sorted.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.file_names.iter().map(String::as_str)
    }

    #[must_use]
    pub fn module_pattern(&self) -> &str {
        self.module_pattern.as_str()
    }
}

/// `prefixes × names × suffixes × extensions`, as `name.ext` file names.
///
/// Empty prefix or suffix lists behave like a single empty string.
#[must_use]
pub fn create_names(
    names: &[String],
    prefixes: &[String],
    suffixes: &[String],
    extensions: &[String],
) -> BTreeSet<String> {
    let empty = [String::new()];
    let prefixes = if prefixes.is_empty() { &empty[..] } else { prefixes };
    let suffixes = if suffixes.is_empty() { &empty[..] } else { suffixes };

    let mut out = BTreeSet::new();
    for prefix in prefixes {
        for name in names {
            for suffix in suffixes {
                for ext in extensions {
                    out.insert(format!("{prefix}{name}{suffix}.{}", strip_dot(ext)));
                }
            }
        }
    }
    out
}
