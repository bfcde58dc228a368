pub mod paths;
pub mod resolve;
pub mod version;
pub mod which;

use clap::Args;
use resmod_core::ResolveOptions;
use std::path::PathBuf;

/// Search flags shared by `resolve` and `paths`; each one overrides the
/// options file.
#[derive(Args, Debug, Default)]
pub struct PatternArgs {
    /// Host module the config files are written for
    #[arg(long, short = 'm')]
    pub module: Option<String>,

    /// Config file name, e.g. "generate.js"
    #[arg(long, short = 'f')]
    pub config_file: Option<String>,

    /// Config base name (repeatable)
    #[arg(long = "config-name", value_name = "NAME")]
    pub config_names: Vec<String>,

    /// File name prefix (repeatable)
    #[arg(long = "prefix", value_name = "PREFIX")]
    pub prefixes: Vec<String>,

    /// File name suffix (repeatable)
    #[arg(long = "suffix", value_name = "SUFFIX")]
    pub suffixes: Vec<String>,

    /// Config file extension (repeatable)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Glob for directories that may hold a config file
    #[arg(long)]
    pub module_pattern: Option<String>,

    /// Extra search directory (repeatable, searched first)
    #[arg(long = "path", value_name = "DIR")]
    pub paths: Vec<PathBuf>,

    /// Do not search global package directories
    #[arg(long)]
    pub no_global: bool,

    /// Ignore pattern (repeatable, replaces the default list)
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Positive matcher: a glob, or JSON (`["a","b"]`, `{"regex":".."}`, `{"contains":".."}`)
    #[arg(long)]
    pub matcher: Option<String>,

    /// Descend into matched directories
    #[arg(long)]
    pub recurse: bool,

    /// Fail candidates whose host module is missing
    #[arg(long)]
    pub require_companion: bool,

    /// Skip host module lookup
    #[arg(long)]
    pub no_companion: bool,
}

impl PatternArgs {
    /// Layer the flags over `options`.
    pub fn apply(self, mut options: ResolveOptions) -> ResolveOptions {
        if let Some(module) = self.module {
            options.module = Some(module);
        }
        if let Some(file) = self.config_file {
            options.config_file = Some(file);
        }
        if !self.config_names.is_empty() {
            options.config_names = self.config_names;
        }
        if !self.prefixes.is_empty() {
            options.prefixes = self.prefixes;
        }
        if !self.suffixes.is_empty() {
            options.suffixes = self.suffixes;
        }
        if !self.extensions.is_empty() {
            options.extensions = Some(self.extensions);
        }
        if let Some(pattern) = self.module_pattern {
            options.module_pattern = Some(pattern);
        }
        if !self.paths.is_empty() {
            options.paths = self.paths;
        }
        if self.no_global {
            options.include_global_paths = false;
        }
        if !self.ignore.is_empty() {
            options.ignore = Some(self.ignore);
        }
        if let Some(matcher) = self.matcher {
            options.matcher_input = Some(matcher_value(&matcher));
        }
        if self.recurse {
            options.recurse = true;
        }
        if self.require_companion {
            options.require_companion = true;
        }
        if self.no_companion {
            options.resolve_companion = false;
        }
        options
    }
}

/// JSON matchers are parsed; anything else is taken as a glob.
fn matcher_value(raw: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value @ (serde_json::Value::Array(_) | serde_json::Value::Object(_))) => value,
        _ => serde_json::Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matcher_value() {
        assert_eq!(matcher_value("generate-*"), serde_json::json!("generate-*"));
        assert_eq!(matcher_value(r#"["a","b"]"#), serde_json::json!(["a", "b"]));
        assert_eq!(matcher_value("42"), serde_json::json!("42"));
    }

    #[test]
    fn test_apply_overrides_file_options() {
        let base = ResolveOptions::new("generate", "generate.js").with_paths(["/from-file"]);
        let args = PatternArgs {
            paths: vec![PathBuf::from("/from-flag")],
            no_global: true,
            no_companion: true,
            ..Default::default()
        };

        let options = args.apply(base);
        assert_eq!(options.paths, vec![PathBuf::from("/from-flag")]);
        assert_eq!(options.config_file.as_deref(), Some("generate.js"));
        assert!(!options.include_global_paths);
        assert!(!options.resolve_companion);
    }
}
