//! Positive candidate matchers.

use crate::descriptor::Descriptor;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Predicate over a candidate name and its descriptor.
pub type MatchFn = Rc<dyn Fn(&str, &Descriptor) -> bool>;

/// A candidate filter.
///
/// Unrecognized or uncompilable input becomes [`Matcher::Never`], which
/// rejects everything.
#[derive(Clone)]
pub enum Matcher {
    Glob(glob::Pattern),
    /// Exact match against any of the names.
    Names(Vec<String>),
    /// Regex over the name, or over the path relative to the search root
    /// when `relative` is set.
    Regex {
        regex: regex_lite::Regex,
        relative: bool,
    },
    Func(MatchFn),
    /// Substring match against any of the needles.
    Contains(Vec<String>),
    /// Rejects everything; carries the reason the input was not usable.
    Never(String),
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Glob(p) => f.debug_tuple("Glob").field(&p.as_str()).finish(),
            Self::Names(names) => f.debug_tuple("Names").field(names).finish(),
            Self::Regex { regex, relative } => f
                .debug_struct("Regex")
                .field("regex", &regex.as_str())
                .field("relative", relative)
                .finish(),
            Self::Func(_) => f.write_str("Func(..)"),
            Self::Contains(needles) => f.debug_tuple("Contains").field(needles).finish(),
            Self::Never(reason) => f.debug_tuple("Never").field(reason).finish(),
        }
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(ToString::to_string))
            .collect(),
        _ => None,
    }
}

impl Matcher {
    /// Glob matcher; an invalid pattern yields `Never`.
    #[must_use]
    pub fn glob(pattern: &str) -> Self {
        match glob::Pattern::new(pattern) {
            Ok(p) => Self::Glob(p),
            Err(e) => Self::Never(format!("invalid glob `{pattern}`: {e}")),
        }
    }

    /// Regex matcher; an invalid regex yields `Never`.
    #[must_use]
    pub fn regex(pattern: &str, relative: bool) -> Self {
        match regex_lite::Regex::new(pattern) {
            Ok(regex) => Self::Regex { regex, relative },
            Err(e) => Self::Never(format!("invalid regex `{pattern}`: {e}")),
        }
    }

    #[must_use]
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn func(f: impl Fn(&str, &Descriptor) -> bool + 'static) -> Self {
        Self::Func(Rc::new(f))
    }

    /// Build a matcher from untyped input.
    ///
    /// - `"pattern"` is a glob
    /// - `["a", "b"]` matches any of the names exactly
    /// - `{"regex": "..", "relative": bool}` is a regex
    /// - `{"contains": "x" | ["x", ..]}` is a substring match
    ///
    /// Anything else is `Never`.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(pattern) => Self::glob(pattern),
            Value::Array(_) => match string_list(value) {
                Some(names) => Self::Names(names),
                None => Self::Never("name lists may only contain strings".to_string()),
            },
            Value::Object(map) => {
                if let Some(regex) = map.get("regex") {
                    let Some(pattern) = regex.as_str() else {
                        return Self::Never("`regex` must be a string".to_string());
                    };
                    let relative = map
                        .get("relative")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    return Self::regex(pattern, relative);
                }
                if let Some(needles) = map.get("contains") {
                    return match string_list(needles) {
                        Some(needles) => Self::Contains(needles),
                        None => Self::Never(
                            "`contains` must be a string or a list of strings".to_string(),
                        ),
                    };
                }
                Self::Never("expected a `regex` or `contains` key".to_string())
            }
            other => Self::Never(format!("unsupported matcher value: {other}")),
        }
    }

    /// False for `Never`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Never(_))
    }

    /// Why the matcher rejects everything, if it does.
    #[must_use]
    pub fn invalid_reason(&self) -> Option<&str> {
        match self {
            Self::Never(reason) => Some(reason),
            _ => None,
        }
    }

    /// Test a candidate.
    #[must_use]
    pub fn matches(&self, name: &str, descriptor: &Descriptor) -> bool {
        match self {
            Self::Glob(pattern) => pattern.matches(name),
            Self::Names(names) => names.iter().any(|n| n == name),
            Self::Regex { regex, relative } => {
                if *relative {
                    match descriptor.relative() {
                        Ok(Some(rel)) => regex.is_match(&rel.to_string_lossy()),
                        _ => false,
                    }
                } else {
                    regex.is_match(name)
                }
            }
            Self::Func(f) => f(name, descriptor),
            Self::Contains(needles) => needles.iter().any(|n| name.contains(n.as_str())),
            Self::Never(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorContext;
    use serde_json::json;

    fn descriptor(path: &str, base: &str) -> Descriptor {
        let d = Descriptor::new(path, Rc::new(DescriptorContext::default()));
        d.set_base(base);
        d
    }

    #[test]
    fn test_from_value_kinds() {
        let d = descriptor("/fixtures/generate-node/generate.js", "/fixtures");

        let glob = Matcher::from_value(&json!("generate-*"));
        assert!(glob.matches("generate-node", &d));
        assert!(!glob.matches("verb-node", &d));

        let names = Matcher::from_value(&json!(["generate-node", "generate-foo"]));
        assert!(names.matches("generate-foo", &d));
        assert!(!names.matches("generate", &d));

        let regex = Matcher::from_value(&json!({"regex": "^generate-(node|foo)$"}));
        assert!(regex.matches("generate-node", &d));

        let contains = Matcher::from_value(&json!({"contains": ["node", "bar"]}));
        assert!(contains.matches("generate-node", &d));
        assert!(!contains.matches("generate-foo", &d));
    }

    #[test]
    fn test_regex_relative_to_base() {
        let d = descriptor("/fixtures/generate-node/generate.js", "/fixtures");
        let regex = Matcher::from_value(&json!({"regex": "^generate-node/generate\\.js$", "relative": true}));
        assert!(regex.matches("anything", &d));
    }

    #[test]
    fn test_unrecognized_is_never() {
        let d = descriptor("/fixtures/generate-node/generate.js", "/fixtures");
        for value in [json!(42), json!(null), json!({"other": 1}), json!([1, 2]), json!({"regex": "("})] {
            let matcher = Matcher::from_value(&value);
            assert!(!matcher.is_valid(), "{value} should be invalid");
            assert!(matcher.invalid_reason().is_some());
            assert!(!matcher.matches("generate-node", &d));
        }
    }

    #[test]
    fn test_func_matcher() {
        let d = descriptor("/fixtures/generate-node/generate.js", "/fixtures");
        let matcher = Matcher::func(|name, _| name.ends_with("-node"));
        assert!(matcher.matches("generate-node", &d));
        assert!(!matcher.matches("generate-foo", &d));
        assert_eq!(format!("{matcher:?}"), "Func(..)");
    }
}
