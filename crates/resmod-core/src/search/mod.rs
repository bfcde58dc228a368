//! Where to look and what to accept.

mod dirs;
mod ignore;
mod matcher;
mod pattern;

pub use dirs::{global_package_dirs, search_dirs, GlobalDirSources};
pub use ignore::{Ignore, DEFAULT_IGNORE};
pub use matcher::{MatchFn, Matcher};
pub use pattern::{create_names, SearchPattern, DEFAULT_CONFIG_EXTENSIONS, DEFAULT_MODULE_PATTERN};
