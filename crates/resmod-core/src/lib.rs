#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Find config files written for a host module and describe them lazily.
//!
//! A [`Resolver`] searches explicit paths, the working directory and the
//! global package directories for config files named after a convention,
//! and yields a [`Descriptor`] per file. Descriptor attributes (`name`,
//! `alias`, `pkg`, `module_path`, ...) are derived on first read and cached.

pub mod attrs;
pub mod companion;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod paths;
pub mod resolver;
pub mod search;
pub mod user;
pub mod version;

pub use attrs::{AttrValue, Attrs};
pub use companion::{resolve_module_path, Companion, ModuleProbe};
pub use config::{AliasFn, NamingFn, ResolveOptions};
pub use descriptor::{Descriptor, DescriptorContext, DescriptorOptions, DescriptorSnapshot};
pub use error::{Error, Result};
pub use loader::{FsLoader, LoadedModule, ModuleLoader};
pub use manifest::{Manifest, ManifestCache, MemoryManifestCache, NoManifestCache};
pub use resolver::{Failure, FirstMatch, Resolution, Resolver};
pub use search::{Ignore, Matcher, SearchPattern};
pub use user::UserContext;
pub use version::VERSION;
