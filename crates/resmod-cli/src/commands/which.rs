//! `resmod which <module>`: where a host module is installed.

use miette::{miette, IntoDiagnostic, Result};
use resmod_core::version::OUTPUT_SCHEMA_VERSION;
use resmod_core::{Companion, FsLoader, MemoryManifestCache, ResolveOptions};
use serde::Serialize;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Serialize)]
struct WhichOutput {
    schema_version: u32,
    module: String,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    realpath: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

pub fn run(module: &str, options: &ResolveOptions, json: bool) -> Result<()> {
    let global_dirs = if options.include_global_paths {
        options.effective_global_dirs()
    } else {
        Vec::new()
    };
    let companion = Companion::new(
        module,
        options.effective_cwd(),
        global_dirs,
        Rc::new(MemoryManifestCache::new()),
        Rc::new(FsLoader),
    );

    let path = companion.path().into_diagnostic()?;
    let realpath = companion.realpath().into_diagnostic()?;
    let version = companion
        .pkg()
        .into_diagnostic()?
        .and_then(|pkg| pkg.version.clone());

    if json {
        let out = WhichOutput {
            schema_version: OUTPUT_SCHEMA_VERSION,
            module: module.to_string(),
            found: path.is_some(),
            path,
            realpath,
            version,
        };
        println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
        return Ok(());
    }

    let Some(path) = path else {
        return Err(miette!(
            "{module} is not installed locally or globally (from {})",
            companion.cwd().display()
        ));
    };
    match version {
        Some(version) => println!("{} ({module}@{version})", path.display()),
        None => println!("{}", path.display()),
    }
    Ok(())
}
