//! `resmod paths`: the search directories, in order.

use miette::{IntoDiagnostic, Result};
use resmod_core::version::OUTPUT_SCHEMA_VERSION;
use resmod_core::ResolveOptions;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct PathsOutput {
    schema_version: u32,
    cwd: PathBuf,
    dirs: Vec<Dir>,
}

#[derive(Serialize)]
struct Dir {
    path: PathBuf,
    exists: bool,
}

pub fn run(options: ResolveOptions, json: bool) -> Result<()> {
    let dirs: Vec<Dir> = options
        .search_dirs()
        .into_iter()
        .map(|path| Dir {
            exists: path.is_dir(),
            path,
        })
        .collect();

    if json {
        let out = PathsOutput {
            schema_version: OUTPUT_SCHEMA_VERSION,
            cwd: options.effective_cwd(),
            dirs,
        };
        println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
        return Ok(());
    }

    for dir in dirs {
        if dir.exists {
            println!("{}", dir.path.display());
        } else {
            println!("{} (missing)", dir.path.display());
        }
    }
    Ok(())
}
