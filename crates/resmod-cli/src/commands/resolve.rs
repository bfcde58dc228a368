//! `resmod resolve`: list the config files found in the search directories.

use miette::{miette, IntoDiagnostic, Result};
use resmod_core::version::OUTPUT_SCHEMA_VERSION;
use resmod_core::{DescriptorSnapshot, ResolveOptions, Resolver};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Serialize)]
struct ResolveOutput {
    schema_version: u32,
    search_dirs: Vec<PathBuf>,
    descriptors: Vec<DescriptorSnapshot>,
    failures: Vec<FailureOutput>,
}

#[derive(Serialize)]
struct FailureOutput {
    path: PathBuf,
    error: String,
}

pub fn run(options: ResolveOptions, json: bool) -> Result<()> {
    let resolver = Resolver::new(options).into_diagnostic()?;
    let resolution = resolver.resolve();

    let descriptors = resolution
        .descriptors
        .iter()
        .map(|d| d.snapshot())
        .collect::<Result<Vec<_>, _>>()
        .into_diagnostic()?;
    let failures: Vec<FailureOutput> = resolution
        .failures
        .iter()
        .map(|f| FailureOutput {
            path: f.path.clone(),
            error: f.error.to_string(),
        })
        .collect();

    if json {
        let out = ResolveOutput {
            schema_version: OUTPUT_SCHEMA_VERSION,
            search_dirs: resolver.search_dirs().to_vec(),
            descriptors,
            failures,
        };
        println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
    } else {
        print_human(&descriptors, &failures)?;
    }

    if resolution.failures.is_empty() {
        Ok(())
    } else {
        Err(miette!(
            "{} config file(s) could not be resolved",
            resolution.failures.len()
        ))
    }
}

fn print_human(descriptors: &[DescriptorSnapshot], failures: &[FailureOutput]) -> Result<()> {
    let mut out = io::stdout().lock();

    if descriptors.is_empty() {
        writeln!(out, "no config files found").into_diagnostic()?;
    }

    let width = descriptors.iter().map(|d| d.alias.len()).max().unwrap_or(0);
    for d in descriptors {
        write!(out, "{:width$}  {}", d.alias, d.path.display()).into_diagnostic()?;
        if d.name != d.alias {
            write!(out, "  ({})", d.name).into_diagnostic()?;
        }
        if let Some(module_path) = &d.module_path {
            write!(out, "  -> {}", module_path.display()).into_diagnostic()?;
        }
        writeln!(out).into_diagnostic()?;
    }

    for failure in failures {
        eprintln!("error: {}: {}", failure.path.display(), failure.error);
    }
    Ok(())
}
