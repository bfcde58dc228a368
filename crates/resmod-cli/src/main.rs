#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod logging;

use clap::Parser;
use commands::PatternArgs;
use miette::{IntoDiagnostic, Result};
use resmod_core::ResolveOptions;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "resmod")]
#[command(author, version, about = "Find and describe config files written for a host module", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Read resolve options from a JSON file (flags override it)
    #[arg(long, global = true, value_name = "FILE")]
    options: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// List the config files found in the search directories
    Resolve {
        #[command(flatten)]
        pattern: PatternArgs,
    },

    /// Print the search directories in order
    Paths {
        #[command(flatten)]
        pattern: PatternArgs,
    },

    /// Print where a host module is installed
    Which {
        /// Module name, e.g. "generate"
        module: String,

        /// Do not look in global package directories
        #[arg(long)]
        no_global: bool,
    },
}

fn base_options(cli: &Cli) -> Result<ResolveOptions> {
    let mut options = match &cli.options {
        Some(path) => ResolveOptions::from_file(path).into_diagnostic()?,
        None => ResolveOptions::default(),
    };
    if let Some(cwd) = &cli.cwd {
        options.cwd = Some(cwd.clone());
    }
    Ok(options)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.json);

    let options = base_options(&cli)?;
    let cwd = options.effective_cwd();
    let span = tracing::info_span!("resmod", cwd = %cwd.display());
    let _guard = span.enter();

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Resolve { pattern }) => {
            commands::resolve::run(pattern.apply(options), cli.json)
        }
        Some(Commands::Paths { pattern }) => commands::paths::run(pattern.apply(options), cli.json),
        Some(Commands::Which { module, no_global }) => {
            let options = if no_global {
                options.with_global_paths(false)
            } else {
                options
            };
            commands::which::run(&module, &options, cli.json)
        }
    }
}
