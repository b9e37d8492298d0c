#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]

mod commands;
mod logging;

use clap::Parser;
use esbridge_core::TransformConfig;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "esbridge")]
#[command(author, version, about = "Rewrites ES modules for script hosts without a module linker", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Transform config file (JSON); defaults apply to missing fields
    #[arg(long, global = true, value_name = "PATH", env = "ESBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Transform one module into a host wrapper
    Transform {
        /// Source file to transform
        file: PathBuf,

        /// Module path baked into the wrapper (default: "/" + path relative to cwd)
        #[arg(long, value_name = "URL")]
        module_path: Option<String>,

        /// Write the result here instead of stdout
        #[arg(long, short, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Transform a source tree and keep it in sync
    Watch {
        /// Source root to watch
        root: PathBuf,

        /// Directory receiving the transformed modules
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,
    },

    /// Decode a dev-server HMR message and print the host action
    DecodeHmr {
        /// File holding one JSON message (default: stdin)
        file: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<TransformConfig> {
    match path {
        Some(path) => TransformConfig::load(path)
            .into_diagnostic()
            .wrap_err("loading transform config"),
        None => Ok(TransformConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Transform {
            file,
            module_path,
            out,
        }) => {
            let config = load_config(cli.config.as_ref())?;
            commands::transform::run(
                &file,
                module_path.as_deref(),
                out.as_deref(),
                &config,
                cli.json,
            )
        }
        Some(Commands::Watch { root, out_dir }) => {
            let config = load_config(cli.config.as_ref())?;
            commands::watch::run(&root, &out_dir, config, cli.json)
        }
        Some(Commands::DecodeHmr { file }) => commands::decode_hmr::run(file.as_deref(), cli.json),
    }
}
