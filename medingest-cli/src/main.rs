//! medingest CLI
//!
//! Loads local dataset files and URLs through the ingestion pipeline and
//! reports what a viewer would receive.

mod commands;
mod error;
mod logging;
mod scene;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use medingest::dataset::ElementType;

use commands::common::{parse_dims, parse_named_url, parse_spacing, NamedUrl};
use commands::config::ConfigCommands;
use commands::load::LoadArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "medingest")]
#[command(version, about = "Ingest dataset files into decoded, ready-to-render datasets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load files and URLs, then commit them to a logging scene
    ///
    /// DICOM (.dcm) slices are queued but not decoded: no series assembler is
    /// built in, so they are reported as errors.
    Load {
        /// Local files (archives are expanded)
        files: Vec<PathBuf>,

        /// Remote file as NAME=URL, or a URL ending in a file name
        #[arg(long = "url", value_name = "NAME=URL", value_parser = parse_named_url)]
        urls: Vec<NamedUrl>,

        /// Token sent with remote requests
        #[arg(long)]
        auth_token: Option<String>,

        /// Raw volume dimensions, X,Y,Z
        #[arg(long, value_parser = parse_dims)]
        raw_dims: Option<[usize; 3]>,

        /// Raw volume spacing, SX,SY,SZ
        #[arg(long, value_parser = parse_spacing, default_value = "1,1,1")]
        raw_spacing: [f64; 3],

        /// Raw voxel type (int8, uint8, int16, uint16, int32, uint32, float32, float64)
        #[arg(long, default_value = "uint8")]
        raw_type: ElementType,

        /// Config file (defaults to the user config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write logs to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// View or edit configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,

        /// Config file (defaults to the user config directory)
        #[arg(long, global = true)]
        file: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Load {
            files,
            urls,
            auth_token,
            raw_dims,
            raw_spacing,
            raw_type,
            config,
            log_file,
        } => {
            let _log_guard = logging::init(log_file.as_deref())?;
            commands::load::run(LoadArgs {
                files,
                urls,
                auth_token,
                raw_dims,
                raw_spacing,
                raw_type,
                config,
            })
        }
        Commands::Config { command, file } => commands::config::run(command, file),
    }
}
