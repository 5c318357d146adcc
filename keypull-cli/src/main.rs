//! KeyPull CLI - Android keystore and keybox extraction tool.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success (at least one location extracted, or keybox valid)
  1   Nothing could be extracted
  64  Command line usage error
  65  Keybox failed validation
  66  Input file could not be read
  69  Device bridge or device unavailable
  74  Output directory could not be written
  77  Root access unavailable on the device";

#[derive(Parser)]
#[command(name = "keypull")]
#[command(author, version, about = "Extract Android keystore and keybox files over ADB", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull keystore and keybox files from the first connected device
    Extract {
        /// Device paths to extract (defaults to the well-known locations)
        #[arg(value_name = "LOCATION")]
        locations: Vec<String>,

        /// Directory where extracted files are written [default: output]
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Path to the adb executable [default: adb]
        #[arg(long, value_name = "PATH")]
        adb: Option<PathBuf>,

        /// Seconds to wait for adbd to restart after `adb root` [default: 2]
        #[arg(long, value_name = "SECS")]
        settle_secs: Option<u64>,

        /// Print the extraction report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a local keybox XML file
    Validate {
        /// Path to the keybox file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the parsed attestation as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the default device locations
    Locations,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_filter = match (verbose, quiet) {
        (0, true) => "error",
        (0, false) => "warn",
        (1, _) => "keypull=info,keypull_core=info",
        (2, _) => "keypull=debug,keypull_core=debug",
        _ => "keypull=trace,keypull_core=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are reported through the error path too.
            let code = if err.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Extract {
            locations,
            output,
            adb,
            settle_secs,
            json,
        } => commands::extract::execute(
            commands::extract::ExtractArgs {
                locations,
                output,
                adb,
                settle_secs,
                json,
            },
            cli.quiet,
        ),
        Commands::Validate { file, json } => commands::validate::execute(file, json, cli.quiet),
        Commands::Locations => commands::locations::execute(),
    };

    let exit = match result {
        Ok(()) => ExitCode::success(),
        Err(err) => {
            let exit = ExitCode::from_anyhow(&err);
            eprintln!(
                "{} {}",
                "error:".red().bold(),
                exit.message.as_deref().unwrap_or("unknown error")
            );
            exit
        }
    };

    process::exit(exit.code);
}
