//! Extract command implementation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use keypull_core::{Extractor, ExtractorConfig, RootState};
use tracing::{debug, info};

use crate::utils::print_report;

/// Options for the extract command. `None` falls back to the environment.
pub struct ExtractArgs {
    pub locations: Vec<String>,
    pub output: Option<PathBuf>,
    pub adb: Option<PathBuf>,
    pub settle_secs: Option<u64>,
    pub json: bool,
}

impl ExtractArgs {
    /// Layer command-line options over the environment configuration.
    fn into_config(self, mut config: ExtractorConfig) -> ExtractorConfig {
        if let Some(adb) = self.adb {
            config.adb_path = adb;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(secs) = self.settle_secs {
            config.settle_delay = Duration::from_secs(secs);
        }
        if !self.locations.is_empty() {
            config.locations = self.locations;
        }
        config
    }
}

/// Execute the extract command.
pub fn execute(args: ExtractArgs, quiet: bool) -> Result<()> {
    let json = args.json;
    let config = args.into_config(ExtractorConfig::from_env());
    debug!(config = ?config, "Resolved configuration");

    // Progress goes to stderr in JSON mode so stdout stays parseable
    let progress = |line: String| {
        if quiet {
            return;
        }
        if json {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    };

    progress("Instantiating extraction process...".dimmed().to_string());

    let mut session = config.session();

    let device = session
        .discover_device()
        .context("ADB connection failed")?
        .to_string();
    progress(format!("{} {}", "Connected to device:".dimmed(), device.cyan()));

    let root = session
        .escalate_privileges()
        .context("Failed to obtain root")?;
    match root {
        RootState::RootViaBridge => progress("Obtained root via ADB".green().to_string()),
        RootState::RootViaSu => progress("Obtained root via SU".green().to_string()),
        RootState::NotAttempted | RootState::Failed => {}
    }

    session
        .ensure_output_dir()
        .context("Could not create output directory")?;

    info!(
        device = %device,
        locations = config.locations.len(),
        output = %session.output_dir().display(),
        "Starting extraction"
    );

    let report = Extractor::new(&session).extract_all(&config.locations);

    if json {
        let rendered =
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{rendered}");
    } else if !quiet {
        print_report(&report, session.output_dir());
    }

    if !report.any_succeeded() {
        bail!(
            "Keybox extraction failed: none of {} location(s) could be extracted",
            report.attempts.len()
        );
    }

    Ok(())
}
