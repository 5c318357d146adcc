//! Validate command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use keypull_core::Attestation;
use tracing::info;

use crate::utils::print_attestation;

/// Execute the validate command.
pub fn execute(file: PathBuf, json: bool, quiet: bool) -> Result<()> {
    let attestation = Attestation::from_file(&file)
        .with_context(|| format!("Keybox validation failed for {}", file.display()))?;

    info!(
        path = %file.display(),
        keyboxes = attestation.keyboxes.len(),
        keys = attestation.key_count(),
        "Keybox valid"
    );

    if json {
        let rendered = serde_json::to_string_pretty(&attestation)
            .context("Failed to serialize attestation")?;
        println!("{rendered}");
    } else if !quiet {
        println!();
        println!("{}", "Keybox structure is valid".green().bold());
        println!();
        print_attestation(&attestation, "   ");
    }

    Ok(())
}
