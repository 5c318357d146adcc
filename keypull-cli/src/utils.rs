//! Terminal rendering shared across CLI commands.

use std::path::Path;

use colored::Colorize;
use keypull_core::{Attestation, Extracted, ExtractionReport, Outcome};

/// Shorten a hex digest for display.
pub fn short_digest(digest: &str) -> &str {
    &digest[..digest.len().min(16)]
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    match bytes {
        b if b >= MIB => format!("{:.1} MiB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KiB", b as f64 / KIB as f64),
        b => format!("{b} B"),
    }
}

/// Print the keybox summary: declared count, device IDs, key algorithms.
pub fn print_attestation(attestation: &Attestation, indent: &str) {
    println!(
        "{indent}{} {}",
        "Keyboxes found:".dimmed(),
        attestation.number_of_keyboxes
    );
    for (i, keybox) in attestation.keyboxes.iter().enumerate() {
        println!(
            "{indent}Keybox {} - Device ID: {}",
            i + 1,
            if keybox.device_id.is_empty() {
                "(none)".dimmed().to_string()
            } else {
                keybox.device_id.cyan().to_string()
            }
        );
        for (j, key) in keybox.keys.iter().enumerate() {
            println!(
                "{indent}  Key {}: Algorithm={}, Certificates={}",
                j + 1,
                key.algorithm_or_unknown(),
                key.certificate_chain.number_of_certificates
            );
        }
    }
}

/// Print one line per attempted location followed by the totals.
pub fn print_report(report: &ExtractionReport, output_dir: &Path) {
    println!();
    for attempt in &report.attempts {
        match &attempt.outcome {
            Outcome::Extracted(extracted) => {
                println!("  {} {}", "Success:".green(), attempt.location);
                print_extracted(extracted);
            }
            Outcome::Failed { error } => {
                println!("  {} {}", "Failed:".red(), attempt.location);
                println!("     {}", error.to_string().dimmed());
            }
        }
    }
    println!();

    if !report.any_succeeded() {
        println!("{}", "Keybox extraction failed.".red().bold());
        return;
    }

    println!(
        "{}",
        format!(
            "Extracted keybox data from {} location(s):",
            report.succeeded.len()
        )
        .green()
        .bold()
    );
    for location in &report.succeeded {
        println!("  - {location}");
    }
    println!();
    println!(
        "   {} {}",
        "Extraction saved to:".dimmed(),
        output_dir.display()
    );
}

fn print_extracted(extracted: &Extracted) {
    match extracted {
        Extracted::Keybox { file, attestation } => {
            println!(
                "     {} {} ({}, sha3 {})",
                "Keybox extracted:".dimmed(),
                file.local.display(),
                format_size(file.size),
                short_digest(&file.sha3_256)
            );
            print_attestation(attestation, "     ");
        }
        Extracted::Keystore { file } => {
            println!(
                "     {} {} ({}, sha3 {})",
                "Keystore extracted:".dimmed(),
                file.local.display(),
                format_size(file.size),
                short_digest(&file.sha3_256)
            );
        }
        Extracted::Directory(summary) => {
            println!(
                "     {} {} pulled, {} failed",
                "Files:".dimmed(),
                summary.pulled.len(),
                summary.failed.len()
            );
            for failure in &summary.failed {
                println!(
                    "     {} {}: {}",
                    "Failed to pull".yellow(),
                    failure.remote,
                    failure.error
                );
            }
            for candidate in &summary.keybox_candidates {
                if let Some(attestation) = &candidate.attestation {
                    println!(
                        "     {} {}",
                        "Keybox located:".green(),
                        candidate.file.local.display()
                    );
                    print_attestation(attestation, "       ");
                }
            }
        }
    }
}
