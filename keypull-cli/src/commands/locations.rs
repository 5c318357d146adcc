//! Locations command - list the paths tried by default.

use anyhow::Result;
use keypull_core::{LocationKind, DEVICE_LOCATIONS};

/// Execute the locations command.
pub fn execute() -> Result<()> {
    for location in DEVICE_LOCATIONS {
        let kind = match LocationKind::classify(location) {
            LocationKind::KeyboxFile => "keybox",
            LocationKind::KeystoreFile => "keystore",
            LocationKind::Directory => "directory",
        };
        println!("{kind:<10} {location}");
    }
    Ok(())
}
