//! KeyPull Core - Android keystore and keybox extraction library
//!
//! This crate pulls key material from an Android device over `adb` and
//! validates any keybox XML it finds.
//!
//! # Workflow
//!
//! 1. [`Session::discover_device`] starts the bridge server and selects the
//!    first online device
//! 2. [`Session::escalate_privileges`] obtains root via `adb root`, falling
//!    back to an `su` probe
//! 3. [`Session::ensure_output_dir`] creates the local output directory
//! 4. [`Extractor::extract_all`] pulls each location in turn, collecting
//!    successes and recording failures without stopping
//!
//! # Example
//!
//! ```no_run
//! use keypull_core::{ExtractorConfig, Extractor};
//!
//! # fn example() -> keypull_core::Result<()> {
//! let config = ExtractorConfig::from_env();
//! let mut session = config.session();
//!
//! session.discover_device()?;
//! session.escalate_privileges()?;
//! session.ensure_output_dir()?;
//!
//! let report = Extractor::new(&session).extract_all(&config.locations);
//! for location in &report.succeeded {
//!     println!("extracted {location}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod extract;
pub mod keybox;
pub mod locations;
pub mod session;

// Re-export main types for convenience
pub use bridge::{AdbBridge, Bridge, MockBridge};
pub use config::ExtractorConfig;
pub use error::{KeypullError, Result};
pub use extract::{
    DirectorySummary, Extracted, ExtractionReport, Extractor, KeyboxCandidate, LocationKind,
    LocationReport, Outcome, PulledFile,
};
pub use keybox::{validate, Attestation, KeyboxError};
pub use locations::DEVICE_LOCATIONS;
pub use session::{RootState, Session};
