//! Typed keybox attestation tree.

use std::path::Path;

use serde::Serialize;

use super::error::KeyboxResult;

/// Parsed `AndroidAttestation` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attestation {
    /// Value of the `NumberOfKeyboxes` element (0 when absent).
    pub number_of_keyboxes: u64,
    /// `Keybox` elements in document order.
    pub keyboxes: Vec<Keybox>,
}

impl Attestation {
    /// Read a keybox file from disk and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> KeyboxResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        super::validate(&bytes)
    }

    /// Total number of `Key` entries across all keyboxes.
    pub fn key_count(&self) -> usize {
        self.keyboxes.iter().map(|kb| kb.keys.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keybox {
    /// `DeviceID` attribute, empty when missing.
    pub device_id: String,
    pub keys: Vec<Key>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Key {
    pub algorithm: String,
    pub private_key: PrivateKey,
    pub certificate_chain: CertificateChain,
}

impl Key {
    /// Algorithm name for display, `"unknown"` when the attribute is empty.
    pub fn algorithm_or_unknown(&self) -> &str {
        if self.algorithm.is_empty() {
            "unknown"
        } else {
            &self.algorithm
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivateKey {
    pub format: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateChain {
    /// Declared count. May disagree with `certificates.len()`.
    pub number_of_certificates: u64,
    pub certificates: Vec<Certificate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Certificate {
    pub format: String,
    pub data: String,
}
