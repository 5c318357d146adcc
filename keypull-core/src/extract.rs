//! Per-location extraction and the batch orchestrator.
//!
//! Each device path is classified once by suffix:
//!
//! - `.xml` - a keybox file; pulled and validated, invalid content fails
//! - `.sqlite` - a keystore database; pulled byte-for-byte
//! - anything else - a directory; every regular file below it is pulled
//!
//! Files met during a directory walk that look like keyboxes are validated
//! opportunistically. Their validation failures are recorded but never fail
//! the directory.

use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use tracing::{debug, info, warn};

use crate::bridge::Bridge;
use crate::error::{KeypullError, Result};
use crate::keybox::{self, Attestation};
use crate::session::Session;

/// How a device path is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    KeyboxFile,
    KeystoreFile,
    Directory,
}

impl LocationKind {
    pub fn classify(location: &str) -> Self {
        if location.ends_with(".xml") {
            Self::KeyboxFile
        } else if location.ends_with(".sqlite") {
            Self::KeystoreFile
        } else {
            Self::Directory
        }
    }
}

/// A file copied from the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PulledFile {
    pub remote: String,
    pub local: PathBuf,
    pub size: u64,
    /// SHA3-256 of the local copy, hex encoded.
    pub sha3_256: String,
}

/// A directory file that was run through the keybox validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboxCandidate {
    pub file: PulledFile,
    /// `None` when the file did not validate.
    pub attestation: Option<Attestation>,
    pub error: Option<String>,
}

/// A file that could not be pulled during a directory walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub remote: String,
    pub error: String,
}

/// Result of walking one remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectorySummary {
    pub remote_dir: String,
    pub pulled: Vec<PulledFile>,
    pub failed: Vec<FileFailure>,
    pub keybox_candidates: Vec<KeyboxCandidate>,
}

/// What a successful location produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Extracted {
    Keybox {
        file: PulledFile,
        attestation: Attestation,
    },
    Keystore {
        file: PulledFile,
    },
    Directory(DirectorySummary),
}

impl Extracted {
    /// Number of files written to the output directory.
    pub fn file_count(&self) -> usize {
        match self {
            Self::Keybox { .. } | Self::Keystore { .. } => 1,
            Self::Directory(summary) => summary.pulled.len(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Extracted(Extracted),
    Failed {
        #[serde(serialize_with = "serialize_error")]
        error: KeypullError,
    },
}

/// One attempted location and how it went.
#[derive(Debug, Serialize)]
pub struct LocationReport {
    pub location: String,
    pub kind: LocationKind,
    pub outcome: Outcome,
}

impl LocationReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Outcome::Extracted(_))
    }
}

/// Result of a batch: successes in input order plus one report per attempt.
#[derive(Debug, Default, Serialize)]
pub struct ExtractionReport {
    pub succeeded: Vec<String>,
    pub attempts: Vec<LocationReport>,
}

impl ExtractionReport {
    pub fn any_succeeded(&self) -> bool {
        !self.succeeded.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &LocationReport> {
        self.attempts.iter().filter(|a| !a.succeeded())
    }

    /// Every file written across all successful locations.
    pub fn pulled_files(&self) -> Vec<&PulledFile> {
        self.attempts
            .iter()
            .filter_map(|a| match &a.outcome {
                Outcome::Extracted(extracted) => Some(extracted),
                Outcome::Failed { .. } => None,
            })
            .flat_map(|extracted| match extracted {
                Extracted::Keybox { file, .. } | Extracted::Keystore { file } => vec![file],
                Extracted::Directory(summary) => summary.pulled.iter().collect(),
            })
            .collect()
    }

    fn push(&mut self, location: &str, result: Result<Extracted>) {
        let outcome = match result {
            Ok(extracted) => {
                self.succeeded.push(location.to_string());
                Outcome::Extracted(extracted)
            }
            Err(error) => Outcome::Failed { error },
        };
        self.attempts.push(LocationReport {
            location: location.to_string(),
            kind: LocationKind::classify(location),
            outcome,
        });
    }
}

fn serialize_error<S: Serializer>(
    error: &KeypullError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Local name for a single-file location: the last path segment.
pub fn remote_basename(remote: &str) -> &str {
    let trimmed = remote.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Local name for a file found in a directory walk:
/// `/data/misc/keystore/user_0/x` becomes `data_misc_keystore_user_0_x`.
pub fn flatten_remote_path(remote: &str) -> String {
    remote.trim_matches('/').replace('/', "_")
}

/// Whether a directory file should be run through the validator.
fn looks_like_keybox(remote: &str) -> bool {
    remote.contains("keybox") || remote.ends_with(".xml")
}

/// Pulls device locations into a session's output directory.
///
/// Borrows the session immutably: device and output directory are fixed
/// for the whole batch.
pub struct Extractor<'s, B> {
    session: &'s Session<B>,
}

impl<'s, B: Bridge> Extractor<'s, B> {
    pub fn new(session: &'s Session<B>) -> Self {
        Self { session }
    }

    /// Extract every location in order, continuing past failures.
    pub fn extract_all<I, S>(&self, locations: I) -> ExtractionReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extract_all_with(locations, |location| self.extract_location(location))
    }

    /// Fold `extract` over the locations, collecting successes in order.
    fn extract_all_with<I, S, F>(&self, locations: I, mut extract: F) -> ExtractionReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&str) -> Result<Extracted>,
    {
        locations
            .into_iter()
            .fold(ExtractionReport::default(), |mut report, location| {
                let location = location.as_ref();
                info!(location = %location, "Attempting extraction");
                let result = extract(location);
                match &result {
                    Ok(extracted) => {
                        info!(location = %location, files = extracted.file_count(), "Extraction succeeded")
                    }
                    Err(e) => warn!(location = %location, error = %e, "Extraction failed"),
                }
                report.push(location, result);
                report
            })
    }

    /// Extract one device path according to its suffix.
    pub fn extract_location(&self, location: &str) -> Result<Extracted> {
        match LocationKind::classify(location) {
            LocationKind::KeyboxFile => self.extract_keybox(location),
            LocationKind::KeystoreFile => self.extract_keystore(location),
            LocationKind::Directory => self.extract_directory(location).map(Extracted::Directory),
        }
    }

    fn extract_keybox(&self, remote: &str) -> Result<Extracted> {
        let local = self.session.output_dir().join(remote_basename(remote));
        let (file, bytes) = self.pull(remote, local)?;
        info!(path = %file.local.display(), "Keybox extracted");

        // The pulled file is left in place even when it does not validate.
        let attestation = keybox::validate(&bytes).map_err(|source| {
            KeypullError::DownloadedKeyboxInvalid {
                path: file.local.clone(),
                source,
            }
        })?;

        Ok(Extracted::Keybox { file, attestation })
    }

    fn extract_keystore(&self, remote: &str) -> Result<Extracted> {
        let local = self.session.output_dir().join(remote_basename(remote));
        let (file, _) = self.pull(remote, local)?;
        info!(path = %file.local.display(), "Keystore extracted");
        Ok(Extracted::Keystore { file })
    }

    /// Pull every regular file below `remote_dir`.
    ///
    /// Fails only when the listing fails or is empty. Individual pull
    /// failures are recorded and the walk continues.
    pub fn extract_directory(&self, remote_dir: &str) -> Result<DirectorySummary> {
        let device = self.session.device()?;
        let files = self.session.bridge().shell_find(device, remote_dir)?;
        if files.is_empty() {
            return Err(KeypullError::EmptyDirectory {
                path: remote_dir.to_string(),
            });
        }
        debug!(dir = %remote_dir, count = files.len(), "Listed remote directory");

        let mut summary = DirectorySummary {
            remote_dir: remote_dir.to_string(),
            pulled: Vec::new(),
            failed: Vec::new(),
            keybox_candidates: Vec::new(),
        };

        for remote in files {
            let local = self.session.output_dir().join(flatten_remote_path(&remote));
            let (file, bytes) = match self.pull(&remote, local) {
                Ok(pulled) => pulled,
                Err(e) => {
                    warn!(remote = %remote, error = %e, "Failed to pull file");
                    summary.failed.push(FileFailure {
                        remote,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if looks_like_keybox(&remote) {
                let candidate = match keybox::validate(&bytes) {
                    Ok(attestation) => {
                        info!(remote = %remote, keyboxes = attestation.keyboxes.len(), "Keybox located");
                        KeyboxCandidate {
                            file: file.clone(),
                            attestation: Some(attestation),
                            error: None,
                        }
                    }
                    Err(e) => {
                        debug!(remote = %remote, error = %e, "Ignoring file that is not a valid keybox");
                        KeyboxCandidate {
                            file: file.clone(),
                            attestation: None,
                            error: Some(e.to_string()),
                        }
                    }
                };
                summary.keybox_candidates.push(candidate);
            }

            summary.pulled.push(file);
        }

        Ok(summary)
    }

    /// Pull `remote` to `local` and fingerprint the copy.
    fn pull(&self, remote: &str, local: PathBuf) -> Result<(PulledFile, Vec<u8>)> {
        let device = self.session.device()?;
        self.session.bridge().pull(device, remote, &local)?;

        let bytes = read_local(&local)?;
        let file = PulledFile {
            remote: remote.to_string(),
            size: bytes.len() as u64,
            sha3_256: hex::encode(Sha3_256::digest(&bytes)),
            local,
        };
        debug!(remote = %remote, local = %file.local.display(), bytes = file.size, "Pulled file");
        Ok((file, bytes))
    }
}

fn read_local(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| KeypullError::LocalIo {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::bridge::{BridgeCall, MockBridge};
    use crate::keybox::KeyboxError;

    const KEYBOX_XML: &str = r#"<AndroidAttestation>
    <NumberOfKeyboxes>1</NumberOfKeyboxes>
    <Keybox DeviceID="dev1">
        <Key algorithm="ecdsa">
            <PrivateKey format="pem">PRIVATE</PrivateKey>
            <CertificateChain>
                <NumberOfCertificates>1</NumberOfCertificates>
                <Certificate format="pem">CERT</Certificate>
            </CertificateChain>
        </Key>
    </Keybox>
</AndroidAttestation>"#;

    fn session(bridge: MockBridge, temp: &TempDir) -> Session<MockBridge> {
        let mut session = Session::new(bridge, temp.path().join("output"));
        session.discover_device().unwrap();
        session
    }

    #[test]
    fn test_classify_locations() {
        assert_eq!(
            LocationKind::classify("/data/adb/tricky_store/keybox.xml"),
            LocationKind::KeyboxFile
        );
        assert_eq!(
            LocationKind::classify("/data/misc/keystore/persistent.sqlite"),
            LocationKind::KeystoreFile
        );
        assert_eq!(
            LocationKind::classify("/data/misc/keystore/"),
            LocationKind::Directory
        );
        assert_eq!(
            LocationKind::classify("/vendor/etc/keystore"),
            LocationKind::Directory
        );
        assert_eq!(
            LocationKind::classify("/data/keybox.xml.bak"),
            LocationKind::Directory
        );
    }

    #[test]
    fn test_local_names() {
        assert_eq!(remote_basename("/data/adb/tricky_store/keybox.xml"), "keybox.xml");
        assert_eq!(remote_basename("persistent.sqlite"), "persistent.sqlite");
        assert_eq!(flatten_remote_path("/data/file1"), "data_file1");
        assert_eq!(
            flatten_remote_path("/data/misc/keystore/user_0/"),
            "data_misc_keystore_user_0"
        );
    }

    #[test]
    fn test_directory_pulls_each_file_and_validates_keybox_only() {
        let temp = TempDir::new().unwrap();
        let bridge = MockBridge::with_device("ABC123")
            .directory("/data", &["/data/file1", "/data/keybox.xml"])
            .file("/data/file1", b"opaque".to_vec())
            .file("/data/keybox.xml", KEYBOX_XML);
        let session = session(bridge, &temp);
        let output = session.output_dir().to_path_buf();

        let summary = Extractor::new(&session).extract_directory("/data").unwrap();

        let pulls: Vec<_> = session
            .bridge()
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                BridgeCall::Pull { remote, local, .. } => Some((remote, local)),
                _ => None,
            })
            .collect();
        assert_eq!(
            pulls,
            vec![
                (
                    "/data/file1".to_string(),
                    output.join("data_file1").display().to_string()
                ),
                (
                    "/data/keybox.xml".to_string(),
                    output.join("data_keybox.xml").display().to_string()
                ),
            ]
        );

        assert_eq!(summary.pulled.len(), 2);
        assert!(summary.failed.is_empty());
        assert_eq!(summary.keybox_candidates.len(), 1);
        let candidate = &summary.keybox_candidates[0];
        assert_eq!(candidate.file.remote, "/data/keybox.xml");
        assert_eq!(
            candidate.attestation.as_ref().unwrap().keyboxes[0].device_id,
            "dev1"
        );
    }

    #[test]
    fn test_directory_continues_past_pull_failure() {
        let temp = TempDir::new().unwrap();
        let bridge = MockBridge::with_device("ABC123")
            .directory("/data/misc/keystore/", &["/data/misc/keystore/gone", "/data/misc/keystore/ok"])
            .file("/data/misc/keystore/ok", b"blob".to_vec());
        let session = session(bridge, &temp);

        let summary = Extractor::new(&session)
            .extract_directory("/data/misc/keystore/")
            .unwrap();

        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].remote, "/data/misc/keystore/gone");
        assert_eq!(summary.pulled.len(), 1);
        assert_eq!(summary.pulled[0].size, 4);
        assert!(session.output_dir().join("data_misc_keystore_ok").is_file());
    }

    #[test]
    fn test_directory_swallows_invalid_keybox() {
        let temp = TempDir::new().unwrap();
        let bridge = MockBridge::with_device("ABC123")
            .directory("/data", &["/data/config.xml", "/data/keybox_backup"])
            .file("/data/config.xml", "<not-closed>")
            .file("/data/keybox_backup", "<AndroidAttestation><Keybox><Key/></Keybox></AndroidAttestation>");
        let session = session(bridge, &temp);

        let summary = Extractor::new(&session).extract_directory("/data").unwrap();

        assert_eq!(summary.pulled.len(), 2);
        assert_eq!(summary.keybox_candidates.len(), 2);
        assert!(summary
            .keybox_candidates
            .iter()
            .all(|c| c.attestation.is_none() && c.error.is_some()));
    }

    #[test]
    fn test_empty_directory_fails() {
        let temp = TempDir::new().unwrap();
        let bridge = MockBridge::with_device("ABC123").directory("/vendor/etc/keystore/", &[]);
        let session = session(bridge, &temp);

        let err = Extractor::new(&session)
            .extract_location("/vendor/etc/keystore/")
            .unwrap_err();
        assert!(matches!(err, KeypullError::EmptyDirectory { .. }));
    }

    #[test]
    fn test_directory_listing_failure() {
        let temp = TempDir::new().unwrap();
        let session = session(MockBridge::with_device("ABC123"), &temp);

        let err = Extractor::new(&session)
            .extract_location("/mnt/vendor/keystore/")
            .unwrap_err();
        assert!(matches!(err, KeypullError::BridgeCommandFailed { .. }));
    }

    #[test]
    fn test_keybox_file_validated() {
        let temp = TempDir::new().unwrap();
        let bridge = MockBridge::with_device("ABC123")
            .file("/data/adb/tricky_store/keybox.xml", KEYBOX_XML);
        let session = session(bridge, &temp);

        let extracted = Extractor::new(&session)
            .extract_location("/data/adb/tricky_store/keybox.xml")
            .unwrap();

        match extracted {
            Extracted::Keybox { file, attestation } => {
                assert_eq!(file.local, session.output_dir().join("keybox.xml"));
                assert_eq!(file.size, KEYBOX_XML.len() as u64);
                assert_eq!(file.sha3_256.len(), 64);
                assert_eq!(attestation.number_of_keyboxes, 1);
            }
            other => panic!("unexpected extraction: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_keybox_file_fails_but_is_kept() {
        let temp = TempDir::new().unwrap();
        let bridge = MockBridge::with_device("ABC123")
            .file("/data/adb/tricky_store/keybox.xml", "<AndroidAttestation>");
        let session = session(bridge, &temp);

        let err = Extractor::new(&session)
            .extract_location("/data/adb/tricky_store/keybox.xml")
            .unwrap_err();

        match err {
            KeypullError::DownloadedKeyboxInvalid { path, source } => {
                assert!(matches!(source, KeyboxError::MalformedXml { .. }));
                assert!(path.is_file());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_keystore_copied_without_validation() {
        let temp = TempDir::new().unwrap();
        let bridge = MockBridge::with_device("ABC123")
            .file("/data/misc/keystore/persistent.sqlite", b"SQLite format 3\0".to_vec());
        let session = session(bridge, &temp);

        let extracted = Extractor::new(&session)
            .extract_location("/data/misc/keystore/persistent.sqlite")
            .unwrap();

        assert!(matches!(extracted, Extracted::Keystore { .. }));
        assert_eq!(
            std::fs::read(session.output_dir().join("persistent.sqlite")).unwrap(),
            b"SQLite format 3\0"
        );
    }

    #[test]
    fn test_keystore_pull_failure() {
        let temp = TempDir::new().unwrap();
        let session = session(MockBridge::with_device("ABC123"), &temp);

        let err = Extractor::new(&session)
            .extract_location("/data/misc/keystore/persistent.sqlite")
            .unwrap_err();
        assert!(matches!(err, KeypullError::PullFailed { .. }));
    }

    #[test]
    fn test_extraction_requires_device() {
        let temp = TempDir::new().unwrap();
        let session = Session::new(
            MockBridge::new().file("/data/a.sqlite", b"x".to_vec()),
            temp.path(),
        );

        let err = Extractor::new(&session)
            .extract_location("/data/a.sqlite")
            .unwrap_err();
        assert!(matches!(err, KeypullError::DeviceNotInitialized));
        assert!(session.bridge().calls().is_empty());
    }

    #[test]
    fn test_extract_all_collects_successful_locations() {
        let temp = TempDir::new().unwrap();
        let session = session(MockBridge::with_device("ABC123"), &temp);
        let extractor = Extractor::new(&session);

        let report = extractor.extract_all_with(["one", "two", "three"], |location| {
            if location == "two" {
                Err(KeypullError::EmptyDirectory {
                    path: location.to_string(),
                })
            } else {
                Ok(Extracted::Directory(DirectorySummary {
                    remote_dir: location.to_string(),
                    pulled: Vec::new(),
                    failed: Vec::new(),
                    keybox_candidates: Vec::new(),
                }))
            }
        });

        assert_eq!(report.succeeded, vec!["one", "three"]);
        assert_eq!(report.attempts.len(), 3);
        assert_eq!(
            report.failures().map(|f| f.location.as_str()).collect::<Vec<_>>(),
            vec!["two"]
        );
    }

    #[test]
    fn test_extract_all_failure_position_does_not_matter() {
        let temp = TempDir::new().unwrap();
        let session = session(MockBridge::with_device("ABC123"), &temp);
        let extractor = Extractor::new(&session);
        let fails = |bad: &'static str| {
            move |location: &str| {
                if location == bad {
                    Err(KeypullError::RootUnavailable)
                } else {
                    Ok(Extracted::Keystore {
                        file: PulledFile {
                            remote: location.to_string(),
                            local: PathBuf::from(location),
                            size: 0,
                            sha3_256: String::new(),
                        },
                    })
                }
            }
        };

        for (bad, expected) in [
            ("one", vec!["two", "three"]),
            ("three", vec!["one", "two"]),
        ] {
            let report = extractor.extract_all_with(["one", "two", "three"], fails(bad));
            assert_eq!(report.succeeded, expected);
        }
    }

    #[test]
    fn test_extract_all_over_mock_device() {
        let temp = TempDir::new().unwrap();
        let bridge = MockBridge::with_device("ABC123")
            .file("/data/misc/keystore/persistent.sqlite", b"db".to_vec())
            .file("/data/adb/tricky_store/keybox.xml", KEYBOX_XML)
            .directory("/data/misc/keystore/user_0/", &["/data/misc/keystore/user_0/10001_USRPKEY_x"])
            .file("/data/misc/keystore/user_0/10001_USRPKEY_x", b"key".to_vec());
        let session = session(bridge, &temp);

        let report = Extractor::new(&session).extract_all([
            "/data/misc/keystore/",
            "/data/misc/keystore/user_0/",
            "/data/misc/keystore/persistent.sqlite",
            "/data/adb/tricky_store/keybox.xml",
        ]);

        assert_eq!(
            report.succeeded,
            vec![
                "/data/misc/keystore/user_0/",
                "/data/misc/keystore/persistent.sqlite",
                "/data/adb/tricky_store/keybox.xml",
            ]
        );
        assert!(report.any_succeeded());
        assert_eq!(report.pulled_files().len(), 3);
        assert_eq!(report.attempts[0].kind, LocationKind::Directory);
        assert!(!report.attempts[0].succeeded());
    }

    #[test]
    fn test_report_serializes_errors_as_text() {
        let mut report = ExtractionReport::default();
        report.push(
            "/vendor/etc/keystore/",
            Err(KeypullError::EmptyDirectory {
                path: "/vendor/etc/keystore/".into(),
            }),
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["succeeded"], serde_json::json!([]));
        assert_eq!(json["attempts"][0]["outcome"]["status"], "failed");
        assert_eq!(
            json["attempts"][0]["outcome"]["error"],
            "no files found in /vendor/etc/keystore/"
        );
    }
}
