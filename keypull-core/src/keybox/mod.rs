//! Keybox attestation documents.
//!
//! A keybox is an XML document holding one or more hardware-backed
//! attestation records for a device:
//!
//! ```xml
//! <AndroidAttestation>
//!   <NumberOfKeyboxes>1</NumberOfKeyboxes>
//!   <Keybox DeviceID="dev1">
//!     <Key algorithm="ecdsa">
//!       <PrivateKey format="pem">...</PrivateKey>
//!       <CertificateChain>
//!         <NumberOfCertificates>1</NumberOfCertificates>
//!         <Certificate format="pem">...</Certificate>
//!       </CertificateChain>
//!     </Key>
//!   </Keybox>
//! </AndroidAttestation>
//! ```
//!
//! [`validate`] turns raw bytes into an [`Attestation`] and enforces the
//! structural rules. Declared counts are stored as written and never
//! compared with the number of child elements.
//!
//! # Example
//!
//! ```
//! use keypull_core::keybox::validate;
//!
//! let xml = br#"<AndroidAttestation>
//!   <NumberOfKeyboxes>1</NumberOfKeyboxes>
//!   <Keybox DeviceID="dev1">
//!     <Key algorithm="rsa">
//!       <PrivateKey format="pem">KEY</PrivateKey>
//!       <CertificateChain><NumberOfCertificates>0</NumberOfCertificates></CertificateChain>
//!     </Key>
//!   </Keybox>
//! </AndroidAttestation>"#;
//!
//! let attestation = validate(xml).unwrap();
//! assert_eq!(attestation.keyboxes[0].device_id, "dev1");
//! ```

mod error;
mod model;
mod validate;

pub use error::{KeyboxError, KeyboxResult};
pub use model::{Attestation, Certificate, CertificateChain, Key, Keybox, PrivateKey};
pub use validate::validate;
