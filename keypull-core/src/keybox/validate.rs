//! Keybox XML validation.

use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;

use super::error::{KeyboxError, KeyboxResult};
use super::model::{Attestation, Certificate, CertificateChain, Key, Keybox, PrivateKey};

/// Parse and validate a keybox document.
///
/// Only the structure is checked: every `Key` must carry a `PrivateKey` and a
/// `CertificateChain`, and declared counts must be non-negative integers.
/// The function performs no I/O; callers read the bytes themselves.
///
/// # Errors
///
/// - [`KeyboxError::MalformedXml`] when the bytes are not UTF-8 or not XML
/// - [`KeyboxError::InvalidCountField`] for a non-numeric declared count
/// - [`KeyboxError::MissingKeyComponent`] for an incomplete `Key`
pub fn validate(bytes: &[u8]) -> KeyboxResult<Attestation> {
    let text = std::str::from_utf8(bytes).map_err(|e| KeyboxError::MalformedXml {
        cause: e.to_string(),
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options).map_err(|e| {
        KeyboxError::MalformedXml {
            cause: e.to_string(),
        }
    })?;

    let root = doc.root_element();
    let number_of_keyboxes = declared_count(root, "NumberOfKeyboxes")?;
    let keyboxes = children(root, "Keybox")
        .map(parse_keybox)
        .collect::<KeyboxResult<Vec<_>>>()?;

    debug!(
        declared = number_of_keyboxes,
        found = keyboxes.len(),
        "Parsed keybox document"
    );

    Ok(Attestation {
        number_of_keyboxes,
        keyboxes,
    })
}

fn parse_keybox(node: Node<'_, '_>) -> KeyboxResult<Keybox> {
    Ok(Keybox {
        device_id: attribute(node, "DeviceID"),
        keys: children(node, "Key")
            .map(parse_key)
            .collect::<KeyboxResult<Vec<_>>>()?,
    })
}

fn parse_key(node: Node<'_, '_>) -> KeyboxResult<Key> {
    let private_key = children(node, "PrivateKey")
        .next()
        .ok_or(KeyboxError::MissingKeyComponent {
            component: "PrivateKey",
        })?;
    let certificate_chain = children(node, "CertificateChain")
        .next()
        .ok_or(KeyboxError::MissingKeyComponent {
            component: "CertificateChain",
        })?;

    Ok(Key {
        algorithm: attribute(node, "algorithm"),
        private_key: PrivateKey {
            format: attribute(private_key, "format"),
            data: trimmed_text(private_key),
        },
        certificate_chain: parse_certificate_chain(certificate_chain)?,
    })
}

fn parse_certificate_chain(node: Node<'_, '_>) -> KeyboxResult<CertificateChain> {
    let number_of_certificates = declared_count(node, "NumberOfCertificates")?;
    let certificates = children(node, "Certificate")
        .map(|cert| Certificate {
            format: attribute(cert, "format"),
            data: trimmed_text(cert),
        })
        .collect();

    Ok(CertificateChain {
        number_of_certificates,
        certificates,
    })
}

/// Element children of `node` with the given tag name, in document order.
fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && child.has_tag_name(name))
}

fn attribute(node: Node<'_, '_>, name: &str) -> String {
    node.attribute(name).unwrap_or_default().to_string()
}

/// Text content up to the first child element. Comments and processing
/// instructions in between are skipped.
fn leading_text(node: Node<'_, '_>) -> String {
    node.children()
        .take_while(|child| !child.is_element())
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect()
}

fn trimmed_text(node: Node<'_, '_>) -> String {
    leading_text(node).trim().to_string()
}

/// Read a count element. Absent means 0; present must parse as `u64`.
fn declared_count(node: Node<'_, '_>, field: &'static str) -> KeyboxResult<u64> {
    let Some(element) = children(node, field).next() else {
        return Ok(0);
    };
    let raw = leading_text(element);
    raw.trim()
        .parse::<u64>()
        .map_err(|_| KeyboxError::InvalidCountField { field, value: raw })
}
