//! Semantic content fingerprinting.
//!
//! The fingerprint covers what was said, not how the bundle was assembled:
//! block types with their plain text, and document names with their URLs.
//! Ids and timestamps are deliberately excluded so two harvests of identical
//! content hash identically.

use sha2::{Digest, Sha256};

use crate::bundle::{ContentBlock, ScrapedDocument};

/// SHA-256 over the canonical serialization of the given content.
///
/// The canonical form is a compact JSON object with a `blocks` array of
/// `[type, plain_text]` pairs and a `documents` array of `[name, url]`
/// pairs, both in bundle order. Returns lowercase hex.
pub fn content_fingerprint(blocks: &[ContentBlock], documents: &[ScrapedDocument]) -> String {
    let canonical = serde_json::json!({
        "blocks": blocks
            .iter()
            .map(|b| serde_json::json!([b.payload.kind().as_str(), b.plain_text]))
            .collect::<Vec<_>>(),
        "documents": documents
            .iter()
            .map(|d| serde_json::json!([d.name, d.url]))
            .collect::<Vec<_>>(),
    });
    hex_digest(canonical.to_string().as_bytes())
}

/// Lowercase hex SHA-256 of raw bytes.
pub fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

/// True for a 64-character lowercase hex string, the shape of every
/// content hash in a bundle.
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64
        && value
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
