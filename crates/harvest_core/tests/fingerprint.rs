use harvest_core::{
    content_fingerprint, hex_digest, is_sha256_hex, BlockPayload, ContentBlock, DocType,
    ScrapedDocument, SourceReference, Verbatim,
};

fn text_block(id: &str, payload: BlockPayload, plain: &str, url: &str) -> ContentBlock {
    ContentBlock {
        id: id.to_string(),
        payload,
        verbatim: Verbatim,
        html_content: format!("<p>{plain}</p>"),
        markdown_content: plain.to_string(),
        plain_text: plain.to_string(),
        source_ref: SourceReference::webpage(url),
    }
}

fn document(id: &str, name: &str, url: &str) -> ScrapedDocument {
    ScrapedDocument::pending(id, name, DocType::Pdf, url, SourceReference::webpage(url))
}

#[test]
fn fingerprint_is_lowercase_hex() {
    let hash = content_fingerprint(&[], &[]);
    assert!(is_sha256_hex(&hash));
}

#[test]
fn fingerprint_ignores_ids_and_timestamps() {
    // Same content captured twice: different block ids, document ids, and
    // capture timestamps must not change the fingerprint.
    let first = content_fingerprint(
        &[text_block(
            "block-1",
            BlockPayload::Paragraph,
            "Die Sitzung beginnt um 18 Uhr.",
            "https://a.example.de",
        )],
        &[document("doc-1", "Protokoll", "https://a.example.de/p.pdf")],
    );
    let second = content_fingerprint(
        &[text_block(
            "block-99",
            BlockPayload::Paragraph,
            "Die Sitzung beginnt um 18 Uhr.",
            "https://b.example.de",
        )],
        &[document("doc-42", "Protokoll", "https://a.example.de/p.pdf")],
    );

    assert_eq!(first, second);
}

#[test]
fn fingerprint_tracks_plain_text() {
    let base = content_fingerprint(
        &[text_block("block-1", BlockPayload::Paragraph, "alt", "https://x.de")],
        &[],
    );
    let changed = content_fingerprint(
        &[text_block("block-1", BlockPayload::Paragraph, "neu", "https://x.de")],
        &[],
    );
    assert_ne!(base, changed);
}

#[test]
fn fingerprint_tracks_block_type() {
    let paragraph = content_fingerprint(
        &[text_block("block-1", BlockPayload::Paragraph, "Haushalt", "https://x.de")],
        &[],
    );
    let heading = content_fingerprint(
        &[text_block(
            "block-1",
            BlockPayload::Heading {
                level: 2,
                text: "Haushalt".to_string(),
            },
            "Haushalt",
            "https://x.de",
        )],
        &[],
    );
    assert_ne!(paragraph, heading);
}

#[test]
fn fingerprint_tracks_document_identity() {
    let base = content_fingerprint(&[], &[document("doc-1", "Plan", "https://x.de/plan.pdf")]);
    let renamed = content_fingerprint(&[], &[document("doc-1", "Plan 2026", "https://x.de/plan.pdf")]);
    let moved = content_fingerprint(&[], &[document("doc-1", "Plan", "https://x.de/neu/plan.pdf")]);

    assert_ne!(base, renamed);
    assert_ne!(base, moved);
}

#[test]
fn hex_digest_matches_known_vectors() {
    assert_eq!(
        hex_digest(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(
        hex_digest(b"abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn sha256_hex_shape_checks() {
    assert!(is_sha256_hex(&"a".repeat(64)));
    assert!(!is_sha256_hex(&"A".repeat(64)));
    assert!(!is_sha256_hex(&"a".repeat(63)));
    assert!(!is_sha256_hex(&"g".repeat(64)));
    assert!(!is_sha256_hex(""));
}
