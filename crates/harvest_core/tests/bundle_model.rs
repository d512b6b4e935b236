use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;

use harvest_core::{
    BlockPayload, BundleMetadata, ContentBlock, DocType, ExtractionStatus, ScrapeBundle,
    ScrapedDocument, SourceReference, Verbatim,
};

fn fixed_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn webpage_ref(url: &str) -> SourceReference {
    let mut source = SourceReference::webpage(url);
    source.timestamp = fixed_time();
    source
}

fn heading_block(id: &str, level: u8, text: &str) -> ContentBlock {
    ContentBlock {
        id: id.to_string(),
        payload: BlockPayload::Heading {
            level,
            text: text.to_string(),
        },
        verbatim: Verbatim,
        html_content: format!("<h{level}>{text}</h{level}>"),
        markdown_content: format!("{} {text}", "#".repeat(level as usize)),
        plain_text: text.to_string(),
        source_ref: webpage_ref("https://example.com/page"),
    }
}

#[test]
fn heading_block_serializes_to_flat_object() {
    let block = heading_block("block-1", 2, "Minutes");
    let value = serde_json::to_value(&block).unwrap();

    assert_eq!(
        value,
        serde_json::json!({
            "id": "block-1",
            "type": "heading",
            "level": 2,
            "text": "Minutes",
            "verbatim": true,
            "html_content": "<h2>Minutes</h2>",
            "markdown_content": "## Minutes",
            "plain_text": "Minutes",
            "source_ref": {
                "kind": "webpage",
                "url": "https://example.com/page",
                "timestamp": "2026-01-15T12:00:00Z"
            }
        })
    );
}

#[test]
fn paragraph_payload_carries_only_its_tag() {
    let value = serde_json::to_value(BlockPayload::Paragraph).unwrap();
    assert_eq!(value, serde_json::json!({ "type": "paragraph" }));
}

#[test]
fn verbatim_refuses_to_deserialize_false() {
    let mut value = serde_json::to_value(heading_block("block-1", 1, "T")).unwrap();
    value["verbatim"] = serde_json::json!(false);

    let result: Result<ContentBlock, _> = serde_json::from_value(value);
    assert!(result.is_err());
}

#[test]
fn document_source_includes_page_number_only_when_set() {
    let mut with_page = SourceReference::document("report.pdf", Some(3));
    with_page.timestamp = fixed_time();
    let value = serde_json::to_value(&with_page).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "kind": "document",
            "filename": "report.pdf",
            "page_number": 3,
            "timestamp": "2026-01-15T12:00:00Z"
        })
    );

    let mut without_page = SourceReference::document("report.pdf", None);
    without_page.timestamp = fixed_time();
    let value = serde_json::to_value(&without_page).unwrap();
    assert!(value.get("page_number").is_none());
}

#[test]
fn padded_rows_pads_short_and_truncates_long() {
    let payload = BlockPayload::Table {
        columns: vec!["a".into(), "b".into(), "c".into()],
        rows: vec![
            vec!["1".into()],
            vec!["1".into(), "2".into(), "3".into(), "4".into()],
        ],
        caption: None,
    };

    let padded = payload.padded_rows().unwrap();
    assert_eq!(
        padded,
        vec![
            vec!["1".to_string(), String::new(), String::new()],
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
        ]
    );
    // The stored rows stay as captured.
    let BlockPayload::Table { rows, .. } = payload else {
        unreachable!()
    };
    assert_eq!(rows[0].len(), 1);
    assert_eq!(rows[1].len(), 4);
}

#[test]
fn padded_rows_is_none_for_non_tables() {
    assert!(BlockPayload::Paragraph.padded_rows().is_none());
}

#[test]
fn doc_type_maps_known_extensions() {
    assert_eq!(DocType::from_extension("pdf"), Some(DocType::Pdf));
    assert_eq!(DocType::from_extension("docx"), Some(DocType::Docx));
    assert_eq!(DocType::from_extension("xlsx"), Some(DocType::Xlsx));
    assert_eq!(DocType::from_extension("pptx"), Some(DocType::Pptx));
    assert_eq!(DocType::from_extension("doc"), Some(DocType::Other));
    assert_eq!(DocType::from_extension("xls"), Some(DocType::Other));
    assert_eq!(DocType::from_extension("ppt"), Some(DocType::Other));
    assert_eq!(DocType::from_extension("html"), None);
    assert_eq!(DocType::from_extension("zip"), None);
}

#[test]
fn pending_document_starts_clean() {
    let doc = ScrapedDocument::pending(
        "doc-1",
        "Budget 2026",
        DocType::Pdf,
        "https://example.com/budget.pdf",
        webpage_ref("https://example.com"),
    );

    assert_eq!(doc.extraction_status, ExtractionStatus::Pending);
    assert!(doc.content_hash.is_empty());
    assert_eq!(doc.size_bytes, 0);
    assert!(doc.extraction_metadata.is_empty());
    assert!(doc.is_internally_valid());
}

#[test]
fn record_failure_stores_error_and_timestamp() {
    let mut doc = ScrapedDocument::pending(
        "doc-1",
        "Budget 2026",
        DocType::Pdf,
        "https://example.com/budget.pdf",
        webpage_ref("https://example.com"),
    );
    doc.record_failure("server returned 404");

    assert_eq!(doc.extraction_status, ExtractionStatus::Failed);
    assert_eq!(
        doc.extraction_metadata.get("error"),
        Some(&serde_json::Value::String("server returned 404".into()))
    );
    assert!(doc.extraction_metadata.contains_key("failed_at"));
    assert!(doc.is_internally_valid());
}

#[test]
fn internal_validity_tracks_status() {
    let mut doc = ScrapedDocument::pending(
        "doc-1",
        "Budget 2026",
        DocType::Pdf,
        "https://example.com/budget.pdf",
        webpage_ref("https://example.com"),
    );

    // Completed without a hash or size is incoherent.
    doc.extraction_status = ExtractionStatus::Completed;
    assert!(!doc.is_internally_valid());

    doc.content_hash = "a".repeat(64);
    doc.size_bytes = 1024;
    assert!(doc.is_internally_valid());

    // Failed without recorded error details is incoherent.
    doc.extraction_status = ExtractionStatus::Failed;
    assert!(!doc.is_internally_valid());

    doc.record_failure("timed out");
    assert!(doc.is_internally_valid());

    doc.name.clear();
    assert!(!doc.is_internally_valid());
}

#[test]
fn bundle_round_trips_through_json() {
    let blocks = vec![heading_block("block-1", 1, "Council Minutes")];
    let documents = vec![ScrapedDocument::pending(
        "doc-1",
        "minutes.pdf",
        DocType::Pdf,
        "https://example.com/minutes.pdf",
        webpage_ref("https://example.com/page"),
    )];
    let bundle = ScrapeBundle {
        id: "3e9b1c6a-0000-4000-8000-000000000000".to_string(),
        source: webpage_ref("https://example.com/page"),
        lang: "en".to_string(),
        content_hash: harvest_core::content_fingerprint(&blocks, &documents),
        last_modified: fixed_time(),
        blocks,
        documents,
        metadata: BundleMetadata {
            harvester_version: "0.1.0".to_string(),
            harvested_at: fixed_time(),
            run_id: "run-1".to_string(),
            session_id: "session-1".to_string(),
            normalized_url: "https://example.com/page".to_string(),
        },
    };

    let json = serde_json::to_string_pretty(&bundle).unwrap();
    let parsed: ScrapeBundle = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, bundle);
}
