//! Linked-document discovery, download, and type dispatch.
//!
//! Discovery scans every anchor on the page, not just the content
//! container; a sidebar link to a PDF is still a document. Downloads and
//! extraction happen per document and never fail the harvest: problems are
//! recorded on the document itself.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;
use url::Url;

use harvest_core::{hex_digest, DocType, ExtractionStatus, ScrapedDocument, SourceReference};
use harvest_logging::harvest_debug;

use crate::fetch::{fetch_with_retries, Fetcher};
use crate::sanitize::extract_text;
use crate::walk::element_path;

/// Finds documents linked from the page, in document order.
///
/// An anchor counts as a document link when its resolved URL path ends in a
/// recognized extension. The same URL linked twice yields one document; the
/// first anchor wins. Names come from the anchor text, falling back to the
/// file name in the URL.
pub fn discover_documents(
    document: &Html,
    base: Option<&Url>,
    page_url: &str,
) -> Vec<ScrapedDocument> {
    let Ok(anchor_sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut documents = Vec::new();
    for anchor in document.select(&anchor_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_href(href, base) else {
            continue;
        };
        let Some(doc_type) = doc_type_from_path(resolved.path()) else {
            continue;
        };
        if !seen.insert(resolved.to_string()) {
            continue;
        }

        let mut name = extract_text(anchor);
        if name.is_empty() {
            name = filename_from_url(&resolved);
        }
        let id = format!("doc-{}", documents.len() + 1);
        let source_ref =
            SourceReference::webpage(page_url).with_selector(element_path(anchor));
        documents.push(ScrapedDocument::pending(
            id,
            name,
            doc_type,
            resolved.to_string(),
            source_ref,
        ));
    }
    documents
}

fn resolve_href(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#')
        || lower.starts_with('?')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
    {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.and_then(|base| base.join(trimmed).ok())
}

fn doc_type_from_path(path: &str) -> Option<DocType> {
    let filename = path.rsplit('/').next().unwrap_or(path);
    let (stem, extension) = filename.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    DocType::from_extension(&extension.to_ascii_lowercase())
}

fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .unwrap_or_else(|| url.host_str().unwrap_or("document").to_string())
}

/// What a [`DocumentHandler`] got out of a downloaded document.
#[derive(Debug, Clone, Default)]
pub struct DocumentExtraction {
    pub text: Option<String>,
    pub tables: Option<u32>,
    pub pages: Option<u32>,
    pub language: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A document's content could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExtractionError {
    pub message: String,
}

impl ExtractionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Extracts content from one document format.
///
/// Implementations get the raw downloaded bytes; hashing and sizing have
/// already happened by the time they run.
pub trait DocumentHandler: Send + Sync {
    /// Short name recorded as `extraction_method` in document metadata.
    fn method(&self) -> &'static str;

    fn extract(&self, bytes: &Bytes) -> Result<DocumentExtraction, ExtractionError>;
}

/// Stand-in handler for formats without a real extractor yet.
///
/// Leaves the text fields empty; the download itself (hash, size, mime
/// type) is still recorded in full.
pub struct PlaceholderHandler {
    method: &'static str,
}

impl PlaceholderHandler {
    pub fn new(method: &'static str) -> Self {
        Self { method }
    }
}

impl DocumentHandler for PlaceholderHandler {
    fn method(&self) -> &'static str {
        self.method
    }

    fn extract(&self, _bytes: &Bytes) -> Result<DocumentExtraction, ExtractionError> {
        Ok(DocumentExtraction::default())
    }
}

/// Downloads discovered documents and dispatches them to format handlers.
pub struct DocumentFetcher {
    fetcher: Arc<dyn Fetcher>,
    handlers: HashMap<DocType, Arc<dyn DocumentHandler>>,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl DocumentFetcher {
    /// A fetcher with placeholder handlers for all known formats.
    pub fn new(fetcher: Arc<dyn Fetcher>, max_retries: u32) -> Self {
        let mut handlers: HashMap<DocType, Arc<dyn DocumentHandler>> = HashMap::new();
        handlers.insert(DocType::Pdf, Arc::new(PlaceholderHandler::new("pdf")));
        handlers.insert(DocType::Docx, Arc::new(PlaceholderHandler::new("docx")));
        handlers.insert(DocType::Xlsx, Arc::new(PlaceholderHandler::new("xlsx")));
        handlers.insert(DocType::Pptx, Arc::new(PlaceholderHandler::new("pptx")));
        Self {
            fetcher,
            handlers,
            max_retries,
            retry_base_delay: Duration::from_millis(500),
        }
    }

    /// Replaces the handler for one document type.
    pub fn with_handler(mut self, doc_type: DocType, handler: Arc<dyn DocumentHandler>) -> Self {
        self.handlers.insert(doc_type, handler);
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Downloads and processes one discovered document in place.
    ///
    /// Never returns an error: a failed download or extraction marks the
    /// document failed with the reason in its metadata, and the harvest
    /// moves on.
    pub async fn process(&self, doc: &mut ScrapedDocument, cancel: &CancellationToken) {
        let fetched = fetch_with_retries(
            self.fetcher.as_ref(),
            &doc.url,
            cancel,
            self.max_retries,
            self.retry_base_delay,
        )
        .await;

        let output = match fetched {
            Ok(output) => output,
            Err(err) => {
                harvest_debug!("Document download failed for {}: {}", doc.url, err);
                doc.record_failure(err.to_string());
                return;
            }
        };

        let bytes = Bytes::from(output.bytes);
        doc.content_hash = hex_digest(&bytes);
        doc.size_bytes = bytes.len() as u64;
        doc.mime_type = output
            .metadata
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_string());

        match self.handlers.get(&doc.doc_type) {
            Some(handler) => {
                doc.extraction_metadata.insert(
                    "extraction_method".into(),
                    serde_json::Value::String(handler.method().to_string()),
                );
                match handler.extract(&bytes) {
                    Ok(extraction) => {
                        doc.extraction_status = ExtractionStatus::Completed;
                        doc.extracted_text = extraction.text;
                        doc.tables_extracted = extraction.tables;
                        doc.pages = extraction.pages;
                        if extraction.language.is_some() {
                            doc.language = extraction.language;
                        }
                        doc.extraction_metadata.extend(extraction.metadata);
                    }
                    Err(err) => doc.record_failure(err.to_string()),
                }
            }
            None => {
                // No handler registered; the download alone is the result.
                doc.extraction_status = ExtractionStatus::Completed;
                doc.extraction_metadata.insert(
                    "extraction_method".into(),
                    serde_json::Value::String("none".to_string()),
                );
            }
        }
    }

    /// Whether a later pass should re-attempt this document.
    pub fn needs_retry(&self, doc: &ScrapedDocument) -> bool {
        doc.extraction_status == ExtractionStatus::Failed || !doc.is_internally_valid()
    }
}
