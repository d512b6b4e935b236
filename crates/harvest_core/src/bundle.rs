//! The harvested-content data model.
//!
//! A [`ScrapeBundle`] is the unit of output for one harvested page: an ordered
//! list of typed content blocks, the documents linked from the page, and
//! provenance metadata. Everything here serializes to the bundle JSON shape
//! written to disk.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Marker for content captured without paraphrase or summarization.
///
/// Serializes as the JSON literal `true` and refuses to deserialize from
/// anything else, so a bundle can never claim non-verbatim content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verbatim;

impl Serialize for Verbatim {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(true)
    }
}

impl<'de> Deserialize<'de> for Verbatim {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if bool::deserialize(deserializer)? {
            Ok(Verbatim)
        } else {
            Err(D::Error::custom("verbatim must be true"))
        }
    }
}

/// Where a piece of content came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    /// The page or file the content was taken from.
    #[serde(flatten)]
    pub target: SourceTarget,
    /// Structural path of the element within the source, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub selector: Option<String>,
    /// When the content was captured.
    pub timestamp: DateTime<Utc>,
}

/// The concrete origin behind a [`SourceReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceTarget {
    /// Content taken from a fetched web page.
    Webpage {
        /// Full URL of the page.
        url: String,
    },
    /// Content taken from inside a downloaded document.
    Document {
        /// File name of the document.
        filename: String,
        /// Page within the document, for paginated formats.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        page_number: Option<u32>,
    },
}

impl SourceReference {
    /// Reference to a web page, stamped with the current time.
    pub fn webpage(url: impl Into<String>) -> Self {
        Self {
            target: SourceTarget::Webpage { url: url.into() },
            selector: None,
            timestamp: Utc::now(),
        }
    }

    /// Reference to a location inside a downloaded document.
    pub fn document(filename: impl Into<String>, page_number: Option<u32>) -> Self {
        Self {
            target: SourceTarget::Document {
                filename: filename.into(),
                page_number,
            },
            selector: None,
            timestamp: Utc::now(),
        }
    }

    /// Attaches a structural selector path.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// The page URL, if this reference points at a web page.
    pub fn url(&self) -> Option<&str> {
        match &self.target {
            SourceTarget::Webpage { url } => Some(url),
            SourceTarget::Document { .. } => None,
        }
    }

    /// True when the target identifies its origin (non-empty url or filename).
    pub fn is_complete(&self) -> bool {
        match &self.target {
            SourceTarget::Webpage { url } => !url.is_empty(),
            SourceTarget::Document { filename, .. } => !filename.is_empty(),
        }
    }
}

/// Structural category of a content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// A heading element (h1-h6).
    Heading,
    /// A paragraph or free text run.
    Paragraph,
    /// An ordered or unordered list.
    List,
    /// A data table.
    Table,
}

impl BlockKind {
    /// Lowercase name as it appears in bundle JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Heading => "heading",
            BlockKind::Paragraph => "paragraph",
            BlockKind::List => "list",
            BlockKind::Table => "table",
        }
    }
}

/// Type-specific payload of a content block.
///
/// Flattened into the block object under a `type` tag, so a heading block
/// serializes as `{"type": "heading", "level": 1, "text": "..."}` alongside
/// the common fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockPayload {
    /// Heading with its level (1-6) and text.
    Heading {
        /// Heading depth, 1 for h1 through 6 for h6.
        level: u8,
        /// The heading text.
        text: String,
    },
    /// Paragraph; the text lives in the common renderings.
    Paragraph,
    /// List with ordering flag and item texts.
    List {
        /// True for `<ol>`, false for `<ul>`.
        ordered: bool,
        /// Item texts in document order.
        items: Vec<String>,
    },
    /// Table with column names and cell rows.
    Table {
        /// Column header names.
        columns: Vec<String>,
        /// Cell rows as captured; may be ragged relative to `columns`.
        rows: Vec<Vec<String>>,
        /// Table caption, when present.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        caption: Option<String>,
    },
}

impl BlockPayload {
    /// The structural category of this payload.
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockPayload::Heading { .. } => BlockKind::Heading,
            BlockPayload::Paragraph => BlockKind::Paragraph,
            BlockPayload::List { .. } => BlockKind::List,
            BlockPayload::Table { .. } => BlockKind::Table,
        }
    }

    /// Table rows normalized to the column count, padding short rows with
    /// empty cells and truncating long ones. `None` for non-table payloads.
    ///
    /// The stored `rows` keep the cells exactly as captured; consumers that
    /// need a rectangular grid use this view instead.
    pub fn padded_rows(&self) -> Option<Vec<Vec<String>>> {
        let BlockPayload::Table { columns, rows, .. } = self else {
            return None;
        };
        let width = columns.len();
        Some(
            rows.iter()
                .map(|row| {
                    let mut padded = row.clone();
                    padded.resize(width, String::new());
                    padded
                })
                .collect(),
        )
    }
}

/// One extracted unit of page content with three parallel renderings.
///
/// The renderings are all derived from the same captured data: `plain_text`
/// is the normalized text, `markdown_content` its markdown form, and
/// `html_content` the cleaned structural markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Stable id within the bundle, `block-1`, `block-2`, ...
    pub id: String,
    /// The typed payload, flattened into this object under `type`.
    #[serde(flatten)]
    pub payload: BlockPayload,
    /// Always the literal `true`; content is captured verbatim.
    pub verbatim: Verbatim,
    /// Cleaned HTML rendering of the block.
    pub html_content: String,
    /// Markdown rendering of the block.
    pub markdown_content: String,
    /// Plain text rendering with whitespace collapsed.
    pub plain_text: String,
    /// Where the block was captured from.
    pub source_ref: SourceReference,
}

/// File format of a linked document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    /// PDF document.
    Pdf,
    /// Word document (.docx).
    Docx,
    /// Excel workbook (.xlsx).
    Xlsx,
    /// PowerPoint presentation (.pptx).
    Pptx,
    /// Recognized but legacy or uncategorized format.
    Other,
}

impl DocType {
    /// Maps a lowercase file extension to a document type.
    ///
    /// Returns `None` for extensions that are not treated as documents at
    /// all; legacy office extensions map to [`DocType::Other`].
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(DocType::Pdf),
            "docx" => Some(DocType::Docx),
            "xlsx" => Some(DocType::Xlsx),
            "pptx" => Some(DocType::Pptx),
            "doc" | "xls" | "ppt" => Some(DocType::Other),
            _ => None,
        }
    }

    /// Lowercase name as it appears in bundle JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            DocType::Pdf => "pdf",
            DocType::Docx => "docx",
            DocType::Xlsx => "xlsx",
            DocType::Pptx => "pptx",
            DocType::Other => "other",
        }
    }
}

/// Lifecycle state of a document's content extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    /// Discovered but not yet downloaded.
    Pending,
    /// Downloaded and processed.
    Completed,
    /// Download or extraction failed; details in `extraction_metadata`.
    Failed,
}

impl ExtractionStatus {
    /// Lowercase name as it appears in bundle JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionStatus::Pending => "pending",
            ExtractionStatus::Completed => "completed",
            ExtractionStatus::Failed => "failed",
        }
    }
}

/// A document linked from a harvested page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedDocument {
    /// Stable id within the bundle, `doc-1`, `doc-2`, ...
    pub id: String,
    /// Display name, from the anchor text or the URL file name.
    pub name: String,
    /// File format, from the URL extension.
    #[serde(rename = "type")]
    pub doc_type: DocType,
    /// Absolute URL of the document.
    pub url: String,
    /// SHA-256 of the raw bytes; empty until downloaded.
    pub content_hash: String,
    /// Size of the raw bytes; zero until downloaded.
    pub size_bytes: u64,
    /// MIME type reported by the server.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mime_type: Option<String>,
    /// Language of the document content, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
    /// Page count, for paginated formats.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pages: Option<u32>,
    /// Text extracted from the document body.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub extracted_text: Option<String>,
    /// Number of tables extracted from the document.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tables_extracted: Option<u32>,
    /// Where extraction stands for this document.
    pub extraction_status: ExtractionStatus,
    /// Free-form diagnostics; always populated on failure.
    #[serde(default)]
    pub extraction_metadata: serde_json::Map<String, serde_json::Value>,
    /// The page the document was discovered on.
    pub source_ref: SourceReference,
}

impl ScrapedDocument {
    /// A freshly discovered document awaiting download.
    pub fn pending(
        id: impl Into<String>,
        name: impl Into<String>,
        doc_type: DocType,
        url: impl Into<String>,
        source_ref: SourceReference,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            doc_type,
            url: url.into(),
            content_hash: String::new(),
            size_bytes: 0,
            mime_type: None,
            language: None,
            pages: None,
            extracted_text: None,
            tables_extracted: None,
            extraction_status: ExtractionStatus::Pending,
            extraction_metadata: serde_json::Map::new(),
            source_ref,
        }
    }

    /// Marks the document failed and records the error with a timestamp.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.extraction_status = ExtractionStatus::Failed;
        self.extraction_metadata
            .insert("error".into(), serde_json::Value::String(error.into()));
        self.extraction_metadata.insert(
            "failed_at".into(),
            serde_json::Value::String(Utc::now().to_rfc3339()),
        );
    }

    /// Whether this document's own fields are coherent.
    ///
    /// Requires a non-empty name and url; a completed document must carry a
    /// well-formed hash and a positive size, and a failed one must carry an
    /// error in its metadata.
    pub fn is_internally_valid(&self) -> bool {
        if self.name.is_empty() || self.url.is_empty() {
            return false;
        }
        match self.extraction_status {
            ExtractionStatus::Pending => true,
            ExtractionStatus::Completed => {
                crate::is_sha256_hex(&self.content_hash) && self.size_bytes > 0
            }
            ExtractionStatus::Failed => self.extraction_metadata.contains_key("error"),
        }
    }
}

/// Provenance metadata attached to every bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMetadata {
    /// Version of the harvester that produced the bundle.
    pub harvester_version: String,
    /// When the harvest finished.
    pub harvested_at: DateTime<Utc>,
    /// Id shared by all bundles of one batch run.
    pub run_id: String,
    /// Id of the harvester instance that produced the bundle.
    pub session_id: String,
    /// The page URL in normalized form, as used for caching.
    pub normalized_url: String,
}

/// Everything harvested from one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeBundle {
    /// Unique bundle id.
    pub id: String,
    /// The harvested page.
    pub source: SourceReference,
    /// ISO 639-1 language code of the page content.
    pub lang: String,
    /// Semantic fingerprint over block and document content.
    pub content_hash: String,
    /// When the page content last changed, from the server when reported.
    pub last_modified: DateTime<Utc>,
    /// Content blocks in document order.
    pub blocks: Vec<ContentBlock>,
    /// Linked documents in discovery order.
    pub documents: Vec<ScrapedDocument>,
    /// Provenance details.
    pub metadata: BundleMetadata,
}

impl ScrapeBundle {
    /// Total character count over all block plain texts.
    pub fn total_plain_text_chars(&self) -> usize {
        self.blocks.iter().map(|b| b.plain_text.chars().count()).sum()
    }

    /// All block plain texts joined with newlines.
    pub fn concatenated_plain_text(&self) -> String {
        let mut text = String::new();
        for block in &self.blocks {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&block.plain_text);
        }
        text
    }
}
