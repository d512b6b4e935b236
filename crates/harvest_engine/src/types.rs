use std::fmt;

use harvest_core::ExtractionStatus;

/// Pipeline stage of a single URL harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Decoding,
    Extracting,
    Documents,
    Hashing,
    Validating,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Decoding => "decoding",
            Stage::Extracting => "extracting",
            Stage::Documents => "documents",
            Stage::Hashing => "hashing",
            Stage::Validating => "validating",
            Stage::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Progress notifications emitted while harvesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    /// The harvest of `url` entered a new pipeline stage.
    StageChanged { url: String, stage: Stage },
    /// The page body arrived; `final_url` reflects any redirects.
    PageFetched {
        url: String,
        final_url: String,
        bytes: u64,
    },
    /// A linked document finished downloading and extraction.
    DocumentProcessed {
        url: String,
        name: String,
        status: ExtractionStatus,
    },
    /// The harvest of `url` produced a bundle.
    UrlCompleted {
        url: String,
        blocks: usize,
        documents: usize,
        score: u8,
        from_cache: bool,
    },
    /// The harvest of `url` failed; the URL is skipped, not the run.
    UrlFailed { url: String, error: String },
    /// The batch loop is pausing between chunks.
    ChunkDelay { millis: u64 },
}

/// Receives [`HarvestEvent`]s as they happen.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Forwards events into an mpsc channel, for consumers with their own loop.
pub struct ChannelSink {
    tx: std::sync::mpsc::Sender<HarvestEvent>,
}

impl ChannelSink {
    pub fn new(tx: std::sync::mpsc::Sender<HarvestEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: HarvestEvent) {
        let _ = self.tx.send(event);
    }
}

/// Writes events to the log and nothing else; the default sink.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, event: HarvestEvent) {
        match event {
            HarvestEvent::StageChanged { url, stage } => {
                log::debug!("{url}: {stage}");
            }
            HarvestEvent::PageFetched {
                url,
                final_url,
                bytes,
            } => {
                if url == final_url {
                    log::debug!("{url}: fetched {bytes} bytes");
                } else {
                    log::debug!("{url}: fetched {bytes} bytes via {final_url}");
                }
            }
            HarvestEvent::DocumentProcessed { url, name, status } => {
                log::debug!("{url}: document '{name}' {}", status.as_str());
            }
            HarvestEvent::UrlCompleted {
                url,
                blocks,
                documents,
                score,
                from_cache,
            } => {
                let origin = if from_cache { " (cached)" } else { "" };
                log::info!("{url}: {blocks} blocks, {documents} documents, score {score}{origin}");
            }
            HarvestEvent::UrlFailed { url, error } => {
                log::warn!("{url}: failed: {error}");
            }
            HarvestEvent::ChunkDelay { millis } => {
                log::debug!("pausing {millis}ms before next chunk");
            }
        }
    }
}

/// Discards all events.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: HarvestEvent) {}
}

/// Raw bytes of a fetched resource plus transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

/// Transport details of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    /// Last-Modified header value, verbatim, when the server sent one.
    pub last_modified: Option<String>,
    pub byte_len: u64,
}

/// A failed fetch, with the failure classified for retry decisions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct NetworkError {
    pub kind: NetworkFailure,
    pub message: String,
}

impl NetworkError {
    pub(crate) fn new(kind: NetworkFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// What went wrong with a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkFailure {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    /// Body arrived but is too small to be a real page.
    ShortBody { min_bytes: u64, actual: u64 },
    Cancelled,
    Network,
}

impl NetworkFailure {
    /// True for failures that may succeed on retry: timeouts, transport
    /// errors, and server errors. Client errors and policy violations
    /// (too large, wrong content type) stay failed.
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkFailure::Timeout | NetworkFailure::Network => true,
            NetworkFailure::HttpStatus(code) => *code >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for NetworkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFailure::InvalidUrl => write!(f, "invalid url"),
            NetworkFailure::HttpStatus(code) => write!(f, "http status {code}"),
            NetworkFailure::Timeout => write!(f, "timeout"),
            NetworkFailure::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            NetworkFailure::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            NetworkFailure::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            NetworkFailure::ShortBody { min_bytes, actual } => {
                write!(f, "body too short ({actual} bytes, minimum {min_bytes})")
            }
            NetworkFailure::Cancelled => write!(f, "cancelled"),
            NetworkFailure::Network => write!(f, "network error"),
        }
    }
}

/// A harvest that could not produce a bundle.
///
/// Per-document failures never surface here; they are recorded on the
/// document inside the bundle.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("fetch of {url} failed: {source}")]
    Fetch {
        url: String,
        source: NetworkError,
    },
    #[error(transparent)]
    Decode(#[from] crate::decode::DecodeError),
    #[error("bundle construction failed: {0}")]
    Construction(String),
    #[error(transparent)]
    Persist(#[from] crate::persist::PersistError),
}
