//! Harvester engine: fetch pipeline, content extraction, and persistence.
mod blocks;
mod decode;
mod documents;
mod fetch;
mod harvester;
mod persist;
mod sanitize;
mod types;
mod walk;

pub use blocks::BlockBuilder;
pub use decode::{decode_page, DecodeError, DecodedPage};
pub use documents::{
    discover_documents, DocumentExtraction, DocumentFetcher, DocumentHandler, ExtractionError,
    PlaceholderHandler,
};
pub use fetch::{
    fetch_with_retries, FetchSettings, Fetcher, ReqwestFetcher, MIN_PAGE_BODY_BYTES,
};
pub use harvester::{Harvested, Harvester};
pub use persist::{bundle_filename, ensure_output_dir, AtomicFileWriter, PersistError};
pub use sanitize::{clean_html, extract_text, has_meaningful_content, html_to_markdown};
pub use types::{
    ChannelSink, FetchMetadata, FetchOutput, HarvestError, HarvestEvent, LogSink, NetworkError,
    NetworkFailure, NullSink, ProgressSink, Stage,
};
pub use walk::{
    collect_content_nodes, select_primary_container, ContentNode, NodeKind, WalkOptions,
};
