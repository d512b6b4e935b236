//! Harvest core: pure bundle model, validation, and fingerprinting.
mod bundle;
mod fingerprint;
mod lang;
mod options;
mod urlnorm;
mod validate;

pub use bundle::{
    BlockKind, BlockPayload, BundleMetadata, ContentBlock, DocType, ExtractionStatus,
    ScrapeBundle, ScrapedDocument, SourceReference, SourceTarget, Verbatim,
};
pub use fingerprint::{content_fingerprint, hex_digest, is_sha256_hex};
pub use lang::{detect_language, normalize_lang_attr, LangConfig, LangProfile};
pub use options::{HarvestOptions, DEFAULT_USER_AGENT};
pub use urlnorm::normalize_url;
pub use validate::{BundleValidator, ValidationConfig, ValidationReport};
