//! Harvest configuration.

use std::time::Duration;

use crate::lang::LangConfig;
use crate::validate::ValidationConfig;

/// Default identifying user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("content-harvester/", env!("CARGO_PKG_VERSION"));

/// Tunable behavior for a harvester instance.
///
/// The defaults describe a polite, complete harvest: formatting preserved,
/// tables and documents extracted, modest batches with a pause in between.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Keep inline formatting (links, emphasis) in markdown renderings.
    /// Default: true.
    pub preserve_formatting: bool,
    /// Emit table blocks. When false, tables are skipped entirely.
    /// Default: true.
    pub extract_tables: bool,
    /// Discover and download linked documents. Default: true.
    pub extract_documents: bool,
    /// Capture content verbatim; the only supported mode. Default: true.
    pub verbatim_only: bool,
    /// Retries after a failed fetch attempt, for transient failures only.
    /// Default: 3.
    pub max_retries: u32,
    /// Per-request timeout. Default: 30 seconds.
    pub timeout: Duration,
    /// User agent header for all requests. Default: [`DEFAULT_USER_AGENT`].
    pub user_agent: String,
    /// Accept-Language header for all requests. Default: "en".
    pub accept_language: String,
    /// Ignore cached results and re-fetch. Default: false.
    pub force_refresh: bool,
    /// How long a cached harvest stays fresh. Default: 1 hour.
    pub cache_ttl: Duration,
    /// URLs harvested concurrently within one batch chunk. Default: 5.
    pub batch_size: usize,
    /// Pause between batch chunks. Default: 1 second.
    pub delay: Duration,
    /// Validation thresholds and penalties.
    pub validation: ValidationConfig,
    /// Candidate languages for the detection fallback.
    pub lang: LangConfig,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            preserve_formatting: true,
            extract_tables: true,
            extract_documents: true,
            verbatim_only: true,
            max_retries: 3,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en".to_string(),
            force_refresh: false,
            cache_ttl: Duration::from_secs(3600),
            batch_size: 5,
            delay: Duration::from_secs(1),
            validation: ValidationConfig::default(),
            lang: LangConfig::default(),
        }
    }
}
