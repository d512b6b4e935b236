//! The harvest pipeline: fetch, decode, extract, document download,
//! fingerprint, validate.
//!
//! A [`Harvester`] owns its HTTP clients, result cache, and cancellation
//! token; nothing here is global state. Single URLs go through
//! [`Harvester::harvest`], batches through [`Harvester::harvest_many`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use scraper::Html;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use harvest_core::{
    content_fingerprint, detect_language, is_sha256_hex, normalize_lang_attr, normalize_url,
    BundleMetadata, BundleValidator, ContentBlock, HarvestOptions, ScrapeBundle, ScrapedDocument,
    SourceReference, ValidationReport,
};
use harvest_logging::{harvest_debug, harvest_info, harvest_warn};

use crate::blocks::BlockBuilder;
use crate::decode::decode_page;
use crate::documents::{discover_documents, DocumentFetcher};
use crate::fetch::{fetch_with_retries, FetchSettings, Fetcher, ReqwestFetcher};
use crate::types::{HarvestError, HarvestEvent, LogSink, ProgressSink, Stage};
use crate::walk::{collect_content_nodes, select_primary_container, WalkOptions};

/// One finished harvest: the bundle plus its validation outcome.
#[derive(Debug, Clone)]
pub struct Harvested {
    pub bundle: ScrapeBundle,
    pub validation: ValidationReport,
    /// True when the result was served from this harvester's cache.
    pub from_cache: bool,
}

struct CachedHarvest {
    bundle: ScrapeBundle,
    validation: ValidationReport,
    stored_at: Instant,
}

/// Harvests web pages into validated content bundles.
pub struct Harvester {
    options: HarvestOptions,
    fetcher: Arc<dyn Fetcher>,
    documents: DocumentFetcher,
    validator: BundleValidator,
    sink: Arc<dyn ProgressSink>,
    cache: Mutex<HashMap<String, CachedHarvest>>,
    session_id: String,
    cancel: CancellationToken,
    retry_base_delay: Duration,
}

impl Harvester {
    /// A harvester with real HTTP clients wired from the options.
    pub fn new(options: HarvestOptions) -> Self {
        let fetcher: Arc<dyn Fetcher> =
            Arc::new(ReqwestFetcher::new(FetchSettings::for_pages(&options)));
        let document_fetcher: Arc<dyn Fetcher> =
            Arc::new(ReqwestFetcher::new(FetchSettings::for_documents(&options)));
        let documents = DocumentFetcher::new(document_fetcher, options.max_retries);
        let validator = BundleValidator::new(options.validation.clone());
        Self {
            options,
            fetcher,
            documents,
            validator,
            sink: Arc::new(LogSink),
            cache: Mutex::new(HashMap::new()),
            session_id: Uuid::new_v4().to_string(),
            cancel: CancellationToken::new(),
            retry_base_delay: FetchSettings::default().retry_base_delay,
        }
    }

    /// Replaces the page fetcher.
    pub fn with_page_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Replaces the document downloader.
    pub fn with_document_fetcher(mut self, documents: DocumentFetcher) -> Self {
        self.documents = documents;
        self
    }

    /// Replaces the progress sink; the default only logs.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Shrinks the first retry backoff for both pages and documents.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self.documents = self.documents.with_retry_base_delay(delay);
        self
    }

    pub fn options(&self) -> &HarvestOptions {
        &self.options
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Token that aborts in-flight fetches when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Harvests one URL into a validated bundle.
    ///
    /// A fresh cached result is returned without touching the network
    /// unless the options force a refresh.
    pub async fn harvest(&self, url: &str) -> Result<Harvested, HarvestError> {
        let run_id = Uuid::new_v4().to_string();
        harvest_logging::set_run_id(&run_id);
        self.harvest_with_run(url, &run_id).await
    }

    /// Harvests a list of URLs in polite chunks.
    ///
    /// Each chunk of `batch_size` URLs runs concurrently, with a pause
    /// between chunks. A failed URL is logged and dropped; the remaining
    /// results come back in input order.
    pub async fn harvest_many(&self, urls: &[String]) -> Vec<Harvested> {
        let run_id = Uuid::new_v4().to_string();
        harvest_logging::set_run_id(&run_id);
        let chunk_size = self.options.batch_size.max(1);
        let chunk_count = urls.len().div_ceil(chunk_size);
        let mut results = Vec::with_capacity(urls.len());

        for (index, chunk) in urls.chunks(chunk_size).enumerate() {
            if self.cancel.is_cancelled() {
                harvest_info!(
                    "Batch cancelled after {} of {} URLs",
                    results.len(),
                    urls.len()
                );
                break;
            }

            let outcomes =
                join_all(chunk.iter().map(|url| self.harvest_with_run(url, &run_id))).await;
            for (url, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    Ok(harvested) => results.push(harvested),
                    Err(err) => harvest_warn!("Skipping {url}: {err}"),
                }
            }

            let is_last = index + 1 == chunk_count;
            if !is_last && !self.options.delay.is_zero() {
                self.sink.emit(HarvestEvent::ChunkDelay {
                    millis: self.options.delay.as_millis() as u64,
                });
                tokio::time::sleep(self.options.delay).await;
            }
        }
        results
    }

    async fn harvest_with_run(&self, url: &str, run_id: &str) -> Result<Harvested, HarvestError> {
        match self.harvest_inner(url, run_id).await {
            Ok(harvested) => {
                self.sink.emit(HarvestEvent::UrlCompleted {
                    url: url.to_string(),
                    blocks: harvested.bundle.blocks.len(),
                    documents: harvested.bundle.documents.len(),
                    score: harvested.validation.score,
                    from_cache: harvested.from_cache,
                });
                Ok(harvested)
            }
            Err(err) => {
                self.sink.emit(HarvestEvent::UrlFailed {
                    url: url.to_string(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn harvest_inner(&self, url: &str, run_id: &str) -> Result<Harvested, HarvestError> {
        let normalized = normalize_url(url);

        if !self.options.force_refresh {
            if let Some(cached) = self.cached(&normalized) {
                harvest_debug!("Cache hit for {normalized}");
                return Ok(cached);
            }
        }

        self.stage(url, Stage::Fetching);
        let output = fetch_with_retries(
            self.fetcher.as_ref(),
            &normalized,
            &self.cancel,
            self.options.max_retries,
            self.retry_base_delay,
        )
        .await
        .map_err(|source| HarvestError::Fetch {
            url: normalized.clone(),
            source,
        })?;
        self.sink.emit(HarvestEvent::PageFetched {
            url: url.to_string(),
            final_url: output.metadata.final_url.clone(),
            bytes: output.metadata.byte_len,
        });

        self.stage(url, Stage::Decoding);
        let decoded = decode_page(&output.bytes, output.metadata.content_type.as_deref())?;

        self.stage(url, Stage::Extracting);
        let page_url = output.metadata.final_url.clone();
        let mut extracted = extract_page(&decoded.html, &page_url, &self.options);

        if self.options.extract_documents && !extracted.documents.is_empty() {
            self.stage(url, Stage::Documents);
            for doc in &mut extracted.documents {
                self.documents.process(doc, &self.cancel).await;
                self.sink.emit(HarvestEvent::DocumentProcessed {
                    url: doc.url.clone(),
                    name: doc.name.clone(),
                    status: doc.extraction_status,
                });
            }
        }

        let lang = match extracted.lang_attr {
            Some(code) => code,
            None => {
                let text: Vec<&str> = extracted
                    .blocks
                    .iter()
                    .map(|b| b.plain_text.as_str())
                    .collect();
                detect_language(&text.join("\n"), &self.options.lang)
            }
        };

        self.stage(url, Stage::Hashing);
        let content_hash = content_fingerprint(&extracted.blocks, &extracted.documents);
        let last_modified = output
            .metadata
            .last_modified
            .as_deref()
            .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let bundle = ScrapeBundle {
            id: Uuid::new_v4().to_string(),
            source: SourceReference::webpage(&page_url),
            lang,
            content_hash,
            last_modified,
            blocks: extracted.blocks,
            documents: extracted.documents,
            metadata: BundleMetadata {
                harvester_version: env!("CARGO_PKG_VERSION").to_string(),
                harvested_at: Utc::now(),
                run_id: run_id.to_string(),
                session_id: self.session_id.clone(),
                normalized_url: normalized.clone(),
            },
        };
        if !bundle.source.is_complete() || !is_sha256_hex(&bundle.content_hash) {
            return Err(HarvestError::Construction(
                "bundle is missing its source or content hash".into(),
            ));
        }

        self.stage(url, Stage::Validating);
        let validation = self.validator.validate(&bundle);
        if !validation.is_valid {
            harvest_warn!(
                "Validation found {} errors for {page_url} (score {})",
                validation.errors.len(),
                validation.score
            );
        }
        self.stage(url, Stage::Done);

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                normalized,
                CachedHarvest {
                    bundle: bundle.clone(),
                    validation: validation.clone(),
                    stored_at: Instant::now(),
                },
            );
        }

        Ok(Harvested {
            bundle,
            validation,
            from_cache: false,
        })
    }

    fn cached(&self, normalized: &str) -> Option<Harvested> {
        let cache = self.cache.lock().ok()?;
        let entry = cache.get(normalized)?;
        if entry.stored_at.elapsed() > self.options.cache_ttl {
            return None;
        }
        Some(Harvested {
            bundle: entry.bundle.clone(),
            validation: entry.validation.clone(),
            from_cache: true,
        })
    }

    fn stage(&self, url: &str, stage: Stage) {
        self.sink.emit(HarvestEvent::StageChanged {
            url: url.to_string(),
            stage,
        });
    }
}

struct PageExtract {
    blocks: Vec<ContentBlock>,
    documents: Vec<ScrapedDocument>,
    lang_attr: Option<String>,
}

// Parsing and extraction stay synchronous so the non-Send DOM types never
// live across an await point.
fn extract_page(html: &str, page_url: &str, options: &HarvestOptions) -> PageExtract {
    let document = Html::parse_document(html);
    let lang_attr = document
        .root_element()
        .value()
        .attr("lang")
        .and_then(normalize_lang_attr);

    let container = select_primary_container(&document);
    let nodes = collect_content_nodes(
        container,
        WalkOptions {
            include_tables: options.extract_tables,
        },
    );
    let builder = BlockBuilder::new(options.preserve_formatting);
    let blocks = nodes
        .into_iter()
        .enumerate()
        .map(|(index, node)| builder.build(node, &format!("block-{}", index + 1), page_url))
        .collect();

    let documents = if options.extract_documents {
        let base = Url::parse(page_url).ok();
        discover_documents(&document, base.as_ref(), page_url)
    } else {
        Vec::new()
    };

    PageExtract {
        blocks,
        documents,
        lang_attr,
    }
}
