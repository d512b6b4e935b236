use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE, LAST_MODIFIED};
use tokio_util::sync::CancellationToken;

use harvest_core::{HarvestOptions, DEFAULT_USER_AGENT};

use crate::{FetchMetadata, FetchOutput, NetworkError, NetworkFailure};

/// Pages smaller than this are treated as fetch failures; real pages are
/// never this small, error shells sometimes are.
pub const MIN_PAGE_BODY_BYTES: u64 = 100;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Acceptable Content-Type values; an empty list allows anything.
    pub allowed_content_types: Vec<String>,
    /// Bodies below this size fail with [`NetworkFailure::ShortBody`].
    pub min_body_bytes: u64,
    pub user_agent: String,
    pub accept_language: String,
    /// First retry backoff; doubles per attempt.
    pub retry_base_delay: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            min_body_bytes: MIN_PAGE_BODY_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en".to_string(),
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl FetchSettings {
    /// Settings for fetching HTML pages, honoring the harvest options.
    pub fn for_pages(options: &HarvestOptions) -> Self {
        Self {
            request_timeout: options.timeout,
            user_agent: options.user_agent.clone(),
            accept_language: options.accept_language.clone(),
            ..Self::default()
        }
    }

    /// Settings for downloading linked documents: any content type, any
    /// plausible size, no minimum body length.
    pub fn for_documents(options: &HarvestOptions) -> Self {
        Self {
            request_timeout: options.timeout,
            max_bytes: options.validation.max_document_bytes,
            allowed_content_types: Vec::new(),
            min_body_bytes: 1,
            user_agent: options.user_agent.clone(),
            accept_language: options.accept_language.clone(),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchOutput, NetworkError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    fn build_client(
        &self,
        redirect_counter: Arc<AtomicUsize>,
    ) -> Result<reqwest::Client, NetworkError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .user_agent(&self.settings.user_agent)
            .build()
            .map_err(|err| NetworkError::new(NetworkFailure::Network, err.to_string()))
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        if self.settings.allowed_content_types.is_empty() {
            return true;
        }
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchOutput, NetworkError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| NetworkError::new(NetworkFailure::InvalidUrl, err.to_string()))?;
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(redirect_counter.clone())?;

        let request = client
            .get(parsed)
            .header(ACCEPT_LANGUAGE, &self.settings.accept_language);
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(NetworkError::new(NetworkFailure::Cancelled, "harvest cancelled"));
            }
            result = request.send() => result.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::new(
                NetworkFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(NetworkError::new(
                    NetworkFailure::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(NetworkError::new(
                    NetworkFailure::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(NetworkError::new(NetworkFailure::Cancelled, "harvest cancelled"));
                }
                chunk = stream.next() => match chunk {
                    Some(chunk) => chunk.map_err(map_reqwest_error)?,
                    None => break,
                },
            };
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(NetworkError::new(
                    NetworkFailure::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        if (bytes.len() as u64) < self.settings.min_body_bytes {
            return Err(NetworkError::new(
                NetworkFailure::ShortBody {
                    min_bytes: self.settings.min_body_bytes,
                    actual: bytes.len() as u64,
                },
                "body too short to be a real page",
            ));
        }

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            redirect_count: redirect_counter.load(Ordering::Relaxed),
            content_type,
            last_modified,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput { bytes, metadata })
    }
}

/// Fetches with bounded retries and exponential backoff.
///
/// Only transient failures are retried; `max_retries` counts retries after
/// the initial attempt.
pub async fn fetch_with_retries(
    fetcher: &dyn Fetcher,
    url: &str,
    cancel: &CancellationToken,
    max_retries: u32,
    base_delay: Duration,
) -> Result<FetchOutput, NetworkError> {
    let mut attempt = 0u32;
    loop {
        match fetcher.fetch(url, cancel).await {
            Ok(output) => return Ok(output),
            Err(err)
                if attempt < max_retries
                    && err.kind.is_transient()
                    && !cancel.is_cancelled() =>
            {
                let backoff = base_delay.saturating_mul(2u32.saturating_pow(attempt));
                log::debug!(
                    "retry {} of {max_retries} for {url} in {backoff:?}: {err}",
                    attempt + 1
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        return NetworkError::new(NetworkFailure::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return NetworkError::new(NetworkFailure::RedirectLimitExceeded, err.to_string());
    }
    NetworkError::new(NetworkFailure::Network, err.to_string())
}
