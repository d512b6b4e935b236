//! Bundle validation.
//!
//! Validation never rejects a harvest outright; it reports. Structural
//! problems become errors, content-quality observations become warnings, and
//! both feed a 0-100 score. A bundle is valid when it has no errors, even if
//! warnings remain.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::bundle::{BlockKind, BlockPayload, ExtractionStatus, ScrapeBundle};
use crate::fingerprint::is_sha256_hex;

/// Thresholds and penalties for bundle validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    /// Deducted for each missing top-level field. Default: 20.
    pub missing_field_penalty: u32,
    /// Deducted for a malformed content hash. Default: 10.
    pub bad_hash_penalty: u32,
    /// Deducted for a malformed language code. Default: 5.
    pub bad_lang_penalty: u32,
    /// Deducted per block-level error. Default: 5.
    pub block_error_penalty: u32,
    /// Deducted per document-level error. Default: 3.
    pub document_error_penalty: u32,
    /// Deducted per warning of any kind. Default: 2.
    pub warning_penalty: u32,
    /// Below this many characters of text the bundle counts as thin.
    /// Default: 500.
    pub min_text_chars: usize,
    /// Above this share of paragraph blocks the structure looks degenerate.
    /// Default: 0.9.
    pub max_paragraph_ratio: f64,
    /// Fewer domain keyword hits than this draws a warning. Default: 2.
    pub min_keyword_hits: usize,
    /// Keywords that signal on-topic content, matched case-insensitively.
    pub keywords: Vec<String>,
    /// Document sizes above this are treated as implausible.
    /// Default: 100 MB.
    pub max_document_bytes: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            missing_field_penalty: 20,
            bad_hash_penalty: 10,
            bad_lang_penalty: 5,
            block_error_penalty: 5,
            document_error_penalty: 3,
            warning_penalty: 2,
            min_text_chars: 500,
            max_paragraph_ratio: 0.9,
            min_keyword_hits: 2,
            keywords: [
                "sitzung",
                "protokoll",
                "beschluss",
                "vorlage",
                "antrag",
                "council",
                "meeting",
                "minutes",
                "agenda",
                "decision",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
            max_document_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Outcome of validating one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True when no errors were found; warnings do not affect validity.
    pub is_valid: bool,
    /// Structural problems.
    pub errors: Vec<String>,
    /// Content-quality observations.
    pub warnings: Vec<String>,
    /// 100 minus all penalties, floored at 0.
    pub score: u8,
}

/// Checks bundles for structural and content-quality problems.
#[derive(Debug, Clone, Default)]
pub struct BundleValidator {
    config: ValidationConfig,
}

impl BundleValidator {
    /// A validator with the given thresholds.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validates a bundle, returning all findings and a score.
    pub fn validate(&self, bundle: &ScrapeBundle) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut penalty = 0u32;

        self.check_top_level(bundle, &mut errors, &mut penalty);
        self.check_blocks(bundle, &mut errors, &mut warnings, &mut penalty);
        self.check_documents(bundle, &mut errors, &mut warnings, &mut penalty);
        self.check_quality(bundle, &mut warnings, &mut penalty);

        let score = 100u32.saturating_sub(penalty).min(100) as u8;
        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            score,
        }
    }

    fn check_top_level(&self, bundle: &ScrapeBundle, errors: &mut Vec<String>, penalty: &mut u32) {
        if bundle.id.is_empty() {
            errors.push("bundle is missing its id".to_string());
            *penalty += self.config.missing_field_penalty;
        }
        if !bundle.source.is_complete() {
            errors.push("bundle source has no origin".to_string());
            *penalty += self.config.missing_field_penalty;
        }
        if bundle.lang.is_empty() {
            errors.push("bundle is missing its language".to_string());
            *penalty += self.config.missing_field_penalty;
        } else if !is_iso_639_1(&bundle.lang) {
            errors.push(format!(
                "language '{}' is not a two-letter lowercase code",
                bundle.lang
            ));
            *penalty += self.config.bad_lang_penalty;
        }
        if bundle.content_hash.is_empty() {
            errors.push("bundle is missing its content hash".to_string());
            *penalty += self.config.missing_field_penalty;
        } else if !is_sha256_hex(&bundle.content_hash) {
            errors.push("content hash is not 64 lowercase hex characters".to_string());
            *penalty += self.config.bad_hash_penalty;
        }
    }

    fn check_blocks(
        &self,
        bundle: &ScrapeBundle,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
        penalty: &mut u32,
    ) {
        let mut seen_ids = HashSet::new();
        for (index, block) in bundle.blocks.iter().enumerate() {
            let label = if block.id.is_empty() {
                format!("block at index {index}")
            } else {
                format!("block {}", block.id)
            };

            if block.id.is_empty() {
                errors.push(format!("{label} has an empty id"));
                *penalty += self.config.block_error_penalty;
            } else if !seen_ids.insert(block.id.clone()) {
                errors.push(format!("duplicate block id {}", block.id));
                *penalty += self.config.block_error_penalty;
            }

            if !block.source_ref.is_complete() {
                errors.push(format!("{label} has an incomplete source reference"));
                *penalty += self.config.block_error_penalty;
            }

            match &block.payload {
                BlockPayload::Heading { level, text } => {
                    if !(1..=6).contains(level) {
                        errors.push(format!("{label} has heading level {level} outside 1-6"));
                        *penalty += self.config.block_error_penalty;
                    }
                    if text.trim().is_empty() {
                        errors.push(format!("{label} is a heading with no text"));
                        *penalty += self.config.block_error_penalty;
                    }
                }
                BlockPayload::Paragraph => {
                    if block.plain_text.trim().is_empty() {
                        warnings.push(format!("{label} is an empty paragraph"));
                        *penalty += self.config.warning_penalty;
                    }
                }
                BlockPayload::List { items, .. } => {
                    if items.is_empty() {
                        errors.push(format!("{label} is a list with no items"));
                        *penalty += self.config.block_error_penalty;
                    } else if items.iter().any(|item| item.trim().is_empty()) {
                        errors.push(format!("{label} contains empty list items"));
                        *penalty += self.config.block_error_penalty;
                    }
                }
                BlockPayload::Table { columns, rows, .. } => {
                    if columns.is_empty() {
                        errors.push(format!("{label} is a table with no columns"));
                        *penalty += self.config.block_error_penalty;
                    } else {
                        let ragged = rows.iter().filter(|row| row.len() != columns.len()).count();
                        if ragged > 0 {
                            warnings.push(format!(
                                "{label} has {ragged} rows not matching its {} columns",
                                columns.len()
                            ));
                            *penalty += self.config.warning_penalty;
                        }
                    }
                }
            }

            if block.html_content.trim().is_empty()
                && block.markdown_content.trim().is_empty()
                && block.plain_text.trim().is_empty()
            {
                warnings.push(format!("{label} has no content in any rendering"));
                *penalty += self.config.warning_penalty;
            }
        }
    }

    fn check_documents(
        &self,
        bundle: &ScrapeBundle,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
        penalty: &mut u32,
    ) {
        let mut by_hash: HashMap<&str, Vec<&str>> = HashMap::new();
        for (index, doc) in bundle.documents.iter().enumerate() {
            let label = if doc.id.is_empty() {
                format!("document at index {index}")
            } else {
                format!("document {}", doc.id)
            };

            if doc.id.is_empty() || doc.name.is_empty() || doc.url.is_empty() {
                errors.push(format!("{label} is missing required fields"));
                *penalty += self.config.document_error_penalty;
            }
            if !doc.content_hash.is_empty() && !is_sha256_hex(&doc.content_hash) {
                errors.push(format!("{label} has a malformed content hash"));
                *penalty += self.config.document_error_penalty;
            }
            match doc.extraction_status {
                ExtractionStatus::Completed => {
                    if doc.content_hash.is_empty() {
                        errors.push(format!("{label} is completed but has no content hash"));
                        *penalty += self.config.document_error_penalty;
                    }
                }
                ExtractionStatus::Failed => {
                    if !doc.extraction_metadata.contains_key("error") {
                        errors.push(format!("{label} failed but carries no error details"));
                        *penalty += self.config.document_error_penalty;
                    }
                }
                ExtractionStatus::Pending => {}
            }
            if doc.size_bytes > self.config.max_document_bytes {
                errors.push(format!(
                    "{label} is implausibly large ({} bytes)",
                    doc.size_bytes
                ));
                *penalty += self.config.document_error_penalty;
            }
            if !doc.content_hash.is_empty() {
                by_hash.entry(&doc.content_hash).or_default().push(&doc.id);
            }
        }

        for (hash, ids) in by_hash {
            if ids.len() > 1 {
                warnings.push(format!(
                    "documents {} share content hash {}",
                    ids.join(", "),
                    &hash[..hash.len().min(8)]
                ));
                *penalty += self.config.warning_penalty;
            }
        }
    }

    fn check_quality(&self, bundle: &ScrapeBundle, warnings: &mut Vec<String>, penalty: &mut u32) {
        let total_chars = bundle.total_plain_text_chars();
        if total_chars < self.config.min_text_chars {
            warnings.push(format!(
                "bundle has thin content ({total_chars} characters of text)"
            ));
            *penalty += self.config.warning_penalty;
        }

        let tables = bundle
            .blocks
            .iter()
            .filter(|b| b.payload.kind() == BlockKind::Table)
            .count();
        if !bundle.documents.is_empty() && tables == 0 {
            warnings.push("documents are linked but no tables were extracted".to_string());
            *penalty += self.config.warning_penalty;
        }

        if !bundle.blocks.is_empty() {
            let paragraphs = bundle
                .blocks
                .iter()
                .filter(|b| b.payload.kind() == BlockKind::Paragraph)
                .count();
            let ratio = paragraphs as f64 / bundle.blocks.len() as f64;
            if ratio > self.config.max_paragraph_ratio {
                warnings.push(format!(
                    "{paragraphs} of {} blocks are paragraphs; structure may be lost",
                    bundle.blocks.len()
                ));
                *penalty += self.config.warning_penalty;
            }
        }

        let text = bundle.concatenated_plain_text().to_lowercase();
        let hits: usize = self
            .config
            .keywords
            .iter()
            .map(|keyword| text.matches(keyword.as_str()).count())
            .sum();
        if hits < self.config.min_keyword_hits {
            warnings.push(format!("only {hits} domain keyword hits in the content"));
            *penalty += self.config.warning_penalty;
        }
    }
}

fn is_iso_639_1(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_lowercase())
}
