//! The pipeline-wide error taxonomy. Every stage returns `Result<_,
//! PipelineError>`; the driver is the only place that catches, logs,
//! cancels siblings and maps to a process exit code.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required input file or directory is missing.
    #[error("required input missing: {detail}")]
    InputMissing { detail: String },

    /// An input file could not be parsed at all (unlike a single
    /// malformed record, which is counted and skipped).
    #[error("input file malformed: {detail}")]
    InputMalformedFile { detail: String },

    /// A sibling stage failed, or the driver was asked to stop; this
    /// run produced no output and nothing was published.
    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value exceeded the bounds the data model guarantees (e.g. an
    /// entity id or a view count outside the signed 64-bit range).
    /// Always a bug, never a soft failure.
    #[error("overflow: {detail}")]
    Overflow { detail: String },

    #[error("storage error: {0}")]
    Storage(String),
}

/// Per-kind counts of malformed records that were skipped rather than
/// failing the whole stage. Logged once at stage completion.
#[derive(Debug, Default)]
pub struct Counters {
    malformed_sitelinks: AtomicU64,
    malformed_pageviews: AtomicU64,
    unmapped_wiki_codes: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_malformed_sitelink(&self) {
        self.malformed_sitelinks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed_pageview(&self) {
        self.malformed_pageviews.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unmapped_wiki_code(&self) {
        self.unmapped_wiki_codes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed_sitelinks(&self) -> u64 {
        self.malformed_sitelinks.load(Ordering::Relaxed)
    }

    pub fn malformed_pageviews(&self) -> u64 {
        self.malformed_pageviews.load(Ordering::Relaxed)
    }

    pub fn unmapped_wiki_codes(&self) -> u64 {
        self.unmapped_wiki_codes.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.malformed_sitelinks() + self.malformed_pageviews() + self.unmapped_wiki_codes()
    }
}
