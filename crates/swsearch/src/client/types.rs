use std::{num::NonZeroUsize, sync::Arc};

use bon::Builder;
use serde::Deserialize;
use thiserror::Error;
use url::ParseError;

/// Similarity-search thresholds and score selection shared by every search
/// in a run.
///
/// Field names mirror the upstream query parameters: `dist` bounds the
/// overall edit distance, `sdist` the topological distance, and the
/// remaining fields cap per-metric difference counts (terminal atoms up/down,
/// ring atoms, linker atoms, major/minor ring systems, hybridisation,
/// substitutions).
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub db: String,
    pub dist: u32,
    pub sdist: u32,
    pub tdn: u32,
    pub tup: u32,
    pub rdn: u32,
    pub rup: u32,
    pub ldn: u32,
    pub lup: u32,
    pub maj: u32,
    pub min: u32,
    pub sub: u32,
    pub scores: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            db: "REAL-Database-22Q1.smi.anon".to_string(),
            dist: 5,
            sdist: 12,
            tdn: 6,
            tup: 6,
            rdn: 6,
            rup: 2,
            ldn: 2,
            lup: 2,
            maj: 6,
            min: 6,
            sub: 6,
            scores: "Atom Alignment,ECFP4,Daylight".to_string(),
        }
    }
}

/// Options for a batch search.
#[derive(Debug, Clone, Builder)]
pub struct SearchOptions {
    #[builder(default = NonZeroUsize::new(10).unwrap())]
    pub worker_count: NonZeroUsize,
    #[builder(default = 64)]
    pub channel_capacity: usize,
    /// Accepted for API compatibility with the upstream entry point, but the
    /// hit-list page length is fixed at 300 and this value is never threaded
    /// into pagination.
    pub results_per_query: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Hit-list identifier correlating a submitted search with its result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HitListId(pub(crate) String);

impl HitListId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HitListId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error type shared across the search pipeline.
#[derive(Debug, Error, Clone)]
pub enum SearchError {
    #[error("invalid base URL `{0}`")]
    InvalidBaseUrl(String),
    #[error("failed to join `{path}` onto base URL: {source}")]
    UrlJoin {
        path: String,
        #[source]
        source: Arc<ParseError>,
    },
    #[error("request error during `{stage}`: {source}")]
    Request {
        stage: &'static str,
        #[source]
        source: Arc<reqwest::Error>,
    },
    #[error("unexpected HTTP status {status} during `{stage}`")]
    HttpStatus { stage: &'static str, status: u16 },
    #[error("JSON decode error during `{stage}`: {source}")]
    Json {
        stage: &'static str,
        #[source]
        source: Arc<serde_json::Error>,
    },
    #[error("more than one hit-list id observed on a single submission stream: {ids:?}")]
    ProtocolViolation { ids: Vec<String> },
    #[error("hit-list reply reported zero records")]
    NoHits,
    #[error("hit-list reply carried no `data` rows")]
    EmptyReply,
    #[error("hit-list rows produced an empty table after expansion")]
    EmptyTable,
    #[error("bounded task channel closed unexpectedly")]
    ChannelClosed,
    #[error("search worker {reason}")]
    WorkerJoin { reason: &'static str },
}

impl SearchError {
    pub fn request(stage: &'static str, error: reqwest::Error) -> Self {
        Self::Request {
            stage,
            source: Arc::new(error),
        }
    }

    pub fn json(stage: &'static str, error: serde_json::Error) -> Self {
        Self::Json {
            stage,
            source: Arc::new(error),
        }
    }

    /// Whether the error may be cured by retrying the same idempotent GET.
    ///
    /// Matches the upstream retry policy: 500/502 replies (the service is
    /// known to crash internally) and connection-level failures. Every other
    /// status or decode problem is final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpStatus { status, .. } => matches!(status, 500 | 502),
            Self::Request { source, .. } => source.is_connect() || source.is_timeout(),
            _ => false,
        }
    }

    /// Whether the error is one of the recoverable "no data" outcomes that
    /// collapse to an empty result set rather than a failed pipeline.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoHits | Self::EmptyReply | Self::EmptyTable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retryable() {
        assert!(
            SearchError::HttpStatus {
                stage: "submit",
                status: 500
            }
            .is_transient()
        );
        assert!(
            SearchError::HttpStatus {
                stage: "submit",
                status: 502
            }
            .is_transient()
        );
    }

    #[test]
    fn client_errors_are_final() {
        assert!(
            !SearchError::HttpStatus {
                stage: "hitlist",
                status: 404
            }
            .is_transient()
        );
        assert!(!SearchError::NoHits.is_transient());
        assert!(!SearchError::ProtocolViolation { ids: Vec::new() }.is_transient());
    }

    #[test]
    fn empty_outcomes_are_no_data() {
        assert!(SearchError::NoHits.is_no_data());
        assert!(SearchError::EmptyReply.is_no_data());
        assert!(SearchError::EmptyTable.is_no_data());
        assert!(!SearchError::ChannelClosed.is_no_data());
    }

    #[test]
    fn default_options_use_fixed_pool_size() {
        let options = SearchOptions::default();
        assert_eq!(options.worker_count.get(), 10);
        assert!(options.results_per_query.is_none());
    }
}
