//! Typed error taxonomy for the engine's public boundary.
//!
//! Each kind carries a human-readable message via `#[error(...)]` and a
//! `#[source]`/`#[from]` link to the underlying cause, so callers that only
//! want a message (the CLI) and callers that want to match on a cause
//! (tests, embedders) are both served by the same type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the metadata probe (HEAD / Range GET fallback).
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("server returned HTTP {0}")]
    HttpStatus(u32),
    #[error("could not determine file size from response headers")]
    NoSize,
    #[error("network error during probe: {0}")]
    Network(#[from] curl::Error),
    #[error("probe request timed out")]
    Timeout,
}

/// Errors from the segment planner.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid size for planning: {0}")]
    InvalidSize(u64),
}

/// Errors from a single segment fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("segment exhausted all retries: {0}")]
    Exhausted(#[source] crate::retry::SegmentError),
}

/// Errors from loading a state sidecar file.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level errors from a coordinator download run.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("probing {uri} failed: {source}")]
    Probe {
        uri: String,
        #[source]
        source: ProbeError,
    },
    #[error("planning segments failed: {0}")]
    Plan(#[from] PlanError),
    #[error("download incomplete: {0} segment(s) did not finish")]
    Incomplete(usize),
    #[error("I/O error preparing output file: {0}")]
    Io(#[from] std::io::Error),
}
