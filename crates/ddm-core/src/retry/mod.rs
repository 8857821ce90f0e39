//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures) and exponential backoff decisions so that higher
//! layers (the coordinator, the fetcher) can share a consistent policy.
//!
//! The fetcher constructs `RetryPolicy` with `base_delay == max_delay` so
//! `decide` always returns that fixed delay rather than growing the backoff
//! across attempts; see `RetryPolicy::fixed_delay`.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::SegmentError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
