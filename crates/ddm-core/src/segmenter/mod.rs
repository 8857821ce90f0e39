//! Range math and segment planning.
//!
//! Splits a download into N segments and computes HTTP Range header bounds.
//! Completion tracking lives in `DownloadState` rather than a bitmap here,
//! since resume state is persisted as a sidecar JSON file keyed by segment id.

mod range;

pub use range::{plan, Segment};
