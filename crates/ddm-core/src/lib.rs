pub mod config;
pub mod logging;

pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod probe;
pub mod progress;
pub mod retry;
pub mod segmenter;
pub mod state;
pub mod storage;
pub mod url_model;

pub use coordinator::{Coordinator, Destination};
pub use error::DownloadError;
