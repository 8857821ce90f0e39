//! Download Coordinator: the top-level orchestrator. Composes the probe,
//! planner, state store, storage, and fetchers into one `download()` call;
//! also exposes a side-effect-free `info()` query.

mod paths;
mod run;

pub use paths::Destination;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::DdmConfig;
use crate::error::{DownloadError, ProbeError};
use crate::probe::{self, FileMetadata};
use crate::progress::{NullProgressObserver, ProgressObserver};

/// Owns one download's worth of orchestration: a configuration and a
/// progress sink. Stateless otherwise; a single `Coordinator` can be reused
/// for as many `download()`/`info()` calls as the caller likes.
pub struct Coordinator {
    config: DdmConfig,
    progress: Arc<dyn ProgressObserver>,
}

impl Coordinator {
    /// Builds a coordinator that reports no progress.
    pub fn new(config: DdmConfig) -> Self {
        Self::with_progress_observer(config, Arc::new(NullProgressObserver))
    }

    /// Builds a coordinator that reports through `progress`.
    pub fn with_progress_observer(config: DdmConfig, progress: Arc<dyn ProgressObserver>) -> Self {
        Self { config, progress }
    }

    /// Queries file metadata without touching disk.
    pub async fn info(&self, uri: &str) -> Result<FileMetadata, ProbeError> {
        let uri = uri.to_string();
        let user_agent = self.config.user_agent.clone();
        let timeout = Duration::from_secs(self.config.timeout);
        tokio::task::spawn_blocking(move || probe::probe(&uri, &user_agent, timeout))
            .await
            .expect("probe task panicked")
    }

    /// Runs a full segmented download to completion, to pause, or to error.
    ///
    /// `segments_override` overrides `DdmConfig::segments_amount` for this
    /// call; `resume` controls whether an existing output/state pair is
    /// trusted or always discarded. `cancel` is a cooperative
    /// abort flag the caller may set (e.g. from a Ctrl-C handler) to request
    /// a clean pause; pass a fresh `Arc::new(AtomicBool::new(false))` when no
    /// external cancellation is wired up.
    pub async fn download(
        &self,
        uri: &str,
        destination: Destination,
        segments_override: Option<usize>,
        resume: bool,
        cancel: Arc<AtomicBool>,
    ) -> Result<PathBuf, DownloadError> {
        run::run_download(
            &self.config,
            Arc::clone(&self.progress),
            uri,
            destination,
            segments_override,
            resume,
            cancel,
        )
        .await
    }
}
