//! `ddm download <url>` – run a segmented download to completion or pause.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use ddm_core::config::DdmConfig;
use ddm_core::{Coordinator, Destination};

use crate::cli::progress::ConsoleProgress;

pub async fn run_download(
    cfg: DdmConfig,
    url: &str,
    output: Option<PathBuf>,
    dir: Option<PathBuf>,
    segments: Option<usize>,
    resume: bool,
) -> Result<()> {
    let destination = match (output, dir) {
        (Some(path), _) => Destination::File(path),
        (None, Some(dir)) => Destination::Directory(dir),
        (None, None) => Destination::Default,
    };

    let coordinator = Coordinator::with_progress_observer(cfg, Arc::new(ConsoleProgress::new()));
    let cancel = install_cancel_handler();

    let path = coordinator
        .download(url, destination, segments, resume, cancel)
        .await?;
    tracing::info!(path = %path.display(), "download finished");
    Ok(())
}

/// Wires Ctrl-C to the Coordinator's cooperative abort flag so a download
/// stops cleanly at the next chunk boundary and checkpoints its progress
/// instead of being killed mid-write.
fn install_cancel_handler() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received interrupt, pausing after the current chunk");
            flag.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    });
    cancel
}
