//! The orchestration itself: probe → plan → resume-or-fresh → spawn fetchers
//! → checkpoint → finalize.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::sync::Mutex;

use super::paths::{self, Destination};
use crate::config::DdmConfig;
use crate::error::DownloadError;
use crate::fetcher::{self, FetchEvent};
use crate::probe::{self, FileMetadata};
use crate::progress::ProgressObserver;
use crate::retry::RetryPolicy;
use crate::segmenter::{self, Segment};
use crate::state::{self, DownloadState};
use crate::storage::{self, StorageWriter, StorageWriterBuilder};

/// Checkpoint interval: how often the in-progress `DownloadState` is flushed
/// to its sidecar file while fetchers are running.
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(5);

/// `StorageWriter`'s constructors return `anyhow::Result`; the Coordinator's
/// public boundary is the typed `DownloadError`, so I/O-stage failures are
/// folded into `DownloadError::Io` here rather than at every call site.
fn io_err(e: anyhow::Error) -> DownloadError {
    DownloadError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

pub(super) async fn run_download(
    config: &DdmConfig,
    progress: Arc<dyn ProgressObserver>,
    uri: &str,
    destination: Destination,
    segments_override: Option<usize>,
    resume: bool,
    cancel: Arc<AtomicBool>,
) -> Result<PathBuf, DownloadError> {
    let metadata = probe_metadata(uri, config).await.map_err(|source| DownloadError::Probe {
        uri: uri.to_string(),
        source,
    })?;

    let final_path =
        paths::resolve_final_path(&destination, &metadata.filename, &config.download_path)?;
    let temp_path = storage::temp_path(&final_path);
    let state_file_path = paths::state_path(&final_path);

    let requested_segments = segments_override.unwrap_or(config.segments_amount);
    let effective_segments = if metadata.supports_range {
        requested_segments
    } else {
        1
    };
    let segments = segmenter::plan(metadata.size, effective_segments)?;
    let total_segments = segments.len();

    let (storage, initial_state) =
        prepare_storage_and_state(uri, &metadata, resume, &temp_path, &state_file_path)?;

    progress.on_start(total_segments, initial_state.completed.len());

    let pending: Vec<Segment> = segments
        .iter()
        .filter(|s| !initial_state.completed.contains(&s.id))
        .copied()
        .collect();

    let state = Arc::new(Mutex::new(initial_state));

    if pending.is_empty() {
        return finalize(storage, state, &state_file_path, &final_path, &progress, total_segments).await;
    }

    let (tx, rx) = unbounded_channel::<FetchEvent>();

    let retry_policy = RetryPolicy::fixed_delay(config.retry_times, Duration::from_secs(3));
    let chunk_size = config.chunk_size;
    let timeout = Duration::from_secs(config.timeout);
    let user_agent = config.user_agent.clone();

    let mut fetch_handles = Vec::with_capacity(pending.len());
    for segment in pending {
        let resume_offset = state.lock().await.resume_offset(segment.id);
        let uri = uri.to_string();
        let user_agent = user_agent.clone();
        let storage = storage.clone();
        let tx = tx.clone();
        let cancel = Arc::clone(&cancel);
        let policy = retry_policy;

        fetch_handles.push(tokio::spawn(async move {
            tokio::task::spawn_blocking(move || {
                fetcher::fetch_segment_blocking(
                    &uri,
                    &user_agent,
                    &segment,
                    &storage,
                    resume_offset,
                    &policy,
                    chunk_size,
                    timeout,
                    &tx,
                    &cancel,
                )
            })
            .await
        }));
    }
    drop(tx);

    let event_loop = spawn_event_loop(rx, Arc::clone(&state), Arc::clone(&progress));
    let checkpoint_handle = spawn_checkpointer(Arc::clone(&state), state_file_path.clone());

    for handle in fetch_handles {
        let _ = handle.await.expect("fetch task panicked");
    }
    event_loop.await.expect("event loop task panicked");

    checkpoint_handle.abort();
    finalize(storage, state, &state_file_path, &final_path, &progress, total_segments).await
}

async fn probe_metadata(uri: &str, config: &DdmConfig) -> Result<FileMetadata, crate::error::ProbeError> {
    let uri_owned = uri.to_string();
    let user_agent = config.user_agent.clone();
    let timeout = Duration::from_secs(config.timeout);
    tokio::task::spawn_blocking(move || probe::probe(&uri_owned, &user_agent, timeout))
        .await
        .expect("probe task panicked")
}

/// Decides resume-vs-fresh and returns the storage writer plus the
/// `DownloadState` to start from.
fn prepare_storage_and_state(
    uri: &str,
    metadata: &FileMetadata,
    resume: bool,
    temp_path: &std::path::Path,
    state_file_path: &std::path::Path,
) -> Result<(StorageWriter, DownloadState), DownloadError> {
    if resume && temp_path.exists() && state_file_path.exists() {
        match state::load(state_file_path) {
            Ok(loaded)
                if state::resume_is_valid(
                    &loaded,
                    uri,
                    metadata.size,
                    metadata.etag.as_deref(),
                    metadata.last_modified.as_deref(),
                ) =>
            {
                let writer = StorageWriter::open_existing(temp_path).map_err(io_err)?;
                return Ok((writer, loaded));
            }
            Ok(_) => {
                tracing::info!("resume state does not match current probe; starting fresh");
            }
            Err(e) => {
                tracing::warn!(error = %e, "state file unreadable; starting fresh");
            }
        }
    }

    let _ = std::fs::remove_file(temp_path);
    let _ = state::delete(state_file_path);

    let mut builder = StorageWriterBuilder::create(temp_path).map_err(io_err)?;
    builder.preallocate(metadata.size).map_err(io_err)?;
    let writer = builder.build();

    let mut fresh = DownloadState::new(uri, metadata.size);
    fresh.etag = metadata.etag.clone();
    fresh.last_modified = metadata.last_modified.clone();
    Ok((writer, fresh))
}

/// Drains fetcher events, mutating the shared `DownloadState` and forwarding
/// segment completions to the progress observer. Exits once every `tx` clone
/// held by a fetch task has been dropped.
fn spawn_event_loop(
    mut rx: UnboundedReceiver<FetchEvent>,
    state: Arc<Mutex<DownloadState>>,
    progress: Arc<dyn ProgressObserver>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                FetchEvent::Progress { id, bytes_written } => {
                    state.lock().await.mark_partial(id, bytes_written);
                }
                FetchEvent::Done { id } => {
                    state.lock().await.mark_completed(id);
                    progress.on_segment_complete(id);
                }
                FetchEvent::Failed { .. } => {
                    // The segment's last-known offset is already on record
                    // from its most recent `Progress` event; nothing further
                    // to persist here. The Coordinator surfaces the overall
                    // failure once every task has settled.
                }
            }
        }
    })
}

/// Periodic checkpoint task: saves a consistent snapshot of `state` every
/// `CHECKPOINT_INTERVAL`, cancelled by the caller via `JoinHandle::abort`
/// once all fetchers have settled.
fn spawn_checkpointer(
    state: Arc<Mutex<DownloadState>>,
    state_file_path: PathBuf,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
        interval.tick().await; // first tick is immediate; nothing to checkpoint yet
        loop {
            interval.tick().await;
            let snapshot = {
                let mut guard = state.lock().await;
                guard.touch();
                guard.clone()
            };
            let path = state_file_path.clone();
            let _ = tokio::task::spawn_blocking(move || state::save(&path, &snapshot)).await;
        }
    })
}

async fn finalize(
    storage: StorageWriter,
    state: Arc<Mutex<DownloadState>>,
    state_file_path: &std::path::Path,
    final_path: &std::path::Path,
    progress: &Arc<dyn ProgressObserver>,
    total_segments: usize,
) -> Result<PathBuf, DownloadError> {
    let final_state = {
        let mut guard = state.lock().await;
        guard.touch();
        guard.clone()
    };
    let _ = state::save(state_file_path, &final_state);

    if final_state.is_complete(total_segments) {
        storage.sync().map_err(io_err)?;
        storage.finalize(final_path).map_err(io_err)?;
        let _ = state::delete(state_file_path);
        progress.on_finish(final_path);
        Ok(final_path.to_path_buf())
    } else {
        let remaining = total_segments - final_state.completed.len();
        progress.on_pause(remaining);
        Err(DownloadError::Incomplete(remaining))
    }
}
