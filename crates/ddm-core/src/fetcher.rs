//! Segment Fetcher: downloads one byte range with retry, writing into the
//! output file at the correct offset in chunk-sized pieces so progress and
//! cooperative cancellation are observable mid-transfer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::FetchError;
use crate::retry::{run_with_retry, RetryPolicy, SegmentError};
use crate::segmenter::Segment;
use crate::storage::StorageWriter;

/// Progress update emitted as a segment downloads, consumed by the
/// Coordinator to mutate `DownloadState` and notify the `ProgressObserver`.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    /// `bytes_written` bytes (counted from the segment's own start) are now
    /// durably on disk for `id`, the next `resume_offset` for this segment.
    Progress { id: u32, bytes_written: u64 },
    /// The segment finished successfully; all its bytes are on disk.
    Done { id: u32 },
    /// The segment exhausted all retries.
    Failed { id: u32 },
}

/// Downloads `segment`, resuming at `resume_offset` bytes into it, retrying
/// per `policy` with a fixed backoff between attempts. Performs a blocking
/// curl transfer; call from inside `tokio::task::spawn_blocking`.
///
/// Sends a `FetchEvent::Progress` after every chunk boundary and exactly one
/// terminal `Done`/`Failed` event before returning. Never writes bytes
/// outside `[segment.start, segment.end)`.
pub fn fetch_segment_blocking(
    uri: &str,
    user_agent: &str,
    segment: &Segment,
    storage: &StorageWriter,
    resume_offset: u64,
    policy: &RetryPolicy,
    chunk_size: usize,
    timeout: Duration,
    events: &UnboundedSender<FetchEvent>,
    abort: &Arc<AtomicBool>,
) -> Result<(), FetchError> {
    let written = Arc::new(AtomicU64::new(resume_offset.min(segment.len())));

    let result = run_with_retry(policy, || {
        if abort.load(Ordering::Relaxed) {
            return Err(SegmentError::Aborted);
        }
        attempt_once(
            uri, user_agent, segment, storage, &written, chunk_size, timeout, events, abort,
        )
    });

    match result {
        Ok(()) => {
            let _ = events.send(FetchEvent::Done { id: segment.id });
            Ok(())
        }
        Err(e) => {
            let _ = events.send(FetchEvent::Failed { id: segment.id });
            Err(FetchError::Exhausted(e))
        }
    }
}

/// A single HTTP attempt: GET `Range: bytes={start+written}-{end-1}`, stream
/// the body into `storage` at the right offset, classify the outcome.
#[allow(clippy::too_many_arguments)]
fn attempt_once(
    uri: &str,
    user_agent: &str,
    segment: &Segment,
    storage: &StorageWriter,
    written: &Arc<AtomicU64>,
    chunk_size: usize,
    timeout: Duration,
    events: &UnboundedSender<FetchEvent>,
    abort: &Arc<AtomicBool>,
) -> Result<(), SegmentError> {
    let attempt_start_off = written.load(Ordering::Relaxed);
    if attempt_start_off >= segment.len() {
        // Already fully written by a prior attempt (shouldn't normally
        // happen since the Coordinator wouldn't re-dispatch a completed
        // segment, but make the fetcher itself idempotent).
        return Ok(());
    }

    let storage_error: Arc<Mutex<Option<std::io::Error>>> = Arc::new(Mutex::new(None));
    let storage_error_cb = Arc::clone(&storage_error);
    let written_cb = Arc::clone(written);
    let events_cb = events.clone();
    let segment_start = segment.start;
    let segment_len = segment.len();
    let segment_id = segment.id;
    let abort_cb = Arc::clone(abort);
    let storage = storage.clone();

    let mut easy = curl::easy::Easy::new();
    easy.url(uri).map_err(SegmentError::Curl)?;
    easy.useragent(user_agent).map_err(SegmentError::Curl)?;
    easy.follow_location(true).map_err(SegmentError::Curl)?;
    easy.connect_timeout(Duration::from_secs(30))
        .map_err(SegmentError::Curl)?;
    easy.timeout(timeout).map_err(SegmentError::Curl)?;
    easy.buffer_size(chunk_size)
        .map_err(SegmentError::Curl)?;

    let range_str = segment.range_header_value_from(segment_start + attempt_start_off);
    let range_str = range_str
        .strip_prefix("bytes=")
        .unwrap_or(&range_str)
        .to_string();
    easy.range(&range_str).map_err(SegmentError::Curl)?;

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(move |data| {
                if abort_cb.load(Ordering::Relaxed) {
                    return Ok(0);
                }
                let off = written_cb.load(Ordering::Relaxed);
                let remaining = segment_len.saturating_sub(off);
                let to_write: &[u8] = if (data.len() as u64) > remaining {
                    &data[..remaining as usize]
                } else {
                    data
                };
                match storage.write_at(segment_start + off, to_write) {
                    Ok(()) => {
                        let new_off = off + to_write.len() as u64;
                        written_cb.store(new_off, Ordering::Relaxed);
                        let _ = events_cb.send(FetchEvent::Progress {
                            id: segment_id,
                            bytes_written: new_off,
                        });
                        Ok(to_write.len())
                    }
                    Err(e) => {
                        let io_err = e.downcast::<std::io::Error>().unwrap_or_else(|e| {
                            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
                        });
                        let _ = storage_error_cb.lock().unwrap().replace(io_err);
                        Ok(0)
                    }
                }
            })
            .map_err(SegmentError::Curl)?;

        if let Err(e) = transfer.perform() {
            if e.is_write_error() {
                if abort.load(Ordering::Relaxed) {
                    return Err(SegmentError::Aborted);
                }
                if let Some(io_err) = storage_error.lock().unwrap().take() {
                    return Err(SegmentError::Storage(io_err));
                }
            }
            return Err(SegmentError::Curl(e));
        }
    }

    if let Some(io_err) = storage_error.lock().unwrap().take() {
        return Err(SegmentError::Storage(io_err));
    }

    let code = easy.response_code().map_err(SegmentError::Curl)?;
    let received_this_attempt = written.load(Ordering::Relaxed) - attempt_start_off;
    let requested_this_attempt = segment_len - attempt_start_off;

    match code {
        200 => {
            if received_this_attempt != requested_this_attempt {
                return Err(SegmentError::PartialTransfer {
                    expected: requested_this_attempt,
                    received: received_this_attempt,
                });
            }
        }
        206 => {
            if written.load(Ordering::Relaxed) != segment_len {
                return Err(SegmentError::PartialTransfer {
                    expected: segment_len,
                    received: written.load(Ordering::Relaxed),
                });
            }
        }
        other => return Err(SegmentError::Http(other)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::Segment;

    #[test]
    fn fetch_event_variants_carry_segment_id() {
        let ev = FetchEvent::Progress {
            id: 3,
            bytes_written: 100,
        };
        match ev {
            FetchEvent::Progress { id, bytes_written } => {
                assert_eq!(id, 3);
                assert_eq!(bytes_written, 100);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn attempt_once_is_a_noop_when_already_fully_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.part");
        let mut builder = crate::storage::StorageWriterBuilder::create(&path).unwrap();
        builder.preallocate(10).unwrap();
        let storage = builder.build();

        let segment = Segment {
            id: 0,
            start: 0,
            end: 10,
        };
        let written = Arc::new(AtomicU64::new(10));
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let abort = Arc::new(AtomicBool::new(false));

        let r = attempt_once(
            "http://127.0.0.1:1/unused",
            "test-agent",
            &segment,
            &storage,
            &written,
            8192,
            Duration::from_secs(1),
            &tx,
            &abort,
        );
        assert!(r.is_ok());
    }
}
