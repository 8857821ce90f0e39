//! Integration tests: a local HTTP server with Range support, driving the
//! Coordinator end to end: multi-segment download, single-stream fallback,
//! HEAD-blocked probing, and resume after a simulated crash.

mod common;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use ddm_core::config::DdmConfig;
use ddm_core::segmenter;
use ddm_core::state::{self, DownloadState};
use ddm_core::{Coordinator, Destination};
use tempfile::tempdir;

use common::range_server::{self, RangeServerOptions};

fn no_cancel() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[tokio::test]
async fn multi_segment_download_completes_and_file_matches() {
    let body: Vec<u8> = (0u8..100).cycle().take(64 * 1024).collect();
    let url = range_server::start(body.clone());

    let download_dir = tempdir().unwrap();
    let cfg = DdmConfig {
        download_path: download_dir.path().to_path_buf(),
        segments_amount: 8,
        ..DdmConfig::default()
    };

    let coordinator = Coordinator::new(cfg);
    let path = coordinator
        .download(&url, Destination::Default, None, true, no_cancel())
        .await
        .expect("download should complete");

    assert!(path.exists());
    let content = std::fs::read(&path).unwrap();
    assert_eq!(content.len(), body.len());
    assert_eq!(content, body, "downloaded bytes must be bit-exact");

    let state_path = PathBuf::from(format!("{}.state", path.display()));
    assert!(
        state::load(&state_path).is_err(),
        "state sidecar should be removed on completion"
    );
}

#[tokio::test]
async fn head_blocked_falls_back_to_range_probe_and_completes() {
    let body: Vec<u8> = (0u8..100).cycle().take(32 * 1024).collect();
    let url = range_server::start_with_options(
        body.clone(),
        RangeServerOptions {
            head_allowed: false,
            support_ranges: true,
            advertise_ranges: true,
        },
    );

    let download_dir = tempdir().unwrap();
    let cfg = DdmConfig {
        download_path: download_dir.path().to_path_buf(),
        segments_amount: 4,
        ..DdmConfig::default()
    };

    let coordinator = Coordinator::new(cfg);
    let path = coordinator
        .download(&url, Destination::Default, None, true, no_cancel())
        .await
        .expect("download should complete despite blocked HEAD");

    let content = std::fs::read(&path).unwrap();
    assert_eq!(content, body);
}

#[tokio::test]
async fn no_range_support_falls_back_to_single_segment() {
    let body: Vec<u8> = (0u8..100).cycle().take(32 * 1024).collect();
    let url = range_server::start_with_options(
        body.clone(),
        RangeServerOptions {
            head_allowed: true,
            support_ranges: false,
            advertise_ranges: false,
        },
    );

    let download_dir = tempdir().unwrap();
    let cfg = DdmConfig {
        download_path: download_dir.path().to_path_buf(),
        segments_amount: 8,
        ..DdmConfig::default()
    };

    let coordinator = Coordinator::new(cfg);
    let path = coordinator
        .download(&url, Destination::Default, None, true, no_cancel())
        .await
        .expect("download should complete as a single stream");

    let content = std::fs::read(&path).unwrap();
    assert_eq!(content, body);
}

#[tokio::test]
async fn resume_after_crash_honors_partial_progress() {
    let body: Vec<u8> = (0u8..200).cycle().take(40_000).collect();
    let url = range_server::start(body.clone());

    let download_dir = tempdir().unwrap();
    let cfg = DdmConfig {
        download_path: download_dir.path().to_path_buf(),
        segments_amount: 4,
        ..DdmConfig::default()
    };
    let coordinator = Coordinator::new(cfg.clone());

    let metadata = coordinator.info(&url).await.unwrap();
    let final_path = download_dir.path().join(&metadata.filename);
    let temp_path = PathBuf::from(format!("{}.part", final_path.display()));
    let state_path = PathBuf::from(format!("{}.state", final_path.display()));

    let segments = segmenter::plan(metadata.size, cfg.segments_amount).unwrap();

    // Simulate a crash: segments 0 and 1 finished, 2 and 3 never started.
    // Preallocate the temp file and write only the bytes the completed
    // segments would have produced so the resumed run's bit-exactness
    // assertion still holds.
    {
        let mut builder = ddm_core::storage::StorageWriterBuilder::create(&temp_path).unwrap();
        builder.preallocate(metadata.size).unwrap();
        let writer = builder.build();
        for seg in &segments[..2] {
            let start = seg.start as usize;
            let end = seg.end as usize;
            writer.write_at(seg.start, &body[start..end]).unwrap();
        }
        writer.sync().unwrap();
    }

    let mut crashed_state = DownloadState::new(&url, metadata.size);
    crashed_state.mark_completed(segments[0].id);
    crashed_state.mark_completed(segments[1].id);
    state::save(&state_path, &crashed_state).unwrap();

    let path = coordinator
        .download(&url, Destination::Default, None, true, no_cancel())
        .await
        .expect("resumed download should complete");

    assert_eq!(path, final_path);
    let content = std::fs::read(&path).unwrap();
    assert_eq!(content, body, "resumed download must be bit-exact");
}

#[tokio::test]
async fn mismatched_existing_state_is_discarded_and_redownloaded() {
    let body: Vec<u8> = (0u8..50).cycle().take(10_000).collect();
    let url = range_server::start(body.clone());

    let download_dir = tempdir().unwrap();
    let cfg = DdmConfig {
        download_path: download_dir.path().to_path_buf(),
        segments_amount: 2,
        ..DdmConfig::default()
    };
    let coordinator = Coordinator::new(cfg.clone());

    let metadata = coordinator.info(&url).await.unwrap();
    let final_path = download_dir.path().join(&metadata.filename);
    let temp_path = PathBuf::from(format!("{}.part", final_path.display()));
    let state_path = PathBuf::from(format!("{}.state", final_path.display()));

    // A state file claiming a different total size than the server actually
    // reports: resume validation must reject it and start fresh rather than
    // trusting (and corrupting) the mismatched partial file.
    std::fs::write(&temp_path, vec![0u8; metadata.size as usize]).unwrap();
    let mut stale_state = DownloadState::new(&url, metadata.size + 1);
    stale_state.mark_completed(0);
    state::save(&state_path, &stale_state).unwrap();

    let path = coordinator
        .download(&url, Destination::Default, None, true, no_cancel())
        .await
        .expect("download should complete after discarding stale state");

    let content = std::fs::read(&path).unwrap();
    assert_eq!(content, body, "redownloaded bytes must match the server body");
}

#[tokio::test]
async fn explicit_output_path_is_respected() {
    let body: Vec<u8> = (0u8..10).cycle().take(4096).collect();
    let url = range_server::start(body.clone());

    let download_dir = tempdir().unwrap();
    let out_path = download_dir.path().join("renamed.bin");
    let cfg = DdmConfig {
        download_path: download_dir.path().join("unused"),
        segments_amount: 4,
        ..DdmConfig::default()
    };

    let coordinator = Coordinator::new(cfg);
    let path = coordinator
        .download(&url, Destination::File(out_path.clone()), None, true, no_cancel())
        .await
        .expect("download should complete");

    assert_eq!(path, out_path);
    assert_eq!(std::fs::read(&out_path).unwrap(), body);
}
