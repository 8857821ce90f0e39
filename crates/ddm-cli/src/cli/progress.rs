//! Terminal progress reporting: the CLI's own `ProgressObserver`.
//! The engine only ever calls these four hooks; everything about how that
//! turns into terminal output lives here.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use ddm_core::progress::ProgressObserver;

/// Prints one line per event; segment completion is tallied against the
/// total so the CLI can show "N/M segments" without the engine exposing
/// any richer progress type.
pub struct ConsoleProgress {
    completed: AtomicUsize,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            completed: AtomicUsize::new(0),
        }
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_start(&self, total_segments: usize, already_completed: usize) {
        self.completed.store(already_completed, Ordering::Relaxed);
        if already_completed > 0 {
            println!(
                "resuming: {already_completed}/{total_segments} segment(s) already complete"
            );
        } else {
            println!("starting download: {total_segments} segment(s)");
        }
    }

    fn on_segment_complete(&self, id: u32) {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        println!("segment {id} done ({done} complete so far)");
    }

    fn on_finish(&self, path: &Path) {
        println!("done: {}", path.display());
    }

    fn on_pause(&self, remaining_count: usize) {
        println!("paused: {remaining_count} segment(s) remaining, re-run to resume");
    }
}
