//! Progress Observer interface: the engine's only outbound dependency on a
//! UI. The core knows nothing about terminals or widgets; it just calls
//! these four hooks.

use std::path::Path;

/// Consumes segment-completion events for a single download.
///
/// Implementations are supplied by the embedder (CLI, GUI, ...); the engine
/// ships only `NullProgressObserver` for callers that don't care.
pub trait ProgressObserver: Send + Sync {
    /// Called once, before any fetcher is spawned.
    fn on_start(&self, total_segments: usize, already_completed: usize);
    /// Called when a segment finishes successfully.
    fn on_segment_complete(&self, id: u32);
    /// Called once, after the output file is finalized.
    fn on_finish(&self, path: &Path);
    /// Called once, when the download stops with segments still incomplete
    /// (cancellation or exhausted retries).
    fn on_pause(&self, remaining_count: usize);
}

/// An observer that does nothing; the default when the caller doesn't supply one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressObserver;

impl ProgressObserver for NullProgressObserver {
    fn on_start(&self, _total_segments: usize, _already_completed: usize) {}
    fn on_segment_complete(&self, _id: u32) {}
    fn on_finish(&self, _path: &Path) {}
    fn on_pause(&self, _remaining_count: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_observer_does_not_panic() {
        let obs = NullProgressObserver;
        obs.on_start(4, 0);
        obs.on_segment_complete(0);
        obs.on_finish(Path::new("/tmp/x"));
        obs.on_pause(1);
    }
}
