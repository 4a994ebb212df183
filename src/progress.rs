//! Progress-callback trait for per-file analysis events.
//!
//! Pass an [`Arc<dyn AnalysisProgressCallback>`] to
//! [`crate::Analyzer::analyze_files`] or [`crate::batch::run_batch`] to follow
//! a multi-file run, e.g. to drive a terminal progress bar.
//!
//! # Example
//!
//! ```rust
//! use docanalyze::{AnalysisProgressCallback, AnalysisStatus, ProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter {
//!     failed: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for FailureCounter {
//!     fn on_file_complete(&self, _index: usize, _total: usize, name: &str, status: AnalysisStatus) {
//!         if status == AnalysisStatus::Error {
//!             self.failed.fetch_add(1, Ordering::SeqCst);
//!             eprintln!("{name} failed");
//!         }
//!     }
//! }
//!
//! let cb: ProgressCallback = Arc::new(FailureCounter { failed: AtomicUsize::new(0) });
//! cb.on_batch_start(2);
//! ```

use crate::output::AnalysisStatus;
use std::sync::Arc;

/// Called as a multi-file run processes each file.
///
/// Files are processed sequentially, so calls never overlap for one run.
/// All methods default to no-ops.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once before the first file.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is loaded.
    ///
    /// # Arguments
    /// * `index`: 1-based position in the run
    /// * `total`: number of files in the run
    /// * `name` : display name of the file
    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called once the file has a result, whatever its status.
    fn on_file_complete(&self, index: usize, total: usize, name: &str, status: AnalysisStatus) {
        let _ = (index, total, name, status);
    }

    /// Called once after every file has been attempted.
    ///
    /// # Arguments
    /// * `total_files`: files in the run
    /// * `error_count`: files whose result is an error
    fn on_batch_complete(&self, total_files: usize, error_count: usize) {
        let _ = (total_files, error_count);
    }
}

/// No-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Shared handle accepted by the multi-file entry points.
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl AnalysisProgressCallback for Recorder {
        fn on_batch_start(&self, total_files: usize) {
            self.events.lock().unwrap().push(format!("start {total_files}"));
        }

        fn on_file_complete(&self, index: usize, total: usize, name: &str, status: AnalysisStatus) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{index}/{total} {name} {status}"));
        }

        fn on_batch_complete(&self, total_files: usize, error_count: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {total_files} {error_count}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start(1, 2, "a.txt");
        cb.on_file_complete(1, 2, "a.txt", AnalysisStatus::Info);
        cb.on_batch_complete(2, 0);
    }

    #[test]
    fn recorder_sees_ordered_events() {
        let rec = Arc::new(Recorder::default());
        let cb: ProgressCallback = rec.clone();
        cb.on_batch_start(2);
        cb.on_file_start(1, 2, "a.txt");
        cb.on_file_complete(1, 2, "a.txt", AnalysisStatus::Success);
        cb.on_file_complete(2, 2, "b.pdf", AnalysisStatus::Error);
        cb.on_batch_complete(2, 1);
        assert_eq!(
            *rec.events.lock().unwrap(),
            vec!["start 2", "1/2 a.txt success", "2/2 b.pdf error", "done 2 1"]
        );
    }
}
