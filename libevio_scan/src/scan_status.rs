use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// Progress and cancellation shared between a scanning worker and whoever watches it.
///
/// One writer (the worker) and one reader (the UI). Everything is atomic so neither side
/// ever takes a lock.
#[derive(Debug, Default)]
pub struct ScanStatus {
    progress: AtomicU8,
    stop: AtomicBool,
    files_done: AtomicUsize,
    worker_id: usize,
}

impl ScanStatus {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }

    /// Percent complete of the file currently being scanned
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    /// Progress never moves backwards within a file, and is capped at 100
    pub fn set_progress(&self, percent: u8) {
        self.progress.fetch_max(percent.min(100), Ordering::Relaxed);
    }

    /// Start over for the next file
    pub fn reset_progress(&self) {
        self.progress.store(0, Ordering::Relaxed);
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn finish_file(&self) {
        self.files_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn files_done(&self) -> usize {
        self.files_done.load(Ordering::Relaxed)
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }
}
