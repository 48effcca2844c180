//! Running session counts and per-transfer speed tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::model::ItemStatus;

/// Outcome counts for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub fallbacks: usize,
}

impl Counts {
    /// True when every counted item landed in exactly one terminal bucket.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.total == self.success + self.failed + self.skipped
    }
}

/// Mutex-guarded counts shared between the completion path and live readers.
///
/// Each [`record`](Self::record) is one locked update, so a concurrent
/// [`snapshot`](Self::snapshot) never observes a half-applied completion.
#[derive(Debug, Default)]
pub struct CountsTracker {
    inner: Mutex<Counts>,
}

impl CountsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one terminal item. `Pending` is ignored.
    pub fn record(&self, status: ItemStatus, fallback: bool) {
        let mut counts = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match status {
            ItemStatus::Pending => return,
            ItemStatus::Success => counts.success += 1,
            ItemStatus::Failed => counts.failed += 1,
            ItemStatus::Skipped => counts.skipped += 1,
        }
        counts.total += 1;
        if fallback {
            counts.fallbacks += 1;
        }
    }

    /// Current counts.
    #[must_use]
    pub fn snapshot(&self) -> Counts {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Converts cumulative `(downloaded, total)` callbacks into deltas and speed.
pub struct TransferTracker {
    start_time: Instant,
    downloaded: AtomicU64,
    peak_speed: AtomicU64,
}

impl Default for TransferTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            downloaded: AtomicU64::new(0),
            peak_speed: AtomicU64::new(0),
        }
    }

    /// Records a cumulative byte count and returns `(delta, speed)`.
    ///
    /// Uses `fetch_max` so out-of-order callbacks never move the high-water
    /// mark backwards; a stale callback yields a zero delta.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn observe(&self, cumulative: u64) -> (u64, u64) {
        let previous = self.downloaded.fetch_max(cumulative, Ordering::Relaxed);
        let delta = cumulative.saturating_sub(previous);
        let total = previous.max(cumulative);
        let secs = self.start_time.elapsed().as_secs_f64();
        let speed = if secs > 0.0 { (total as f64 / secs) as u64 } else { 0 };
        self.peak_speed.fetch_max(speed, Ordering::Relaxed);
        (delta, speed)
    }

    /// Bytes seen so far.
    #[must_use]
    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn peak_speed(&self) -> u64 {
        self.peak_speed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
