//! One orchestrator run against one source collection.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::DownloadConfig;
use crate::hooks::HookResult;
use crate::model::{ItemStatus, MediaItem};
use crate::stats::{Counts, CountsTracker};

/// Live state of a session.
///
/// Counts are kept in a shared [`CountsTracker`] so a progress view can hold
/// [`counts_handle`](Self::counts_handle) and read consistent snapshots while
/// workers complete items.
#[derive(Debug, Clone)]
pub struct Session {
    pub playlist_url: String,
    pub session_id: String,
    pub started: DateTime<Utc>,
    pub ended: Option<DateTime<Utc>>,
    pub quality_order: Vec<String>,
    pub audio_only: bool,
    pub config_snapshot: serde_json::Value,
    /// Items in collection order; skipped ones are already terminal.
    pub items: Vec<MediaItem>,
    pub hook_results: Vec<HookResult>,
    /// Why submission stopped early, if it did.
    pub aborted: Option<String>,
    counts: Arc<CountsTracker>,
}

impl Session {
    /// Starts a session over planned items, counting any that are already terminal.
    #[must_use]
    pub fn start(playlist_url: &str, config: &DownloadConfig, items: Vec<MediaItem>) -> Self {
        let counts = Arc::new(CountsTracker::new());
        for item in items.iter().filter(|i| i.status.is_terminal()) {
            counts.record(item.status, item.fallback_applied);
        }
        Self {
            playlist_url: playlist_url.to_string(),
            session_id: uuid::Uuid::new_v4().to_string(),
            started: Utc::now(),
            ended: None,
            quality_order: config.quality_order.clone(),
            audio_only: config.audio_only,
            config_snapshot: config.snapshot(),
            items,
            hook_results: Vec::new(),
            aborted: None,
            counts,
        }
    }

    /// Current counts.
    #[must_use]
    pub fn counts(&self) -> Counts {
        self.counts.snapshot()
    }

    /// Shared handle for live progress readers.
    #[must_use]
    pub fn counts_handle(&self) -> Arc<CountsTracker> {
        Arc::clone(&self.counts)
    }

    /// Stores a terminal item in its slot and counts it.
    ///
    /// A slot that is already terminal is left alone so nothing is counted twice.
    pub fn complete(&mut self, slot: usize, item: MediaItem) -> bool {
        let Some(current) = self.items.get_mut(slot) else {
            return false;
        };
        if current.status.is_terminal() || !item.status.is_terminal() {
            return false;
        }
        self.counts.record(item.status, item.fallback_applied);
        *current = item;
        true
    }

    /// Slots still waiting to be processed.
    #[must_use]
    pub fn pending_slots(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.status == ItemStatus::Pending)
            .map(|(slot, _)| slot)
            .collect()
    }

    /// Sets the end timestamp.
    pub fn close(&mut self) {
        if self.ended.is_none() {
            self.ended = Some(Utc::now());
        }
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.ended.is_some()
    }
}
