//! Final session report.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::format::{format_bytes, format_duration};
use crate::hooks::HookResult;
use crate::model::{CaptionTrack, ItemStatus, MediaItem};
use crate::session::Session;
use crate::stats::Counts;

/// Report file name inside the output directory.
pub const REPORT_FILENAME: &str = "report.json";

/// Version of the report layout.
pub const SCHEMA_VERSION: &str = "1.1.0";

/// An item that ended in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEntry {
    pub video_id: String,
    pub title: String,
    pub reason: String,
}

/// An item delivered below its preferred quality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackEntry {
    pub video_id: String,
    /// Preferred quality.
    pub from: String,
    /// Quality actually delivered.
    pub to: Option<String>,
}

/// Per-item line of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub index: usize,
    pub video_id: String,
    pub title: String,
    pub status: ItemStatus,
    pub preferred_quality: String,
    pub selected_quality: Option<String>,
    pub fallback: bool,
    pub retries: u32,
    pub size_bytes: Option<u64>,
    pub duration: Option<f64>,
    pub resolution: Option<String>,
    pub filename: Option<String>,
    pub failure_reason: Option<String>,
    pub captions: Vec<CaptionTrack>,
}

impl From<&MediaItem> for ItemSummary {
    fn from(item: &MediaItem) -> Self {
        Self {
            index: item.index,
            video_id: item.video_id.clone(),
            title: item.title.clone(),
            status: item.status,
            preferred_quality: item.preferred_quality.clone(),
            selected_quality: item.selected_quality.clone(),
            fallback: item.fallback_applied,
            retries: item.retries,
            size_bytes: item.size_bytes,
            duration: item.duration,
            resolution: item.resolution.clone(),
            filename: item.filename.clone(),
            failure_reason: item.failure_reason.as_ref().map(ToString::to_string),
            captions: item.captions.clone(),
        }
    }
}

/// Summary of a finished (or aborted) session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub schema_version: String,
    pub playlist_url: String,
    pub session_id: String,
    pub started: DateTime<Utc>,
    pub ended: Option<DateTime<Utc>>,
    pub aborted: Option<String>,
    pub quality_order: Vec<String>,
    pub audio_only: bool,
    pub config: serde_json::Value,
    pub counts: Counts,
    pub total_bytes: u64,
    pub failures: Vec<FailureEntry>,
    pub fallbacks: Vec<FallbackEntry>,
    pub hooks: Vec<HookResult>,
    pub videos: Vec<ItemSummary>,
}

/// Builds the report for a session without touching any state.
#[must_use]
pub fn build_report(session: &Session) -> Report {
    let failures = session
        .items
        .iter()
        .filter(|item| item.status == ItemStatus::Failed)
        .map(|item| FailureEntry {
            video_id: item.video_id.clone(),
            title: item.title.clone(),
            reason: item
                .failure_reason
                .as_ref()
                .map_or_else(|| "unknown".to_string(), ToString::to_string),
        })
        .collect();

    let fallbacks = session
        .items
        .iter()
        .filter(|item| item.fallback_applied)
        .map(|item| FallbackEntry {
            video_id: item.video_id.clone(),
            from: item.preferred_quality.clone(),
            to: item.selected_quality.clone(),
        })
        .collect();

    let total_bytes = session
        .items
        .iter()
        .filter(|item| item.status == ItemStatus::Success)
        .filter_map(|item| item.size_bytes)
        .sum();

    Report {
        schema_version: SCHEMA_VERSION.to_string(),
        playlist_url: session.playlist_url.clone(),
        session_id: session.session_id.clone(),
        started: session.started,
        ended: session.ended,
        aborted: session.aborted.clone(),
        quality_order: session.quality_order.clone(),
        audio_only: session.audio_only,
        config: session.config_snapshot.clone(),
        counts: session.counts(),
        total_bytes,
        failures,
        fallbacks,
        hooks: session.hook_results.clone(),
        videos: session.items.iter().map(ItemSummary::from).collect(),
    }
}

impl Report {
    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes `report.json` into `dir` atomically and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(REPORT_FILENAME);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, self.to_json()?)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(path)
    }

    /// Wall time between start and end, once the session has ended.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.ended.and_then(|ended| (ended - self.started).to_std().ok())
    }

    /// Human-readable multi-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let c = &self.counts;
        let mut out = format!(
            "{}: {} ok, {} failed, {} skipped ({} total), {} fallbacks, {}",
            self.playlist_url,
            c.success,
            c.failed,
            c.skipped,
            c.total,
            c.fallbacks,
            format_bytes(self.total_bytes)
        );
        if let Some(elapsed) = self.elapsed() {
            let _ = write!(out, " in {}", format_duration(elapsed));
        }
        if let Some(reason) = &self.aborted {
            let _ = write!(out, "\nAborted: {reason}");
        }
        for f in &self.failures {
            let _ = write!(out, "\n  failed  {} ({}): {}", f.video_id, f.title, f.reason);
        }
        for f in &self.fallbacks {
            let _ = write!(
                out,
                "\n  fallback {}: {} -> {}",
                f.video_id,
                f.from,
                f.to.as_deref().unwrap_or("?")
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DownloadConfig;
    use crate::error::{ErrorKind, RetrievalError};
    use tempfile::TempDir;

    fn finished_session() -> Session {
        let mut ok = MediaItem::new(1, "a", "Alpha", "720p");
        ok.status = ItemStatus::Success;
        ok.selected_quality = Some("480p".into());
        ok.fallback_applied = true;
        ok.size_bytes = Some(2048);

        let mut bad = MediaItem::new(2, "b", "Beta", "720p");
        bad.fail(RetrievalError::new(ErrorKind::Private, "members only").into());

        let mut skipped = MediaItem::new(3, "c", "Gamma", "720p");
        skipped.status = ItemStatus::Skipped;

        let mut session = Session::start("pl", &DownloadConfig::default(), vec![skipped]);
        session.items.insert(0, MediaItem::new(1, "a", "Alpha", "720p"));
        session.items.insert(1, MediaItem::new(2, "b", "Beta", "720p"));
        session.complete(0, ok);
        session.complete(1, bad);
        session.close();
        session
    }

    #[test]
    fn report_lists_failures_and_fallbacks() {
        let report = build_report(&finished_session());
        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.counts.total, 3);
        assert!(report.counts.is_consistent());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].reason, "private: members only");
        assert_eq!(report.fallbacks.len(), 1);
        assert_eq!(report.fallbacks[0].from, "720p");
        assert_eq!(report.fallbacks[0].to.as_deref(), Some("480p"));
        assert_eq!(report.total_bytes, 2048);
        assert_eq!(report.videos.len(), 3);
    }

    #[test]
    fn building_is_pure() {
        let session = finished_session();
        assert_eq!(build_report(&session), build_report(&session));
        assert_eq!(
            build_report(&session).to_json().unwrap(),
            build_report(&session).to_json().unwrap()
        );
    }

    #[test]
    fn json_uses_camel_case() {
        let json = build_report(&finished_session()).to_json().unwrap();
        assert!(json.contains("\"schemaVersion\": \"1.1.0\""));
        assert!(json.contains("\"playlistUrl\""));
        assert!(json.contains("\"failureReason\""));
        assert!(json.contains("\"from\": \"720p\""));
        assert!(json.contains("\"to\": \"480p\""));
    }

    #[test]
    fn save_writes_report() {
        let dir = TempDir::new().unwrap();
        let report = build_report(&finished_session());
        let path = report.save(dir.path()).unwrap();
        let loaded: Report = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded.counts, report.counts);
        assert!(!dir.path().join("report.json.tmp").exists());
    }

    #[test]
    fn summary_mentions_failures() {
        let summary = build_report(&finished_session()).summary();
        assert!(summary.contains("1 ok, 1 failed, 1 skipped (3 total)"));
        assert!(summary.contains("failed  b (Beta): private: members only"));
        assert!(summary.contains("fallback a: 720p -> 480p"));
    }

    #[test]
    fn summary_shows_elapsed_time() {
        let mut session = finished_session();
        session.ended = Some(session.started + chrono::Duration::seconds(65));
        let report = build_report(&session);
        assert_eq!(report.elapsed(), Some(Duration::from_secs(65)));
        assert!(report.summary().lines().next().unwrap().ends_with(" in 1m 05s"));

        session.ended = None;
        let open = build_report(&session);
        assert!(open.elapsed().is_none());
        assert!(!open.summary().contains(" in "));
    }
}
