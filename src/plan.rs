//! Dry-run plan: what a session would do, without transferring anything.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{ItemStatus, MediaItem};

/// One item in a dry-run plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedItem {
    pub index: usize,
    pub video_id: String,
    pub title: String,
    pub preferred_quality: String,
    pub selected_quality: Option<String>,
    pub fallback: bool,
    pub estimated_size: Option<u64>,
    /// Already downloaded; a real run would skip it.
    pub skip: bool,
}

impl From<&MediaItem> for PlannedItem {
    fn from(item: &MediaItem) -> Self {
        Self {
            index: item.index,
            video_id: item.video_id.clone(),
            title: item.title.clone(),
            preferred_quality: item.preferred_quality.clone(),
            selected_quality: item.selected_quality.clone(),
            fallback: item.fallback_applied,
            estimated_size: item.size_bytes,
            skip: item.status == ItemStatus::Skipped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub mode: String,
    pub playlist_url: String,
    pub quality_order: Vec<String>,
    pub audio_only: bool,
    pub videos: Vec<PlannedItem>,
}

impl Plan {
    #[must_use]
    pub fn new(playlist_url: &str, quality_order: &[String], audio_only: bool, items: &[MediaItem]) -> Self {
        Self {
            mode: "dry-run".to_string(),
            playlist_url: playlist_url.to_string(),
            quality_order: quality_order.to_vec(),
            audio_only,
            videos: items.iter().map(PlannedItem::from).collect(),
        }
    }

    /// Items a real run would transfer.
    pub fn to_download(&self) -> impl Iterator<Item = &PlannedItem> {
        self.videos.iter().filter(|v| !v.skip)
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_items_flagged() {
        let mut done = MediaItem::new(2, "b", "B", "720p");
        done.status = ItemStatus::Skipped;
        let items = vec![MediaItem::new(1, "a", "A", "720p"), done];
        let plan = Plan::new("pl", &["720p".to_string()], false, &items);

        assert_eq!(plan.mode, "dry-run");
        assert!(!plan.videos[0].skip);
        assert!(plan.videos[1].skip);
        assert_eq!(plan.to_download().count(), 1);

        let json = plan.to_json().unwrap();
        assert!(json.contains("\"playlistUrl\": \"pl\""));
        assert!(json.contains("\"preferredQuality\": \"720p\""));
    }
}
