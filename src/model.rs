//! Items, caption tracks and media descriptors shared across the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FailureReason;

/// Lifecycle state of a [`MediaItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Pending,
    Success,
    Failed,
    Skipped,
}

impl ItemStatus {
    /// Returns true once the item can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a caption track was authored by a person or generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionKind {
    Manual,
    Auto,
}

impl CaptionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for CaptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caption file written for a downloaded item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub video_id: String,
    pub language: String,
    pub kind: CaptionKind,
    pub format: String,
    pub path: String,
}

/// One entry of a remote collection as returned by the listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    /// Opaque identity, possibly a full URL.
    pub id: String,
    /// Human title.
    pub title: String,
}

impl CollectionEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// One unit of work within a processed collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// 1-based position within the source collection.
    pub index: usize,
    pub video_id: String,
    pub title: String,
    pub preferred_quality: String,
    pub audio_only: bool,
    pub status: ItemStatus,
    pub selected_quality: Option<String>,
    pub failure_reason: Option<FailureReason>,
    pub fallback_applied: bool,
    pub retries: u32,
    pub size_bytes: Option<u64>,
    pub duration: Option<f64>,
    pub resolution: Option<String>,
    pub filename: Option<String>,
    pub captions: Vec<CaptionTrack>,
}

impl MediaItem {
    /// Creates a pending item.
    pub fn new(
        index: usize,
        video_id: impl Into<String>,
        title: impl Into<String>,
        preferred_quality: impl Into<String>,
    ) -> Self {
        Self {
            index,
            video_id: video_id.into(),
            title: title.into(),
            preferred_quality: preferred_quality.into(),
            audio_only: false,
            status: ItemStatus::Pending,
            selected_quality: None,
            failure_reason: None,
            fallback_applied: false,
            retries: 0,
            size_bytes: None,
            duration: None,
            resolution: None,
            filename: None,
            captions: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_audio_only(mut self, audio_only: bool) -> Self {
        self.audio_only = audio_only;
        self
    }

    /// Quality used for naming: the selected one once known.
    #[must_use]
    pub fn effective_quality(&self) -> &str {
        self.selected_quality
            .as_deref()
            .unwrap_or(&self.preferred_quality)
    }

    /// Moves the item to `failed`.
    pub fn fail(&mut self, reason: FailureReason) {
        self.status = ItemStatus::Failed;
        self.failure_reason = Some(reason);
    }
}

/// One downloadable rendition advertised in item metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Provider format identifier.
    pub format_id: String,
    /// Container / file extension, e.g. `mp4`.
    pub container: String,
    pub has_video: bool,
    pub has_audio: bool,
    pub height: Option<u32>,
    /// Bitrate in kbps.
    pub bitrate: Option<u32>,
    pub size_estimate: Option<u64>,
}

impl FormatDescriptor {
    /// Label recorded as the selected quality, e.g. `720p` or `audio`.
    #[must_use]
    pub fn quality_label(&self) -> String {
        match self.height {
            Some(h) if self.has_video => format!("{h}p"),
            _ if !self.has_video && self.has_audio => "audio".to_string(),
            _ => "best".to_string(),
        }
    }

    /// True when video and audio come in one stream.
    #[must_use]
    pub const fn is_combined(&self) -> bool {
        self.has_video && self.has_audio
    }

    #[must_use]
    pub fn resolution(&self) -> Option<String> {
        self.height.filter(|_| self.has_video).map(|h| format!("{h}p"))
    }
}

/// Resolved metadata for a single item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaMetadata {
    pub title: String,
    pub duration: Option<f64>,
    pub formats: Vec<FormatDescriptor>,
}

impl MediaMetadata {
    /// Distinct video heights advertised, highest first.
    #[must_use]
    pub fn video_heights(&self) -> Vec<u32> {
        let mut heights: Vec<u32> = self
            .formats
            .iter()
            .filter(|f| f.has_video)
            .filter_map(|f| f.height)
            .collect();
        heights.sort_unstable_by(|a, b| b.cmp(a));
        heights.dedup();
        heights
    }
}
