//! Manual-then-auto caption acquisition for downloaded items.

use std::path::PathBuf;
use std::sync::Arc;

use crate::format::format_srt_timestamp;
use crate::fs::FileSystem;
use crate::model::{CaptionKind, CaptionTrack, MediaItem};
use crate::naming::sanitize;
use crate::service::{TranscriptOutcome, TranscriptSegment, TranscriptService};
use crate::url::canonicalize_id;

/// Subdirectory of the output directory holding caption files.
pub const CAPTIONS_DIR: &str = "captions";

/// Fetches caption tracks and writes them as SRT files.
pub struct CaptionPipeline {
    service: Arc<dyn TranscriptService>,
    fs: Arc<dyn FileSystem>,
    output_dir: PathBuf,
    languages: Vec<String>,
}

impl CaptionPipeline {
    /// Creates a pipeline; an empty language list means `["en"]`.
    pub fn new(
        service: Arc<dyn TranscriptService>,
        fs: Arc<dyn FileSystem>,
        output_dir: impl Into<PathBuf>,
        languages: Vec<String>,
    ) -> Self {
        let languages = if languages.is_empty() {
            vec!["en".to_string()]
        } else {
            languages
        };
        Self {
            service,
            fs,
            output_dir: output_dir.into(),
            languages,
        }
    }

    /// Returns the caption tracks for `item`.
    ///
    /// A manual track wins outright. Otherwise an auto track is fetched when
    /// auto was requested, and also when only manual was requested: a manual-only
    /// request with no manual track falls back to an auto track rather than
    /// returning nothing.
    pub async fn obtain(&self, item: &MediaItem, want_manual: bool, want_auto: bool) -> Vec<CaptionTrack> {
        if want_manual && let Some(track) = self.fetch_manual(item).await {
            return vec![track];
        }
        if (want_auto || want_manual)
            && let Some(track) = self.fetch_auto(item).await
        {
            if !want_auto {
                log::info!("No manual captions for {}, using auto-generated", item.video_id);
            }
            return vec![track];
        }
        Vec::new()
    }

    /// First manual track across the preferred languages.
    pub async fn fetch_manual(&self, item: &MediaItem) -> Option<CaptionTrack> {
        self.fetch_kind(item, CaptionKind::Manual).await
    }

    /// First auto-generated track across the preferred languages.
    pub async fn fetch_auto(&self, item: &MediaItem) -> Option<CaptionTrack> {
        self.fetch_kind(item, CaptionKind::Auto).await
    }

    async fn fetch_kind(&self, item: &MediaItem, kind: CaptionKind) -> Option<CaptionTrack> {
        let id = canonicalize_id(&item.video_id);
        for language in &self.languages {
            match self.service.fetch(&id, language, kind).await {
                TranscriptOutcome::Found(segments) => {
                    return match self.write(item, language, kind, &segments).await {
                        Ok(track) => Some(track),
                        Err(e) => {
                            log::warn!("Failed to write {kind} captions for {}: {e}", item.video_id);
                            None
                        }
                    };
                }
                TranscriptOutcome::NotAvailable => {}
                TranscriptOutcome::Disabled => {
                    log::debug!("Captions disabled for {}", item.video_id);
                    return None;
                }
            }
        }
        None
    }

    async fn write(
        &self,
        item: &MediaItem,
        language: &str,
        kind: CaptionKind,
        segments: &[TranscriptSegment],
    ) -> std::io::Result<CaptionTrack> {
        let filename = sanitize(&format!("{}.{language}.{kind}.srt", item.video_id));
        let path = self.output_dir.join(CAPTIONS_DIR).join(filename);
        self.fs.write_file(&path, render_srt(segments).as_bytes()).await?;
        Ok(CaptionTrack {
            video_id: item.video_id.clone(),
            language: language.to_string(),
            kind,
            format: "srt".to_string(),
            path: path.to_string_lossy().into_owned(),
        })
    }
}

/// Renders cues as SRT text.
#[must_use]
pub fn render_srt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_timestamp(seg.start),
            format_srt_timestamp(seg.start + seg.duration.max(0.0)),
            seg.text
        ));
    }
    out
}
