//! On-disk checkpoint of per-item outcomes, used for resume.
//!
//! The manifest is a hint: an entry only counts as "already downloaded" when
//! its recorded file still exists in the output directory.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fs::FileSystem;
use crate::model::{ItemStatus, MediaItem};

/// Manifest file name inside the output directory.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Last known outcome of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub status: ItemStatus,
    pub quality: Option<String>,
    pub fallback: bool,
    pub retries: u32,
    pub filename: Option<String>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

/// Serialized manifest contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestData {
    #[serde(rename = "playlist_url", default)]
    pub source: Option<String>,
    #[serde(rename = "videos", default)]
    pub entries: BTreeMap<String, ManifestEntry>,
}

/// Item outcomes for one output directory.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    data: ManifestData,
}

impl Manifest {
    /// Creates an empty manifest stored in `dir`.
    #[must_use]
    pub fn empty(dir: &Path) -> Self {
        Self {
            path: dir.join(MANIFEST_FILENAME),
            data: ManifestData::default(),
        }
    }

    /// Loads the manifest from `dir`.
    ///
    /// A missing file yields an empty manifest. So does an unreadable or
    /// unparsable one: the session then proceeds without history.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        let mut manifest = Self::empty(dir);
        match std::fs::read_to_string(&manifest.path) {
            Ok(contents) => match serde_json::from_str::<ManifestData>(&contents) {
                Ok(data) => manifest.data = data,
                Err(e) => log::warn!(
                    "Ignoring corrupted manifest {}: {e}",
                    manifest.path.display()
                ),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not read manifest {}: {e}", manifest.path.display()),
        }
        manifest
    }

    /// Path of the manifest file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity of the collection last written to this manifest.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.data.source.as_deref()
    }

    pub fn set_source(&mut self, source: &str) {
        self.data.source = Some(source.to_string());
    }

    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&ManifestEntry> {
        self.data.entries.get(id)
    }

    #[must_use]
    pub const fn entries(&self) -> &BTreeMap<String, ManifestEntry> {
        &self.data.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.entries.is_empty()
    }

    /// Records a processed item. Pending and skipped items leave the entry untouched.
    pub fn record(&mut self, item: &MediaItem) {
        if !matches!(item.status, ItemStatus::Success | ItemStatus::Failed) {
            return;
        }
        self.data.entries.insert(
            item.video_id.clone(),
            ManifestEntry {
                status: item.status,
                quality: item.selected_quality.clone(),
                fallback: item.fallback_applied,
                retries: item.retries,
                filename: item.filename.clone(),
                updated: Some(Utc::now()),
            },
        );
    }

    /// Writes the manifest atomically (write tmp + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be serialized or written.
    pub fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&self.data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)
    }

    /// Identities recorded as `success` whose file still exists under `dir`.
    pub async fn compute_skips(&self, dir: &Path, fs: &dyn FileSystem) -> HashSet<String> {
        let mut skips = HashSet::new();
        for (id, entry) in &self.data.entries {
            if entry.status != ItemStatus::Success {
                continue;
            }
            let Some(filename) = entry.filename.as_deref().filter(|f| !f.is_empty()) else {
                continue;
            };
            if fs.file_exists(&dir.join(filename)).await {
                skips.insert(id.clone());
            }
        }
        skips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::TokioFileSystem;
    use tempfile::TempDir;

    fn item(id: &str, status: ItemStatus, filename: &str) -> MediaItem {
        let mut v = MediaItem::new(1, id, "T", "720p");
        v.status = status;
        v.filename = Some(filename.to_string());
        v.selected_quality = Some("720p".into());
        v
    }

    #[test]
    fn load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let m = Manifest::load(dir.path());
        assert!(m.is_empty());
        assert!(m.source().is_none());
    }

    #[test]
    fn load_corrupted_is_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILENAME), "not json").unwrap();
        let m = Manifest::load(dir.path());
        assert!(m.is_empty());
    }

    #[test]
    fn load_wrong_shape_is_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILENAME),
            r#"{"videos": {"a": {"status": "exploded"}}}"#,
        )
        .unwrap();
        assert!(Manifest::load(dir.path()).is_empty());
    }

    #[test]
    fn round_trip_many_entries() {
        let dir = TempDir::new().unwrap();
        let mut m = Manifest::load(dir.path());
        m.set_source("https://example.com/playlist?list=PL1");
        for i in 0..25 {
            let status = if i % 3 == 0 { ItemStatus::Failed } else { ItemStatus::Success };
            m.record(&item(&format!("v{i}"), status, &format!("{i:03}.mp4")));
        }
        m.save().unwrap();

        let loaded = Manifest::load(dir.path());
        assert_eq!(loaded.len(), 25);
        assert_eq!(loaded.entries(), m.entries());
        assert_eq!(loaded.source(), Some("https://example.com/playlist?list=PL1"));
        assert!(!dir.path().join("manifest.json.tmp").exists());
    }

    #[test]
    fn reads_legacy_layout() {
        let dir = TempDir::new().unwrap();
        let json = r#"{
            "playlist_url": "https://playlist.example/id",
            "videos": {
                "vid1": {"status": "success", "quality": "720p", "fallback": false, "retries": 0, "filename": "001-vid1.mp4"},
                "vid2": {"status": "failed", "quality": "720p", "fallback": false, "retries": 1, "filename": "002-vid2.mp4"}
            }
        }"#;
        std::fs::write(dir.path().join(MANIFEST_FILENAME), json).unwrap();
        let m = Manifest::load(dir.path());
        assert_eq!(m.len(), 2);
        assert_eq!(m.entry("vid2").unwrap().retries, 1);
        assert!(m.entry("vid1").unwrap().updated.is_none());
    }

    #[test]
    fn record_ignores_non_processed_items() {
        let dir = TempDir::new().unwrap();
        let mut m = Manifest::empty(dir.path());
        m.record(&item("ok", ItemStatus::Success, "a.mp4"));
        m.record(&item("ok", ItemStatus::Skipped, "b.mp4"));
        m.record(&item("p", ItemStatus::Pending, "c.mp4"));
        assert_eq!(m.len(), 1);
        assert_eq!(m.entry("ok").unwrap().filename.as_deref(), Some("a.mp4"));
    }

    #[tokio::test]
    async fn compute_skips_requires_file_on_disk() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("present.mp4"), "x").unwrap();

        let mut m = Manifest::empty(dir.path());
        m.record(&item("present", ItemStatus::Success, "present.mp4"));
        m.record(&item("missing", ItemStatus::Success, "missing.mp4"));
        m.record(&item("failed", ItemStatus::Failed, "present.mp4"));

        let skips = m.compute_skips(dir.path(), &TokioFileSystem).await;
        assert!(skips.contains("present"));
        assert!(!skips.contains("missing"));
        assert!(!skips.contains("failed"));
    }
}
