//! Configuration types for playlist download sessions.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::filter::IndexRange;

/// Quality tokens tried in order when nothing else is configured.
pub const DEFAULT_QUALITY_ORDER: [&str; 6] = ["1080p", "720p", "480p", "360p", "240p", "144p"];

/// Which caption kinds to fetch for successfully downloaded items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Request manually authored tracks.
    pub manual: bool,
    /// Request auto-generated tracks.
    pub auto: bool,
    /// Language codes tried in order.
    pub languages: Vec<String>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            manual: false,
            auto: false,
            languages: vec!["en".to_string()],
        }
    }
}

impl CaptionConfig {
    /// Returns true if any caption kind was requested.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.manual || self.auto
    }
}

/// Configuration for a download session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Quality tokens in fallback order, most preferred first.
    pub quality_order: Vec<String>,
    /// Requested quality; the head of `quality_order` when unset.
    pub preferred_quality: Option<String>,
    /// Number of items processed concurrently.
    pub max_concurrency: usize,
    /// Items submitted per batch; `2 * max_concurrency` when unset.
    pub batch_size: Option<usize>,
    /// Per-call timeout handed to the retrieval service.
    pub timeout_seconds: u64,
    /// Maximum attempts per retrieval call, including the first.
    pub retry_attempts: u32,
    /// Base delay for linear backoff between attempts.
    pub retry_base_delay_ms: u64,
    /// Directory where media, captions, manifest and report are written.
    pub output_dir: PathBuf,
    /// Fetch audio only.
    pub audio_only: bool,
    /// Destination filename template.
    pub naming_template: String,
    /// Skip items the manifest already records as downloaded.
    pub resume: bool,
    /// Case-insensitive title substrings; any match keeps an item.
    pub filters: Vec<String>,
    /// Inclusive 1-based `start:end` range.
    pub index_range: Option<String>,
    /// Caption acquisition settings.
    pub captions: CaptionConfig,
    /// Optional global deadline after which no new batches are submitted.
    pub session_deadline_seconds: Option<u64>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            quality_order: DEFAULT_QUALITY_ORDER.iter().map(ToString::to_string).collect(),
            preferred_quality: None,
            max_concurrency: 4,
            batch_size: None,
            timeout_seconds: 10,
            retry_attempts: 3,
            retry_base_delay_ms: 1000,
            output_dir: PathBuf::from("downloads"),
            audio_only: false,
            naming_template: "{index:03d}-{title}".to_string(),
            resume: true,
            filters: Vec::new(),
            index_range: None,
            captions: CaptionConfig::default(),
            session_deadline_seconds: None,
        }
    }
}

impl DownloadConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `preferred` to the front of the default quality order.
    #[must_use]
    pub fn quality_order_for(preferred: &str) -> Vec<String> {
        std::iter::once(preferred.to_string())
            .chain(
                DEFAULT_QUALITY_ORDER
                    .iter()
                    .filter(|q| **q != preferred)
                    .map(ToString::to_string),
            )
            .collect()
    }

    /// Sets the preferred quality and reorders the fallback list around it.
    #[must_use]
    pub fn with_preferred_quality(mut self, quality: &str) -> Self {
        self.quality_order = Self::quality_order_for(quality);
        self.preferred_quality = Some(quality.to_string());
        self
    }

    /// Replaces the quality fallback order.
    #[must_use]
    pub fn with_quality_order(mut self, order: Vec<String>) -> Self {
        self.quality_order = order;
        self
    }

    /// Sets the number of concurrent item downloads.
    #[must_use]
    pub const fn with_max_concurrency(mut self, concurrent: usize) -> Self {
        self.max_concurrency = concurrent;
        self
    }

    /// Sets the submission batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Sets the retry budget and backoff base.
    #[must_use]
    pub const fn with_retry(mut self, attempts: u32, base_delay_ms: u64) -> Self {
        self.retry_attempts = attempts;
        self.retry_base_delay_ms = base_delay_ms;
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets audio-only mode.
    #[must_use]
    pub const fn with_audio_only(mut self, audio_only: bool) -> Self {
        self.audio_only = audio_only;
        self
    }

    /// Sets the filename template.
    #[must_use]
    pub fn with_naming_template(mut self, template: impl Into<String>) -> Self {
        self.naming_template = template.into();
        self
    }

    /// Sets whether manifest-based resume is enabled.
    #[must_use]
    pub const fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Sets title filters and the index range.
    #[must_use]
    pub fn with_selection(mut self, filters: Vec<String>, index_range: Option<String>) -> Self {
        self.filters = filters;
        self.index_range = index_range;
        self
    }

    /// Sets caption acquisition settings.
    #[must_use]
    pub fn with_captions(mut self, captions: CaptionConfig) -> Self {
        self.captions = captions;
        self
    }

    /// Sets a global session deadline.
    #[must_use]
    pub const fn with_session_deadline(mut self, seconds: u64) -> Self {
        self.session_deadline_seconds = Some(seconds);
        self
    }

    /// The quality token requested for every item.
    #[must_use]
    pub fn preferred(&self) -> &str {
        self.preferred_quality
            .as_deref()
            .or_else(|| self.quality_order.first().map(String::as_str))
            .unwrap_or("best")
    }

    /// Effective batch size.
    #[must_use]
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size
            .unwrap_or_else(|| self.max_concurrency.saturating_mul(2))
            .max(1)
    }

    /// Backoff base as a `Duration`.
    #[must_use]
    pub const fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Global deadline, if configured.
    #[must_use]
    pub fn session_deadline(&self) -> Option<Duration> {
        self.session_deadline_seconds.map(Duration::from_secs)
    }

    /// Checks the configuration before any work is scheduled.
    ///
    /// # Errors
    ///
    /// Returns a validation error for zero concurrency, an empty quality
    /// order, a zero retry budget, or a malformed index range.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(ValidationError::Config("max_concurrency must be at least 1".into()).into());
        }
        if self.quality_order.is_empty() {
            return Err(ValidationError::Config("quality_order must not be empty".into()).into());
        }
        if self.retry_attempts == 0 {
            return Err(ValidationError::Config("retry_attempts must be at least 1".into()).into());
        }
        IndexRange::parse(self.index_range.as_deref())?;
        Ok(())
    }

    /// Default location of the config file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("playlist-dl")
            .join("config.toml")
    }

    /// Loads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads from `path`, falling back to defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            log::info!("Loaded config from {}", path.display());
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// JSON snapshot stored alongside session results.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_download_config() {
        let config = DownloadConfig::default();
        assert_eq!(config.quality_order[0], "1080p");
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.effective_batch_size(), 8);
        assert_eq!(config.preferred(), "1080p");
        assert!(config.resume);
        assert!(!config.captions.enabled());
    }

    #[test]
    fn builder_pattern() {
        let config = DownloadConfig::new()
            .with_preferred_quality("480p")
            .with_max_concurrency(2)
            .with_batch_size(3)
            .with_retry(5, 0)
            .with_audio_only(true)
            .with_resume(false);

        assert_eq!(config.preferred(), "480p");
        assert_eq!(config.quality_order[0], "480p");
        assert_eq!(config.quality_order.len(), 6);
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.effective_batch_size(), 3);
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.retry_base_delay(), Duration::ZERO);
        assert!(config.audio_only);
        assert!(!config.resume);
    }

    #[test]
    fn quality_order_for_unknown_token_prepends() {
        let order = DownloadConfig::quality_order_for("4k");
        assert_eq!(order.len(), 7);
        assert_eq!(order[0], "4k");
        assert_eq!(order[1], "1080p");
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(DownloadConfig::default().validate().is_ok());
        assert!(DownloadConfig::default().with_max_concurrency(0).validate().is_err());
        assert!(DownloadConfig::default().with_quality_order(vec![]).validate().is_err());
        assert!(DownloadConfig::default().with_retry(0, 10).validate().is_err());
        assert!(
            DownloadConfig::default()
                .with_selection(vec![], Some("9:2".into()))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn download_config_serializes_to_toml() {
        let config = DownloadConfig::default().with_captions(CaptionConfig {
            manual: true,
            auto: false,
            languages: vec!["de".into(), "en".into()],
        });
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: DownloadConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: DownloadConfig = toml::from_str("max_concurrency = 8\naudio_only = true\n").unwrap();
        assert_eq!(config.max_concurrency, 8);
        assert!(config.audio_only);
        assert_eq!(config.naming_template, "{index:03d}-{title}");
    }

    #[test]
    fn load_or_default_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DownloadConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, DownloadConfig::default());
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_concurrency = \"many\"").unwrap();
        assert!(DownloadConfig::load(&path).is_err());
    }

    #[test]
    fn default_path_is_under_config_dir() {
        let path = DownloadConfig::default_path();
        assert!(path.to_string_lossy().contains("playlist-dl"));
    }

    #[test]
    fn snapshot_contains_fields() {
        let snap = DownloadConfig::default().snapshot();
        assert_eq!(snap["max_concurrency"], 4);
        assert_eq!(snap["naming_template"], "{index:03d}-{title}");
    }
}
