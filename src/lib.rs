//! playlist-dl - A library for downloading media playlists.
//!
//! This library plans a collection into items, runs them through a bounded
//! worker pool with quality fallback and retries, checkpoints outcomes to a
//! resumable manifest and aggregates a session report. The byte-level media
//! retrieval and caption text are supplied by the caller through the
//! [`MediaRetrieval`] and [`TranscriptService`] traits.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use playlist_dl::{
//!     DownloadConfig, DownloadProgress, Downloader, HookRegistry, MediaRetrieval, NoProgress,
//!     ReportHook, build_report,
//! };
//!
//! # async fn example(service: Arc<dyn MediaRetrieval>) -> playlist_dl::Result<()> {
//! let config = DownloadConfig::default()
//!     .with_preferred_quality("720p")
//!     .with_output_dir("downloads");
//!
//! let hooks = HookRegistry::new().with(Arc::new(ReportHook::new("downloads")));
//! let downloader = Downloader::new(service, config).with_hooks(hooks);
//!
//! let progress: Arc<dyn DownloadProgress> = Arc::new(NoProgress);
//! let session = downloader
//!     .run("https://www.youtube.com/playlist?list=PL123", &progress)
//!     .await?;
//! println!("{}", build_report(&session).summary());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod captions;
pub mod config;
pub mod download;
pub mod error;
pub mod filter;
pub mod format;
pub mod fs;
pub mod hooks;
pub mod logging;
pub mod manifest;
pub mod model;
pub mod naming;
pub mod plan;
pub mod quality;
pub mod report;
pub mod retry;
pub mod service;
pub mod session;
pub mod stats;
pub mod url;

// Re-export main types for convenience
pub use captions::CaptionPipeline;
pub use config::{CaptionConfig, DownloadConfig};
pub use download::{DownloadProgress, Downloader, NoProgress};
pub use error::{Error, ErrorKind, FailureReason, Result, RetrievalError, ValidationError};
pub use fs::{FileSystem, TokioFileSystem};
pub use hooks::{HookError, HookPhase, HookRegistry, HookResult, HookStatus, LoggingHook, ReportHook, SessionHook};
pub use manifest::Manifest;
pub use model::{CaptionKind, CaptionTrack, CollectionEntry, FormatDescriptor, ItemStatus, MediaItem, MediaMetadata};
pub use plan::{Plan, PlannedItem};
pub use quality::FormatSelector;
pub use report::{Report, build_report};
pub use retry::RetryPolicy;
pub use service::{MediaRetrieval, TranscriptOutcome, TranscriptSegment, TranscriptService, TransferRequest};
pub use session::Session;
pub use stats::{Counts, CountsTracker};
