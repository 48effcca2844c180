//! Session orchestration: planning, the bounded worker pool and per-item processing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;

use crate::captions::CaptionPipeline;
use crate::config::DownloadConfig;
use crate::error::{Error, ErrorKind, RetrievalError, Result};
use crate::filter::{self, IndexRange};
use crate::fs::{FileSystem, TokioFileSystem};
use crate::hooks::{HookRegistry, HookStatus};
use crate::manifest::Manifest;
use crate::model::{CollectionEntry, ItemStatus, MediaItem};
use crate::naming;
use crate::plan::Plan;
use crate::quality;
use crate::retry::RetryPolicy;
use crate::service::{MediaRetrieval, TranscriptService, TransferRequest};
use crate::session::Session;
use crate::stats::TransferTracker;
use crate::url::canonicalize_id;

/// Trait for receiving download progress updates.
///
/// All methods have default no-op implementations for convenience.
pub trait DownloadProgress: Send + Sync {
    /// Called when a worker picks up an item.
    fn on_item_start(&self, _item: &MediaItem) {}

    /// Called with cumulative bytes for the item's transfer and the current speed.
    fn on_progress(&self, _video_id: &str, _downloaded: u64, _total: u64, _speed: u64) {}

    /// Called before the backoff sleep that follows a failed attempt.
    fn on_retry(&self, _video_id: &str, _attempt: u32, _error: &RetrievalError) {}

    /// Called once the item reached a terminal status.
    fn on_item_complete(&self, _item: &MediaItem) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl DownloadProgress for NoProgress {}

/// Returns the staging path a transfer writes to before it is renamed.
fn part_path(output_dir: &Path, id: &str) -> PathBuf {
    output_dir.join(naming::fit_name(".", &naming::sanitize(id), ".part"))
}

/// Runs download sessions against a media retrieval service.
pub struct Downloader<F: FileSystem + 'static = TokioFileSystem> {
    retrieval: Arc<dyn MediaRetrieval>,
    transcripts: Option<Arc<dyn TranscriptService>>,
    config: DownloadConfig,
    retry: RetryPolicy,
    hooks: HookRegistry,
    fs: Arc<F>,
    cancel: CancellationToken,
}

impl Downloader<TokioFileSystem> {
    /// Creates a new downloader with the default file system.
    #[must_use]
    pub fn new(retrieval: Arc<dyn MediaRetrieval>, config: DownloadConfig) -> Self {
        Self::with_fs(retrieval, config, TokioFileSystem)
    }
}

impl<F: FileSystem + 'static> Downloader<F> {
    /// Creates a new downloader with a custom file system implementation.
    #[must_use]
    pub fn with_fs(retrieval: Arc<dyn MediaRetrieval>, config: DownloadConfig, fs: F) -> Self {
        Self {
            retrieval,
            transcripts: None,
            retry: RetryPolicy::from_config(&config),
            config,
            hooks: HookRegistry::new(),
            fs: Arc::new(fs),
            cancel: CancellationToken::new(),
        }
    }

    /// Enables caption acquisition through `service`.
    #[must_use]
    pub fn with_transcripts(mut self, service: Arc<dyn TranscriptService>) -> Self {
        self.transcripts = Some(service);
        self
    }

    /// Replaces the lifecycle hooks invoked during a run.
    #[must_use]
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    /// Returns a reference to the download configuration.
    #[must_use]
    pub const fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Token that stops every session started by this downloader.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops submission of further batches. In-flight items still finish.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Lists, filters and resume-checks `source` without transferring anything.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad configuration, or a collection
    /// error when the source cannot be listed.
    pub async fn plan(&self, source: &str) -> Result<Plan> {
        let (items, _) = self.prepare(source).await?;
        Ok(Plan::new(
            source,
            &self.config.quality_order,
            self.config.audio_only,
            &items,
        ))
    }

    /// Processes every planned item of `source` and returns the closed session.
    ///
    /// Item failures never abort the run; they end up as `failed` items.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, the output directory cannot be
    /// created, or the collection cannot be listed.
    pub async fn run(&self, source: &str, progress: &Arc<dyn DownloadProgress>) -> Result<Session> {
        self.config.validate()?;
        self.fs.create_dir_all(&self.config.output_dir).await?;

        let (items, mut manifest) = self.prepare(source).await?;
        manifest.set_source(source);

        let mut session = Session::start(source, &self.config, items);
        let results = self.hooks.run_collection_start(&session);
        session.hook_results.extend(results);

        let token = self.cancel.child_token();
        let deadline = self.config.session_deadline().map(|limit| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                log::warn!("Session deadline of {limit:?} reached, stopping submission");
                token.cancel();
            })
        });

        let captions = self.caption_pipeline();
        let pending = session.pending_slots();
        log::info!(
            "Processing {} of {} items from {source} ({} concurrent)",
            pending.len(),
            session.items.len(),
            self.config.max_concurrency
        );

        for batch in pending.chunks(self.config.effective_batch_size()) {
            if token.is_cancelled() {
                break;
            }
            let work: Vec<(usize, MediaItem)> = batch
                .iter()
                .map(|&slot| (slot, session.items[slot].clone()))
                .collect();

            let mut completions = stream::iter(work)
                .map(|(slot, item)| {
                    let captions = captions.as_ref();
                    async move { (slot, self.process_item(item, progress, captions).await) }
                })
                .buffer_unordered(self.config.max_concurrency);

            while let Some((slot, item)) = completions.next().await {
                self.complete_item(&mut session, &mut manifest, &token, progress, slot, item);
            }

            if let Err(e) = manifest.save() {
                log::error!("Failed to save manifest {}: {e}", manifest.path().display());
            }
        }

        if let Some(handle) = deadline {
            handle.abort();
        }

        let unsubmitted = session.pending_slots().len();
        if unsubmitted > 0 && session.aborted.is_none() {
            let reason = if self.cancel.is_cancelled() {
                "cancelled"
            } else {
                "session deadline elapsed"
            };
            log::warn!("Session stopped early ({reason}); {unsubmitted} items were not submitted");
            session.aborted = Some(reason.to_string());
        }

        session.close();
        if let Err(e) = manifest.save() {
            log::error!("Failed to save manifest {}: {e}", manifest.path().display());
        }
        let results = self.hooks.run_collection_complete(&session);
        session.hook_results.extend(results);

        Ok(session)
    }

    fn caption_pipeline(&self) -> Option<CaptionPipeline> {
        let service = self.transcripts.as_ref()?;
        if !self.config.captions.enabled() {
            return None;
        }
        let fs: Arc<dyn FileSystem> = Arc::clone(&self.fs) as Arc<dyn FileSystem>;
        Some(CaptionPipeline::new(
            Arc::clone(service),
            fs,
            self.config.output_dir.clone(),
            self.config.captions.languages.clone(),
        ))
    }

    /// Validates, lists, builds, filters and resume-marks the items of `source`.
    async fn prepare(&self, source: &str) -> Result<(Vec<MediaItem>, Manifest)> {
        self.config.validate()?;
        let range = IndexRange::parse(self.config.index_range.as_deref())?;

        let entries = self.list_collection(source).await?;
        let preferred = self.config.preferred();
        let items = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                MediaItem::new(i + 1, entry.id, entry.title, preferred)
                    .with_audio_only(self.config.audio_only)
            })
            .collect();
        let mut items = filter::select(items, &self.config.filters, range);

        let manifest = Manifest::load(&self.config.output_dir);
        if self.config.resume && !manifest.is_empty() {
            let skips = manifest
                .compute_skips(&self.config.output_dir, self.fs.as_ref())
                .await;
            for item in items.iter_mut().filter(|i| skips.contains(&i.video_id)) {
                item.status = ItemStatus::Skipped;
                if let Some(entry) = manifest.entry(&item.video_id) {
                    item.selected_quality.clone_from(&entry.quality);
                    item.filename.clone_from(&entry.filename);
                }
            }
            if !skips.is_empty() {
                log::info!("Resuming: {} items already downloaded", skips.len());
            }
        }
        Ok((items, manifest))
    }

    async fn list_collection(&self, source: &str) -> Result<Vec<CollectionEntry>> {
        let attempted = self
            .retry
            .run(
                |_| self.retrieval.list_collection(source),
                |attempt, e| log::warn!("Listing {source} failed (attempt {attempt}): {e}"),
            )
            .await;
        attempted.result.map_err(|reason| Error::Collection {
            source_id: source.to_string(),
            reason,
        })
    }

    /// Applies one terminal item to the manifest, the session and observers.
    fn complete_item(
        &self,
        session: &mut Session,
        manifest: &mut Manifest,
        token: &CancellationToken,
        progress: &Arc<dyn DownloadProgress>,
        slot: usize,
        item: MediaItem,
    ) {
        if let Some(reason) = item
            .failure_reason
            .as_ref()
            .filter(|r| r.kind == ErrorKind::SourceUnavailable)
            && session.aborted.is_none()
        {
            log::error!("Source unavailable, no further items will be submitted: {reason}");
            session.aborted = Some(format!("source unavailable: {}", reason.message));
            token.cancel();
        }

        match item.status {
            ItemStatus::Failed => log::warn!(
                "[{}] {} failed: {}",
                item.index,
                item.video_id,
                item.failure_reason
                    .as_ref()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string)
            ),
            _ => log::info!(
                "[{}] {} -> {}{}",
                item.index,
                item.video_id,
                item.selected_quality.as_deref().unwrap_or("?"),
                if item.fallback_applied { " (fallback)" } else { "" }
            ),
        }

        manifest.record(&item);
        progress.on_item_complete(&item);
        let failed_hooks = self
            .hooks
            .run_item_complete(&item)
            .into_iter()
            .filter(|r| r.status == HookStatus::Failed);
        session.hook_results.extend(failed_hooks);
        session.complete(slot, item);
    }

    /// Runs the full pipeline for one item and returns it in a terminal state.
    async fn process_item(
        &self,
        mut item: MediaItem,
        progress: &Arc<dyn DownloadProgress>,
        captions: Option<&CaptionPipeline>,
    ) -> MediaItem {
        progress.on_item_start(&item);
        let id = canonicalize_id(&item.video_id);
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let video_id = item.video_id.clone();

        let attempted = self
            .retry
            .run(
                |_| self.retrieval.fetch_metadata(&id, timeout),
                |attempt, e| progress.on_retry(&video_id, attempt, e),
            )
            .await;
        item.retries += attempted.retries();
        let metadata = match attempted.result {
            Ok(metadata) => metadata,
            Err(e) => {
                item.fail(e.into());
                return item;
            }
        };
        if item.title.trim().is_empty() && !metadata.title.is_empty() {
            item.title.clone_from(&metadata.title);
        }
        item.duration = metadata.duration;

        let chain = quality::build_chain(
            &item.preferred_quality,
            &self.config.quality_order,
            item.audio_only,
        );
        let staging = part_path(&self.config.output_dir, &id);
        let tracker = TransferTracker::new();
        let on_bytes = |downloaded: u64, total: u64| {
            let (_, speed) = tracker.observe(downloaded);
            progress.on_progress(&video_id, downloaded, total, speed);
        };

        let attempted = self
            .retry
            .run(
                |_| {
                    let request = TransferRequest {
                        id: &id,
                        chain: &chain,
                        destination: &staging,
                        timeout,
                    };
                    self.retrieval.transfer(request, &on_bytes)
                },
                |attempt, e| progress.on_retry(&video_id, attempt, e),
            )
            .await;
        item.retries += attempted.retries();
        let format = match attempted.result {
            Ok(format) => format,
            Err(e) => {
                let _ = self.fs.remove_file(&staging).await;
                item.fail(e.into());
                return item;
            }
        };

        item.selected_quality = Some(format.quality_label());
        item.fallback_applied = quality::fell_back(&chain, &format);
        if !item.audio_only
            && quality::height_missing(&item.preferred_quality, &metadata.video_heights())
                != item.fallback_applied
        {
            log::debug!(
                "{}: advertised heights {:?} disagree with delivered format {}",
                item.video_id,
                metadata.video_heights(),
                format.format_id
            );
        }
        item.resolution = format.resolution();
        item.size_bytes = format
            .size_estimate
            .or_else(|| Some(tracker.downloaded()).filter(|b| *b > 0));

        let extension = if format.container.is_empty() {
            if item.audio_only { "m4a" } else { "mp4" }
        } else {
            format.container.as_str()
        };
        let filename = naming::fit_name(
            "",
            &naming::render(&self.config.naming_template, &item, None),
            &format!(".{extension}"),
        );
        if let Err(e) = self
            .fs
            .rename_file(&staging, &self.config.output_dir.join(&filename))
            .await
        {
            let _ = self.fs.remove_file(&staging).await;
            let reason = RetrievalError::new(
                ErrorKind::Other,
                format!("could not move {filename} into place: {e}"),
            );
            item.fail(reason.into());
            return item;
        }
        item.filename = Some(filename);
        item.status = ItemStatus::Success;

        if let Some(captions) = captions {
            let wanted = &self.config.captions;
            item.captions = captions.obtain(&item, wanted.manual, wanted.auto).await;
        }
        item
    }
}
