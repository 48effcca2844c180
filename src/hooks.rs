//! Session lifecycle hooks.
//!
//! Hooks observe a run; they cannot change it. Every call is isolated: an
//! error or panic inside a hook becomes a failed [`HookResult`] and the
//! pipeline carries on.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::MediaItem;
use crate::report::build_report;
use crate::session::Session;

/// Error type hooks report back.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Lifecycle point a hook was invoked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    CollectionStart,
    ItemComplete,
    CollectionComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookStatus {
    Success,
    Failed,
}

/// Outcome of one hook invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookResult {
    pub name: String,
    pub phase: HookPhase,
    pub status: HookStatus,
    pub error: Option<String>,
}

/// Observer of session lifecycle events. All methods default to no-ops.
pub trait SessionHook: Send + Sync {
    fn name(&self) -> &str;

    fn on_collection_start(&self, _session: &Session) -> Result<(), HookError> {
        Ok(())
    }

    fn on_item_complete(&self, _item: &MediaItem) -> Result<(), HookError> {
        Ok(())
    }

    fn on_collection_complete(&self, _session: &Session) -> Result<(), HookError> {
        Ok(())
    }
}

/// Ordered set of hooks invoked by the orchestrator.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn SessionHook>>,
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn SessionHook>) {
        self.hooks.push(hook);
    }

    #[must_use]
    pub fn with(mut self, hook: Arc<dyn SessionHook>) -> Self {
        self.register(hook);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn run_collection_start(&self, session: &Session) -> Vec<HookResult> {
        self.run_all(HookPhase::CollectionStart, |hook| hook.on_collection_start(session))
    }

    pub fn run_item_complete(&self, item: &MediaItem) -> Vec<HookResult> {
        self.run_all(HookPhase::ItemComplete, |hook| hook.on_item_complete(item))
    }

    pub fn run_collection_complete(&self, session: &Session) -> Vec<HookResult> {
        self.run_all(HookPhase::CollectionComplete, |hook| hook.on_collection_complete(session))
    }

    fn run_all<F>(&self, phase: HookPhase, call: F) -> Vec<HookResult>
    where
        F: Fn(&dyn SessionHook) -> Result<(), HookError>,
    {
        self.hooks
            .iter()
            .map(|hook| {
                let name = hook.name().to_string();
                let outcome = catch_unwind(AssertUnwindSafe(|| call(hook.as_ref())));
                let error = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(panic) => Some(panic_message(panic.as_ref())),
                };
                if let Some(error) = &error {
                    log::warn!("Hook '{name}' failed during {phase:?}: {error}");
                }
                HookResult {
                    name,
                    phase,
                    status: if error.is_some() { HookStatus::Failed } else { HookStatus::Success },
                    error,
                }
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(|| "hook panicked".to_string(), |msg| format!("hook panicked: {msg}"))
}

/// Logs lifecycle events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHook;

impl SessionHook for LoggingHook {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_collection_start(&self, session: &Session) -> Result<(), HookError> {
        log::info!(
            "Session {} started for {} ({} items)",
            session.session_id,
            session.playlist_url,
            session.items.len()
        );
        Ok(())
    }

    fn on_item_complete(&self, item: &MediaItem) -> Result<(), HookError> {
        log::info!("[{}] {} -> {}", item.index, item.title, item.status);
        Ok(())
    }

    fn on_collection_complete(&self, session: &Session) -> Result<(), HookError> {
        let counts = session.counts();
        log::info!(
            "Session {} finished: {} ok, {} failed, {} skipped, {} fallbacks",
            session.session_id,
            counts.success,
            counts.failed,
            counts.skipped,
            counts.fallbacks
        );
        Ok(())
    }
}

/// Writes `report.json` into a directory when the collection completes.
#[derive(Debug, Clone)]
pub struct ReportHook {
    dir: PathBuf,
}

impl ReportHook {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SessionHook for ReportHook {
    fn name(&self) -> &str {
        "report"
    }

    fn on_collection_complete(&self, session: &Session) -> Result<(), HookError> {
        let path = build_report(session).save(&self.dir)?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }
}
