//! Boundaries to the external media retrieval and transcript services.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RetrievalError;
use crate::model::{CaptionKind, CollectionEntry, FormatDescriptor, MediaMetadata};
use crate::quality::FormatSelector;

/// Progress callback invoked with `(bytes_downloaded, bytes_total)`.
pub type TransferProgressFn<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// A single transfer request handed to [`MediaRetrieval::transfer`].
#[derive(Debug, Clone, Copy)]
pub struct TransferRequest<'a> {
    /// Canonical item identity.
    pub id: &'a str,
    /// Selectors to try, most preferred first.
    pub chain: &'a [FormatSelector],
    /// Staging path the service writes to.
    pub destination: &'a Path,
    /// Per-call timeout.
    pub timeout: Duration,
}

/// Media listing, metadata resolution and byte transfer.
#[async_trait]
pub trait MediaRetrieval: Send + Sync {
    /// Lists the entries of a collection in source order.
    async fn list_collection(&self, source: &str) -> Result<Vec<CollectionEntry>, RetrievalError>;

    /// Resolves metadata for one canonical item identity.
    async fn fetch_metadata(&self, id: &str, timeout: Duration) -> Result<MediaMetadata, RetrievalError>;

    /// Transfers the first satisfiable selector in the chain to the destination.
    ///
    /// Returns the format that was actually written.
    async fn transfer(
        &self,
        request: TransferRequest<'_>,
        progress: TransferProgressFn<'_>,
    ) -> Result<FormatDescriptor, RetrievalError>;
}

/// One timed caption cue.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

/// Result of a transcript lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptOutcome {
    Found(Vec<TranscriptSegment>),
    /// No track for this language and kind.
    NotAvailable,
    /// Captions are turned off for the item entirely.
    Disabled,
}

/// Caption text acquisition.
#[async_trait]
pub trait TranscriptService: Send + Sync {
    async fn fetch(&self, id: &str, language: &str, kind: CaptionKind) -> TranscriptOutcome;
}
