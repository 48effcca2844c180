//! Quality fallback chains.
//!
//! A chain is a declarative, ordered list of [`FormatSelector`]s handed to the
//! retrieval service. Nothing in here touches the network; the same request
//! and preference list always yield the same chain.

use std::fmt;

use crate::model::FormatDescriptor;

/// One acceptable rendition, most specific first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatSelector {
    /// Video at exactly this height, merged with the best audio.
    Height(u32),
    /// A provider-specific token passed through untouched.
    Named(String),
    /// Best single stream that already carries video and audio.
    BestCombined,
    /// Best of anything.
    Best,
    /// Best audio-only stream.
    BestAudio,
}

impl FormatSelector {
    /// Parses a quality token such as `720p`, `1080p60`, `4k` or `best`.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        let t = token.trim().to_ascii_lowercase();
        match t.as_str() {
            "best" => return Self::BestCombined,
            "audio" | "bestaudio" => return Self::BestAudio,
            "4k" | "2160p" => return Self::Height(2160),
            "8k" | "4320p" => return Self::Height(4320),
            "2k" => return Self::Height(1440),
            _ => {}
        }
        parse_height(&t).map_or_else(|| Self::Named(token.trim().to_string()), Self::Height)
    }

    /// Selector string in the retrieval service's format syntax.
    #[must_use]
    pub fn spec(&self) -> String {
        match self {
            Self::Height(h) => format!("bv*[height={h}]+ba/b[height={h}]"),
            Self::Named(name) => name.clone(),
            Self::BestCombined => "b".to_string(),
            Self::Best => "bv*+ba/b".to_string(),
            Self::BestAudio => "ba/b".to_string(),
        }
    }

    /// Whether `format` satisfies this selector.
    #[must_use]
    pub fn matches(&self, format: &FormatDescriptor) -> bool {
        match self {
            Self::Height(h) => format.has_video && format.height == Some(*h),
            Self::Named(name) => format.format_id == *name,
            Self::BestCombined => format.is_combined(),
            Self::Best => format.has_video || format.has_audio,
            Self::BestAudio => format.has_audio && !format.has_video,
        }
    }

    const fn is_generic(&self) -> bool {
        matches!(self, Self::BestCombined | Self::Best | Self::BestAudio)
    }
}

impl fmt::Display for FormatSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spec())
    }
}

/// Extracts the height from tokens like `720p` or `1080p60`.
fn parse_height(token: &str) -> Option<u32> {
    let (digits, _) = token.split_once('p')?;
    digits.parse().ok().filter(|h| *h > 0)
}

/// Builds the ordered fallback chain for a request.
///
/// The requested token comes first, then the rest of `order` (duplicates
/// dropped), then best combined stream, then best of anything. In audio-only
/// mode the chain is a single best-audio request.
#[must_use]
pub fn build_chain(requested: &str, order: &[String], audio_only: bool) -> Vec<FormatSelector> {
    if audio_only {
        return vec![FormatSelector::BestAudio];
    }

    let mut chain: Vec<FormatSelector> = Vec::with_capacity(order.len() + 3);
    let head = FormatSelector::from_token(requested);
    if !head.is_generic() {
        chain.push(head);
        for token in order {
            let selector = FormatSelector::from_token(token);
            if selector.is_generic() || chain.contains(&selector) {
                continue;
            }
            chain.push(selector);
        }
    }
    chain.push(FormatSelector::BestCombined);
    chain.push(FormatSelector::Best);
    chain
}

/// Whether the transfer landed on something other than the chain head.
///
/// Compares the selected format against the chain itself, so a target height
/// that only exists as a video-only stream still counts as honored when the
/// merged `Height` selector matched it. Audio-only and "best" requests never
/// report a fallback.
#[must_use]
pub fn fell_back(chain: &[FormatSelector], selected: &FormatDescriptor) -> bool {
    match chain.first() {
        None | Some(FormatSelector::BestAudio | FormatSelector::BestCombined) => false,
        Some(head) => !head.matches(selected),
    }
}

/// Height-set heuristic: the requested height is missing from metadata.
///
/// Kept for diagnostics only; it disagrees with [`fell_back`] when the
/// requested height exists but the provider could not deliver it.
#[must_use]
pub fn height_missing(requested: &str, available_heights: &[u32]) -> bool {
    match FormatSelector::from_token(requested) {
        FormatSelector::Height(h) => !available_heights.contains(&h),
        _ => false,
    }
}
