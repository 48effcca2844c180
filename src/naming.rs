//! Destination filename templates.
//!
//! Templates use `{token}` or `{token:spec}` placeholders. Recognized tokens
//! are `index`, `title`, `quality`, `video_id` (alias `id`), `date` and
//! `audio_only`; `index` honors width specs such as `03d`. Unknown tokens are
//! logged and rendered as nothing.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use crate::model::MediaItem;

/// Replacement for filesystem-reserved characters.
pub const SAFE_SUB: &str = "_";
/// Name used when sanitizing leaves nothing usable.
pub const PLACEHOLDER_NAME: &str = "untitled";
/// Maximum filename length in characters.
pub const MAX_NAME_LEN: usize = 255;
/// Maximum length in bytes of a name written to disk.
pub const MAX_NAME_BYTES: usize = 255;

const KNOWN_TOKENS: [&str; 7] = ["index", "title", "quality", "video_id", "id", "date", "audio_only"];

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("valid regex"));

static RESERVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]+"#).expect("valid regex"));

/// Returns the names of tokens in `template` that [`render`] does not know.
#[must_use]
pub fn unknown_tokens(template: &str) -> Vec<String> {
    TOKEN_RE
        .captures_iter(template)
        .filter_map(|caps| {
            let name = token_name(&caps[1]);
            (!KNOWN_TOKENS.contains(&name)).then(|| name.to_string())
        })
        .collect()
}

fn token_name(raw: &str) -> &str {
    raw.split_once(':').map_or(raw, |(name, _)| name).trim()
}

/// Renders `template` for `item` and sanitizes the result.
///
/// `date` defaults to today's local date.
#[must_use]
pub fn render(template: &str, item: &MediaItem, date: Option<NaiveDate>) -> String {
    for token in unknown_tokens(template) {
        log::warn!("Unknown filename token '{token}' in template '{template}'");
    }
    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());

    let rendered = TOKEN_RE.replace_all(template, |caps: &Captures<'_>| {
        let raw = &caps[1];
        let spec = raw.split_once(':').map(|(_, spec)| spec.trim());
        match token_name(raw) {
            "index" => format_index(item.index, spec),
            "title" => item.title.clone(),
            "quality" => item.effective_quality().to_string(),
            "video_id" | "id" => item.video_id.clone(),
            "date" => date.format("%Y-%m-%d").to_string(),
            "audio_only" => item.audio_only.to_string(),
            _ => String::new(),
        }
    });

    sanitize(&rendered)
}

/// Applies a Python-style integer spec: `03d` zero-pads, `3d` space-pads.
fn format_index(index: usize, spec: Option<&str>) -> String {
    let Some(spec) = spec.map(|s| s.trim_end_matches('d')).filter(|s| !s.is_empty()) else {
        return index.to_string();
    };
    let (zero, width) = spec
        .strip_prefix('0')
        .map_or((false, spec), |rest| (true, rest));
    match width.parse::<usize>() {
        Ok(width) if zero => format!("{index:0width$}"),
        Ok(width) => format!("{index:>width$}"),
        Err(_) => index.to_string(),
    }
}

/// Makes `name` safe to use as a single path component.
#[must_use]
pub fn sanitize(name: &str) -> String {
    let mut name = RESERVED_RE.replace_all(name, SAFE_SUB).into_owned();
    if let Some(stem) = name.strip_suffix(". ") {
        name = format!("{stem}.");
    }
    let name = name.trim();
    if name.trim_matches('.').is_empty() {
        return PLACEHOLDER_NAME.to_string();
    }
    name.chars().take(MAX_NAME_LEN).collect()
}

/// Joins `prefix`, `stem` and `suffix`, shortening the stem so the result
/// fits in [`MAX_NAME_BYTES`]. Cuts fall on a char boundary.
#[must_use]
pub fn fit_name(prefix: &str, stem: &str, suffix: &str) -> String {
    let budget = MAX_NAME_BYTES.saturating_sub(prefix.len() + suffix.len());
    let mut end = stem.len().min(budget);
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    let stem = stem[..end].trim_end();
    let stem = if stem.is_empty() { PLACEHOLDER_NAME } else { stem };
    format!("{prefix}{stem}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MediaItem {
        MediaItem::new(1, "vid123", "Test Video / Sample", "720p")
    }

    fn day() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 3, 9)
    }

    #[test]
    fn index_padding_and_title() {
        let out = render("{index:03d}-{title}", &sample(), day());
        assert!(out.starts_with("001-Test Video _ Sample"), "{out}");
    }

    #[test]
    fn identity_and_quality() {
        assert_eq!(render("{index}-{video_id}-{quality}", &sample(), day()), "1-vid123-720p");
    }

    #[test]
    fn quality_uses_selected_when_resolved() {
        let mut item = sample();
        item.selected_quality = Some("480p".into());
        assert_eq!(render("{quality}", &item, day()), "480p");
    }

    #[test]
    fn date_and_audio_only() {
        let item = sample().with_audio_only(true);
        assert_eq!(render("{date}_{audio_only}", &item, day()), "2024-03-09_true");
        assert_eq!(render("{audio_only}", &sample(), day()), "false");
    }

    #[test]
    fn unknown_token_is_removed() {
        assert_eq!(render("{index}-{unknown}-{title}", &sample(), day()), "1--Test Video _ Sample");
        assert_eq!(unknown_tokens("{index}-{unknown}-{nope:3}"), vec!["unknown", "nope"]);
        assert!(unknown_tokens("{index:03d}{title}{id}").is_empty());
    }

    #[test]
    fn space_padded_index() {
        assert_eq!(format_index(7, Some("3d")), "  7");
        assert_eq!(format_index(7, Some("d")), "7");
        assert_eq!(format_index(1234, Some("03d")), "1234");
        assert_eq!(format_index(7, Some("x")), "7");
    }

    #[test]
    fn sanitize_cases() {
        assert_eq!(sanitize("simple"), "simple");
        assert_eq!(sanitize("with/slash"), "with_slash");
        assert_eq!(sanitize("colon:name"), "colon_name");
        assert_eq!(sanitize("trail. "), "trail.");
        assert_eq!(sanitize(r#"a<>:"/\|?*b"#), "a_b");
        assert_eq!(sanitize("..."), PLACEHOLDER_NAME);
        assert_eq!(sanitize("   "), PLACEHOLDER_NAME);
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "é".repeat(400);
        assert_eq!(sanitize(&long).chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn fit_name_respects_byte_limit() {
        let name = fit_name("", &"a".repeat(300), ".mp4");
        assert_eq!(name.len(), MAX_NAME_BYTES);
        assert!(name.ends_with("a.mp4"));

        let name = fit_name(".", &"é".repeat(200), ".part");
        assert!(name.len() <= MAX_NAME_BYTES);
        assert!(name.starts_with(".é") && name.ends_with("é.part"));

        assert_eq!(fit_name("", "short", ".m4a"), "short.m4a");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn sanitized_names_are_safe(raw in ".{0,400}") {
                let out = sanitize(&raw);
                prop_assert!(!out.is_empty());
                prop_assert!(out.chars().count() <= MAX_NAME_LEN);
                prop_assert!(!out.contains(['\\', '/', ':', '*', '?', '"', '<', '>', '|']));
            }

            #[test]
            fn fitted_names_stay_within_bytes(raw in ".{0,400}", ext in "[a-z0-9]{1,8}") {
                let out = fit_name("", &sanitize(&raw), &format!(".{ext}"));
                prop_assert!(out.len() <= MAX_NAME_BYTES);
                let suffix = format!(".{ext}");
                prop_assert!(out.ends_with(&suffix));
            }
        }
    }
}
