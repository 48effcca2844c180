//! Title and index-range selection over planned items.

use crate::error::ValidationError;
use crate::model::MediaItem;

/// Inclusive, 1-based bounds parsed from a `start:end` spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl IndexRange {
    /// Parses `"start:end"`, either side optional. `None` or `""` means unbounded.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the colon is missing, a bound is not
    /// a positive integer, or `start > end`.
    pub fn parse(spec: Option<&str>) -> Result<Self, ValidationError> {
        let Some(spec) = spec.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::default());
        };
        let (start_s, end_s) = spec
            .split_once(':')
            .ok_or_else(|| ValidationError::MissingColon(spec.to_string()))?;
        let start = parse_bound(start_s)?;
        let end = parse_bound(end_s)?;
        if let (Some(start), Some(end)) = (start, end)
            && end < start
        {
            return Err(ValidationError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whether a 1-based position falls inside the range.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.start.is_none_or(|s| index >= s) && self.end.is_none_or(|e| index <= e)
    }
}

fn parse_bound(raw: &str) -> Result<Option<usize>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .map(Some)
        .ok_or_else(|| ValidationError::InvalidBound(raw.to_string()))
}

/// Keeps items inside `range` whose title contains any of `terms`.
///
/// Terms match case-insensitively; blank terms are ignored and an empty term
/// list keeps every title. Input order is preserved.
#[must_use]
pub fn select(items: Vec<MediaItem>, terms: &[String], range: IndexRange) -> Vec<MediaItem> {
    let terms: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();

    items
        .into_iter()
        .filter(|item| range.contains(item.index))
        .filter(|item| {
            if terms.is_empty() {
                return true;
            }
            let title = item.title.to_lowercase();
            terms.iter().any(|t| title.contains(t.as_str()))
        })
        .collect()
}

/// Parses `range_spec` and applies both predicates.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the range spec is malformed.
pub fn apply(
    items: Vec<MediaItem>,
    terms: &[String],
    range_spec: Option<&str>,
) -> Result<Vec<MediaItem>, ValidationError> {
    let range = IndexRange::parse(range_spec)?;
    Ok(select(items, terms, range))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk(index: usize, title: &str) -> MediaItem {
        MediaItem::new(index, format!("vid{index}"), title, "720p")
    }

    fn numbered(n: usize) -> Vec<MediaItem> {
        (1..=n).map(|i| mk(i, &format!("V{i}"))).collect()
    }

    fn strings(terms: &[&str]) -> Vec<String> {
        terms.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parse_valid_specs() {
        assert_eq!(
            IndexRange::parse(Some("1:10")).unwrap(),
            IndexRange { start: Some(1), end: Some(10) }
        );
        assert_eq!(
            IndexRange::parse(Some("5:")).unwrap(),
            IndexRange { start: Some(5), end: None }
        );
        assert_eq!(
            IndexRange::parse(Some(":7")).unwrap(),
            IndexRange { start: None, end: Some(7) }
        );
        assert_eq!(IndexRange::parse(None).unwrap(), IndexRange::default());
        assert_eq!(IndexRange::parse(Some("3:3")).unwrap().start, Some(3));
    }

    #[test]
    fn parse_invalid_specs() {
        for spec in ["bad", "::", "a:1", "1:b", "0:3", "-1:2"] {
            assert!(IndexRange::parse(Some(spec)).is_err(), "{spec} should be rejected");
        }
        assert_eq!(
            IndexRange::parse(Some("9:2")).unwrap_err(),
            ValidationError::EndBeforeStart { start: 9, end: 2 }
        );
    }

    #[test]
    fn range_is_inclusive() {
        let out = apply(numbered(10), &[], Some("3:5")).unwrap();
        assert_eq!(out.iter().map(|v| v.index).collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn open_ended_ranges() {
        assert_eq!(apply(numbered(5), &[], Some("4:")).unwrap().len(), 2);
        assert_eq!(apply(numbered(5), &[], Some(":2")).unwrap().len(), 2);
    }

    #[test]
    fn terms_match_any_case_insensitive() {
        let items = vec![mk(1, "Alpha"), mk(2, "Beta test"), mk(3, "GAMMA"), mk(4, "delta")];
        assert_eq!(apply(items, &strings(&["a"]), None).unwrap().len(), 4);

        let items = vec![mk(1, "Foo"), mk(2, "bar"), mk(3, "Baz")];
        let out = apply(items, &strings(&["BAR"]), None).unwrap();
        assert_eq!(out.iter().map(|v| v.title.as_str()).collect::<Vec<_>>(), vec!["bar"]);
    }

    #[test]
    fn multiple_terms_are_or_combined_in_input_order() {
        let items = vec![mk(1, "rust talk"), mk(2, "go talk"), mk(3, "Zig intro"), mk(4, "misc")];
        let out = apply(items, &strings(&["zig", "RUST"]), None).unwrap();
        assert_eq!(out.iter().map(|v| v.index).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn blank_terms_ignored() {
        let out = apply(numbered(3), &strings(&["", "  "]), None).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn range_and_terms_combine() {
        let items = vec![mk(1, "keep"), mk(2, "keep"), mk(3, "drop"), mk(4, "keep")];
        let out = apply(items, &strings(&["keep"]), Some("2:4")).unwrap();
        assert_eq!(out.iter().map(|v| v.index).collect::<Vec<_>>(), vec![2, 4]);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn inclusive_bounds_hold(start in 1usize..40, len in 0usize..40, n in 0usize..80) {
                let end = start + len;
                let out = apply(numbered(n), &[], Some(&format!("{start}:{end}"))).unwrap();
                prop_assert!(out.iter().all(|v| v.index >= start && v.index <= end));
                let expected = (start..=end).filter(|i| *i <= n).count();
                prop_assert_eq!(out.len(), expected);
            }

            #[test]
            fn inverted_bounds_rejected(end in 1usize..100, gap in 1usize..100) {
                let spec = format!("{}:{}", end + gap, end);
                prop_assert!(IndexRange::parse(Some(&spec)).is_err());
            }
        }
    }
}
