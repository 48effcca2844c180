//! Item identity canonicalization.

/// Query parameters that do not change which item an identity points at.
const IRRELEVANT_PARAMS: [&str; 7] = ["t", "start", "time_continue", "feature", "si", "pp", "index"];

/// Strips playback offsets and tracking parameters from an item identity.
///
/// `https://host/watch?v=abc&t=42s&list=PL1#t=10` becomes
/// `https://host/watch?v=abc&list=PL1`. Remaining parameters keep their
/// order, non-timestamp fragments are kept, and plain identities such as
/// `abc123` are only trimmed. Applying it twice changes nothing.
#[must_use]
pub fn canonicalize_id(raw: &str) -> String {
    let raw = raw.trim();
    let (base, fragment) = match raw.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (raw, None),
    };
    let fragment = fragment.filter(|f| !f.is_empty() && !is_offset_param(f));

    let mut out = match base.split_once('?') {
        Some((path, query)) => {
            let kept: Vec<&str> = query
                .split('&')
                .filter(|pair| !pair.is_empty())
                .filter(|pair| !IRRELEVANT_PARAMS.contains(&param_key(pair)))
                .collect();
            if kept.is_empty() {
                path.to_string()
            } else {
                format!("{path}?{}", kept.join("&"))
            }
        }
        None => base.to_string(),
    };

    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn param_key(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(key, _)| key)
}

fn is_offset_param(fragment: &str) -> bool {
    fragment
        .split('&')
        .all(|pair| matches!(param_key(pair), "t" | "start"))
}

/// Returns true if the identity looks like an http(s) URL.
#[must_use]
pub fn is_url(id: &str) -> bool {
    let id = id.trim_start();
    id.starts_with("https://") || id.starts_with("http://")
}
