//! Wire helpers shared by the task kinds: separators, sanitizing, URLs.

use chrono::{DateTime, Utc};
use url::Url;

/// Separates top-level fields of a combined upload body.
pub const RECORD_SEPARATOR: char = '\u{1E}';

/// Separates key/value items inside the arguments field.
pub const UNIT_SEPARATOR: char = '\u{1F}';

/// Strip both separators so a value can't break the record framing.
pub fn safe(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != RECORD_SEPARATOR && *c != UNIT_SEPARATOR)
        .collect()
}

/// Like [`safe`], but keeps unit separators (used for the arguments field).
pub fn safe_keep_unit(value: &str) -> String {
    value.chars().filter(|c| *c != RECORD_SEPARATOR).collect()
}

/// `yyyy-MM-ddTHH:mm:ssZ`, always UTC.
pub fn timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// First `max` characters of `value` (not bytes).
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Append percent-encoded path segments to `base`.
///
/// Returns `None` for URLs that can't carry a path (e.g. `mailto:`).
pub fn endpoint_url<S: AsRef<str>>(base: &Url, segments: &[S]) -> Option<Url> {
    let mut url = base.clone();
    {
        let mut path = url.path_segments_mut().ok()?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment.as_ref());
        }
    }
    Some(url)
}
