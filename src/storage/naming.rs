//! Object key construction for the durable store.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Reduce a file name to characters that are safe in object keys.
///
/// Anything outside `[A-Za-z0-9._-]` becomes `-`, runs of `-` collapse, and
/// an empty result falls back to `document`.
pub fn sanitize_object_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        return "document".to_string();
    }
    trimmed.chars().take(120).collect()
}

/// Build `{category}/{timestamp}-{sanitized-name}`.
///
/// The timestamp segment is the epoch millisecond followed by eight random
/// hex digits, so two uploads of the same name in the same millisecond never
/// share a key.
///
/// Category segments are sanitized individually so a tenant prefix such as
/// `school-1/letters` keeps its `/` separators.
pub fn object_key(category: &str, name: &str, at: DateTime<Utc>) -> String {
    let category: Vec<String> = category
        .split('/')
        .filter(|segment| !segment.trim().is_empty())
        .map(sanitize_object_name)
        .collect();
    let category = if category.is_empty() {
        "uncategorized".to_string()
    } else {
        category.join("/")
    };

    let nonce = Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}.{}-{}",
        category,
        at.timestamp_millis(),
        &nonce[..8],
        sanitize_object_name(name)
    )
}
