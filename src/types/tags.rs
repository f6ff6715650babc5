//! Tag list encoding at the storage boundary.
//!
//! Photos keep their tags as an ordered list; the `photos.tags` column holds
//! the same list as a JSON array of strings.

/// Encodes a tag list for the `photos.tags` column.
#[must_use]
pub fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Decodes the `photos.tags` column. Malformed or empty text yields no tags.
#[must_use]
pub fn decode_tags(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(text).unwrap_or_else(|e| {
        tracing::warn!("Ignoring malformed tag list '{}': {}", text, e);
        Vec::new()
    })
}

/// Trims tag names and drops empties and repeats, keeping first-seen order.
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
