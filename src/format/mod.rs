//! Pure mapping from stored rows to API records.

mod records;
mod urls;

pub use records::{
    CollectionDetail, CollectionSummary, DownloadLink, PhotoDetail, PhotoSummary,
    collection_detail, collection_summary, download_link, photo_detail, photo_summary,
};
pub use urls::{ImageSize, InvalidImageSize, MediaUrls};

pub use crate::types::decode_tags;

/// Reads a text-encoded boolean column. Only `true`, in any case, is true.
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// The text stored for a boolean column.
#[must_use]
pub fn flag_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("True"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("1"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_flag_str() {
        assert!(parse_flag(flag_str(true)));
        assert!(!parse_flag(flag_str(false)));
    }
}
