use std::fmt;
use std::str::FromStr;

use serde::Serialize;

const ORIGINAL_SEGMENT: &str = "images/original/";

/// Image renditions a download URL can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Thumb,
    Small,
    Large,
    Original,
}

impl ImageSize {
    /// Sizes accepted by the download endpoint.
    pub const DOWNLOADABLE: [ImageSize; 3] = [ImageSize::Small, ImageSize::Large, ImageSize::Original];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Thumb => "thumb",
            ImageSize::Small => "small",
            ImageSize::Large => "large",
            ImageSize::Original => "original",
        }
    }

    /// The object key of this rendition, given the original's key.
    #[must_use]
    pub fn object_key(self, original_key: &str) -> String {
        match self {
            ImageSize::Original => original_key.to_string(),
            size => original_key.replace(ORIGINAL_SEGMENT, &format!("images/{}/", size.as_str())),
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidImageSize;

impl FromStr for ImageSize {
    type Err = InvalidImageSize;

    /// Parses one of the downloadable sizes. `thumb` is not downloadable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(ImageSize::Small),
            "large" => Ok(ImageSize::Large),
            "original" => Ok(ImageSize::Original),
            _ => Err(InvalidImageSize),
        }
    }
}

/// Turns object keys into public URLs.
#[derive(Debug, Clone)]
pub struct MediaUrls {
    base_url: String,
}

impl MediaUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }

    #[must_use]
    pub fn thumbnail_url(&self, object_key: &str) -> String {
        self.sized_url(object_key, ImageSize::Thumb)
    }

    #[must_use]
    pub fn download_url(&self, object_key: &str, size: ImageSize) -> String {
        self.sized_url(object_key, size)
    }

    fn sized_url(&self, object_key: &str, size: ImageSize) -> String {
        self.object_url(&size.object_key(object_key))
    }
}
