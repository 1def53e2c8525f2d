//! Processed images returned by the API.

use std::path::Path;

use reqwest::header::HeaderMap;

use crate::error::Error;

/// A processed image: the response body plus the metadata headers describing
/// it.
#[derive(Debug, Clone)]
pub struct ImageResult {
    headers: HeaderMap,
    data: Vec<u8>,
}

impl ImageResult {
    pub(crate) fn new(headers: HeaderMap, data: Vec<u8>) -> Self {
        ImageResult { headers, data }
    }

    /// Writes the image to `path`.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Image bytes.
    pub fn to_buffer(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the result, returning the image bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Size in bytes, from the `Content-Length` header when present.
    pub fn size(&self) -> u64 {
        self.header("content-length")
            .and_then(|value| value.parse().ok())
            .unwrap_or(self.data.len() as u64)
    }

    /// MIME type of the image, e.g. `image/png`.
    pub fn media_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Width in pixels, from the `Image-Width` header.
    pub fn width(&self) -> Option<u32> {
        self.header("image-width").and_then(|value| value.parse().ok())
    }

    /// Height in pixels, from the `Image-Height` header.
    pub fn height(&self) -> Option<u32> {
        self.header("image-height").and_then(|value| value.parse().ok())
    }

    /// Target URL when the image was exported to a cloud store.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}
