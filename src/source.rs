//! Server-side image resources and the commands queued against them.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::Error;
use crate::http::{Body, Client, Method};
use crate::result::ImageResult;

/// An image uploaded to the API, addressed by the resource URL the API
/// returned on creation.
///
/// Transformation commands accumulate locally; nothing is sent until a result
/// is requested. The transforming methods return a new `Source`, leaving the
/// original untouched, so one upload can fan out into several variants
/// without re-uploading.
#[derive(Debug, Clone)]
pub struct Source {
    client: Arc<Client>,
    url: String,
    commands: Map<String, Value>,
}

impl Source {
    /// Uploads raw image bytes and wraps the created resource.
    pub(crate) fn shrink(client: Arc<Client>, data: Vec<u8>) -> Result<Source, Error> {
        let response = client.request(Method::Post, "/shrink", Body::Raw(data))?;
        let url = response
            .location()
            .map(str::to_string)
            .ok_or_else(|| Error::Parse {
                message: "Response is missing the Location header".to_string(),
                status: response.status.as_u16(),
            })?;

        Ok(Source {
            client,
            url,
            commands: Map::new(),
        })
    }

    pub(crate) fn from_file(client: Arc<Client>, path: impl AsRef<Path>) -> Result<Source, Error> {
        let data = std::fs::read(path)?;
        Self::shrink(client, data)
    }

    /// Queues a `resize` command, e.g. `json!({"method": "fit", "width": 150,
    /// "height": 100})`.
    pub fn resize(&self, options: Value) -> Source {
        self.with_command("resize", options)
    }

    /// Queues a `convert` command to change the output format, e.g.
    /// `json!({"type": "image/webp"})`.
    pub fn convert(&self, options: Value) -> Source {
        self.with_command("convert", options)
    }

    /// Sends the queued commands plus a `store` command, exporting the result
    /// to a cloud target (for example an S3 bucket).
    #[tracing::instrument(skip(self, options))]
    pub fn store(&self, options: Value) -> Result<ImageResult, Error> {
        let mut commands = self.commands.clone();
        commands.insert("store".to_string(), options);

        let response = self
            .client
            .request(Method::Post, &self.url, Body::Json(commands))?;
        Ok(ImageResult::new(response.headers, response.body))
    }

    /// Fetches the processed image with all queued commands applied.
    #[tracing::instrument(skip(self))]
    pub fn result(&self) -> Result<ImageResult, Error> {
        let response =
            self.client
                .request(Method::Get, &self.url, Body::Json(self.commands.clone()))?;
        Ok(ImageResult::new(response.headers, response.body))
    }

    /// Fetches the result and writes it to `path`.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.result()?.to_file(path)
    }

    /// Fetches the result as bytes.
    pub fn to_buffer(&self) -> Result<Vec<u8>, Error> {
        Ok(self.result()?.into_bytes())
    }

    /// Resource URL identifying this source on the server.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn with_command(&self, name: &str, options: Value) -> Source {
        let mut commands = self.commands.clone();
        commands.insert(name.to_string(), options);

        Source {
            client: Arc::clone(&self.client),
            url: self.url.clone(),
            commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_client(server: &mockito::ServerGuard) -> Arc<Client> {
        Arc::new(Client::with_endpoint(&server.url(), "test-key", None, None).unwrap())
    }

    #[test]
    fn test_shrink_captures_location_as_resource_url() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/shrink")
            .with_status(201)
            .with_header("location", "/output/abc123")
            .create();

        let source = Source::shrink(test_client(&server), b"image bytes".to_vec()).unwrap();

        mock.assert();
        assert_eq!(source.url(), "/output/abc123");
        assert!(source.commands.is_empty());
    }

    #[test]
    fn test_shrink_without_location_is_an_error() {
        let mut server = mockito::Server::new();
        server.mock("POST", "/shrink").with_status(201).create();

        let err = Source::shrink(test_client(&server), b"image bytes".to_vec()).unwrap_err();
        assert!(matches!(err, Error::Parse { status: 201, .. }));
    }

    #[test]
    fn test_resize_returns_new_source_and_keeps_original() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/shrink")
            .with_status(201)
            .with_header("location", "/output/abc123")
            .create();

        let source = Source::shrink(test_client(&server), b"image bytes".to_vec()).unwrap();
        let resized = source.resize(json!({"method": "fit", "width": 150}));

        assert!(source.commands.is_empty());
        assert_eq!(resized.commands["resize"]["width"], 150);
        assert_eq!(resized.url(), source.url());
    }

    #[test]
    fn test_result_sends_queued_commands() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/shrink")
            .with_status(201)
            .with_header("location", "/output/abc123")
            .create();
        let result_mock = server
            .mock("GET", "/output/abc123")
            .match_body(mockito::Matcher::Exact(
                r#"{"convert":{"type":"image/webp"},"resize":{"width":150}}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "image/webp")
            .with_body("webp bytes")
            .create();

        let source = Source::shrink(test_client(&server), b"image bytes".to_vec()).unwrap();
        let result = source
            .resize(json!({"width": 150}))
            .convert(json!({"type": "image/webp"}))
            .result()
            .unwrap();

        result_mock.assert();
        assert_eq!(result.to_buffer(), b"webp bytes");
        assert_eq!(result.media_type(), Some("image/webp"));
    }

    #[test]
    fn test_store_posts_store_command_group() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/shrink")
            .with_status(201)
            .with_header("location", "/output/abc123")
            .create();
        let store_mock = server
            .mock("POST", "/output/abc123")
            .match_body(mockito::Matcher::Exact(
                r#"{"store":{"service":"s3"}}"#.to_string(),
            ))
            .with_status(200)
            .with_header("location", "https://bucket.s3.amazonaws.com/example.png")
            .create();

        let source = Source::shrink(test_client(&server), b"image bytes".to_vec()).unwrap();
        let result = source.store(json!({"service": "s3"})).unwrap();

        store_mock.assert();
        assert_eq!(
            result.location(),
            Some("https://bucket.s3.amazonaws.com/example.png")
        );
    }

    #[test]
    fn test_from_file_missing_path_is_io_error() {
        let server = mockito::Server::new();
        let err =
            Source::from_file(test_client(&server), "/no/such/image.png").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
