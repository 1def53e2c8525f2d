//! Rust client for the Tinify image optimization API (TinyPNG and TinyJPG).
//!
//! Uploads image data, applies transformations (resize, format conversion,
//! export to cloud storage), and retrieves the optimized result:
//!
//! ```no_run
//! use serde_json::json;
//! use tinify::Tinify;
//!
//! # fn main() -> Result<(), tinify::Error> {
//! let tinify = Tinify::new("YOUR_API_KEY")?;
//!
//! tinify
//!     .from_file("unoptimized.png")?
//!     .resize(json!({"method": "fit", "width": 150, "height": 100}))
//!     .to_file("optimized.png")?;
//!
//! println!("compressions used: {:?}", tinify.compression_count());
//! # Ok(())
//! # }
//! ```
//!
//! All calls block the current thread for the duration of the exchange,
//! including retry delays. The underlying connection pool is released when
//! the [`Tinify`] value is dropped.

pub mod error;
pub mod http;
pub mod result;
pub mod source;

pub use error::Error;
pub use result::ImageResult;
pub use source::Source;

use std::path::Path;
use std::sync::Arc;

use http::{Body, Client, Method};

/// Entry point holding the authenticated API session.
#[derive(Debug, Clone)]
pub struct Tinify {
    client: Arc<Client>,
}

impl Tinify {
    /// Creates a client authenticated with `key`.
    pub fn new(key: impl Into<String>) -> Result<Tinify, Error> {
        Tinify::builder(key).build()
    }

    /// Starts building a client, for setting an app identifier or proxy.
    pub fn builder(key: impl Into<String>) -> TinifyBuilder {
        TinifyBuilder {
            key: key.into(),
            app_identifier: None,
            proxy: None,
            endpoint: None,
        }
    }

    /// Reads an image from `path` and uploads it.
    pub fn from_file(&self, path: impl AsRef<Path>) -> Result<Source, Error> {
        Source::from_file(Arc::clone(&self.client), path)
    }

    /// Uploads in-memory image data.
    pub fn from_buffer(&self, data: impl Into<Vec<u8>>) -> Result<Source, Error> {
        Source::shrink(Arc::clone(&self.client), data.into())
    }

    /// Last usage count reported by the API, `None` until a response carried
    /// one. Reflects billable compressions against the account.
    pub fn compression_count(&self) -> Option<u64> {
        self.client.compression_count()
    }

    /// Verifies the API key by issuing a request that cannot succeed. Quota
    /// exhaustion (429) and input complaints still prove the key is valid;
    /// anything else propagates.
    #[tracing::instrument(skip(self))]
    pub fn validate(&self) -> Result<(), Error> {
        match self.client.request(Method::Post, "/shrink", Body::None) {
            Ok(_) => Ok(()),
            Err(Error::Account { status: 429, .. }) => Ok(()),
            Err(Error::Client { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Builder for [`Tinify`].
pub struct TinifyBuilder {
    key: String,
    app_identifier: Option<String>,
    proxy: Option<String>,
    endpoint: Option<String>,
}

impl TinifyBuilder {
    /// Identifier appended to the User-Agent, attributing API usage to a
    /// downstream integration, e.g. `"MyApp/1.0"`.
    pub fn app_identifier(mut self, id: impl Into<String>) -> Self {
        self.app_identifier = Some(id.into());
        self
    }

    /// Proxy URL for HTTPS traffic.
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }

    /// Overrides the API origin. Exists for tests against a local server.
    #[doc(hidden)]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    pub fn build(self) -> Result<Tinify, Error> {
        let endpoint = self.endpoint.as_deref().unwrap_or(http::API_ENDPOINT);
        let client = Client::with_endpoint(
            endpoint,
            self.key,
            self.app_identifier.as_deref(),
            self.proxy.as_deref(),
        )?;

        Ok(Tinify {
            client: Arc::new(client),
        })
    }
}
