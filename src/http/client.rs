//! The authenticated API session and its request/retry loop.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use log::{debug, warn};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Certificate, Proxy};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::response::HttpResponse;
use super::retry::{Attempt, RETRY_COUNT, RETRY_DELAY};
use crate::error::Error;

/// Origin all relative targets are resolved against.
pub const API_ENDPOINT: &str = "https://api.tinify.com";

/// Trust anchors shipped with the crate. TLS verification is pinned to this
/// bundle instead of the host store, so a misconfigured system store cannot
/// break or weaken API connections.
const CA_BUNDLE: &[u8] = include_bytes!("../../data/cacert.pem");

const USER_AGENT: &str = concat!(
    "Tinify/",
    env!("CARGO_PKG_VERSION"),
    " Rust/",
    env!("TINIFY_RUSTC_VERSION"),
    " (",
    env!("TINIFY_TARGET"),
    ")"
);

// u64::MAX marks "no compression-count header seen yet".
const COUNT_UNSET: u64 = u64::MAX;

/// Request methods accepted by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
        })
    }
}

/// Request payload for an API exchange.
#[derive(Debug, Clone)]
pub enum Body {
    None,
    /// Command groups, serialized as compact JSON when non-empty. An empty
    /// map sends no body at all.
    Json(Map<String, Value>),
    /// Opaque bytes sent as-is, used for image uploads.
    Raw(Vec<u8>),
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: Option<String>,
    error: Option<String>,
}

/// Authenticated session against the Tinify API.
///
/// Owns the connection pool, the retry loop, and the usage counter. The pool
/// is released when the client is dropped. A single instance is reusable
/// across sequential calls; for concurrent use, callers serialize or create
/// independent instances.
#[derive(Debug)]
pub struct Client {
    http: reqwest::blocking::Client,
    key: String,
    endpoint: String,
    compressions: AtomicU64,
}

impl Client {
    /// Builds a session authenticated with `key`. The optional
    /// `app_identifier` is appended to the User-Agent so third-party
    /// integrations can be attributed; the optional `proxy` routes HTTPS
    /// traffic.
    pub fn new(
        key: impl Into<String>,
        app_identifier: Option<&str>,
        proxy: Option<&str>,
    ) -> Result<Self, Error> {
        Self::with_endpoint(API_ENDPOINT, key, app_identifier, proxy)
    }

    pub(crate) fn with_endpoint(
        endpoint: &str,
        key: impl Into<String>,
        app_identifier: Option<&str>,
        proxy: Option<&str>,
    ) -> Result<Self, Error> {
        let user_agent = match app_identifier {
            Some(id) => format!("{} {}", USER_AGENT, id),
            None => USER_AGENT.to_string(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&user_agent)
                .map_err(|err| Error::connection_with("Invalid app identifier", err))?,
        );

        let mut builder = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .tls_built_in_root_certs(false);

        for certificate in Certificate::from_pem_bundle(CA_BUNDLE)
            .map_err(|err| Error::connection_with("Failed to load bundled trust store", err))?
        {
            builder = builder.add_root_certificate(certificate);
        }

        if let Some(proxy) = proxy {
            builder = builder.proxy(
                Proxy::https(proxy)
                    .map_err(|err| Error::connection_with("Invalid proxy URL", err))?,
            );
        }

        let http = builder
            .build()
            .map_err(|err| Error::connection_with("Failed to build HTTP session", err))?;

        Ok(Client {
            http,
            key: key.into(),
            endpoint: endpoint.to_string(),
            compressions: AtomicU64::new(COUNT_UNSET),
        })
    }

    /// Performs a request against the API and classifies the outcome.
    ///
    /// A relative `target` is resolved against [`API_ENDPOINT`]; a target
    /// starting with `https://` (any case) is used verbatim, so resource URLs
    /// returned by the API can be polled directly. Transport failures and 5xx
    /// responses are retried up to [`RETRY_COUNT`] extra attempts with
    /// [`RETRY_DELAY`] slept before each retry; 4xx responses fail
    /// immediately.
    #[tracing::instrument(skip(self, body))]
    pub fn request(
        &self,
        method: Method,
        target: &str,
        body: Body,
    ) -> Result<HttpResponse, Error> {
        let url = resolve_url(&self.endpoint, target);
        debug!("{} {}...", method, url);

        let mut last = None;

        for attempt in 0..=RETRY_COUNT {
            if attempt > 0 {
                warn!(
                    "{} {} failed, retrying in {}ms (attempt {}/{})...",
                    method,
                    url,
                    RETRY_DELAY.as_millis(),
                    attempt + 1,
                    RETRY_COUNT + 1
                );
                thread::sleep(RETRY_DELAY);
            }

            match self.attempt(method, &url, &body) {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retry(err) if attempt < RETRY_COUNT => last = Some(err),
                Attempt::Retry(err) | Attempt::Fatal(err) => return Err(err),
            }
        }

        // The loop returns on its final attempt, so this only guards against
        // exhausting the budget without following either branch.
        Err(last.unwrap_or_else(|| Error::connection("Received no response")))
    }

    /// One exchange: send, record the usage counter, classify.
    fn attempt(&self, method: Method, url: &str, body: &Body) -> Attempt {
        let mut request = self
            .http
            .request(method.into(), url)
            .basic_auth("api", Some(&self.key));

        match body {
            Body::Json(map) if map.is_empty() => {}
            Body::Json(map) => match serde_json::to_vec(map) {
                Ok(json) => {
                    request = request
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(json);
                }
                Err(err) => {
                    return Attempt::Fatal(Error::connection(format!(
                        "Error while encoding request body: {}",
                        err
                    )));
                }
            },
            Body::Raw(data) => request = request.body(data.clone()),
            Body::None => {}
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(err) => return Attempt::Retry(transport_error(err)),
        };

        let status = response.status();
        let headers = response.headers().clone();

        // The counter reflects the account quota even on error responses, so
        // it is recorded before any classification.
        self.record_compression_count(&headers);

        let body = match response.bytes() {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => return Attempt::Retry(transport_error(err)),
        };

        if status.as_u16() < 400 {
            debug!("{} {} -> {}", method, url, status);
            return Attempt::Done(HttpResponse {
                status,
                headers,
                body,
            });
        }

        let details = error_payload(&body);
        let err = Error::create(details.message, details.error, status.as_u16());
        if status.is_server_error() {
            Attempt::Retry(err)
        } else {
            Attempt::Fatal(err)
        }
    }

    /// Last `compression-count` value reported by the API, `None` until a
    /// response carried one.
    pub fn compression_count(&self) -> Option<u64> {
        match self.compressions.load(Ordering::Relaxed) {
            COUNT_UNSET => None,
            count => Some(count),
        }
    }

    fn record_compression_count(&self, headers: &HeaderMap) {
        if let Some(count) = headers
            .get("compression-count")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
        {
            self.compressions.store(count, Ordering::Relaxed);
        }
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::connection_with("Timeout while connecting", err)
    } else {
        Error::connection_with(format!("Error while connecting: {}", err), err)
    }
}

fn error_payload(body: &[u8]) -> ErrorPayload {
    match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(err) => ErrorPayload {
            message: Some(format!("Error while parsing response: {}", err)),
            error: Some("ParseError".to_string()),
        },
    }
}

fn resolve_url(endpoint: &str, target: &str) -> String {
    let absolute = target
        .get(.."https://".len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("https://"));

    if absolute {
        target.to_string()
    } else {
        format!("{}{}", endpoint, target)
    }
}
