use reqwest::StatusCode;
use reqwest::header::HeaderMap;

/// A non-error exchange with the API: status line, headers, and raw body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Header value as a string, when present and valid UTF-8.
    /// Lookup is case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// `Location` header identifying a created resource.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }
}
