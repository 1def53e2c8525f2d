//! Classified errors raised by the Tinify API client.

use std::error::Error as StdError;
use std::fmt;

type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Errors produced by the client, classified so callers can branch on the
/// failure category without matching on message strings.
#[derive(Debug)]
pub enum Error {
    /// Transport-level failure (timeout, connect, DNS) after retries were
    /// exhausted. Carries the underlying cause when one exists.
    Connection {
        message: String,
        source: Option<Cause>,
    },
    /// The API rejected the request for account reasons: bad API key,
    /// exceeded quota, payment required (HTTP 401 or 429).
    Account {
        message: String,
        code: Option<String>,
        status: u16,
    },
    /// Any other 4xx response: malformed request, unsupported input.
    Client {
        message: String,
        code: Option<String>,
        status: u16,
    },
    /// A 5xx response that survived the retry budget.
    Server {
        message: String,
        code: Option<String>,
        status: u16,
    },
    /// The API returned an error status but the body was not the expected
    /// JSON error document.
    Parse { message: String, status: u16 },
    /// Local file read/write failure while loading input or saving a result.
    Io(std::io::Error),
}

impl Error {
    /// Builds the error matching an API error response: the `error` code and
    /// `message` fields of the body plus the HTTP status code.
    pub(crate) fn create(message: Option<String>, code: Option<String>, status: u16) -> Self {
        let message = match message {
            Some(m) if !m.is_empty() => m,
            _ => "No message was provided".to_string(),
        };

        if code.as_deref() == Some("ParseError") {
            return Error::Parse { message, status };
        }

        match status {
            401 | 429 => Error::Account {
                message,
                code,
                status,
            },
            400..=499 => Error::Client {
                message,
                code,
                status,
            },
            _ => Error::Server {
                message,
                code,
                status,
            },
        }
    }

    pub(crate) fn connection(message: impl Into<String>) -> Self {
        Error::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn connection_with(
        message: impl Into<String>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// HTTP status code of the API response that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Account { status, .. }
            | Error::Client { status, .. }
            | Error::Server { status, .. }
            | Error::Parse { status, .. } => Some(*status),
            Error::Connection { .. } | Error::Io(_) => None,
        }
    }

    /// Human-readable message, without the status/code suffix.
    pub fn message(&self) -> String {
        match self {
            Error::Connection { message, .. }
            | Error::Account { message, .. }
            | Error::Client { message, .. }
            | Error::Server { message, .. }
            | Error::Parse { message, .. } => message.clone(),
            Error::Io(err) => err.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection { message, .. } => write!(f, "{}", message),
            Error::Account {
                message,
                code,
                status,
            }
            | Error::Client {
                message,
                code,
                status,
            }
            | Error::Server {
                message,
                code,
                status,
            } => {
                write!(
                    f,
                    "{} (HTTP {}/{})",
                    message,
                    status,
                    code.as_deref().unwrap_or("Unknown")
                )
            }
            Error::Parse { message, status } => {
                write!(f, "{} (HTTP {}/ParseError)", message, status)
            }
            Error::Io(err) => write!(f, "{}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Connection { source, .. } => {
                source.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
            }
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_maps_401_to_account_error() {
        let err = Error::create(
            Some("Credentials are invalid".to_string()),
            Some("Unauthorized".to_string()),
            401,
        );
        assert!(matches!(err, Error::Account { status: 401, .. }));
    }

    #[test]
    fn test_create_maps_429_to_account_error() {
        let err = Error::create(
            Some("Your monthly limit has been exceeded".to_string()),
            Some("TooManyRequests".to_string()),
            429,
        );
        assert!(matches!(err, Error::Account { status: 429, .. }));
    }

    #[test]
    fn test_create_maps_other_4xx_to_client_error() {
        let err = Error::create(
            Some("File type is not supported".to_string()),
            Some("UnsupportedMediaType".to_string()),
            415,
        );
        assert!(matches!(err, Error::Client { status: 415, .. }));
    }

    #[test]
    fn test_create_maps_5xx_to_server_error() {
        let err = Error::create(
            Some("Oops!".to_string()),
            Some("InternalServerError".to_string()),
            500,
        );
        assert!(matches!(err, Error::Server { status: 500, .. }));
    }

    #[test]
    fn test_create_parse_error_code_wins_over_status() {
        let err = Error::create(
            Some("Error while parsing response: expected value".to_string()),
            Some("ParseError".to_string()),
            500,
        );
        assert!(matches!(err, Error::Parse { status: 500, .. }));
    }

    #[test]
    fn test_create_defaults_missing_message() {
        let err = Error::create(None, Some("BadSignature".to_string()), 403);
        assert_eq!(err.message(), "No message was provided");
    }

    #[test]
    fn test_display_includes_status_and_code() {
        let err = Error::create(
            Some("Credentials are invalid".to_string()),
            Some("Unauthorized".to_string()),
            401,
        );
        assert_eq!(err.to_string(), "Credentials are invalid (HTTP 401/Unauthorized)");
    }

    #[test]
    fn test_connection_error_carries_source() {
        let cause = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = Error::connection_with("Timeout while connecting", cause);
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Timeout while connecting");
    }
}
