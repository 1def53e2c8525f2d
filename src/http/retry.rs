//! Retry policy for API exchanges.

use std::time::Duration;

use crate::error::Error;
use crate::http::HttpResponse;

/// Additional attempts allowed beyond the first request.
pub const RETRY_COUNT: usize = 1;

/// Delay slept before each retry attempt.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Outcome of a single exchange, driving the retry loop in
/// [`Client::request`](crate::http::Client::request).
#[derive(Debug)]
pub(crate) enum Attempt {
    /// Response with a non-error status, handed back to the caller.
    Done(HttpResponse),
    /// Transport failure or 5xx response; tried again while budget remains.
    Retry(Error),
    /// Classified failure that will not improve on retry (4xx).
    Fatal(Error),
}
