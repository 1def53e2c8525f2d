//! HTTP request pipeline: session setup, retries, and response
//! classification.

mod client;
mod response;
mod retry;

pub use client::{API_ENDPOINT, Body, Client, Method};
pub use response::HttpResponse;
pub use retry::{RETRY_COUNT, RETRY_DELAY};
