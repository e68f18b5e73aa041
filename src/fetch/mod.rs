// src/fetch/mod.rs

//! Remote retrieval for steps.
//!
//! - [`Fetch`] is the seam steps call through; tests plug in canned fetchers.
//! - [`HttpFetcher`] is the production implementation: one long-lived
//!   `reqwest::Client` per run, bounded timeout, a fixed pause after every
//!   call and a per-request `Referer` derived from the target URL.
//! - [`jsonp`] unwraps `callback({...})` bodies before JSON parsing.

pub mod http;
pub mod jsonp;

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use thiserror::Error;

pub use http::HttpFetcher;

/// Why a fetch produced no usable body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("response from {url} is not valid JSON: {message}")]
    Decode { url: String, message: String },
}

pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send + 'a>>;

/// Remote retrieval used by steps.
///
/// Calls are issued one at a time by the scheduler; implementations may keep
/// per-call state but never see concurrent requests from a single run.
pub trait Fetch: Send + Sync + Debug {
    /// Fetch `url` and return the body as text.
    fn get_text<'a>(&'a self, url: &'a str) -> FetchFuture<'a, String>;

    /// Fetch `url` and parse the body as JSON (JSONP wrappers are stripped).
    fn get_json<'a>(&'a self, url: &'a str) -> FetchFuture<'a, Value> {
        Box::pin(async move {
            let body = self.get_text(url).await?;
            jsonp::parse_json_body(&body).map_err(|message| FetchError::Decode {
                url: url.to_string(),
                message,
            })
        })
    }
}
