use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pipedag::fetch::{Fetch, FetchError, FetchFuture};
use serde_json::Value;

/// A fetcher that:
/// - answers from a fixed url -> body table
/// - records every requested url, in order
/// - reports HTTP 404 for urls it does not know
#[derive(Debug, Clone, Default)]
pub struct CannedFetcher {
    responses: Arc<Mutex<HashMap<String, Result<String, FetchError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl CannedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, url: &str, body: &str) -> Self {
        self.insert(url, Ok(body.to_string()));
        self
    }

    pub fn with_json(self, url: &str, body: Value) -> Self {
        self.insert(url, Ok(body.to_string()));
        self
    }

    pub fn with_error(self, url: &str, err: FetchError) -> Self {
        self.insert(url, Err(err));
        self
    }

    /// Every url requested so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn insert(&self, url: &str, response: Result<String, FetchError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }
}

impl Fetch for CannedFetcher {
    fn get_text<'a>(&'a self, url: &'a str) -> FetchFuture<'a, String> {
        self.calls.lock().unwrap().push(url.to_string());
        let response = self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            });
        Box::pin(async move { response })
    }
}
