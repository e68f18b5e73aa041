// src/fetch/http.rs

use std::time::Duration;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue, REFERER};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::FetchSection;
use crate::errors::{PipedagError, Result};
use crate::fetch::{Fetch, FetchError, FetchFuture};

const DEFAULT_USER_AGENT: &str = concat!("pipedag/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for one run.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    delay: Duration,
}

impl HttpFetcher {
    /// Build the client from the `[fetch]` section.
    pub fn new(settings: &FetchSection) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json,text/html,*/*;q=0.9"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-us,en;q=0.9"));

        let user_agent = settings
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| PipedagError::ConfigError(format!("building HTTP client: {e}")))?;

        Ok(Self::from_client(
            client,
            Duration::from_millis(settings.delay_ms),
        ))
    }

    /// Wrap an existing client; `delay` is slept after every call.
    pub fn from_client(client: reqwest::Client, delay: Duration) -> Self {
        Self { client, delay }
    }

    async fn send(&self, url: &str) -> std::result::Result<String, FetchError> {
        let mut request = self.client.get(url);
        if let Some(referer) = referer_for(url) {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await.map_err(|e| classify(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_of)
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| classify(url, e))?;
        Ok(decode_body(&bytes, charset.as_deref()))
    }
}

impl Fetch for HttpFetcher {
    fn get_text<'a>(&'a self, url: &'a str) -> FetchFuture<'a, String> {
        Box::pin(async move {
            info!(url = %url, "fetching");
            let result = self.send(url).await;

            match &result {
                Ok(body) => debug!(url = %url, bytes = body.len(), "fetched"),
                Err(err) => warn!(url = %url, error = %err, "fetch failed"),
            }

            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            result
        })
    }
}

/// The `charset` parameter of a `Content-Type` value.
fn charset_of(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Decode a response body to text.
///
/// A recognised `charset` label wins. Without one, valid UTF-8 is taken as
/// is and anything else is decoded with the detected encoding.
pub fn decode_body(bytes: &[u8], charset: Option<&str>) -> String {
    let declared = charset.and_then(|label| Encoding::for_label(label.as_bytes()));
    let encoding = match declared {
        Some(encoding) => encoding,
        None if std::str::from_utf8(bytes).is_ok() => UTF_8,
        None => {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            let guess = detector.guess(None, true);
            debug!(encoding = guess.name(), "guessed body encoding");
            guess
        }
    };
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = encoding.name(), "body had malformed sequences");
    }
    text.into_owned()
}

/// `scheme://host[:port]` of `url`, sent as the referer for that call.
pub fn referer_for(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.origin() {
        origin @ url::Origin::Tuple(..) => Some(origin.ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
