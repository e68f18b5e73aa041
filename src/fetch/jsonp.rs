// src/fetch/jsonp.rs

use serde_json::Value;

/// Parse a response body as JSON, accepting a JSONP wrapper such as
/// `cbitem1({"a": 1});`.
pub fn parse_json_body(body: &str) -> Result<Value, String> {
    let trimmed = body.trim();
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(err) => match unwrap_jsonp(trimmed) {
            Some(inner) => serde_json::from_str(inner).map_err(|e| e.to_string()),
            None => Err(err.to_string()),
        },
    }
}

/// Inner payload of `callback(...)`, or `None` if `body` is not JSONP shaped.
pub fn unwrap_jsonp(body: &str) -> Option<&str> {
    let open = body.find('(')?;
    let callback = body[..open].trim();
    let is_ident = !callback.is_empty()
        && callback
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.');
    if !is_ident {
        return None;
    }

    let rest = body[open + 1..].trim_end().trim_end_matches(';').trim_end();
    rest.strip_suffix(')')
}
