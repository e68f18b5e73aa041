// src/step/params.rs

//! Typed access to a node's free-form `params` table.

use serde_json::Value;

pub type Params = serde_json::Map<String, Value>;

pub fn str_param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

pub fn usize_param(params: &Params, key: &str) -> Option<usize> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

/// A list of strings; a lone string counts as a one-element list.
pub fn string_list(params: &Params, key: &str) -> Vec<String> {
    match params.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// `fields` as `(output name, source path)` pairs.
///
/// Accepts `fields = ["a", "b"]` (names kept) or
/// `fields = { out = "/nested/src" }` (renamed). `None` means "keep the
/// whole item".
pub fn field_map(params: &Params, key: &str) -> Option<Vec<(String, String)>> {
    match params.get(key)? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| (s.trim_start_matches('/').to_string(), s.to_string()))
                .collect(),
        ),
        Value::Object(map) => Some(
            map.iter()
                .filter_map(|(out, src)| src.as_str().map(|s| (out.clone(), s.to_string())))
                .collect(),
        ),
        _ => None,
    }
}

/// Resolve `path` inside `value`: a leading `/` means a JSON pointer,
/// anything else is a top-level key.
pub fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        Some(value)
    } else if path.starts_with('/') {
        value.pointer(path)
    } else {
        value.get(path)
    }
}
