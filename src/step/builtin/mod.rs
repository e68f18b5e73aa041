// src/step/builtin/mod.rs

//! Steps every [`StepRegistry`](crate::step::StepRegistry) starts with.
//!
//! | name                | what it does                                          |
//! |---------------------|-------------------------------------------------------|
//! | `seed`              | emits the node's `initial_output`                     |
//! | `passthrough`       | emits `initial_output` followed by the node's input   |
//! | `save_input`        | persists the input and passes it on                   |
//! | `fetch_text_rows`   | whitespace-delimited text table -> rows               |
//! | `fetch_json_list`   | JSON list -> projected items                          |
//! | `fan_out_fetch`     | one JSON request per input record                     |
//! | `fetch_html_cells`  | labelled HTML table cells -> rows                     |
//! | `incremental_fetch` | paginated fetch bounded by the local snapshot         |

mod html;
mod incremental;
mod json;
mod local;
mod text;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::step::StepRegistry;
use crate::step::params::lookup;

pub use html::FetchHtmlCells;
pub use incremental::IncrementalFetch;
pub use json::{FanOutFetch, FetchJsonList};
pub use local::{Passthrough, SaveInput, Seed};
pub use text::FetchTextRows;

pub(crate) fn register_all(registry: &mut StepRegistry) {
    registry
        .register(Arc::new(Seed))
        .register(Arc::new(Passthrough))
        .register(Arc::new(SaveInput))
        .register(Arc::new(FetchTextRows))
        .register(Arc::new(FetchJsonList))
        .register(Arc::new(FanOutFetch))
        .register(Arc::new(FetchHtmlCells))
        .register(Arc::new(IncrementalFetch));
}

/// Keep only the configured fields of `item`; missing fields become `null`.
fn project(item: &Value, fields: Option<&[(String, String)]>) -> Value {
    match fields {
        None => item.clone(),
        Some(fields) => {
            let mut out = Map::new();
            for (name, path) in fields {
                out.insert(
                    name.clone(),
                    lookup(item, path).cloned().unwrap_or(Value::Null),
                );
            }
            Value::Object(out)
        }
    }
}

/// Fill a locator template: `{placeholder}` is replaced when present,
/// otherwise `value` is appended.
fn render_locator(template: &str, placeholder: &str, value: &str) -> String {
    let token = format!("{{{placeholder}}}");
    if template.contains(&token) {
        template.replace(&token, value)
    } else {
        format!("{template}{value}")
    }
}
