// src/step/builtin/json.rs

use serde_json::Value;
use tracing::{debug, warn};

use crate::context::StepContext;
use crate::step::builtin::{project, render_locator};
use crate::step::params::{field_map, lookup, str_param, string_list, usize_param};
use crate::step::{Params, Step, StepCall, StepFailure, StepFuture, StepOutcome};
use crate::store::cell_text;
use crate::types::Record;

/// Fetches one JSON document and emits the items of a list inside it.
///
/// Params:
/// - `list_pointer`: where the list lives (JSON pointer or key; default: the
///   document itself)
/// - `limit`: keep at most this many items
/// - `fields`: projection, see [`field_map`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchJsonList;

impl Step for FetchJsonList {
    fn name(&self) -> &str {
        "fetch_json_list"
    }

    fn run<'a>(&'a self, call: StepCall<'a>, ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            let mut output = call.seed.to_vec();

            let doc = match ctx.fetcher.get_json(call.resource_locator).await {
                Ok(doc) => doc,
                Err(err) => return StepOutcome::Failed(StepFailure::from(err).with_partial(output)),
            };

            let items = match extract_items(&doc, call.params) {
                Ok(items) => items,
                Err(failure) => {
                    warn!(node = %call.node_id, detail = %failure.detail, "extraction miss");
                    return StepOutcome::Failed(failure.with_partial(output));
                }
            };
            let limit = usize_param(call.params, "limit").unwrap_or(usize::MAX);
            output.extend(items.into_iter().take(limit));

            if let Some(target) = call.persistence {
                if let Err(err) = ctx.store.save(target, &output) {
                    return StepOutcome::Failed(StepFailure::from(err).with_partial(output));
                }
            }
            StepOutcome::Completed(output)
        })
    }
}

/// Issues one request per input record.
///
/// The record's `key_field` value is substituted for `{key}` in the locator
/// (or appended when there is no placeholder). Every item found at
/// `list_pointer` is projected through `fields` and tagged with the key.
/// Records whose key appears in `skip_values` are not fetched. A failed
/// request is logged and skipped; the step then reports the first failure
/// together with everything it did collect.
#[derive(Debug, Clone, Copy, Default)]
pub struct FanOutFetch;

impl Step for FanOutFetch {
    fn name(&self) -> &str {
        "fan_out_fetch"
    }

    fn run<'a>(&'a self, call: StepCall<'a>, ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            let mut output = call.seed.to_vec();

            let Some(key_field) = str_param(call.params, "key_field") else {
                return StepOutcome::Failed(
                    StepFailure::extraction_miss("fan_out_fetch needs params.key_field")
                        .with_partial(output),
                );
            };
            let tag = key_field.trim_start_matches('/');
            let skip = string_list(call.params, "skip_values");

            let mut first_failure: Option<StepFailure> = None;
            let mut issued = 0usize;
            let mut failed = 0usize;

            for record in call.input.iter() {
                let Some(key) = lookup(record, key_field) else {
                    warn!(node = %call.node_id, key_field, "input record has no key; skipped");
                    continue;
                };
                let key_text = cell_text(key);
                if key_text.is_empty() || skip.contains(&key_text) {
                    debug!(node = %call.node_id, key = %key_text, "key skipped");
                    continue;
                }

                let url = render_locator(call.resource_locator, "key", &key_text);
                issued += 1;
                let result = match ctx.fetcher.get_json(&url).await {
                    Ok(doc) => extract_items(&doc, call.params),
                    Err(err) => Err(StepFailure::from(err)),
                };

                match result {
                    Ok(items) => {
                        for item in items {
                            output.push(tag_item(item, tag, key));
                        }
                    }
                    Err(failure) => {
                        warn!(
                            node = %call.node_id,
                            url = %url,
                            detail = %failure.detail,
                            "request skipped"
                        );
                        failed += 1;
                        first_failure.get_or_insert(failure);
                    }
                }
            }

            match first_failure {
                None => StepOutcome::Completed(output),
                Some(mut failure) => {
                    failure.detail = format!(
                        "{} of {} requests failed; first: {}",
                        failed,
                        issued,
                        failure.detail
                    );
                    StepOutcome::Failed(failure.with_partial(output))
                }
            }
        })
    }
}

fn extract_items(doc: &Value, params: &Params) -> Result<Vec<Record>, StepFailure> {
    let pointer = str_param(params, "list_pointer").unwrap_or("");
    let list = lookup(doc, pointer)
        .and_then(Value::as_array)
        .ok_or_else(|| StepFailure::extraction_miss(format!("no list at '{pointer}'")))?;

    let fields = field_map(params, "fields");
    Ok(list
        .iter()
        .map(|item| project(item, fields.as_deref()))
        .collect())
}

fn tag_item(item: Record, tag: &str, key: &Value) -> Record {
    match item {
        Value::Object(mut map) => {
            map.insert(tag.to_string(), key.clone());
            Value::Object(map)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_items_reports_missing_lists() {
        let params = json!({"list_pointer": "/matchInfo"});
        let params = params.as_object().unwrap();
        let err = extract_items(&json!({"other": []}), params).unwrap_err();
        assert_eq!(err.kind, crate::step::FailureKind::ExtractionMiss);
        assert!(err.detail.contains("/matchInfo"));
    }

    #[test]
    fn tag_item_only_touches_objects() {
        assert_eq!(
            tag_item(json!({"host": "A"}), "issueid", &json!("24157")),
            json!({"host": "A", "issueid": "24157"})
        );
        assert_eq!(tag_item(json!(3), "issueid", &json!("1")), json!(3));
    }
}
