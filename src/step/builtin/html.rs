// src/step/builtin/html.rs

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::StepContext;
use crate::step::builtin::render_locator;
use crate::step::params::{lookup, str_param, string_list};
use crate::step::{Params, Step, StepCall, StepFailure, StepFuture, StepOutcome};
use crate::store::cell_text;
use crate::types::Record;

/// Reads labelled rows out of an HTML table.
///
/// For each entry of `labels`, the first cell matching `cell_selector`
/// (default `td`) whose text is exactly the label is located, and the texts
/// of the cells after it become one row: `[label, v1, v2, ...]`. Empty cells
/// and cells containing `placeholder` (default `-`) are dropped. A label that
/// is not on the page is an extraction miss.
///
/// With `key_field` set, one page is fetched per input record, `{key}` in the
/// locator is filled from that field, and every row is prefixed with the key.
/// Keys listed in `skip_values` are not fetched.
///
/// Params: `labels`, `cell_selector`, `placeholder`, `key_field`,
/// `skip_values`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchHtmlCells;

impl Step for FetchHtmlCells {
    fn name(&self) -> &str {
        "fetch_html_cells"
    }

    fn run<'a>(&'a self, call: StepCall<'a>, ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            let mut output = call.seed.to_vec();
            let labels = string_list(call.params, "labels");
            if labels.is_empty() {
                return StepOutcome::Failed(
                    StepFailure::extraction_miss("no labels configured").with_partial(output),
                );
            }

            let Some(key_field) = str_param(call.params, "key_field") else {
                let body = match ctx.fetcher.get_text(call.resource_locator).await {
                    Ok(body) => body,
                    Err(err) => {
                        return StepOutcome::Failed(StepFailure::from(err).with_partial(output));
                    }
                };
                let result = label_rows(&body, call.params, &labels, None);
                output.extend(result.rows);
                return match result.miss {
                    None => finish(call, ctx, output),
                    Some(miss) => StepOutcome::Failed(
                        StepFailure::extraction_miss(format!(
                            "{miss} at {}",
                            call.resource_locator
                        ))
                        .with_partial(output),
                    ),
                };
            };

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
                let failure = match ctx.fetcher.get_text(&url).await {
                    Ok(body) => {
                        let result = label_rows(&body, call.params, &labels, Some(&key_text));
                        output.extend(result.rows);
                        result
                            .miss
                            .map(|miss| StepFailure::extraction_miss(format!("{miss} at {url}")))
                    }
                    Err(err) => Some(StepFailure::from(err)),
                };

                if let Some(failure) = failure {
                    warn!(node = %call.node_id, url = %url, detail = %failure.detail, "page skipped");
                    failed += 1;
                    first_failure.get_or_insert(failure);
                }
            }

            match first_failure {
                None => finish(call, ctx, output),
                Some(mut failure) => {
                    failure.detail = format!(
                        "{} of {} pages failed; first: {}",
                        failed, issued, failure.detail
                    );
                    StepOutcome::Failed(failure.with_partial(output))
                }
            }
        })
    }
}

fn finish(call: StepCall<'_>, ctx: &StepContext, output: Vec<Record>) -> StepOutcome {
    if let Some(target) = call.persistence {
        if let Err(err) = ctx.store.save(target, &output) {
            return StepOutcome::Failed(StepFailure::from(err).with_partial(output));
        }
    }
    StepOutcome::Completed(output)
}

struct LabelRows {
    rows: Vec<Record>,
    /// Why at least one label produced no row.
    miss: Option<String>,
}

fn label_rows(body: &str, params: &Params, labels: &[String], key: Option<&str>) -> LabelRows {
    let selector = str_param(params, "cell_selector").unwrap_or("td");
    let placeholder = str_param(params, "placeholder").unwrap_or("-");

    let found = match sibling_cells(body, selector, labels, placeholder) {
        Ok(found) => found,
        Err(message) => {
            return LabelRows {
                rows: Vec::new(),
                miss: Some(message),
            };
        }
    };

    let mut rows = Vec::new();
    let mut missing = Vec::new();
    for (label, cells) in labels.iter().zip(found) {
        let Some(cells) = cells else {
            missing.push(label.as_str());
            continue;
        };
        let mut row: Vec<Value> = Vec::with_capacity(cells.len() + 2);
        if let Some(key) = key {
            row.push(Value::String(key.to_string()));
        }
        row.push(Value::String(label.clone()));
        row.extend(cells.into_iter().map(Value::String));
        rows.push(Value::Array(row));
    }

    let miss = (!missing.is_empty()).then(|| format!("no cell labelled {}", missing.join(", ")));
    LabelRows { rows, miss }
}

/// Texts of the cells following the first `selector` match whose text is
/// `label`, one entry per label, `None` where the label is absent.
fn sibling_cells(
    body: &str,
    selector: &str,
    labels: &[String],
    placeholder: &str,
) -> Result<Vec<Option<Vec<String>>>, String> {
    let selector =
        Selector::parse(selector).map_err(|e| format!("bad cell selector '{selector}': {e}"))?;
    let document = Html::parse_document(body);

    let found = labels
        .iter()
        .map(|label| {
            let cell = document
                .select(&selector)
                .find(|cell| element_text(cell) == label.trim())?;
            Some(
                cell.next_siblings()
                    .filter_map(ElementRef::wrap)
                    .map(|sibling| element_text(&sibling))
                    .filter(|text| !text.is_empty() && !text.contains(placeholder))
                    .collect(),
            )
        })
        .collect();
    Ok(found)
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TABLE: &str = r#"<html><body><table>
        <tr><td class="border-r border-l">平均值</td><td>2.10</td><td>-</td><td><b>3.05</b></td><td></td></tr>
        <tr><td class="border-r border-l">最大值</td><td>2.45</td><td>3.40</td></tr>
        </table></body></html>"#;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn siblings_skip_placeholders_and_blanks() {
        let found = sibling_cells(TABLE, "td", &labels(&["平均值", "最大值"]), "-").unwrap();
        assert_eq!(
            found,
            vec![
                Some(vec!["2.10".to_string(), "3.05".to_string()]),
                Some(vec!["2.45".to_string(), "3.40".to_string()]),
            ]
        );
    }

    #[test]
    fn absent_label_is_none() {
        let found = sibling_cells(TABLE, "td.border-r", &labels(&["最小值"]), "-").unwrap();
        assert_eq!(found, vec![None]);
    }

    #[test]
    fn bad_selector_is_an_error() {
        assert!(sibling_cells(TABLE, "td[", &labels(&["x"]), "-").is_err());
    }

    #[test]
    fn rows_carry_the_key_and_report_misses() {
        let params = Params::new();
        let result = label_rows(TABLE, &params, &labels(&["最大值", "最小值"]), Some("24157"));
        assert_eq!(result.rows, vec![json!(["24157", "最大值", "2.45", "3.40"])]);
        assert_eq!(result.miss.as_deref(), Some("no cell labelled 最小值"));
    }
}
