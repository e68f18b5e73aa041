// src/step/builtin/text.rs

use serde_json::Value;
use tracing::{debug, warn};

use crate::context::StepContext;
use crate::step::params::usize_param;
use crate::step::{Step, StepCall, StepFailure, StepFuture, StepOutcome};
use crate::types::Record;

/// Fetches a plain-text table and turns each non-blank line into a row of
/// whitespace-separated cells.
///
/// Rows are cut to the persistence column count (or `params.width`), appended
/// to `initial_output`, and written to the snapshot when one is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTextRows;

impl Step for FetchTextRows {
    fn name(&self) -> &str {
        "fetch_text_rows"
    }

    fn run<'a>(&'a self, call: StepCall<'a>, ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            let mut output = call.seed.to_vec();

            let body = match ctx.fetcher.get_text(call.resource_locator).await {
                Ok(body) => body,
                Err(err) => return StepOutcome::Failed(StepFailure::from(err).with_partial(output)),
            };

            let width = call
                .persistence
                .map(|p| p.column_names.len())
                .or_else(|| usize_param(call.params, "width"));
            let rows = parse_rows(&body, width);
            if rows.is_empty() {
                warn!(node = %call.node_id, url = %call.resource_locator, "no rows in response");
                return StepOutcome::Failed(
                    StepFailure::extraction_miss(format!(
                        "no rows in response from {}",
                        call.resource_locator
                    ))
                    .with_partial(output),
                );
            }
            debug!(node = %call.node_id, rows = rows.len(), "parsed text rows");
            output.extend(rows);

            if let Some(target) = call.persistence {
                if let Err(err) = ctx.store.save(target, &output) {
                    return StepOutcome::Failed(StepFailure::from(err).with_partial(output));
                }
            }
            StepOutcome::Completed(output)
        })
    }
}

fn parse_rows(body: &str, width: Option<usize>) -> Vec<Record> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let cells = line.split_whitespace().map(|c| Value::String(c.to_string()));
            match width {
                Some(w) => Value::Array(cells.take(w).collect()),
                None => Value::Array(cells.collect()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_are_split_and_truncated() {
        let body = "24001 2024-01-02 1 2 3 extra\n\n  24002 2024-01-04 4 5 6\n";
        assert_eq!(
            parse_rows(body, Some(5)),
            vec![
                json!(["24001", "2024-01-02", "1", "2", "3"]),
                json!(["24002", "2024-01-04", "4", "5", "6"]),
            ]
        );
        assert_eq!(parse_rows("a b c", None), vec![json!(["a", "b", "c"])]);
    }
}
