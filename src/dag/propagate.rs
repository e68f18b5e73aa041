// src/dag/propagate.rs

use std::collections::HashSet;

use crate::types::Record;

/// Append every record of `incoming` that `target` does not already hold.
///
/// Membership is by serialized value, checked against `target` as it grows,
/// so duplicates inside `incoming` collapse too. Returns how many records were
/// added.
pub fn merge_unique(target: &mut Vec<Record>, incoming: &[Record]) -> usize {
    let before = target.len();
    let mut held: HashSet<String> = target.iter().map(Record::to_string).collect();
    for record in incoming {
        if held.insert(record.to_string()) {
            target.push(record.clone());
        }
    }
    target.len() - before
}

/// Deduplicated concatenation of `head` followed by `tail`.
pub fn concat_unique(head: &[Record], tail: &[Record]) -> Vec<Record> {
    let mut out = Vec::with_capacity(head.len() + tail.len());
    merge_unique(&mut out, head);
    merge_unique(&mut out, tail);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_skips_records_already_present() {
        let mut input = vec![json!("x")];
        let added = merge_unique(&mut input, &[json!("x"), json!("y")]);
        assert_eq!(added, 1);
        assert_eq!(input, vec![json!("x"), json!("y")]);
    }

    #[test]
    fn merge_collapses_duplicates_within_one_batch() {
        let mut input = Vec::new();
        merge_unique(&mut input, &[json!(["1", "a"]), json!(["1", "a"])]);
        assert_eq!(input, vec![json!(["1", "a"])]);
    }

    #[test]
    fn repeated_merges_are_idempotent() {
        let batch = [json!({"id": 1}), json!({"id": 2})];
        let mut input = Vec::new();
        merge_unique(&mut input, &batch);
        assert_eq!(merge_unique(&mut input, &batch), 0);
        assert_eq!(input.len(), 2);
    }

    #[test]
    fn concat_keeps_head_order_first() {
        let out = concat_unique(&[json!(2), json!(1)], &[json!(1), json!(0)]);
        assert_eq!(out, vec![json!(2), json!(1), json!(0)]);
    }

    #[test]
    fn large_batches_merge_without_duplicates() {
        let existing: Vec<Record> = (0..20_000).map(|i| json!([i.to_string()])).collect();
        let incoming: Vec<Record> = (10_000..30_000).map(|i| json!([i.to_string()])).collect();
        let mut target = existing.clone();
        assert_eq!(merge_unique(&mut target, &incoming), 10_000);
        assert_eq!(target.len(), 30_000);
        assert_eq!(target[..20_000], existing[..]);
        assert_eq!(target.last(), Some(&json!(["29999"])));
    }
}
