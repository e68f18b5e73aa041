// src/incremental.rs

//! Watermark-bounded paginated fetch-merge.
//!
//! The cycle is:
//! 1. take the persisted snapshot (possibly empty) as the baseline,
//! 2. page through the remote source, newest first, until it runs out of
//!    pages, repeats itself, or yields a record whose key is not above the
//!    baseline watermark,
//! 3. put the new records in front of the baseline, dropping duplicates.
//!
//! Persisting the merged set is left to the caller. An empty baseline has no
//! watermark, so every available page is consumed.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::dag::propagate::concat_unique;
use crate::fetch::FetchError;
use crate::types::Record;

/// One page of remote records, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    /// The source has nothing after this page.
    pub last: bool,
}

pub type PageFuture<'a> = Pin<Box<dyn Future<Output = Result<Page, FetchError>> + Send + 'a>>;

/// A paginated remote collection. Pages are numbered from 1.
pub trait PageSource: Send {
    fn fetch_page(&mut self, page: u32) -> PageFuture<'_>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// New records followed by the baseline, deduplicated.
    pub merged: Vec<Record>,
    /// How many records were newer than the watermark.
    pub fresh: usize,
    /// Pages requested, including a failed one.
    pub pages: u32,
    /// Set when paging stopped because a fetch failed.
    pub interrupted: Option<FetchError>,
}

impl MergeOutcome {
    /// Whether the merge added nothing to the baseline.
    pub fn is_noop(&self) -> bool {
        self.fresh == 0
    }
}

/// Highest key in `records`, or `None` when no record has a key.
pub fn watermark<K>(records: &[Record], key_of: K) -> Option<i64>
where
    K: Fn(&Record) -> Option<i64>,
{
    records.iter().filter_map(key_of).max()
}

/// Run one fetch-merge cycle against `source`.
///
/// Paging ends at the first record that is not newer than the watermark or
/// whose key was already collected in this cycle, at a page that adds
/// nothing, at the source's last page, or after `max_pages` pages.
pub async fn fetch_merge<S, K>(
    baseline: Vec<Record>,
    source: &mut S,
    key_of: K,
    max_pages: Option<u32>,
) -> MergeOutcome
where
    S: PageSource + ?Sized,
    K: Fn(&Record) -> Option<i64> + Send,
{
    let mark = watermark(&baseline, &key_of);
    debug!(watermark = ?mark, baseline = baseline.len(), "starting incremental fetch");

    let mut fresh: Vec<Record> = Vec::new();
    let mut seen: HashSet<i64> = HashSet::new();
    let mut page_no = 0u32;
    let mut interrupted = None;

    loop {
        page_no += 1;
        let page = match source.fetch_page(page_no).await {
            Ok(page) => page,
            Err(err) => {
                interrupted = Some(err);
                break;
            }
        };

        let mut reached_known = false;
        let mut added = 0usize;
        for record in page.records.iter() {
            let Some(key) = key_of(record) else {
                debug!(page = page_no, "record without an ordering key; skipped");
                continue;
            };
            if mark.is_some_and(|m| key <= m) || !seen.insert(key) {
                reached_known = true;
                break;
            }
            fresh.push(record.clone());
            added += 1;
        }

        let exhausted = max_pages.is_some_and(|max| page_no >= max);
        if reached_known || added == 0 || page.last || exhausted {
            debug!(
                page = page_no,
                reached_known,
                added,
                last = page.last,
                exhausted,
                "paging stopped"
            );
            break;
        }
    }

    debug!(fresh = fresh.len(), pages = page_no, "incremental fetch finished");

    MergeOutcome {
        fresh: fresh.len(),
        merged: concat_unique(&fresh, &baseline),
        pages: page_no,
        interrupted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    struct Pages(Vec<Page>);

    impl PageSource for Pages {
        fn fetch_page(&mut self, page: u32) -> PageFuture<'_> {
            let result = self
                .0
                .get(page as usize - 1)
                .cloned()
                .unwrap_or(Page { records: Vec::new(), last: true });
            Box::pin(async move { Ok(result) })
        }
    }

    fn key(r: &Value) -> Option<i64> {
        r.as_i64()
    }

    #[test]
    fn watermark_is_the_max_key() {
        assert_eq!(watermark(&[json!(99), json!(101), json!(100)], key), Some(101));
        assert_eq!(watermark(&[], key), None);
    }

    #[tokio::test]
    async fn empty_baseline_consumes_every_page() {
        let mut src = Pages(vec![
            Page { records: vec![json!(5), json!(4)], last: false },
            Page { records: vec![json!(3)], last: true },
        ]);
        let out = fetch_merge(Vec::new(), &mut src, key, None).await;
        assert_eq!(out.merged, vec![json!(5), json!(4), json!(3)]);
        assert_eq!(out.pages, 2);
        assert!(out.interrupted.is_none());
    }

    #[tokio::test]
    async fn stops_at_the_first_known_key() {
        let mut src = Pages(vec![
            Page { records: vec![json!(7), json!(6)], last: false },
            Page { records: vec![json!(5), json!(4)], last: false },
            Page { records: vec![json!(3)], last: true },
        ]);
        let out = fetch_merge(vec![json!(5), json!(4)], &mut src, key, None).await;
        assert_eq!(out.merged, vec![json!(7), json!(6), json!(5), json!(4)]);
        assert_eq!(out.pages, 2);
        assert_eq!(out.fresh, 2);
    }

    /// Serves the same page whatever number is asked for.
    struct SamePage(Page, u32);

    impl PageSource for SamePage {
        fn fetch_page(&mut self, _page: u32) -> PageFuture<'_> {
            self.1 += 1;
            let result = self.0.clone();
            Box::pin(async move { Ok(result) })
        }
    }

    /// Endless newest-first feed: page n holds keys 1000 - 2n + 1 and 1000 - 2n.
    struct Endless;

    impl PageSource for Endless {
        fn fetch_page(&mut self, page: u32) -> PageFuture<'_> {
            let top = 1000 - 2 * i64::from(page);
            let records = vec![json!(top + 1), json!(top)];
            Box::pin(async move { Ok(Page { records, last: false }) })
        }
    }

    #[tokio::test]
    async fn repeated_page_ends_paging() {
        let mut src = SamePage(Page { records: vec![json!(5), json!(4)], last: false }, 0);
        let out = fetch_merge(Vec::new(), &mut src, key, None).await;
        assert_eq!(out.merged, vec![json!(5), json!(4)]);
        assert_eq!(out.pages, 2);
        assert_eq!(src.1, 2);
    }

    #[tokio::test]
    async fn page_without_keys_ends_paging() {
        let mut src = SamePage(Page { records: vec![json!("x")], last: false }, 0);
        let out = fetch_merge(Vec::new(), &mut src, key, None).await;
        assert!(out.merged.is_empty());
        assert_eq!(out.pages, 1);
    }

    #[tokio::test]
    async fn max_pages_bounds_an_endless_feed() {
        let out = fetch_merge(Vec::new(), &mut Endless, key, Some(3)).await;
        assert_eq!(out.pages, 3);
        assert_eq!(out.fresh, 6);
        assert_eq!(out.merged.first(), Some(&json!(999)));
        assert_eq!(out.merged.last(), Some(&json!(994)));
    }
}
