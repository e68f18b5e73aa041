//! Shared helpers for `pipedag` tests: config builders, a canned fetcher,
//! a recording step and a ready-made step context.

pub mod builders;
pub mod fake_fetcher;
pub mod recording_step;

use std::sync::{Arc, Once};

use pipedag::context::StepContext;
use pipedag::fs::mock::MockFileSystem;
use pipedag::logging::{LOG_ENV, log_filter};
use pipedag::store::LocalStore;

use crate::fake_fetcher::CannedFetcher;

static INIT: Once = Once::new();

/// Initialise tracing for tests, once per test binary.
///
/// Output goes through the test writer, so it only shows for failing tests
/// (or with `-- --nocapture`). Levels follow `PIPEDAG_LOG`, e.g.
/// `PIPEDAG_LOG=pipedag=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let env = std::env::var(LOG_ENV).ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(log_filter(None, env.as_deref()))
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Step context over a canned fetcher and an in-memory store rooted at `.`.
///
/// Snapshot paths therefore land in `fs` as `./<path>`.
pub fn test_context(fetcher: CannedFetcher, fs: MockFileSystem) -> StepContext {
    StepContext::new(Arc::new(fetcher), LocalStore::new(Arc::new(fs), "."))
}
