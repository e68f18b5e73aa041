// src/context.rs

//! Collaborators injected into every step invocation.

use std::sync::Arc;

use crate::fetch::Fetch;
use crate::store::LocalStore;

/// Shared services for one run.
///
/// Built once by the caller and threaded through the scheduler to each step,
/// so tests can swap in canned fetchers and in-memory stores.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub fetcher: Arc<dyn Fetch>,
    pub store: LocalStore,
}

impl StepContext {
    pub fn new(fetcher: Arc<dyn Fetch>, store: LocalStore) -> Self {
        Self { fetcher, store }
    }
}
