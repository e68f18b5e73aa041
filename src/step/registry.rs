// src/step/registry.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::step::Step;
use crate::step::builtin;

/// Maps step names to implementations.
///
/// Graph construction resolves every node's `step_name` here once; nothing
/// is looked up by name while the pipeline runs.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: BTreeMap<String, Arc<dyn Step>>,
}

impl StepRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in step.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register `step` under its own name, replacing any previous entry.
    pub fn register(&mut self, step: Arc<dyn Step>) -> &mut Self {
        self.steps.insert(step.name().to_string(), step);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Step>> {
        self.steps.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }
}
