//! Step executor registry.
//!
//! Maps step names to executors. Lookups for unknown names return the
//! fallback executor, so adding a new step kind is a registration rather
//! than a code change in the engine.

use std::sync::Arc;

use dashmap::DashMap;

use autoflow_protocols::{ReasoningFallback, StepExecutor};

use crate::error::EngineError;
use crate::fallback::{DisabledReasoning, GenericStepExecutor};

pub struct StepRegistry {
    executors: DashMap<String, Arc<dyn StepExecutor>>,
    fallback: Arc<dyn StepExecutor>,
}

impl StepRegistry {
    /// Create a registry whose fallback consults `reasoning`.
    pub fn new(reasoning: Arc<dyn ReasoningFallback>) -> Self {
        Self::with_fallback(Arc::new(GenericStepExecutor::new(reasoning)))
    }

    /// Create a registry with a custom fallback executor.
    pub fn with_fallback(fallback: Arc<dyn StepExecutor>) -> Self {
        Self {
            executors: DashMap::new(),
            fallback,
        }
    }

    /// Register an executor under its own name.
    pub fn register(&self, executor: Arc<dyn StepExecutor>) -> Result<(), EngineError> {
        let name = executor.name().to_string();
        self.register_as(name, executor)
    }

    /// Register an executor under an explicit step name.
    pub fn register_as(
        &self,
        name: impl Into<String>,
        executor: Arc<dyn StepExecutor>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        if self.executors.contains_key(&name) {
            return Err(EngineError::AlreadyRegistered(name));
        }
        self.executors.insert(name, executor);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Result<(), EngineError> {
        self.executors
            .remove(name)
            .ok_or_else(|| EngineError::NotRegistered(name.to_string()))?;
        Ok(())
    }

    /// Executor for `name`, or the fallback.
    pub fn resolve(&self, name: &str) -> Arc<dyn StepExecutor> {
        self.executors
            .get(name)
            .map(|e| e.value().clone())
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.executors.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new(Arc::new(DisabledReasoning))
    }
}
