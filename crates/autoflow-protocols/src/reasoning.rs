//! Reasoning fallback trait.

use async_trait::async_trait;

use crate::error::ReasoningError;

/// External reasoning service consulted for steps without a registered
/// executor. Returns a JSON document describing the step result.
#[async_trait]
pub trait ReasoningFallback: Send + Sync {
    /// Complete a prompt.
    async fn complete(&self, prompt: &str) -> Result<serde_json::Value, ReasoningError>;
}
