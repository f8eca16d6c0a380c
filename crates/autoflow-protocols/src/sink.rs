//! Report sink trait.

use async_trait::async_trait;

use crate::error::SinkError;

/// Destination for JSON reports emitted by the monitor, the scheduler and
/// the coordinator. Write failures are logged by callers, never escalated.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Sink name for logging.
    fn name(&self) -> &str;

    /// Persist a report under `key`, replacing any earlier report with the same key.
    async fn write(&self, key: &str, payload: &serde_json::Value) -> Result<(), SinkError>;
}
