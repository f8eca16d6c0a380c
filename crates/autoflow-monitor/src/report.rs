//! Monitoring report emitted at finalization.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::data::WorkflowMonitoringData;

/// Sink key for a workflow's monitoring report.
pub fn report_key(workflow_id: &str) -> String {
    format!("workflow-monitoring-{}", workflow_id)
}

/// Build the report document. Only the last `log_limit` log entries are kept.
pub fn monitoring_report(
    data: &WorkflowMonitoringData,
    log_limit: usize,
    generated_at: DateTime<Utc>,
) -> serde_json::Value {
    let skip = data.logs.len().saturating_sub(log_limit);
    let logs: Vec<_> = data.logs.iter().skip(skip).collect();

    json!({
        "workflowId": data.workflow_id,
        "summary": {
            "startedAt": data.started_at,
            "endedAt": data.ended_at,
            "durationMs": data.elapsed_ms(generated_at),
            "status": data.status,
            "errorCount": data.error_count(),
            "warningCount": data.warning_count(),
            "sampleCount": data.samples.len(),
        },
        "aggregates": data.aggregates,
        "alerts": data.alerts,
        "logs": logs,
        "generatedAt": generated_at.to_rfc3339(),
    })
}
