//! In-memory report sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use autoflow_protocols::{ReportSink, SinkError};

/// Keeps the latest report per key.
pub struct MemoryReportSink {
    reports: RwLock<HashMap<String, serde_json::Value>>,
    writes: AtomicUsize,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self {
            reports: RwLock::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.reports.read().get(key).cloned()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.reports.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.read().is_empty()
    }

    /// Number of writes received, including overwrites.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for MemoryReportSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn write(&self, key: &str, payload: &serde_json::Value) -> Result<(), SinkError> {
        self.reports.write().insert(key.to_string(), payload.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_replaces_by_key() {
        let sink = MemoryReportSink::new();
        assert!(sink.is_empty());

        sink.write("b", &json!({"n": 1})).await.unwrap();
        sink.write("a", &json!({"n": 2})).await.unwrap();
        sink.write("b", &json!({"n": 3})).await.unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.write_count(), 3);
        assert_eq!(sink.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(sink.get("b").unwrap()["n"], 3);
        assert!(sink.get("c").is_none());
    }
}
