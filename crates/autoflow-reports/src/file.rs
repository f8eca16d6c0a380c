//! File-backed report sink.
//!
//! Reports are stored as individual JSON files:
//! ```text
//! {directory}/
//! ├── workflow-monitoring-{id}.json
//! ├── orchestration-report-{id}.json
//! └── ...
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use autoflow_protocols::{ReportSink, SinkError};

pub struct FileReportSink {
    directory: PathBuf,
}

impl FileReportSink {
    /// Create the sink, creating `directory` if needed.
    pub async fn new(directory: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let directory = directory.into();
        fs::create_dir_all(&directory).await?;
        debug!("FileReportSink initialized at {:?}", directory);
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path a report with `key` is written to.
    pub fn report_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.json", Self::sanitize_key(key)))
    }

    /// Read a report back. Returns `None` if none was written under `key`.
    pub async fn read(&self, key: &str) -> Result<Option<serde_json::Value>, SinkError> {
        let path = self.report_path(key);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn sanitize_key(key: &str) -> String {
        key.chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn write(&self, key: &str, payload: &serde_json::Value) -> Result<(), SinkError> {
        let content = serde_json::to_string_pretty(payload)?;
        let path = self.report_path(key);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;

        debug!(key = %key, path = ?path, "Report written");
        Ok(())
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
