//! Alert manager for dispatching alerts to channels.

use std::sync::Arc;

use tracing::error;

use crate::alerts::{Alert, AlertChannel, LogChannel};
use crate::error::MonitorError;

/// Fans an alert out to every registered channel.
pub struct AlertManager {
    channels: Vec<Arc<dyn AlertChannel>>,
}

impl AlertManager {
    /// Create a manager with the log channel.
    pub fn new() -> Self {
        Self {
            channels: vec![Arc::new(LogChannel)],
        }
    }

    /// Add a channel.
    pub fn add_channel(&mut self, channel: Arc<dyn AlertChannel>) {
        self.channels.push(channel);
    }

    /// Get list of channel names.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send an alert to all channels. A failing channel does not stop the others.
    pub async fn send(&self, alert: &Alert) -> Vec<MonitorError> {
        let mut errors = Vec::new();

        for channel in &self.channels {
            if let Err(e) = channel.send(alert).await {
                error!(alert_id = %alert.id, "Failed to send alert via {}: {}", channel.name(), e);
                errors.push(e);
            }
        }

        errors
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertKind;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;

    struct RecordingChannel {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AlertChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, alert: &Alert) -> Result<(), MonitorError> {
            self.seen.lock().push(alert.id.clone());
            Ok(())
        }
    }

    struct BrokenChannel;

    #[async_trait]
    impl AlertChannel for BrokenChannel {
        fn name(&self) -> &str {
            "broken"
        }

        async fn send(&self, _alert: &Alert) -> Result<(), MonitorError> {
            Err(MonitorError::AlertDelivery {
                channel: "broken".to_string(),
                message: "unreachable".to_string(),
            })
        }
    }

    #[test]
    fn test_default_has_log_channel() {
        let manager = AlertManager::default();
        assert_eq!(manager.channel_names(), vec!["log"]);
    }

    #[tokio::test]
    async fn test_send_fans_out() {
        let recording = Arc::new(RecordingChannel {
            seen: Mutex::new(Vec::new()),
        });
        let mut manager = AlertManager::new();
        manager.add_channel(Arc::new(BrokenChannel));
        manager.add_channel(recording.clone());

        let alert = Alert::new("wf-1", AlertKind::HighCpuUsage, Utc::now());
        let errors = manager.send(&alert).await;

        assert_eq!(errors.len(), 1);
        assert_eq!(recording.seen.lock().as_slice(), &[alert.id.clone()]);
    }
}
