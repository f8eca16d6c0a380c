    use super::*;

    #[test]
    fn test_severity_display() {
        assert_eq!(AlertSeverity::Info.to_string(), "INFO");
        assert_eq!(AlertSeverity::Warning.to_string(), "WARNING");
        assert_eq!(AlertSeverity::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_kind_defaults() {
        assert_eq!(AlertKind::HighMemoryUsage.severity(), AlertSeverity::Warning);
        assert_eq!(AlertKind::HighCpuUsage.severity(), AlertSeverity::Warning);
        assert_eq!(AlertKind::LongExecution.severity(), AlertSeverity::Info);
        assert_eq!(AlertKind::HighErrorCount.severity(), AlertSeverity::Error);
        assert_eq!(AlertKind::HighMemoryUsage.to_string(), "high_memory_usage");
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&AlertKind::HighErrorCount).unwrap();
        assert_eq!(json, "\"high_error_count\"");
        let json = serde_json::to_string(&AlertSeverity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }

    #[test]
    fn test_alert_new() {
        let now = Utc::now();
        let alert = Alert::new("wf-1", AlertKind::HighCpuUsage, now);
        assert_eq!(alert.workflow_id, "wf-1");
        assert_eq!(alert.message, "High CPU usage detected");
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert!(!alert.acknowledged);
        assert!(!alert.id.is_empty());
    }

    #[test]
    fn test_alert_acknowledge_once() {
        let now = Utc::now();
        let mut alert = Alert::new("wf-1", AlertKind::LongExecution, now);
        assert!(alert.acknowledge(now));
        assert_eq!(alert.acknowledged_at, Some(now));
        assert!(!alert.acknowledge(now));
    }

    #[test]
    fn test_alert_format_text() {
        let alert = Alert::new("wf-7", AlertKind::HighMemoryUsage, Utc::now());
        let text = alert.format_text();
        assert!(text.contains("[WARNING]"));
        assert!(text.contains("high_memory_usage"));
        assert!(text.contains("wf-7"));
    }

    #[tokio::test]
    async fn test_log_channel() {
        let channel = LogChannel;
        assert_eq!(channel.name(), "log");
        let alert = Alert::new("wf-1", AlertKind::HighErrorCount, Utc::now());
        assert!(channel.send(&alert).await.is_ok());
    }
