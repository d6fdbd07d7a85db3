use chrono::Utc;
use tempfile::TempDir;

use asset_sync_gateway::config::LoggerConfig;
use asset_sync_gateway::providers::StructuredLogger;

// The global subscriber can only be installed once per process, so the whole
// logger lifecycle lives in one test.
#[test]
fn test_error_lines_are_written_to_dated_file() {
    let dir = TempDir::new().unwrap();
    let config = LoggerConfig {
        level: "info".to_string(),
        dir: dir.path().to_string_lossy().to_string(),
        file_name: "gateway-test".to_string(),
        local_time: false,
    };

    StructuredLogger::init("info", Some(config.clone())).unwrap();

    StructuredLogger::log_info("informational line", Some("req-1"), None);
    StructuredLogger::log_warning("warning line", Some("req-2"));
    StructuredLogger::log_error("error line", Some("req-3"));

    let today = Utc::now().format("%Y-%m-%d");
    let log_path = dir
        .path()
        .join(format!("gateway-test.{}.error.log", today));

    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(contents.contains("error line"));
    assert!(contents.contains("req-3"));
    assert!(contents.contains("warning line"));
    // Info lines go to stdout only.
    assert!(!contents.contains("informational line"));

    // Every persisted line is valid JSON carrying the request id field.
    for line in contents.lines() {
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(parsed["x-request-id"].is_string());
        assert!(parsed["timestamp"].is_string());
    }
}
