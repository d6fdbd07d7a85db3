use chrono::{Local, Utc};
use serde_json::{json, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::sync::{Arc, OnceLock, RwLock};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::config::LoggerConfig;
use crate::utils::error::Result;

pub struct ConfigurableFileWriter {
    config: LoggerConfig,
}

impl ConfigurableFileWriter {
    fn new(config: LoggerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        Ok(Self { config })
    }

    fn log_file_path(config: &LoggerConfig) -> String {
        let today = if config.local_time {
            Local::now().format("%Y-%m-%d").to_string()
        } else {
            Utc::now().format("%Y-%m-%d").to_string()
        };
        format!(
            "{}/{}.{}.error.log",
            config.dir.trim_end_matches('/'),
            config.file_name,
            today
        )
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for ConfigurableFileWriter {
    type Writer = BufWriter<File>;

    fn make_writer(&'a self) -> Self::Writer {
        let log_file_path = Self::log_file_path(&self.config);

        if let Some(parent) = std::path::Path::new(&log_file_path).parent() {
            std::fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("Failed to create log directory {}: {}", parent.display(), e));
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file_path)
            .unwrap_or_else(|e| panic!("Failed to open log file {}: {}", log_file_path, e));

        BufWriter::new(file)
    }
}

pub struct StructuredLogger;

static LOGGER_CONFIG: OnceLock<Arc<RwLock<Option<LoggerConfig>>>> = OnceLock::new();

impl StructuredLogger {
    pub fn init(level: &str, logger_config: Option<LoggerConfig>) -> Result<()> {
        let filter = match level.to_lowercase().as_str() {
            "error" => "error",
            "warn" => "warn",
            "info" => "info",
            "debug" => "debug",
            "trace" => "trace",
            _ => "info",
        };

        let config_lock = LOGGER_CONFIG.get_or_init(|| Arc::new(RwLock::new(None)));
        if let Ok(mut config_guard) = config_lock.write() {
            *config_guard = logger_config.clone();
        }

        if let Some(config) = logger_config {
            let file_writer = ConfigurableFileWriter::new(config)?;

            // Only ERROR level lines go to the file; everything goes to stdout.
            let error_file_writer = file_writer.with_max_level(Level::ERROR);

            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stdout.and(error_file_writer))
                .init();
        } else {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }

        Ok(())
    }

    pub fn log_info(message: &str, request_id: Option<&str>, additional_data: Option<Value>) {
        let mut log_entry = Self::base_entry(json!({ "info": message }), request_id);

        if let Some(data) = additional_data {
            if let Value::Object(ref mut map) = log_entry {
                if let Value::Object(data_map) = data {
                    for (key, value) in data_map {
                        map.insert(key, value);
                    }
                }
            }
        }

        println!("{}", log_entry);
    }

    pub fn log_warning(message: &str, request_id: Option<&str>) {
        let log_entry = Self::base_entry(json!({ "warning": message }), request_id);
        println!("{}", log_entry);
        Self::write_to_file(&log_entry.to_string());
    }

    pub fn log_error(error: &str, request_id: Option<&str>) {
        let log_entry = Self::base_entry(json!({ "error": error }), request_id);
        println!("{}", log_entry);
        Self::write_to_file(&log_entry.to_string());
    }

    fn base_entry(message: Value, request_id: Option<&str>) -> Value {
        let use_local_time = LOGGER_CONFIG
            .get()
            .and_then(|config_lock| config_lock.read().ok())
            .and_then(|config_guard| config_guard.as_ref().map(|c| c.local_time))
            .unwrap_or(false);

        let timestamp = if use_local_time {
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
        } else {
            Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
        };

        json!({
            "message": message,
            "timestamp": timestamp,
            "x-request-id": request_id.unwrap_or("MAIN")
        })
    }

    fn write_to_file(log_line: &str) {
        if let Some(config_lock) = LOGGER_CONFIG.get() {
            if let Ok(config_guard) = config_lock.read() {
                if let Some(config) = config_guard.as_ref() {
                    let log_file_path = ConfigurableFileWriter::log_file_path(config);

                    if let Some(parent) = std::path::Path::new(&log_file_path).parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }

                    if let Ok(mut file) = OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(&log_file_path)
                    {
                        let _ = writeln!(file, "{}", log_line);
                    }
                }
            }
        }
    }
}
