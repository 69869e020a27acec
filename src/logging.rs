//! Rotating JSONL operational logger.
//!
//! Hand-rolled rather than pulled from the `log`/`tracing` ecosystem because
//! that is how the teacher crate this was grown from does it: plain
//! NDJSON lines, size-based rotation with gzip archives, and a redaction
//! pass over anything that looks like a secret before it ever hits disk.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Local;
use flate2::{write::GzEncoder, Compression};
use fs2::FileExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const LOG_ROTATION_SIZE_MB: u64 = 8;
const MAX_ARCHIVES: u32 = 5;
const ROTATION_CHECK_INTERVAL: u32 = 200;

#[derive(Serialize, Deserialize, Debug, Clone)]
struct LogEntry {
    timestamp: String,
    level: String,
    component: String,
    event: String,
    message: String,
    correlation_id: String,
    fields: HashMap<String, serde_json::Value>,
}

struct RotatingLogger {
    log_path: PathBuf,
    write_count: AtomicU32,
}

impl RotatingLogger {
    fn new(log_path: PathBuf) -> Self {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        Self {
            log_path,
            write_count: AtomicU32::new(0),
        }
    }

    fn write_line(&self, json_line: &str) -> std::io::Result<()> {
        if self.write_count.fetch_add(1, Ordering::Relaxed) % ROTATION_CHECK_INTERVAL == 0 {
            let _ = self.rotate_if_needed();
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{}", json_line)
    }

    fn rotate_if_needed(&self) -> std::io::Result<()> {
        if !self.needs_rotation()? {
            return Ok(());
        }
        let lock_path = self.log_path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)?;
        match lock_file.try_lock_exclusive() {
            Ok(()) => {
                if self.needs_rotation()? {
                    self.perform_rotation()?;
                }
                let _ = std::fs::remove_file(&lock_path);
                Ok(())
            }
            Err(_) => Ok(()),
        }
    }

    fn needs_rotation(&self) -> std::io::Result<bool> {
        if !self.log_path.exists() {
            return Ok(false);
        }
        let metadata = std::fs::metadata(&self.log_path)?;
        Ok(metadata.len() >= LOG_ROTATION_SIZE_MB * 1024 * 1024)
    }

    fn perform_rotation(&self) -> std::io::Result<()> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = self
            .log_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("linksentry.log");
        let archive_name = format!("{}.{}.gz", filename, timestamp);
        let archive_path = self
            .log_path
            .parent()
            .map(|p| p.join(&archive_name))
            .unwrap_or_else(|| PathBuf::from(&archive_name));

        let temp_path = self.log_path.with_extension("rotating");
        std::fs::rename(&self.log_path, &temp_path)?;

        let source_file = File::open(&temp_path)?;
        let target_file = File::create(&archive_path)?;
        let mut encoder = GzEncoder::new(target_file, Compression::default());
        std::io::copy(&mut BufReader::new(source_file), &mut encoder)?;
        encoder.finish()?;
        std::fs::remove_file(&temp_path)?;

        let _ = self.cleanup_old_archives(filename);
        Ok(())
    }

    fn cleanup_old_archives(&self, filename: &str) -> std::io::Result<()> {
        let log_dir = match self.log_path.parent() {
            Some(p) => p,
            None => return Ok(()),
        };
        let mut archives = Vec::new();
        for entry in std::fs::read_dir(log_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&format!("{}.", filename)) && name.ends_with(".gz") {
                archives.push((entry.path(), entry.metadata()?.modified()?));
            }
        }
        archives.sort_by_key(|(_, modified)| *modified);
        if archives.len() > MAX_ARCHIVES as usize {
            let to_remove = archives.len() - MAX_ARCHIVES as usize;
            for (path, _) in archives.iter().take(to_remove) {
                let _ = std::fs::remove_file(path);
            }
        }
        Ok(())
    }
}

/// Process-wide operational logger. One instance is built in `main` and
/// cloned (cheaply, via `Arc`) into every subsystem that wants to log.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Mutex<RotatingLogger>>,
    session_id: String,
    redaction_patterns: Arc<Vec<Regex>>,
}

impl Logger {
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RotatingLogger::new(log_path))),
            session_id: Uuid::new_v4().to_string()[..8].to_string(),
            redaction_patterns: Arc::new(Self::compile_redaction_patterns()),
        }
    }

    /// Default log location: `~/.config/linksentry/linksentry.log`.
    pub fn default_path() -> PathBuf {
        let mut p = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push(".config");
        p.push("linksentry");
        p.push("linksentry.log");
        p
    }

    fn compile_redaction_patterns() -> Vec<Regex> {
        let patterns = [
            r"(?i)authorization[:\s]+[^\s\n]+",
            r"(?i)bearer[:\s]+[^\s\n]+",
            r"(?i)bot_token[:\s]+[^\s\n]+",
            r"(?i)api[_-]?key[:\s]+[^\s\n]+",
            r"(?i)password[:\s]+[^\s\n]+",
        ];
        patterns
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    }

    fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for re in self.redaction_patterns.iter() {
            redacted = re.replace_all(&redacted, "[REDACTED]").to_string();
        }
        redacted
    }

    pub fn log(&self, level: Level, component: &str, event: &str, message: &str) {
        self.log_with_fields(level, component, event, message, HashMap::new())
    }

    pub fn log_with_fields(
        &self,
        level: Level,
        component: &str,
        event: &str,
        message: &str,
        fields: HashMap<String, serde_json::Value>,
    ) {
        let entry = LogEntry {
            timestamp: Local::now().to_rfc3339(),
            level: level.as_str().to_string(),
            component: component.to_string(),
            event: event.to_string(),
            message: self.redact(message),
            correlation_id: self.session_id.clone(),
            fields,
        };
        if let Ok(line) = serde_json::to_string(&entry) {
            if let Ok(inner) = self.inner.lock() {
                let _ = inner.write_line(&line);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Convenience macro-free helpers so call sites read like `log.info(...)`.
impl Logger {
    pub fn debug(&self, component: &str, event: &str, message: &str) {
        self.log(Level::Debug, component, event, message)
    }
    pub fn info(&self, component: &str, event: &str, message: &str) {
        self.log(Level::Info, component, event, message)
    }
    pub fn warn(&self, component: &str, event: &str, message: &str) {
        self.log(Level::Warn, component, event, message)
    }
    pub fn error(&self, component: &str, event: &str, message: &str) {
        self.log(Level::Error, component, event, message)
    }
}

/// A no-op logger for tests that don't want file I/O side effects.
pub fn null_logger() -> Logger {
    Logger::new(std::env::temp_dir().join(format!("linksentry-test-{}.log", Uuid::new_v4())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_bearer_tokens() {
        let logger = null_logger();
        let redacted = logger.redact("Authorization: Bearer abc123xyz");
        assert!(redacted.contains("[REDACTED]"));
        assert!(!redacted.contains("abc123xyz"));
    }

    #[test]
    fn writes_and_rotates_under_size_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        let logger = Logger::new(path.clone());
        logger.info("test", "startup", "hello");
        assert!(path.exists());
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"event\":\"startup\""));
    }
}
