//! Configuration persistence: rename+backup JSON read/write behind a
//! re-entrant lock (spec.md §5: "readers take short sections; writers
//! persist to disk before releasing").

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use super::types::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Live, shared configuration. The scheduler, notifier, and HTTP API all
/// read a cloned snapshot at the top of each operation rather than holding
/// the guard across awaits.
#[derive(Clone)]
pub struct ConfigStore {
    path: PathBuf,
    inner: Arc<RwLock<Config>>,
}

impl ConfigStore {
    /// Load from `path`, creating a default document if it doesn't exist.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let config: Config = serde_json::from_str(&raw)?;
            validate(&config)?;
            config
        } else {
            Config::default()
        };
        Ok(Self {
            path,
            inner: Arc::new(RwLock::new(config)),
        })
    }

    /// Snapshot the current configuration. Cheap: callers should clone this
    /// out rather than hold the store's lock across an await.
    pub async fn snapshot(&self) -> Config {
        self.inner.read().await.clone()
    }

    /// Validate and persist `new_config`, replacing the live document.
    /// Returns the old config unchanged in the store if validation fails.
    pub async fn reload(&self, new_config: Config) -> Result<(), ConfigError> {
        validate(&new_config)?;
        self.write_to_disk(&new_config)?;
        let mut guard = self.inner.write().await;
        *guard = new_config;
        Ok(())
    }

    /// Mutate the live config in place via `f`, then persist.
    pub async fn update<F>(&self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Config),
    {
        let mut guard = self.inner.write().await;
        let mut candidate = guard.clone();
        f(&mut candidate);
        validate(&candidate)?;
        self.write_to_disk(&candidate)?;
        *guard = candidate;
        Ok(())
    }

    /// rename current → `*.bak`, write new content, delete `*.bak` on
    /// success; restore from `*.bak` on failure (spec.md §6.1).
    fn write_to_disk(&self, config: &Config) -> Result<(), ConfigError> {
        let backup = backup_path(&self.path);
        let had_original = self.path.exists();
        if had_original {
            std::fs::rename(&self.path, &backup).map_err(|source| ConfigError::Io {
                path: self.path.clone(),
                source,
            })?;
        }

        let serialized = serde_json::to_string_pretty(config)?;
        let write_result = std::fs::write(&self.path, serialized);

        match write_result {
            Ok(()) => {
                if had_original {
                    let _ = std::fs::remove_file(&backup);
                }
                Ok(())
            }
            Err(source) => {
                if had_original {
                    let _ = std::fs::rename(&backup, &self.path);
                }
                Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".bak");
    PathBuf::from(os)
}

/// Range validation per spec.md §6.1.
fn validate(config: &Config) -> Result<(), ConfigError> {
    let c = &config.check;
    in_range("check.interval_minutes", c.interval_minutes as i64, 1, 1440)?;
    in_range("check.timeout_seconds", c.timeout_seconds as i64, 1, 300)?;
    in_range("check.retry_count", c.retry_count as i64, 0, 10)?;
    in_range("check.max_concurrent", c.max_concurrent as i64, 1, 200)?;

    let n = &config.notification;
    in_range("notification.failure_threshold", n.failure_threshold as i64, 1, 100)?;
    in_range("notification.cooldown_minutes", n.cooldown_minutes as i64, 0, 1440)?;

    if config.daily_report.enabled && !is_valid_hh_mm(&config.daily_report.time) {
        return Err(ConfigError::Validation(format!(
            "daily_report.time must be HH:MM, got {:?}",
            config.daily_report.time
        )));
    }

    Ok(())
}

fn in_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Validation(format!(
            "{field} must be in [{min}, {max}], got {value}"
        )));
    }
    Ok(())
}

fn is_valid_hh_mm(s: &str) -> bool {
    let re = regex::Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").unwrap();
    re.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::load(&path).await.unwrap();
        let snap = store.snapshot().await;
        assert_eq!(snap.check.max_concurrent, 10);
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::load(&path).await.unwrap();
        store
            .update(|c| c.check.max_concurrent = 42)
            .await
            .unwrap();
        assert!(path.exists());
        assert!(!backup_path(&path).exists());

        let store2 = ConfigStore::load(&path).await.unwrap();
        assert_eq!(store2.snapshot().await.check.max_concurrent, 42);
    }

    #[tokio::test]
    async fn rejects_out_of_range_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::load(&path).await.unwrap();
        let result = store.update(|c| c.check.interval_minutes = 0).await;
        assert!(result.is_err());
    }

    #[test]
    fn validates_hh_mm() {
        assert!(is_valid_hh_mm("09:00"));
        assert!(is_valid_hh_mm("23:59"));
        assert!(!is_valid_hh_mm("24:00"));
        assert!(!is_valid_hh_mm("9:00"));
    }
}
