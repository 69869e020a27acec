//! Configuration document shape. Mirrors spec.md §6.1's key list exactly;
//! every group gets its own struct with `#[serde(default)]` fields so a
//! partially-specified JSON document still loads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::endpoint::Endpoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub check: CheckConfig,
    pub notification: NotificationConfig,
    pub history: HistoryConfig,
    pub daily_report: DailyReportConfig,
    pub http_api: HttpApiConfig,
    pub logging: LoggingConfig,
    /// Single-group endpoint list. Superseded by `telegram.groups` when that
    /// map is non-empty (spec.md §6.1).
    pub domains: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            check: CheckConfig::default(),
            notification: NotificationConfig::default(),
            history: HistoryConfig::default(),
            daily_report: DailyReportConfig::default(),
            http_api: HttpApiConfig::default(),
            logging: LoggingConfig::default(),
            domains: Vec::new(),
        }
    }
}

impl Config {
    /// Resolve the effective chat-group → endpoint-list mapping used for
    /// multi-group notification routing (spec.md §4.F "Multi-group
    /// routing"). Falls back to a single implicit group keyed by
    /// `telegram.chat_id` when `telegram.groups` is empty.
    pub fn group_endpoints(&self) -> Vec<ChatGroup> {
        if self.telegram.groups.is_empty() {
            return vec![ChatGroup {
                chat_id: self.telegram.chat_id.clone(),
                name: "default".to_string(),
                endpoints: self
                    .domains
                    .iter()
                    .map(|d| Endpoint::parse(d))
                    .collect(),
                admins: self.telegram.admin_users.clone(),
            }];
        }
        self.telegram
            .groups
            .iter()
            .map(|(chat_id, group)| ChatGroup {
                chat_id: chat_id.clone(),
                name: group.name.clone(),
                endpoints: group.domains.iter().map(|d| Endpoint::parse(d)).collect(),
                admins: group.admins.clone(),
            })
            .collect()
    }

    /// All endpoints across every group, deduplicated by original text.
    pub fn all_endpoints(&self) -> Vec<Endpoint> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for group in self.group_endpoints() {
            for ep in group.endpoints {
                if seen.insert(ep.raw().to_string()) {
                    out.push(ep);
                }
            }
        }
        out
    }

    pub fn is_admin(&self, user: &str) -> bool {
        let normalized = user.trim_start_matches('@');
        if self.telegram.admin_users.is_empty() {
            return true;
        }
        self.telegram
            .admin_users
            .iter()
            .any(|a| a.trim_start_matches('@').eq_ignore_ascii_case(normalized))
    }
}

/// One chat-group's view of the world: which endpoints it watches and who
/// may administer it.
#[derive(Debug, Clone)]
pub struct ChatGroup {
    pub chat_id: String,
    pub name: String,
    pub endpoints: Vec<Endpoint>,
    pub admins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub admin_users: Vec<String>,
    pub groups: HashMap<String, GroupConfig>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            admin_users: Vec::new(),
            groups: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GroupConfig {
    pub name: String,
    pub domains: Vec<String>,
    pub admins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub interval_minutes: u32,
    pub timeout_seconds: u32,
    pub retry_count: u32,
    pub retry_delay_seconds: u32,
    pub max_concurrent: usize,
    pub auto_adjust_concurrent: bool,
    pub batch_notify: bool,
    pub show_eta: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
            timeout_seconds: 10,
            retry_count: 2,
            retry_delay_seconds: 5,
            max_concurrent: 10,
            auto_adjust_concurrent: true,
            batch_notify: true,
            show_eta: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    All,
    Error,
    Smart,
}

impl Default for NotificationLevel {
    fn default() -> Self {
        NotificationLevel::Smart
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub level: NotificationLevel,
    pub failure_threshold: u32,
    pub cooldown_minutes: u32,
    pub notify_on_recovery: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            level: NotificationLevel::Smart,
            failure_threshold: 2,
            cooldown_minutes: 60,
            notify_on_recovery: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub retention_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyReportConfig {
    pub enabled: bool,
    pub time: String,
}

impl Default for DailyReportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            time: "09:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpApiConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub auth: HttpApiAuth,
    pub rate_limit: HttpApiRateLimit,
    pub allowed_ips: Vec<String>,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 8787,
            auth: HttpApiAuth::default(),
            rate_limit: HttpApiRateLimit::default(),
            allowed_ips: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HttpApiAuth {
    pub enabled: bool,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpApiRateLimit {
    pub enabled: bool,
    pub requests_per_minute: u32,
}

impl Default for HttpApiRateLimit {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_minute: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub max_size_mb: u64,
    pub backup_count: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_size_mb: 8,
            backup_count: 5,
        }
    }
}
