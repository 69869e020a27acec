//! Outcome types produced by a single probe attempt (spec.md §3).

use serde::{Deserialize, Serialize};

use super::endpoint::Endpoint;

/// Closed set of terminal states a single probe attempt can resolve to.
/// Deliberately a closed sum so every match site is exhaustive and a new
/// failure mode must be named here rather than stuffed into a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Success,
    DnsError,
    ConnectionError,
    Timeout,
    HttpError,
    SslError,
    WebsocketError,
    PhishingWarning,
    SecurityWarning,
    UnknownError,
}

impl CheckStatus {
    pub fn is_success(self) -> bool {
        matches!(self, CheckStatus::Success)
    }

    /// Short emoji used throughout formatted messages, grounded on the
    /// original notifier's per-status glyph table.
    pub fn emoji(self) -> &'static str {
        match self {
            CheckStatus::Success => "✅",
            CheckStatus::DnsError => "🔍",
            CheckStatus::ConnectionError => "🔌",
            CheckStatus::Timeout => "⏱️",
            CheckStatus::HttpError => "❌",
            CheckStatus::SslError => "🔒",
            CheckStatus::WebsocketError => "🌐",
            CheckStatus::PhishingWarning => "🎣",
            CheckStatus::SecurityWarning => "🚨",
            CheckStatus::UnknownError => "❓",
        }
    }
}

/// The full record of one probe attempt against one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub endpoint: String,
    pub url: String,
    pub status: CheckStatus,
    pub http_status_code: Option<u16>,
    pub error_message: Option<String>,
    pub response_time_seconds: f64,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

impl CheckResult {
    pub fn success(endpoint: &Endpoint, http_status_code: u16, response_time_seconds: f64) -> Self {
        Self {
            endpoint: endpoint.raw().to_string(),
            url: endpoint.url().to_string(),
            status: CheckStatus::Success,
            http_status_code: Some(http_status_code),
            error_message: None,
            response_time_seconds,
            timestamp: chrono::Local::now(),
        }
    }

    pub fn failure(
        endpoint: &Endpoint,
        status: CheckStatus,
        http_status_code: Option<u16>,
        error_message: impl Into<String>,
        response_time_seconds: f64,
    ) -> Self {
        Self {
            endpoint: endpoint.raw().to_string(),
            url: endpoint.url().to_string(),
            status,
            http_status_code,
            error_message: Some(error_message.into()),
            response_time_seconds,
            timestamp: chrono::Local::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_result_has_no_error_message() {
        let ep = Endpoint::parse("example.com");
        let r = CheckResult::success(&ep, 200, 0.123);
        assert!(r.is_success());
        assert!(r.error_message.is_none());
        assert_eq!(r.http_status_code, Some(200));
    }

    #[test]
    fn failure_result_carries_status_and_message() {
        let ep = Endpoint::parse("example.com");
        let r = CheckResult::failure(&ep, CheckStatus::Timeout, None, "timed out after 10s", 10.0);
        assert!(!r.is_success());
        assert_eq!(r.status, CheckStatus::Timeout);
        assert_eq!(r.error_message.as_deref(), Some("timed out after 10s"));
    }
}
