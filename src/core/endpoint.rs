//! Endpoint addressing and failure-bucket classification (spec.md §3).

use serde::{Deserialize, Serialize};

use super::result::CheckStatus;

/// A watched address, stored in its original textual form alongside the
/// scheme-resolved URL actually dialed.
///
/// Equality and hashing are case-sensitive on the original text, per
/// spec.md §3: two entries that differ only by case are distinct endpoints
/// even if they resolve to the same host.
#[derive(Debug, Clone)]
pub struct Endpoint {
    raw: String,
    url: String,
}

impl Endpoint {
    /// Parse a config-file entry into its dialed URL.
    ///
    /// - already schemed (`http://`, `https://`, `ws://`, `wss://`): used
    ///   verbatim.
    /// - bare, starting with the label `ws.`: treated as `wss://<address>`.
    /// - any other bare address: treated as `https://<address>`.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let url = Self::resolve(&raw);
        Self { raw, url }
    }

    fn resolve(raw: &str) -> String {
        if raw.starts_with("http://")
            || raw.starts_with("https://")
            || raw.starts_with("ws://")
            || raw.starts_with("wss://")
        {
            return raw.to_string();
        }
        if raw.starts_with("ws.") {
            return format!("wss://{raw}");
        }
        format!("https://{raw}")
    }

    /// The original, unmodified text as it appeared in config. This is what
    /// equality, hashing, and history keys are based on.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The URL actually dialed on the first attempt.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// True when `url()` is an `https://` URL that was *not* explicitly
    /// requested as such in `raw` (i.e. it was derived from a bare address).
    /// Such endpoints are eligible for the TLS-failure → plain-HTTP retry
    /// described in spec.md §3 and §4.A.
    pub fn is_downgradable(&self) -> bool {
        self.url.starts_with("https://") && !self.raw.starts_with("https://")
    }

    /// The plain-HTTP fallback URL used when a downgradable endpoint fails
    /// TLS verification.
    pub fn http_fallback_url(&self) -> Option<String> {
        if self.is_downgradable() {
            Some(format!("http://{}", self.url.trim_start_matches("https://")))
        } else {
            None
        }
    }

    pub fn is_websocket(&self) -> bool {
        self.url.starts_with("ws://") || self.url.starts_with("wss://")
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl Eq for Endpoint {}

impl std::hash::Hash for Endpoint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Coarser grouping used by the message formatter to cluster related
/// failures under one heading (spec.md §4.G), grounded on the bucket names
/// used by the original Python notifier's `error_groups` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureBucket {
    CloudflareError,
    GatewayError,
    ServerError,
    AccessDenied,
    NotFound,
    BadRequest,
    Http(u16),
    Status(CheckStatus),
}

impl FailureBucket {
    /// Classify a completed check result into the bucket used for grouped
    /// summaries. Mirrors the HTTP status-code table from the original
    /// Python notifier exactly.
    pub fn classify(status: CheckStatus, http_status_code: Option<u16>) -> Self {
        if status != CheckStatus::HttpError {
            return FailureBucket::Status(status);
        }
        match http_status_code {
            Some(code @ 520..=526) => FailureBucket::CloudflareError,
            Some(502) | Some(503) | Some(504) => FailureBucket::GatewayError,
            Some(500) => FailureBucket::ServerError,
            Some(401) | Some(403) | Some(451) => FailureBucket::AccessDenied,
            Some(404) => FailureBucket::NotFound,
            Some(400) | Some(429) => FailureBucket::BadRequest,
            Some(code) => FailureBucket::Http(code),
            None => FailureBucket::Status(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_address_defaults_to_https() {
        let ep = Endpoint::parse("example.com");
        assert_eq!(ep.url(), "https://example.com");
        assert!(ep.is_downgradable());
    }

    #[test]
    fn ws_prefixed_label_becomes_wss() {
        let ep = Endpoint::parse("ws.example.com");
        assert_eq!(ep.url(), "wss://ws.example.com");
        assert!(ep.is_websocket());
        assert!(!ep.is_downgradable());
    }

    #[test]
    fn schemed_addresses_pass_through() {
        let ep = Endpoint::parse("http://example.com");
        assert_eq!(ep.url(), "http://example.com");
        assert!(!ep.is_downgradable());
    }

    #[test]
    fn equality_is_case_sensitive_on_raw_text() {
        let a = Endpoint::parse("Example.com");
        let b = Endpoint::parse("example.com");
        assert_ne!(a, b);
    }

    #[test]
    fn http_fallback_strips_scheme_correctly() {
        let ep = Endpoint::parse("example.com");
        assert_eq!(ep.http_fallback_url().as_deref(), Some("http://example.com"));
    }

    #[test]
    fn cloudflare_bucket_covers_520_to_526() {
        assert_eq!(
            FailureBucket::classify(CheckStatus::HttpError, Some(522)),
            FailureBucket::CloudflareError
        );
        assert_eq!(
            FailureBucket::classify(CheckStatus::HttpError, Some(526)),
            FailureBucket::CloudflareError
        );
    }

    #[test]
    fn gateway_and_server_buckets() {
        assert_eq!(
            FailureBucket::classify(CheckStatus::HttpError, Some(502)),
            FailureBucket::GatewayError
        );
        assert_eq!(
            FailureBucket::classify(CheckStatus::HttpError, Some(500)),
            FailureBucket::ServerError
        );
    }

    #[test]
    fn non_http_error_falls_back_to_status_bucket() {
        assert_eq!(
            FailureBucket::classify(CheckStatus::DnsError, None),
            FailureBucket::Status(CheckStatus::DnsError)
        );
    }
}
