//! Single-endpoint probe orchestration.
//!
//! Grounded on `core/network/proxy_health/checker.rs`'s
//! `assess_proxy_health` orchestration shape (primary attempt, fallback
//! attempt, outcome classification), generalized from one proxy health
//! endpoint to arbitrary HTTP/WebSocket endpoints per spec.md §4.A, with
//! error-string classification grounded on
//! `original_source/domain_checker.py`'s `_check_once`.

use std::time::{Duration, Instant};

use super::client_pool::ClientPool;
use super::security::{self, SecurityVerdict};
use super::websocket;
use crate::core::endpoint::Endpoint;
use crate::core::result::{CheckResult, CheckStatus};

/// HTTP status codes accepted as a successful reach, per spec.md §4.A.
const ACCEPTED_STATUS_CODES: &[u16] = &[
    200, 201, 202, 203, 204, 301, 302, 303, 304, 307, 308, 401, 403,
];

/// Probe one endpoint once. Retries (count, delay) are the caller's
/// responsibility — this function performs exactly one logical attempt,
/// including the single TLS-downgrade retry for bare addresses.
pub async fn probe(pool: &ClientPool, endpoint: &Endpoint, timeout: Duration) -> CheckResult {
    if endpoint.is_websocket() {
        return probe_websocket(endpoint, timeout).await;
    }
    probe_http(pool, endpoint).await
}

async fn probe_http(pool: &ClientPool, endpoint: &Endpoint) -> CheckResult {
    let start = Instant::now();
    match pool.fetch_verified(endpoint.url()).await {
        Ok(response) => {
            let elapsed = start.elapsed().as_secs_f64();
            classify_response(endpoint, response.status_code, &response.body, &response.headers, elapsed)
        }
        Err(message) => {
            if looks_like_tls_failure(&message) {
                if let Some(fallback_url) = endpoint.http_fallback_url() {
                    return probe_downgraded(pool, endpoint, &fallback_url, start).await;
                }
            }
            classify_error(endpoint, &message, start.elapsed().as_secs_f64())
        }
    }
}

async fn probe_downgraded(
    pool: &ClientPool,
    endpoint: &Endpoint,
    fallback_url: &str,
    start: Instant,
) -> CheckResult {
    match pool.fetch_permissive(fallback_url).await {
        Ok(response) => {
            let elapsed = start.elapsed().as_secs_f64();
            classify_response(endpoint, response.status_code, &response.body, &response.headers, elapsed)
        }
        Err(message) => classify_error(endpoint, &message, start.elapsed().as_secs_f64()),
    }
}

async fn probe_websocket(endpoint: &Endpoint, timeout: Duration) -> CheckResult {
    let outcome = websocket::probe(endpoint.url(), timeout).await;
    if outcome.connected {
        CheckResult::success(endpoint, 101, outcome.elapsed.as_secs_f64())
    } else {
        CheckResult::failure(
            endpoint,
            CheckStatus::WebsocketError,
            None,
            outcome.error.unwrap_or_else(|| "websocket handshake failed".to_string()),
            outcome.elapsed.as_secs_f64(),
        )
    }
}

fn classify_response(
    endpoint: &Endpoint,
    status_code: u16,
    body: &str,
    headers: &[(String, String)],
    elapsed: f64,
) -> CheckResult {
    match security::inspect(body, headers) {
        SecurityVerdict::Phishing => {
            return CheckResult::failure(
                endpoint,
                CheckStatus::PhishingWarning,
                Some(status_code),
                "response content matched a known phishing/browser-warning signature",
                elapsed,
            );
        }
        SecurityVerdict::SecurityWarning => {
            return CheckResult::failure(
                endpoint,
                CheckStatus::SecurityWarning,
                Some(status_code),
                "response indicates a CDN security challenge blocking access",
                elapsed,
            );
        }
        SecurityVerdict::Clean => {}
    }

    if ACCEPTED_STATUS_CODES.contains(&status_code) {
        CheckResult::success(endpoint, status_code, elapsed)
    } else {
        CheckResult::failure(
            endpoint,
            CheckStatus::HttpError,
            Some(status_code),
            format!("unexpected HTTP status {status_code}"),
            elapsed,
        )
    }
}

/// Classify a transport-level failure string into a `CheckStatus`.
/// isahc/curl error text doesn't carry a structured error kind, so we match
/// substrings the same way the original Python implementation matched on
/// exception type names and message text.
fn classify_error(endpoint: &Endpoint, message: &str, elapsed: f64) -> CheckResult {
    let lower = message.to_lowercase();
    let status = if lower.contains("name resolution")
        || lower.contains("could not resolve host")
        || lower.contains("dns")
    {
        CheckStatus::DnsError
    } else if lower.contains("timed out") || lower.contains("timeout") {
        CheckStatus::Timeout
    } else if lower.contains("ssl") || lower.contains("tls") || lower.contains("certificate") {
        CheckStatus::SslError
    } else if lower.contains("connection")
        || lower.contains("connect")
        || lower.contains("refused")
        || lower.contains("reset")
        || lower.contains("unreachable")
    {
        CheckStatus::ConnectionError
    } else {
        CheckStatus::UnknownError
    };
    CheckResult::failure(endpoint, status, None, message.to_string(), elapsed)
}

fn looks_like_tls_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("ssl") || lower.contains("tls") || lower.contains("certificate")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_status_codes_include_redirects() {
        assert!(ACCEPTED_STATUS_CODES.contains(&301));
        assert!(!ACCEPTED_STATUS_CODES.contains(&404));
    }

    #[test]
    fn accepted_status_codes_include_auth_and_partial_success() {
        for code in [202, 203, 303, 304, 401, 403] {
            assert!(ACCEPTED_STATUS_CODES.contains(&code), "{code} should be accepted");
        }
    }

    #[test]
    fn classify_error_recognizes_network_unreachable() {
        let ep = Endpoint::parse("example.com");
        let result = classify_error(&ep, "network unreachable", 0.01);
        assert_eq!(result.status, CheckStatus::ConnectionError);
    }

    #[test]
    fn classify_error_recognizes_dns_failure() {
        let ep = Endpoint::parse("example.com");
        let result = classify_error(&ep, "could not resolve host: example.com", 0.01);
        assert_eq!(result.status, CheckStatus::DnsError);
    }

    #[test]
    fn classify_error_recognizes_timeout() {
        let ep = Endpoint::parse("example.com");
        let result = classify_error(&ep, "operation timed out", 10.0);
        assert_eq!(result.status, CheckStatus::Timeout);
    }

    #[test]
    fn classify_error_recognizes_tls_failure() {
        let ep = Endpoint::parse("example.com");
        let result = classify_error(&ep, "SSL certificate problem: self-signed certificate", 0.2);
        assert_eq!(result.status, CheckStatus::SslError);
    }

    #[test]
    fn classify_error_falls_back_to_unknown() {
        let ep = Endpoint::parse("example.com");
        let result = classify_error(&ep, "something bizarre happened", 0.2);
        assert_eq!(result.status, CheckStatus::UnknownError);
    }

    #[test]
    fn classify_response_rejects_unlisted_status() {
        let ep = Endpoint::parse("example.com");
        let result = classify_response(&ep, 500, "ok", &[], 0.1);
        assert_eq!(result.status, CheckStatus::HttpError);
        assert_eq!(result.http_status_code, Some(500));
    }

    #[test]
    fn classify_response_accepts_200() {
        let ep = Endpoint::parse("example.com");
        let result = classify_response(&ep, 200, "ok", &[], 0.1);
        assert!(result.is_success());
    }
}
