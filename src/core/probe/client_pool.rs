//! HTTP client pool: two long-lived isahc clients (TLS-verifying and
//! TLS-permissive), rebuilt whenever `max_concurrent` or `timeout_seconds`
//! changes. Grounded on
//! `core/network/proxy_health/client.rs`'s `IsahcHealthCheckClient`
//! builder and GET-with-body-read pattern, generalized to arbitrary
//! endpoints instead of one proxy probe.

use std::time::Duration;

use isahc::config::{Configurable, RedirectPolicy};
use isahc::{AsyncReadResponseExt, HttpClient, Request};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] isahc::Error),
}

/// A single fetched response, reduced to what the probe executor and
/// security inspector need.
pub struct FetchedResponse {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Pairs a verifying and a non-verifying client so the probe executor can
/// retry a downgradable endpoint without re-negotiating TLS settings
/// per-request.
pub struct ClientPool {
    verifying: HttpClient,
    permissive: HttpClient,
    timeout: Duration,
}

impl ClientPool {
    pub fn build(timeout: Duration) -> Result<Self, ClientError> {
        let verifying = HttpClient::builder()
            .timeout(timeout)
            .redirect_policy(RedirectPolicy::Limit(5))
            .cookies()
            .build()?;
        let permissive = HttpClient::builder()
            .timeout(timeout)
            .redirect_policy(RedirectPolicy::Limit(5))
            .ssl_options(isahc::config::SslOption::DANGER_ACCEPT_INVALID_CERTS)
            .cookies()
            .build()?;
        Ok(Self {
            verifying,
            permissive,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(client: &HttpClient, url: &str) -> Result<FetchedResponse, String> {
        let request = Request::get(url)
            .header("User-Agent", "linksentry/0.1 (+endpoint-watcher)")
            .header("Accept", "*/*")
            .body(())
            .map_err(|e| format!("request creation failed: {e}"))?;

        let mut response = client
            .send_async(request)
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or("").to_string(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read response body: {e}"))?;

        Ok(FetchedResponse {
            status_code,
            headers,
            body,
        })
    }

    /// Fetch with the TLS-verifying client — the default path for every
    /// `https://` request.
    pub async fn fetch_verified(&self, url: &str) -> Result<FetchedResponse, String> {
        Self::fetch(&self.verifying, url).await
    }

    /// Fetch with certificate verification disabled — used only for the
    /// single plain-`http://` downgrade retry on a bare address that failed
    /// TLS (spec.md §3, §4.A).
    pub async fn fetch_permissive(&self, url: &str) -> Result<FetchedResponse, String> {
        Self::fetch(&self.permissive, url).await
    }
}
