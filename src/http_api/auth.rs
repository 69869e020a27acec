//! Inbound request authorization: bearer/API-key auth and CIDR-based IP
//! allowlisting (spec.md §6.2). Grounded on `ipnet`'s `IpNet` for the
//! allowlist match, the one piece of this crate's stack the teacher repo
//! doesn't itself need.

use std::net::IpAddr;
use std::str::FromStr;

use axum::http::HeaderMap;
use ipnet::IpNet;

use crate::config::types::HttpApiConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingOrBadKey,
    IpNotAllowed,
}

/// Resolve the originating client IP: `X-Forwarded-For`'s first element,
/// then `X-Real-IP`, then the socket peer address (spec.md §6.2).
pub fn resolve_client_ip(headers: &HeaderMap, socket_peer: IpAddr) -> IpAddr {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(ip) = IpAddr::from_str(first.trim()) {
                return ip;
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if let Ok(ip) = IpAddr::from_str(real_ip.trim()) {
            return ip;
        }
    }
    socket_peer
}

/// True if `allowed_ips` is empty (no restriction configured) or `ip`
/// matches one of the listed IPs/CIDR ranges.
pub fn ip_allowed(ip: IpAddr, allowed_ips: &[String]) -> bool {
    if allowed_ips.is_empty() {
        return true;
    }
    allowed_ips.iter().any(|entry| {
        if let Ok(net) = entry.parse::<IpNet>() {
            net.contains(&ip)
        } else if let Ok(single) = IpAddr::from_str(entry) {
            single == ip
        } else {
            false
        }
    })
}

/// Extract a presented API key from `Authorization: Bearer …`,
/// `X-API-Key: …`, or a `?api_key=` query parameter.
pub fn extract_api_key(headers: &HeaderMap, query: &str) -> Option<String> {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(key.to_string());
    }
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("api_key=") {
            return Some(value.to_string());
        }
    }
    None
}

/// Full authorization check for an inbound API request: IP allowlist
/// first, then key auth if enabled.
pub fn authorize(
    config: &HttpApiConfig,
    headers: &HeaderMap,
    query: &str,
    client_ip: IpAddr,
) -> Result<(), AuthError> {
    if !ip_allowed(client_ip, &config.allowed_ips) {
        return Err(AuthError::IpNotAllowed);
    }
    if config.auth.enabled {
        match extract_api_key(headers, query) {
            Some(key) if key == config.auth.api_key => Ok(()),
            _ => Err(AuthError::MissingOrBadKey),
        }
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allowlist_allows_everything() {
        let ip: IpAddr = "203.0.113.5".parse().unwrap();
        assert!(ip_allowed(ip, &[]));
    }

    #[test]
    fn cidr_range_matches_contained_address() {
        let ip: IpAddr = "10.0.0.42".parse().unwrap();
        assert!(ip_allowed(ip, &["10.0.0.0/24".to_string()]));
    }

    #[test]
    fn cidr_range_rejects_address_outside_range() {
        let ip: IpAddr = "10.0.1.42".parse().unwrap();
        assert!(!ip_allowed(ip, &["10.0.0.0/24".to_string()]));
    }

    #[test]
    fn extract_api_key_prefers_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer secret123".parse().unwrap());
        assert_eq!(extract_api_key(&headers, ""), Some("secret123".to_string()));
    }

    #[test]
    fn extract_api_key_falls_back_to_query_param() {
        let headers = HeaderMap::new();
        assert_eq!(
            extract_api_key(&headers, "api_key=fromquery"),
            Some("fromquery".to_string())
        );
    }

    #[test]
    fn resolve_client_ip_prefers_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "198.51.100.1, 10.0.0.1".parse().unwrap());
        let fallback: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(resolve_client_ip(&headers, fallback).to_string(), "198.51.100.1");
    }
}
