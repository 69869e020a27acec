//! Content-based phishing/security-warning detection.
//!
//! Grounded directly on `original_source/domain_checker.py`'s
//! `_check_for_security_issues`: a successful HTTP response can still be a
//! security incident if the body or headers carry a browser-warning
//! signature. Phrase lists are kept verbatim from the original so existing
//! operators see the same classification behavior they already tuned for.

const GOOGLE_SAFE_BROWSING_PHRASES: &[&str] = &[
    "deceptive site ahead",
    "this site may harm your computer",
    "the site ahead contains malware",
    "phishing attack ahead",
    "this site has been reported as unsafe",
];

const BROWSER_WARNING_PHRASES: &[&str] = &[
    "reported attack site",
    "suspected phishing site",
    "dangerous site",
    "unsafe website",
];

const CDN_MARKERS: &[&str] = &["cloudflare", "security challenge"];
const ACCESS_BLOCK_PHRASES: &[&str] = &["blocked for security reasons", "access denied"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityVerdict {
    Clean,
    Phishing,
    SecurityWarning,
}

/// Inspect a response body and its headers for phishing/security-warning
/// signatures. `body` should be lowercased-search-ready (we lowercase it
/// internally so callers can pass the raw text).
///
/// The `x-phishing-warning`/`x-malware-warning` response headers are the
/// only signal classified `Phishing`; a fixed body-phrase match is always a
/// `SecurityWarning`, matching the original's header-vs-content distinction.
pub fn inspect(body: &str, headers: &[(String, String)]) -> SecurityVerdict {
    for (name, _) in headers {
        let name_lower = name.to_lowercase();
        if name_lower == "x-phishing-warning" || name_lower == "x-malware-warning" {
            return SecurityVerdict::Phishing;
        }
    }

    let lower = body.to_lowercase();

    if GOOGLE_SAFE_BROWSING_PHRASES.iter().any(|p| lower.contains(p))
        || BROWSER_WARNING_PHRASES.iter().any(|p| lower.contains(p))
    {
        return SecurityVerdict::SecurityWarning;
    }

    let has_cdn_marker = CDN_MARKERS.iter().any(|p| lower.contains(p));
    let has_block_phrase = ACCESS_BLOCK_PHRASES.iter().any(|p| lower.contains(p));
    if has_cdn_marker && has_block_phrase {
        return SecurityVerdict::SecurityWarning;
    }

    SecurityVerdict::Clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_google_safe_browsing_phrase() {
        let verdict = inspect("Warning: Deceptive site ahead!", &[]);
        assert_eq!(verdict, SecurityVerdict::SecurityWarning);
    }

    #[test]
    fn detects_browser_warning_phrase() {
        let verdict = inspect("This is a Reported Attack Site", &[]);
        assert_eq!(verdict, SecurityVerdict::SecurityWarning);
    }

    #[test]
    fn detects_phishing_header() {
        let verdict = inspect(
            "ordinary body",
            &[("X-Phishing-Warning".to_string(), "true".to_string())],
        );
        assert_eq!(verdict, SecurityVerdict::Phishing);
    }

    #[test]
    fn detects_cdn_plus_block_phrase_combo() {
        let verdict = inspect("Access Denied — protected by cloudflare security challenge", &[]);
        assert_eq!(verdict, SecurityVerdict::SecurityWarning);
    }

    #[test]
    fn cdn_marker_alone_is_not_a_warning() {
        let verdict = inspect("served via cloudflare", &[]);
        assert_eq!(verdict, SecurityVerdict::Clean);
    }

    #[test]
    fn ordinary_body_is_clean() {
        assert_eq!(inspect("hello world", &[]), SecurityVerdict::Clean);
    }
}
