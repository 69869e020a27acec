//! Outbound message formatting: full-summary and delta layouts, grouped by
//! failure bucket, paginated at a fixed character cap (spec.md §4.G).
//!
//! Bucket names, emoji, and Chinese-language section titles are carried
//! over verbatim from `original_source/telegram_notifier.py`'s
//! `error_names` table and `display_order` list — this is the one place in
//! the crate where matching the original's exact wording matters, since
//! operators read these messages directly.

use std::collections::HashMap;

use crate::core::endpoint::FailureBucket;
use crate::core::result::{CheckResult, CheckStatus};

/// Telegram's message body limit. Messages are split across this boundary
/// rather than truncated.
pub const MAX_MESSAGE_CHARS: usize = 4096;

fn bucket_label(bucket: FailureBucket) -> (&'static str, String) {
    match bucket {
        FailureBucket::CloudflareError => ("☁️", "Cloudflare错误".to_string()),
        FailureBucket::GatewayError => ("🚪", "网关错误".to_string()),
        FailureBucket::ServerError => ("💥", "服务器内部错误".to_string()),
        FailureBucket::AccessDenied => ("🚫", "访问被拒绝".to_string()),
        FailureBucket::NotFound => ("🔎", "页面不存在".to_string()),
        FailureBucket::BadRequest => ("⚠️", "请求错误".to_string()),
        FailureBucket::Http(code) => ("⚠️", format!("HTTP {code} 错误")),
        FailureBucket::Status(status) => (status.emoji(), status_title(status).to_string()),
    }
}

fn status_title(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Success => "正常",
        CheckStatus::DnsError => "DNS解析失败",
        CheckStatus::ConnectionError => "无法建立连接",
        CheckStatus::Timeout => "访问超时",
        CheckStatus::HttpError => "HTTP错误",
        CheckStatus::SslError => "SSL证书问题",
        CheckStatus::WebsocketError => "WebSocket连接失败",
        CheckStatus::PhishingWarning => "钓鱼网站警告",
        CheckStatus::SecurityWarning => "安全风险警告",
        CheckStatus::UnknownError => "未知错误",
    }
}

/// HTTP sub-code detail lines shown under a bucket heading, matching the
/// original notifier's `detail_info` tables.
fn http_detail(code: u16) -> Option<&'static str> {
    match code {
        522 => Some("522连接超时"),
        521 => Some("521服务器离线"),
        520 => Some("520未知错误"),
        523 => Some("523源站不可达"),
        524 => Some("524超时"),
        525 => Some("525SSL握手失败"),
        526 => Some("526SSL证书无效"),
        502 => Some("502坏网关"),
        503 => Some("503服务暂不可用"),
        504 => Some("504网关超时"),
        401 => Some("401未授权"),
        403 => Some("403禁止访问"),
        451 => Some("451法律原因"),
        _ => None,
    }
}

/// Fixed heading order: CDN/gateway/server-class buckets first (these are
/// usually shared infrastructure incidents affecting many endpoints at
/// once), then per-endpoint transport failures.
const DISPLAY_ORDER: &[FailureBucketKind] = &[
    FailureBucketKind::CloudflareError,
    FailureBucketKind::GatewayError,
    FailureBucketKind::ServerError,
    FailureBucketKind::AccessDenied,
    FailureBucketKind::NotFound,
    FailureBucketKind::BadRequest,
    FailureBucketKind::Status(CheckStatus::DnsError),
    FailureBucketKind::Status(CheckStatus::ConnectionError),
    FailureBucketKind::Status(CheckStatus::Timeout),
    FailureBucketKind::Status(CheckStatus::SslError),
    FailureBucketKind::Status(CheckStatus::WebsocketError),
    FailureBucketKind::Status(CheckStatus::PhishingWarning),
    FailureBucketKind::Status(CheckStatus::SecurityWarning),
    FailureBucketKind::Status(CheckStatus::HttpError),
    FailureBucketKind::Status(CheckStatus::UnknownError),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FailureBucketKind {
    CloudflareError,
    GatewayError,
    ServerError,
    AccessDenied,
    NotFound,
    BadRequest,
    Status(CheckStatus),
}

fn kind_of(bucket: FailureBucket) -> FailureBucketKind {
    match bucket {
        FailureBucket::CloudflareError => FailureBucketKind::CloudflareError,
        FailureBucket::GatewayError => FailureBucketKind::GatewayError,
        FailureBucket::ServerError => FailureBucketKind::ServerError,
        FailureBucket::AccessDenied => FailureBucketKind::AccessDenied,
        FailureBucket::NotFound => FailureBucketKind::NotFound,
        FailureBucket::BadRequest => FailureBucketKind::BadRequest,
        FailureBucket::Http(_) => FailureBucketKind::Status(CheckStatus::HttpError),
        FailureBucket::Status(s) => FailureBucketKind::Status(s),
    }
}

/// Build the full-summary message body for a batch of results (spec.md
/// scenario S2), before pagination.
pub fn format_full_summary(results: &[CheckResult], title: &str) -> String {
    let total = results.len();
    let failures: Vec<&CheckResult> = results.iter().filter(|r| !r.is_success()).collect();
    let success_count = total - failures.len();

    let mut groups: HashMap<FailureBucketKind, Vec<&CheckResult>> = HashMap::new();
    let mut representative: HashMap<FailureBucketKind, FailureBucket> = HashMap::new();
    for result in &failures {
        let bucket = FailureBucket::classify(result.status, result.http_status_code);
        let kind = kind_of(bucket);
        groups.entry(kind).or_default().push(result);
        representative.entry(kind).or_insert(bucket);
    }

    let mut out = String::new();
    out.push_str(&format!("*{title}*\n"));
    out.push_str(&format!("检测总数: {total} | 正常: {success_count} | 异常: {}\n\n", failures.len()));

    if failures.is_empty() {
        out.push_str("✅ 所有端点均正常\n");
        return out;
    }

    for kind in DISPLAY_ORDER {
        let Some(items) = groups.get(kind) else { continue };
        let bucket = representative[kind];
        let (emoji, label) = bucket_label(bucket);
        out.push_str(&format!("\n{emoji} *{label}* ({})\n", items.len()));
        for result in items {
            out.push_str(&format!("  • {}", result.endpoint));
            if let Some(code) = result.http_status_code {
                if let Some(detail) = http_detail(code) {
                    out.push_str(&format!(" [{detail}]"));
                } else {
                    out.push_str(&format!(" [{code}]"));
                }
            }
            out.push('\n');
        }
    }

    out
}

/// Per §4.G, each delta section lists at most this many entries before
/// collapsing the remainder into a single "… and N more" line.
const DELTA_SECTION_CAP: usize = 10;

fn write_capped_section<T>(out: &mut String, heading: &str, items: &[T], mut line: impl FnMut(&T) -> String) {
    if items.is_empty() {
        return;
    }
    out.push_str(heading);
    out.push('\n');
    for item in items.iter().take(DELTA_SECTION_CAP) {
        out.push_str(&line(item));
    }
    if items.len() > DELTA_SECTION_CAP {
        out.push_str(&format!("  … 及另外 {} 项\n", items.len() - DELTA_SECTION_CAP));
    }
    out.push('\n');
}

/// Build the delta message for one cycle's new/recovered/persistent split
/// (spec.md scenario S5/S6).
pub fn format_delta(
    new_errors: &[CheckResult],
    recovered: &[String],
    persistent: &[CheckResult],
) -> Option<String> {
    if new_errors.is_empty() && recovered.is_empty() && persistent.is_empty() {
        return None;
    }

    let mut out = String::new();
    write_capped_section(&mut out, "🆕 *新增异常*", new_errors, |result| {
        format!(
            "  {} {} — {}\n",
            result.status.emoji(),
            result.endpoint,
            result.error_message.as_deref().unwrap_or("")
        )
    });
    write_capped_section(&mut out, "♻️ *持续异常*", persistent, |result| {
        format!("  {} {}\n", result.status.emoji(), result.endpoint)
    });
    write_capped_section(&mut out, "✅ *已恢复*", recovered, |endpoint| format!("  {endpoint}\n"));

    while out.ends_with('\n') {
        out.pop();
    }
    out.push('\n');

    Some(out)
}

/// Split `body` into chunks no longer than `MAX_MESSAGE_CHARS`, breaking at
/// line boundaries where possible. Every chunk after the first is prefixed
/// with a continuation marker, matching the original notifier's
/// "（续）" banner.
pub fn paginate(body: &str) -> Vec<String> {
    if body.chars().count() <= MAX_MESSAGE_CHARS {
        return vec![body.to_string()];
    }

    let continuation_marker = "（续）\n";
    let mut pages = Vec::new();
    let mut current = String::new();
    let mut is_first = true;

    for line in body.split_inclusive('\n') {
        let marker_len = if is_first { 0 } else { continuation_marker.chars().count() };
        let prospective_len = current.chars().count() + line.chars().count() + marker_len;
        if prospective_len > MAX_MESSAGE_CHARS && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
            is_first = false;
        }
        if current.is_empty() && !is_first {
            current.push_str(continuation_marker);
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::Endpoint;

    fn http_error(ep: &str, code: u16) -> CheckResult {
        CheckResult::failure(&Endpoint::parse(ep), CheckStatus::HttpError, Some(code), "bad status", 0.5)
    }

    #[test]
    fn full_summary_groups_cloudflare_errors_together() {
        let results = vec![http_error("a.com", 522), http_error("b.com", 521)];
        let body = format_full_summary(&results, "状态报告");
        assert!(body.contains("Cloudflare错误"));
        assert!(body.contains("522连接超时"));
        assert!(body.contains("521服务器离线"));
    }

    #[test]
    fn full_summary_with_no_failures_says_all_clear() {
        let ep = Endpoint::parse("a.com");
        let results = vec![CheckResult::success(&ep, 200, 0.1)];
        let body = format_full_summary(&results, "状态报告");
        assert!(body.contains("所有端点均正常"));
    }

    #[test]
    fn delta_is_none_when_nothing_changed() {
        assert!(format_delta(&[], &[], &[]).is_none());
    }

    #[test]
    fn delta_lists_new_errors() {
        let results = vec![http_error("a.com", 500)];
        let body = format_delta(&results, &[], &[]).unwrap();
        assert!(body.contains("新增异常"));
        assert!(body.contains("a.com"));
    }

    #[test]
    fn delta_caps_a_section_at_ten_entries_with_overflow_note() {
        let results: Vec<CheckResult> = (0..15).map(|i| http_error(&format!("host{i}.com"), 500)).collect();
        let body = format_delta(&results, &[], &[]).unwrap();
        assert_eq!(body.matches("host").count(), 10);
        assert!(body.contains("及另外 5 项"));
    }

    #[test]
    fn paginate_keeps_short_messages_as_one_page() {
        let pages = paginate("hello world");
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn paginate_splits_long_messages_under_the_cap() {
        let long_line = "x".repeat(100);
        let body = std::iter::repeat(long_line).take(100).collect::<Vec<_>>().join("\n");
        let pages = paginate(&body);
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.chars().count() <= MAX_MESSAGE_CHARS);
        }
    }

    #[test]
    fn bucket_classification_maps_gateway_codes() {
        let bucket = FailureBucket::classify(CheckStatus::HttpError, Some(503));
        assert_eq!(kind_of(bucket), FailureBucketKind::GatewayError);
    }
}
