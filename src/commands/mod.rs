//! Admin command surface parsing (spec.md §6.4).
//!
//! This module only turns inbound messenger text into a typed `Command`;
//! dispatching a parsed command into scheduler/config/tracker actions is
//! out of scope here (spec.md's Non-goals exclude the handler bodies) —
//! callers reach those through `crate::core::gateway::CommandGateway`.

use crate::config::types::NotificationLevel;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Start,
    Status,
    List,
    Add(Vec<String>),
    Remove(Vec<String>),
    Clear,
    Check,
    StopCheck,
    Config,
    Interval(u32),
    Timeout(u32),
    Retry(u32),
    Concurrent(usize),
    Notify(Option<NotificationLevel>),
    AutoAdjust,
    Errors,
    History { domain: Option<String>, days: Option<u32> },
    Ack { endpoint: String, note: Option<String> },
    Admin(AdminAction),
    Stop,
    Restart,
    Reload,
    DailyReport(DailyReportAction),
    ApiKey,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdminAction {
    List,
    Add(String),
    Remove(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DailyReportAction {
    Enable,
    Disable,
    SetTime(String),
    Now,
}

/// Commands any user may invoke, regardless of admin status (spec.md
/// §6.4's "read-only set").
pub const READ_ONLY_COMMANDS: &[&str] = &["help", "start", "status", "list", "errors", "history"];

/// Commands refused while an identically-named operation is already in
/// flight (spec.md §6.4 re-entrancy rule).
pub const NON_REENTRANT_COMMANDS: &[&str] = &["check", "reload", "stop", "restart"];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0} requires an argument")]
    MissingArgument(String),
    #[error("invalid numeric argument for {0}: {1}")]
    InvalidNumber(String, String),
}

/// Parse one line of inbound message text into a `Command`. Unrecognized
/// leading tokens (not starting with `/`) are not commands at all and
/// should be ignored by the caller before reaching this function.
pub fn parse(text: &str) -> Result<Command, ParseError> {
    let text = text.trim();
    let mut parts = text.split_whitespace();
    let head = parts.next().unwrap_or("");
    let name = head.trim_start_matches('/').to_lowercase();
    let args: Vec<&str> = parts.collect();

    match name.as_str() {
        "help" => Ok(Command::Help),
        "start" => Ok(Command::Start),
        "status" => Ok(Command::Status),
        "list" => Ok(Command::List),
        "add" => Ok(Command::Add(args.iter().map(|s| s.to_string()).collect())),
        "remove" => Ok(Command::Remove(args.iter().map(|s| s.to_string()).collect())),
        "clear" => Ok(Command::Clear),
        "check" => Ok(Command::Check),
        "stopcheck" => Ok(Command::StopCheck),
        "config" => Ok(Command::Config),
        "interval" => Ok(Command::Interval(parse_u32("interval", &args)?)),
        "timeout" => Ok(Command::Timeout(parse_u32("timeout", &args)?)),
        "retry" => Ok(Command::Retry(parse_u32("retry", &args)?)),
        "concurrent" => Ok(Command::Concurrent(parse_u32("concurrent", &args)? as usize)),
        "notify" => Ok(Command::Notify(parse_notify_level(&args)?)),
        "autoadjust" => Ok(Command::AutoAdjust),
        "errors" => Ok(Command::Errors),
        "history" => Ok(parse_history(&args)),
        "ack" => parse_ack(&args),
        "admin" => parse_admin(&args),
        "stop" => Ok(Command::Stop),
        "restart" => Ok(Command::Restart),
        "reload" => Ok(Command::Reload),
        "dailyreport" => parse_daily_report(&args),
        "apikey" => Ok(Command::ApiKey),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

fn parse_u32(field: &str, args: &[&str]) -> Result<u32, ParseError> {
    let raw = args.first().ok_or_else(|| ParseError::MissingArgument(field.to_string()))?;
    raw.parse::<u32>()
        .map_err(|_| ParseError::InvalidNumber(field.to_string(), raw.to_string()))
}

fn parse_notify_level(args: &[&str]) -> Result<Option<NotificationLevel>, ParseError> {
    match args.first().map(|s| s.to_lowercase()) {
        None => Ok(None),
        Some(s) if s == "all" => Ok(Some(NotificationLevel::All)),
        Some(s) if s == "error" => Ok(Some(NotificationLevel::Error)),
        Some(s) if s == "smart" => Ok(Some(NotificationLevel::Smart)),
        Some(other) => Err(ParseError::InvalidNumber("notify".to_string(), other)),
    }
}

fn parse_history(args: &[&str]) -> Command {
    let domain = args.first().map(|s| s.to_string());
    let days = args.get(1).and_then(|s| s.parse::<u32>().ok());
    Command::History { domain, days }
}

fn parse_ack(args: &[&str]) -> Result<Command, ParseError> {
    let endpoint = args
        .first()
        .ok_or_else(|| ParseError::MissingArgument("ack".to_string()))?
        .to_string();
    let note = if args.len() > 1 {
        Some(args[1..].join(" "))
    } else {
        None
    };
    Ok(Command::Ack { endpoint, note })
}

fn parse_admin(args: &[&str]) -> Result<Command, ParseError> {
    match args.first().map(|s| s.to_lowercase()).as_deref() {
        None | Some("list") => Ok(Command::Admin(AdminAction::List)),
        Some("add") => {
            let user = args
                .get(1)
                .ok_or_else(|| ParseError::MissingArgument("admin add".to_string()))?;
            Ok(Command::Admin(AdminAction::Add(user.to_string())))
        }
        Some("remove") => {
            let user = args
                .get(1)
                .ok_or_else(|| ParseError::MissingArgument("admin remove".to_string()))?;
            Ok(Command::Admin(AdminAction::Remove(user.to_string())))
        }
        Some(other) => Err(ParseError::Unknown(format!("admin {other}"))),
    }
}

fn parse_daily_report(args: &[&str]) -> Result<Command, ParseError> {
    match args.first().map(|s| s.to_lowercase()).as_deref() {
        Some("enable") => Ok(Command::DailyReport(DailyReportAction::Enable)),
        Some("disable") => Ok(Command::DailyReport(DailyReportAction::Disable)),
        Some("now") => Ok(Command::DailyReport(DailyReportAction::Now)),
        Some("time") => {
            let time = args
                .get(1)
                .ok_or_else(|| ParseError::MissingArgument("dailyreport time".to_string()))?;
            Ok(Command::DailyReport(DailyReportAction::SetTime(time.to_string())))
        }
        Some(other) => Err(ParseError::Unknown(format!("dailyreport {other}"))),
        None => Err(ParseError::MissingArgument("dailyreport".to_string())),
    }
}

/// Whether `command_name` (bare, no leading slash) requires admin
/// authorization.
pub fn requires_admin(command_name: &str) -> bool {
    !READ_ONLY_COMMANDS.contains(&command_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse("/help").unwrap(), Command::Help);
        assert_eq!(parse("/status").unwrap(), Command::Status);
    }

    #[test]
    fn parses_add_with_multiple_endpoints() {
        let cmd = parse("/add a.com b.com").unwrap();
        assert_eq!(cmd, Command::Add(vec!["a.com".to_string(), "b.com".to_string()]));
    }

    #[test]
    fn parses_interval_with_numeric_argument() {
        assert_eq!(parse("/interval 10").unwrap(), Command::Interval(10));
    }

    #[test]
    fn interval_without_argument_is_an_error() {
        assert!(matches!(parse("/interval"), Err(ParseError::MissingArgument(_))));
    }

    #[test]
    fn parses_ack_with_note() {
        let cmd = parse("/ack a.com known flaky upstream").unwrap();
        assert_eq!(
            cmd,
            Command::Ack {
                endpoint: "a.com".to_string(),
                note: Some("known flaky upstream".to_string()),
            }
        );
    }

    #[test]
    fn parses_admin_add() {
        let cmd = parse("/admin add @bob").unwrap();
        assert_eq!(cmd, Command::Admin(AdminAction::Add("@bob".to_string())));
    }

    #[test]
    fn parses_dailyreport_time() {
        let cmd = parse("/dailyreport time 09:00").unwrap();
        assert_eq!(cmd, Command::DailyReport(DailyReportAction::SetTime("09:00".to_string())));
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(matches!(parse("/bogus"), Err(ParseError::Unknown(_))));
    }

    #[test]
    fn read_only_commands_do_not_require_admin() {
        assert!(!requires_admin("status"));
        assert!(requires_admin("reload"));
    }
}
