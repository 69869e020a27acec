//! Notification gating: decides whether a cycle's tracker diff should
//! produce an outbound message, and to which chat groups (spec.md §4.F).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::types::{ChatGroup, NotificationConfig, NotificationLevel};
use crate::core::tracker::UpdateOutcome;

/// Per-group cooldown/threshold state. One instance lives for the process
/// lifetime and is consulted (and updated) once per cycle.
#[derive(Default)]
pub struct NotificationPolicy {
    last_sent: HashMap<String, Instant>,
    consecutive_failures: HashMap<String, u32>,
}

/// Which message shape a `Send` decision calls for: the full per-endpoint
/// report (`all`/`error` levels, and any manually-triggered check) or just
/// the new/recovered/persistent change set (`smart`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    FullSummary,
    Delta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Send(MessageKind),
    Suppressed(SuppressReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    NothingChanged,
    Cooldown,
}

impl NotificationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `group` should be notified this cycle, given the
    /// tracker diff restricted to that group's endpoints.
    ///
    /// Decision table (spec.md §4.F):
    /// - any level, `is_manual = true`: always emit the full summary,
    ///   bypassing every other suppression rule (Scenario S4).
    /// - `level = All`: emit the full summary unconditionally, every cycle.
    /// - `level = Error`: emit the full summary whenever any endpoint is
    ///   non-success this cycle (new or persistent); `failure_threshold` is
    ///   display-only and never gates this decision.
    /// - `level = Smart`: emit the delta immediately on any new error or
    ///   recovery; a purely-persistent failure set re-sends the delta only
    ///   once `unacknowledged_count > 0` and `cooldown_minutes` has elapsed
    ///   since the last send for that group.
    pub fn decide(
        &mut self,
        group: &ChatGroup,
        outcome: &UpdateOutcome,
        config: &NotificationConfig,
        is_manual: bool,
        unacknowledged_count: usize,
    ) -> Decision {
        if is_manual {
            self.last_sent.insert(group.chat_id.clone(), Instant::now());
            return Decision::Send(MessageKind::FullSummary);
        }

        let has_new = !outcome.new_errors.is_empty();
        let has_recovered = !outcome.recovered.is_empty();
        let has_persistent = !outcome.persistent_errors.is_empty();

        let decision = match config.level {
            NotificationLevel::All => Decision::Send(MessageKind::FullSummary),
            NotificationLevel::Error => {
                if has_new || has_persistent {
                    Decision::Send(MessageKind::FullSummary)
                } else {
                    Decision::Suppressed(SuppressReason::NothingChanged)
                }
            }
            NotificationLevel::Smart => {
                if has_new || (has_recovered && config.notify_on_recovery) {
                    Decision::Send(MessageKind::Delta)
                } else if unacknowledged_count > 0 {
                    self.cooldown_gated_decision(&group.chat_id, config.cooldown_minutes)
                } else {
                    Decision::Suppressed(SuppressReason::NothingChanged)
                }
            }
        };

        if matches!(decision, Decision::Send(_)) {
            self.last_sent.insert(group.chat_id.clone(), Instant::now());
        }
        decision
    }

    fn cooldown_gated_decision(&self, chat_id: &str, cooldown_minutes: u32) -> Decision {
        match self.last_sent.get(chat_id) {
            None => Decision::Send(MessageKind::Delta),
            Some(last) => {
                if last.elapsed() >= Duration::from_secs(cooldown_minutes as u64 * 60) {
                    Decision::Send(MessageKind::Delta)
                } else {
                    Decision::Suppressed(SuppressReason::Cooldown)
                }
            }
        }
    }

    pub fn record_consecutive_failure(&mut self, endpoint: &str) -> u32 {
        let count = self.consecutive_failures.entry(endpoint.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn clear_consecutive_failure(&mut self, endpoint: &str) {
        self.consecutive_failures.remove(endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> ChatGroup {
        ChatGroup {
            chat_id: "123".to_string(),
            name: "default".to_string(),
            endpoints: Vec::new(),
            admins: Vec::new(),
        }
    }

    fn outcome(new: &[&str], recovered: &[&str], persistent: &[&str]) -> UpdateOutcome {
        UpdateOutcome {
            new_errors: new.iter().map(|s| s.to_string()).collect(),
            recovered: recovered.iter().map(|s| s.to_string()).collect(),
            persistent_errors: persistent.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn nothing_changed_is_suppressed() {
        let mut policy = NotificationPolicy::new();
        let decision = policy.decide(&group(), &outcome(&[], &[], &[]), &NotificationConfig::default(), false, 0);
        assert_eq!(decision, Decision::Suppressed(SuppressReason::NothingChanged));
    }

    #[test]
    fn manual_trigger_always_sends_full_summary() {
        let mut policy = NotificationPolicy::new();
        let decision = policy.decide(&group(), &outcome(&[], &[], &[]), &NotificationConfig::default(), true, 0);
        assert_eq!(decision, Decision::Send(MessageKind::FullSummary));
    }

    #[test]
    fn all_level_sends_full_summary_even_with_nothing_changed() {
        let mut policy = NotificationPolicy::new();
        let config = NotificationConfig {
            level: NotificationLevel::All,
            ..NotificationConfig::default()
        };
        let decision = policy.decide(&group(), &outcome(&[], &[], &[]), &config, false, 0);
        assert_eq!(decision, Decision::Send(MessageKind::FullSummary));
    }

    #[test]
    fn smart_level_sends_delta_immediately_on_new_error() {
        let mut policy = NotificationPolicy::new();
        let decision = policy.decide(&group(), &outcome(&["a.com"], &[], &[]), &NotificationConfig::default(), false, 1);
        assert_eq!(decision, Decision::Send(MessageKind::Delta));
    }

    #[test]
    fn smart_level_gates_persistent_errors_on_cooldown() {
        let mut policy = NotificationPolicy::new();
        let config = NotificationConfig::default();
        let first = policy.decide(&group(), &outcome(&["a.com"], &[], &[]), &config, false, 1);
        assert_eq!(first, Decision::Send(MessageKind::Delta));

        let second = policy.decide(&group(), &outcome(&[], &[], &["a.com"]), &config, false, 1);
        assert_eq!(second, Decision::Suppressed(SuppressReason::Cooldown));
    }

    #[test]
    fn smart_level_suppresses_persistent_errors_once_acknowledged() {
        let mut policy = NotificationPolicy::new();
        let config = NotificationConfig::default();
        let decision = policy.decide(&group(), &outcome(&[], &[], &["a.com"]), &config, false, 0);
        assert_eq!(decision, Decision::Suppressed(SuppressReason::NothingChanged));
    }

    #[test]
    fn error_level_sends_full_summary_on_persistent_failures_below_threshold() {
        let mut policy = NotificationPolicy::new();
        let config = NotificationConfig {
            level: NotificationLevel::Error,
            failure_threshold: 3,
            ..NotificationConfig::default()
        };
        let decision = policy.decide(&group(), &outcome(&[], &[], &["a.com"]), &config, false, 1);
        assert_eq!(decision, Decision::Send(MessageKind::FullSummary));
    }

    #[test]
    fn error_level_suppresses_when_nothing_failing() {
        let mut policy = NotificationPolicy::new();
        let config = NotificationConfig {
            level: NotificationLevel::Error,
            ..NotificationConfig::default()
        };
        let decision = policy.decide(&group(), &outcome(&[], &["a.com"], &[]), &config, false, 0);
        assert_eq!(decision, Decision::Suppressed(SuppressReason::NothingChanged));
    }
}
