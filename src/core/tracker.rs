//! Error-state tracking: diffs successive check cycles into new, recovered,
//! and persistent failure sets, and retains a bounded history for the
//! `/stats` surface (spec.md §4.E).
//!
//! Grounded directly on `original_source/error_tracker.py`'s `ErrorTracker`
//! class — same `current_errors`/`previous_errors`/`acknowledged_errors`
//! maps, same `update_status` tri-partition, same history cap — reworked
//! into owned Rust collections instead of Python dicts, and borrowing the
//! teacher's `VecDeque`-with-cap pattern from
//! `core/network/error_tracker.rs` for the bounded history ring.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::result::CheckStatus;

const HISTORY_CAP: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub endpoint: String,
    pub status: CheckStatus,
    pub error_message: Option<String>,
    pub first_seen: DateTime<Local>,
    pub last_seen: DateTime<Local>,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub endpoint: String,
    pub status: CheckStatus,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Local>,
    pub acknowledged: bool,
    pub ack_timestamp: Option<DateTime<Local>>,
    pub note: Option<String>,
}

/// Result of folding one cycle's `CheckResult`s into the tracker.
pub struct UpdateOutcome {
    pub new_errors: Vec<String>,
    pub recovered: Vec<String>,
    pub persistent_errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackerState {
    current_errors: HashMap<String, ErrorRecord>,
    acknowledged_errors: HashMap<String, ErrorRecord>,
    #[serde(skip)]
    history: VecDeque<HistoryRecord>,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold this cycle's results into the tracker, returning the three
    /// disjoint partitions spec.md §4.E defines:
    /// - `new_errors`: non-success this cycle, and either absent from the
    ///   previous cycle's failure set or previously failing with a
    ///   *different* `CheckStatus`.
    /// - `recovered`: success this cycle, having failed last cycle.
    /// - `persistent_errors`: non-success in both cycles with an identical
    ///   `CheckStatus`.
    pub fn update(&mut self, results: &[crate::core::result::CheckResult]) -> UpdateOutcome {
        let now = Local::now();
        let previous_errors: HashMap<String, CheckStatus> = self
            .current_errors
            .iter()
            .map(|(endpoint, record)| (endpoint.clone(), record.status))
            .collect();

        let mut new_errors = Vec::new();
        let mut recovered = Vec::new();
        let mut persistent_errors = Vec::new();

        for result in results {
            if result.is_success() {
                if previous_errors.contains_key(&result.endpoint) {
                    recovered.push(result.endpoint.clone());
                    self.current_errors.remove(&result.endpoint);
                    self.acknowledged_errors.remove(&result.endpoint);
                    self.add_to_history(result);
                }
                continue;
            }

            match previous_errors.get(&result.endpoint) {
                Some(prev_status) if *prev_status == result.status => {
                    persistent_errors.push(result.endpoint.clone());
                    if let Some(record) = self.current_errors.get_mut(&result.endpoint) {
                        record.error_message = result.error_message.clone();
                        record.last_seen = now;
                    }
                }
                _ => {
                    new_errors.push(result.endpoint.clone());
                    self.current_errors.insert(
                        result.endpoint.clone(),
                        ErrorRecord {
                            endpoint: result.endpoint.clone(),
                            status: result.status,
                            error_message: result.error_message.clone(),
                            first_seen: now,
                            last_seen: now,
                            acknowledged: false,
                            acknowledged_at: None,
                        },
                    );
                    self.add_to_history(result);
                }
            }
        }

        UpdateOutcome {
            new_errors,
            recovered,
            persistent_errors,
        }
    }

    fn add_to_history(&mut self, result: &crate::core::result::CheckResult) {
        self.history.push_back(HistoryRecord {
            endpoint: result.endpoint.clone(),
            status: result.status,
            error_message: result.error_message.clone(),
            timestamp: result.timestamp,
            acknowledged: false,
            ack_timestamp: None,
            note: None,
        });
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
    }

    /// Mark `endpoint`'s current error acknowledged, stamping a history
    /// record with the acknowledgement time and optional operator `note`.
    pub fn acknowledge(&mut self, endpoint: &str, note: Option<String>) -> bool {
        if let Some(mut record) = self.current_errors.remove(endpoint) {
            let now = Local::now();
            record.acknowledged = true;
            record.acknowledged_at = Some(now);
            self.acknowledged_errors.insert(endpoint.to_string(), record.clone());

            self.history.push_back(HistoryRecord {
                endpoint: record.endpoint.clone(),
                status: record.status,
                error_message: record.error_message.clone(),
                timestamp: now,
                acknowledged: true,
                ack_timestamp: Some(now),
                note,
            });
            while self.history.len() > HISTORY_CAP {
                self.history.pop_front();
            }

            self.current_errors.insert(endpoint.to_string(), record);
            true
        } else {
            false
        }
    }

    pub fn current_errors(&self) -> Vec<&ErrorRecord> {
        self.current_errors.values().collect()
    }

    pub fn unacknowledged_errors(&self) -> Vec<&ErrorRecord> {
        self.current_errors.values().filter(|r| !r.acknowledged).collect()
    }

    /// Statistics over the trailing `days` window, per spec.md §4.E.
    pub fn statistics(&self, days: i64) -> Statistics {
        let cutoff = Local::now() - chrono::Duration::days(days);
        let mut error_types: HashMap<CheckStatus, u64> = HashMap::new();
        let mut per_endpoint: HashMap<String, u64> = HashMap::new();
        let mut total_errors = 0u64;
        let mut total_recoveries = 0u64;

        for record in self.history.iter().filter(|r| r.timestamp >= cutoff) {
            if record.status.is_success() {
                total_recoveries += 1;
            } else {
                total_errors += 1;
                *error_types.entry(record.status).or_insert(0) += 1;
                *per_endpoint.entry(record.endpoint.clone()).or_insert(0) += 1;
            }
        }

        let mut top_error_domains: Vec<(String, u64)> = per_endpoint.into_iter().collect();
        top_error_domains.sort_by(|a, b| b.1.cmp(&a.1));
        top_error_domains.truncate(10);

        Statistics {
            total_errors,
            total_recoveries,
            error_types,
            top_error_domains,
            current_errors: self.current_errors.len(),
            acknowledged_errors: self.acknowledged_errors.len(),
            unacknowledged_errors: self.current_errors.values().filter(|r| !r.acknowledged).count(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Statistics {
    pub total_errors: u64,
    pub total_recoveries: u64,
    pub error_types: HashMap<CheckStatus, u64>,
    pub top_error_domains: Vec<(String, u64)>,
    pub current_errors: usize,
    pub acknowledged_errors: usize,
    pub unacknowledged_errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::Endpoint;
    use crate::core::result::CheckResult;

    fn ok(ep: &str) -> crate::core::result::CheckResult {
        CheckResult::success(&Endpoint::parse(ep), 200, 0.1)
    }
    fn fail(ep: &str) -> crate::core::result::CheckResult {
        CheckResult::failure(&Endpoint::parse(ep), CheckStatus::Timeout, None, "timeout", 10.0)
    }

    #[test]
    fn first_failure_is_new() {
        let mut tracker = TrackerState::new();
        let outcome = tracker.update(&[fail("a.com")]);
        assert_eq!(outcome.new_errors, vec!["a.com".to_string()]);
        assert!(outcome.persistent_errors.is_empty());
        assert!(outcome.recovered.is_empty());
    }

    #[test]
    fn repeated_failure_is_persistent() {
        let mut tracker = TrackerState::new();
        tracker.update(&[fail("a.com")]);
        let outcome = tracker.update(&[fail("a.com")]);
        assert_eq!(outcome.persistent_errors, vec!["a.com".to_string()]);
        assert!(outcome.new_errors.is_empty());
    }

    #[test]
    fn success_after_failure_is_recovered() {
        let mut tracker = TrackerState::new();
        tracker.update(&[fail("a.com")]);
        let outcome = tracker.update(&[ok("a.com")]);
        assert_eq!(outcome.recovered, vec!["a.com".to_string()]);
        assert!(tracker.current_errors().is_empty());
    }

    #[test]
    fn acknowledge_marks_record_without_removing_from_current() {
        let mut tracker = TrackerState::new();
        tracker.update(&[fail("a.com")]);
        assert!(tracker.acknowledge("a.com", Some("known issue".to_string())));
        assert_eq!(tracker.current_errors().len(), 1);
        assert!(tracker.unacknowledged_errors().is_empty());
    }

    #[test]
    fn acknowledge_stamps_a_history_entry() {
        let mut tracker = TrackerState::new();
        tracker.update(&[fail("a.com")]);
        tracker.acknowledge("a.com", None);
        assert!(tracker.history.iter().any(|r| r.acknowledged && r.endpoint == "a.com"));
    }

    #[test]
    fn steady_state_success_does_not_grow_history() {
        let mut tracker = TrackerState::new();
        tracker.update(&[ok("a.com")]);
        tracker.update(&[ok("a.com")]);
        tracker.update(&[ok("a.com")]);
        assert!(tracker.history.is_empty());
    }

    #[test]
    fn statistics_counts_errors_within_window() {
        let mut tracker = TrackerState::new();
        tracker.update(&[fail("a.com"), fail("b.com")]);
        let stats = tracker.statistics(7);
        assert_eq!(stats.total_errors, 2);
        assert_eq!(stats.current_errors, 2);
    }
}
