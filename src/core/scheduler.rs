//! Cycle scheduling: runs a check cycle every `interval_minutes`, supports
//! a manual out-of-band trigger, skips an overrun tick rather than queueing
//! it, and drives the daily-report task on its own clock (spec.md §4.D).
//!
//! Grounded on the teacher's single `current_thread` Tokio runtime model
//! (`src/main.rs`) — everything here runs as tasks on that one executor,
//! coordinated with `tokio::sync::Notify`/`AtomicBool` rather than extra
//! threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::config::store::ConfigStore;
use crate::core::adaptive::AdaptiveController;
use crate::core::endpoint::Endpoint;
use crate::core::formatter;
use crate::core::notifier::NotifierClient;
use crate::core::pool::{WorkerPool, WorkerPoolOptions};
use crate::core::policy::{Decision, MessageKind, NotificationPolicy};
use crate::core::probe::ClientPool;
use crate::core::result::CheckResult;
use crate::core::tracker::TrackerState;
use crate::logging::Logger;

/// Shared state a running cycle needs; constructed once in `main` and
/// cloned into the scheduler and the HTTP API / command surfaces that can
/// trigger a cycle out of band.
pub struct Scheduler<N: NotifierClient> {
    config_store: ConfigStore,
    logger: Logger,
    notifier: Arc<N>,
    tracker: tokio::sync::Mutex<TrackerState>,
    policy: tokio::sync::Mutex<NotificationPolicy>,
    adaptive: AdaptiveController,
    manual_trigger: Notify,
    in_flight: AtomicBool,
}

impl<N: NotifierClient> Scheduler<N> {
    pub fn new(config_store: ConfigStore, logger: Logger, notifier: Arc<N>, initial_concurrent: usize) -> Self {
        Self {
            config_store,
            logger,
            notifier,
            tracker: tokio::sync::Mutex::new(TrackerState::new()),
            policy: tokio::sync::Mutex::new(NotificationPolicy::new()),
            adaptive: AdaptiveController::new(initial_concurrent),
            manual_trigger: Notify::new(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Request an out-of-band cycle (e.g. from a `/check` admin command or
    /// the HTTP API). A no-op if a cycle is already running.
    pub fn trigger_now(&self) {
        self.manual_trigger.notify_one();
    }

    /// The main scheduling loop: never returns under normal operation.
    ///
    /// The first cycle runs without a pre-delay and is not considered
    /// manual. Every following cycle either waits out the remaining
    /// interval or is woken early by a manual trigger, in which case the
    /// upcoming cycle is flagged `is_manual` so its notification bypasses
    /// suppression (spec.md §4.D/§4.F Scenario S4). An in-flight cycle that
    /// races against a fresh manual trigger is cancelled in favor of the new
    /// one, and a cycle that overran its interval skips the wait entirely.
    pub async fn run(&self) {
        let mut skip_wait = true;
        let mut pending_manual = false;

        loop {
            let interval = {
                let config = self.config_store.snapshot().await;
                Duration::from_secs(config.check.interval_minutes as u64 * 60)
            };

            if !skip_wait {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = self.manual_trigger.notified() => { pending_manual = true; }
                }
            }

            let is_manual = pending_manual;
            pending_manual = false;

            self.in_flight.store(true, Ordering::SeqCst);
            let start = std::time::Instant::now();
            let cancelled = tokio::select! {
                _ = self.run_cycle(is_manual) => false,
                _ = self.manual_trigger.notified() => {
                    self.logger.info(
                        "scheduler",
                        "cycle_cancelled",
                        "manual trigger cancelled an in-flight cycle; restarting",
                    );
                    true
                }
            };
            self.in_flight.store(false, Ordering::SeqCst);

            let elapsed = start.elapsed();
            if cancelled {
                pending_manual = true;
            }
            skip_wait = cancelled || elapsed >= interval;
            if skip_wait && !cancelled {
                self.logger.warn(
                    "scheduler",
                    "cycle_overran",
                    &format!("cycle took {:.1}s, exceeding the {:.1}s interval", elapsed.as_secs_f64(), interval.as_secs_f64()),
                );
            }
        }
    }

    async fn run_cycle(&self, is_manual: bool) {
        let config = self.config_store.snapshot().await;
        let endpoints = config.all_endpoints();
        if endpoints.is_empty() {
            return;
        }

        let max_concurrent = if config.check.auto_adjust_concurrent {
            let load = self.adaptive.sample_load();
            self.adaptive.suggest_max_concurrent(load, 0.0)
        } else {
            config.check.max_concurrent
        };

        let client_pool = match ClientPool::build(Duration::from_secs(config.check.timeout_seconds as u64)) {
            Ok(pool) => Arc::new(pool),
            Err(e) => {
                self.logger.error("scheduler", "client_pool_build_failed", &e.to_string());
                return;
            }
        };

        let worker_pool = WorkerPool::new(
            client_pool,
            WorkerPoolOptions {
                max_concurrent,
                retry_count: config.check.retry_count,
                retry_delay: Duration::from_secs(config.check.retry_delay_seconds as u64),
                timeout: Duration::from_secs(config.check.timeout_seconds as u64),
                quick_mode_threshold: 50,
            },
        );

        let results = worker_pool.run(&endpoints, None).await;
        self.logger.info(
            "scheduler",
            "cycle_complete",
            &format!("checked {} endpoints", results.len()),
        );

        self.dispatch_notifications(&results, &config, is_manual).await;
    }

    async fn dispatch_notifications(
        &self,
        results: &[CheckResult],
        config: &crate::config::types::Config,
        is_manual: bool,
    ) {
        let mut tracker = self.tracker.lock().await;
        let outcome = tracker.update(results);
        let unacknowledged: std::collections::HashSet<String> = tracker
            .unacknowledged_errors()
            .into_iter()
            .map(|r| r.endpoint.clone())
            .collect();
        drop(tracker);

        if !config.check.batch_notify {
            return;
        }

        let mut policy = self.policy.lock().await;
        for group in config.group_endpoints() {
            let group_endpoints: std::collections::HashSet<String> =
                group.endpoints.iter().map(|e: &Endpoint| e.raw().to_string()).collect();

            let group_outcome = crate::core::tracker::UpdateOutcome {
                new_errors: outcome.new_errors.iter().filter(|e| group_endpoints.contains(*e)).cloned().collect(),
                recovered: outcome.recovered.iter().filter(|e| group_endpoints.contains(*e)).cloned().collect(),
                persistent_errors: outcome
                    .persistent_errors
                    .iter()
                    .filter(|e| group_endpoints.contains(*e))
                    .cloned()
                    .collect(),
            };

            let group_unacknowledged_count =
                unacknowledged.iter().filter(|e| group_endpoints.contains(*e)).count();

            let decision = policy.decide(
                &group,
                &group_outcome,
                &config.notification,
                is_manual,
                group_unacknowledged_count,
            );

            match decision {
                Decision::Send(MessageKind::FullSummary) => {
                    let group_results: Vec<CheckResult> = results
                        .iter()
                        .filter(|r| group_endpoints.contains(&r.endpoint))
                        .cloned()
                        .collect();
                    let body = formatter::format_full_summary(&group_results, "状态报告");
                    if let Err(e) = self.notifier.send_message(&group.chat_id, &body).await {
                        self.logger.error("notifier", "send_failed", &e.to_string());
                    }
                }
                Decision::Send(MessageKind::Delta) => {
                    let new_results: Vec<CheckResult> = results
                        .iter()
                        .filter(|r| group_outcome.new_errors.contains(&r.endpoint))
                        .cloned()
                        .collect();
                    let persistent_results: Vec<CheckResult> = results
                        .iter()
                        .filter(|r| group_outcome.persistent_errors.contains(&r.endpoint))
                        .cloned()
                        .collect();

                    if let Some(message) =
                        formatter::format_delta(&new_results, &group_outcome.recovered, &persistent_results)
                    {
                        if let Err(e) = self.notifier.send_message(&group.chat_id, &message).await {
                            self.logger.error("notifier", "send_failed", &e.to_string());
                        }
                    }
                }
                Decision::Suppressed(_) => {}
            }
        }
    }

    /// Build the full-summary report used by the daily-report task
    /// (spec.md §4.D).
    pub async fn send_daily_report(&self) {
        let config = self.config_store.snapshot().await;
        let endpoints = config.all_endpoints();
        if endpoints.is_empty() {
            return;
        }
        let client_pool = match ClientPool::build(Duration::from_secs(config.check.timeout_seconds as u64)) {
            Ok(pool) => Arc::new(pool),
            Err(_) => return,
        };
        let worker_pool = WorkerPool::new(
            client_pool,
            WorkerPoolOptions {
                max_concurrent: config.check.max_concurrent,
                retry_count: 0,
                retry_delay: Duration::from_secs(1),
                timeout: Duration::from_secs(config.check.timeout_seconds as u64),
                quick_mode_threshold: 50,
            },
        );
        let results = worker_pool.run(&endpoints, None).await;
        let body = formatter::format_full_summary(&results, "每日状态报告");
        for group in config.group_endpoints() {
            if let Err(e) = self.notifier.send_message(&group.chat_id, &body).await {
                self.logger.error("notifier", "daily_report_failed", &e.to_string());
            }
        }
    }

    /// Background task: wakes once a minute and fires `send_daily_report`
    /// when the clock crosses `daily_report.time`, once per calendar day.
    pub async fn run_daily_report_task(&self) {
        let mut last_fired_date: Option<chrono::NaiveDate> = None;
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let config = self.config_store.snapshot().await;
            if !config.daily_report.enabled {
                continue;
            }
            let now = chrono::Local::now();
            let today = now.date_naive();
            if last_fired_date == Some(today) {
                continue;
            }
            let Some((hour, minute)) = parse_hh_mm(&config.daily_report.time) else {
                continue;
            };
            if now.hour() as u32 == hour && now.minute() as u32 == minute {
                self.send_daily_report().await;
                last_fired_date = Some(today);
            }
        }
    }
}

use chrono::Timelike;

fn parse_hh_mm(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split(':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next()?.parse().ok()?;
    Some((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hh_mm() {
        assert_eq!(parse_hh_mm("09:30"), Some((9, 30)));
        assert_eq!(parse_hh_mm("bad"), None);
    }
}
