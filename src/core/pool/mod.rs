//! Bounded-concurrency worker pool for running one probe per endpoint
//! across a check cycle (spec.md §4.B).
//!
//! Grounded on the teacher's async/await dispatch style in
//! `core/network/http_monitor.rs` (single-client-instance, futures driven
//! through spawned tasks), adapted to batch-at-a-time semaphore gating
//! since here concurrency itself is the thing under adaptive control.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use crate::core::endpoint::Endpoint;
use crate::core::probe::{self, ClientPool};
use crate::core::result::{CheckResult, CheckStatus};

const QUICK_MODE_ENDPOINT_THRESHOLD: usize = 50;
const QUICK_MODE_TIMEOUT: Duration = Duration::from_secs(5);
const BETWEEN_BATCH_PAUSE: Duration = Duration::from_millis(500);
const LAST_STATUS_CACHE_CAP: usize = 1000;

/// Progress callback invoked after each completed batch: (batch_index,
/// total_batches, estimated_remaining).
pub type BatchCallback = Arc<dyn Fn(usize, usize, Duration) + Send + Sync>;

pub struct WorkerPoolOptions {
    pub max_concurrent: usize,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    pub quick_mode_threshold: usize,
}

/// `endpoint → last-seen-success` map capped at 1,000 entries, used so the
/// pool can flag within-batch recoveries without waiting for the tracker's
/// slower cross-cycle diff (spec.md §3 "LastStatusCache").
pub struct LastStatusCache {
    order: VecDeque<String>,
    status: HashMap<String, bool>,
}

impl LastStatusCache {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
            status: HashMap::new(),
        }
    }

    pub fn record(&mut self, endpoint: &str, success: bool) {
        if !self.status.contains_key(endpoint) {
            self.order.push_back(endpoint.to_string());
        }
        self.status.insert(endpoint.to_string(), success);
        if self.status.len() > LAST_STATUS_CACHE_CAP {
            let evict_count = self.status.len() / 2;
            for _ in 0..evict_count {
                if let Some(oldest) = self.order.pop_front() {
                    self.status.remove(&oldest);
                }
            }
        }
    }

    pub fn get(&self, endpoint: &str) -> Option<bool> {
        self.status.get(endpoint).copied()
    }

    pub fn len(&self) -> usize {
        self.status.len()
    }
}

impl Default for LastStatusCache {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WorkerPool {
    client_pool: Arc<ClientPool>,
    options: WorkerPoolOptions,
    last_status: tokio::sync::Mutex<LastStatusCache>,
}

impl WorkerPool {
    pub fn new(client_pool: Arc<ClientPool>, options: WorkerPoolOptions) -> Self {
        Self {
            client_pool,
            options,
            last_status: tokio::sync::Mutex::new(LastStatusCache::new()),
        }
    }

    /// Run one probe per endpoint, partitioned into `max_concurrent`-sized
    /// batches with a pause between batches. Within each batch, one retry
    /// pass is attempted for results classified `timeout` or
    /// `connection_error`. Endpoint counts above `quick_mode_threshold`
    /// force a fixed 5s timeout for the whole run (spec.md §4.B).
    pub async fn run(&self, endpoints: &[Endpoint], on_batch: Option<BatchCallback>) -> Vec<CheckResult> {
        let quick_mode = endpoints.len() > self.options.quick_mode_threshold.max(QUICK_MODE_ENDPOINT_THRESHOLD);
        let timeout = if quick_mode { QUICK_MODE_TIMEOUT } else { self.options.timeout };

        let batch_size = self.options.max_concurrent.max(1);
        let chunks: Vec<&[Endpoint]> = endpoints.chunks(batch_size).collect();
        let total_batches = chunks.len();
        let mut all_results = Vec::with_capacity(endpoints.len());
        let start = Instant::now();

        for (batch_index, chunk) in chunks.iter().enumerate() {
            let mut batch_results = self.run_batch_once(chunk, timeout).await;

            if self.options.retry_count > 0 {
                let retry_positions: Vec<usize> = batch_results
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| matches!(r.status, CheckStatus::Timeout | CheckStatus::ConnectionError))
                    .map(|(i, _)| i)
                    .collect();

                if !retry_positions.is_empty() {
                    tokio::time::sleep(self.options.retry_delay).await;
                    let retry_endpoints: Vec<Endpoint> = retry_positions
                        .iter()
                        .map(|&i| Endpoint::parse(chunk[i].raw().to_string()))
                        .collect();
                    let retry_results = self.run_batch_once(&retry_endpoints, timeout).await;
                    for (slot, result) in retry_positions.into_iter().zip(retry_results.into_iter()) {
                        batch_results[slot] = result;
                    }
                }
            }

            {
                let mut cache = self.last_status.lock().await;
                for result in &batch_results {
                    cache.record(&result.endpoint, result.is_success());
                }
            }

            if let Some(cb) = &on_batch {
                let completed_batches = batch_index + 1;
                let eta = estimate_remaining(start.elapsed(), completed_batches, total_batches);
                cb(completed_batches, total_batches, eta);
            }

            all_results.extend(batch_results);

            if batch_index + 1 < total_batches {
                tokio::time::sleep(BETWEEN_BATCH_PAUSE).await;
            }
        }

        all_results
    }

    async fn run_batch_once(&self, endpoints: &[Endpoint], timeout: Duration) -> Vec<CheckResult> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let permit_sem = Arc::clone(&semaphore);
            let client_pool = Arc::clone(&self.client_pool);
            let endpoint = Endpoint::parse(endpoint.raw().to_string());
            handles.push(tokio::spawn(async move {
                let _permit = permit_sem.acquire_owned().await.expect("semaphore closed");
                probe::probe(&client_pool, &endpoint, timeout).await
            }));
        }

        let mut results = Vec::with_capacity(endpoints.len());
        for (i, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(result) => results.push(result),
                Err(_join_error) => results.push(CheckResult::failure(
                    &endpoints[i],
                    CheckStatus::UnknownError,
                    None,
                    "probe task panicked",
                    0.0,
                )),
            }
        }
        results
    }

    pub async fn last_status_cache_len(&self) -> usize {
        self.last_status.lock().await.len()
    }
}

fn estimate_remaining(elapsed: Duration, completed_batches: usize, total_batches: usize) -> Duration {
    if completed_batches == 0 {
        return Duration::ZERO;
    }
    let per_batch = elapsed.as_secs_f64() / completed_batches as f64;
    let remaining = total_batches.saturating_sub(completed_batches) as f64 * per_batch;
    Duration::from_secs_f64(remaining.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_remaining_is_zero_with_no_progress() {
        assert_eq!(estimate_remaining(Duration::from_secs(5), 0, 10), Duration::ZERO);
    }

    #[test]
    fn estimate_remaining_scales_linearly() {
        let eta = estimate_remaining(Duration::from_secs(10), 5, 10);
        assert!((eta.as_secs_f64() - 10.0).abs() < 0.01);
    }

    #[test]
    fn last_status_cache_evicts_oldest_half_when_full() {
        let mut cache = LastStatusCache::new();
        for i in 0..LAST_STATUS_CACHE_CAP + 1 {
            cache.record(&format!("endpoint-{i}"), true);
        }
        assert!(cache.len() <= LAST_STATUS_CACHE_CAP);
        assert!(cache.get("endpoint-0").is_none());
        assert!(cache.get(&format!("endpoint-{LAST_STATUS_CACHE_CAP}")).is_some());
    }

    #[tokio::test]
    async fn run_probes_every_endpoint_exactly_once() {
        let client_pool = Arc::new(ClientPool::build(Duration::from_millis(50)).unwrap());
        let pool = WorkerPool::new(
            client_pool,
            WorkerPoolOptions {
                max_concurrent: 2,
                retry_count: 0,
                retry_delay: Duration::from_millis(1),
                timeout: Duration::from_millis(50),
                quick_mode_threshold: 50,
            },
        );
        let endpoints = vec![
            Endpoint::parse("127.0.0.1:9"),
            Endpoint::parse("127.0.0.1:10"),
            Endpoint::parse("127.0.0.1:11"),
        ];
        let results = pool.run(&endpoints, None).await;
        assert_eq!(results.len(), 3);
    }
}
