//! Adaptive concurrency controller: scales `max_concurrent` against live
//! CPU/memory pressure and recent response times (spec.md §4.C).
//!
//! Grounded on two pack sources: the `sysinfo` collection pattern from
//! `hypernetix-hyperspot`'s `modkit-node-info` crate (`refresh_cpu_all`,
//! `refresh_memory`, wrapping `System` in a mutex for repeated polls), and
//! the exact threshold/scaling rules from
//! `original_source/domain_checker.py`'s adaptive-concurrency block, which
//! this reproduces faithfully rather than reinventing.

use std::sync::Mutex;

use sysinfo::System;

const MAX_CONCURRENT_CEILING: usize = 200;

pub struct AdaptiveController {
    system: Mutex<System>,
    initial_concurrent: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SystemLoad {
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

impl AdaptiveController {
    pub fn new(initial_concurrent: usize) -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
            initial_concurrent,
        }
    }

    /// Sample current CPU/memory usage. Two refreshes are required for
    /// `sysinfo` to report a meaningful CPU delta, so callers should not
    /// treat the very first sample after construction as authoritative.
    pub fn sample_load(&self) -> SystemLoad {
        let mut system = self.system.lock().expect("system monitor poisoned");
        system.refresh_cpu_all();
        system.refresh_memory();
        let cpu_percent = system.global_cpu_usage();
        let memory_percent = if system.total_memory() == 0 {
            0.0
        } else {
            (system.used_memory() as f64 / system.total_memory() as f64 * 100.0) as f32
        };
        SystemLoad {
            cpu_percent,
            memory_percent,
        }
    }

    /// Compute the next `max_concurrent` value given current load and the
    /// mean response time (seconds) observed over the last cycle.
    ///
    /// Rule order, applied in sequence exactly as the original
    /// implementation does:
    /// 1. CPU-based scale (high CPU shrinks, low CPU grows)
    /// 2. memory-based cap (applied as a ceiling, not a scale)
    /// 3. response-time factor (slow responses shrink further)
    /// 4. clamp to `[1, 200]`
    pub fn suggest_max_concurrent(&self, load: SystemLoad, mean_response_time_secs: f64) -> usize {
        let initial = self.initial_concurrent as f64;
        let mut suggested = initial;

        if load.cpu_percent > 80.0 {
            suggested = initial * 0.5;
        } else if load.cpu_percent > 60.0 {
            suggested = initial * 0.7;
        } else if load.cpu_percent < 30.0 {
            suggested = (initial * 2.0).min(MAX_CONCURRENT_CEILING as f64);
        }

        if load.memory_percent > 85.0 {
            suggested = suggested.min(initial * 0.3);
        } else if load.memory_percent > 70.0 {
            suggested = suggested.min(initial * 0.6);
        }

        if mean_response_time_secs > 5.0 {
            suggested *= 0.7;
        }

        suggested.round().max(1.0).min(MAX_CONCURRENT_CEILING as f64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> AdaptiveController {
        AdaptiveController::new(10)
    }

    #[test]
    fn high_cpu_halves_concurrency() {
        let c = controller();
        let load = SystemLoad {
            cpu_percent: 85.0,
            memory_percent: 10.0,
        };
        assert_eq!(c.suggest_max_concurrent(load, 0.1), 5);
    }

    #[test]
    fn low_cpu_doubles_concurrency_up_to_ceiling() {
        let c = controller();
        let load = SystemLoad {
            cpu_percent: 10.0,
            memory_percent: 10.0,
        };
        assert_eq!(c.suggest_max_concurrent(load, 0.1), 20);
    }

    #[test]
    fn high_memory_caps_regardless_of_cpu() {
        let c = controller();
        let load = SystemLoad {
            cpu_percent: 10.0,
            memory_percent: 90.0,
        };
        // low-cpu would suggest 20, but memory > 85% caps at 0.3 * 10 = 3
        assert_eq!(c.suggest_max_concurrent(load, 0.1), 3);
    }

    #[test]
    fn slow_responses_shrink_further() {
        let c = controller();
        let load = SystemLoad {
            cpu_percent: 50.0,
            memory_percent: 10.0,
        };
        // normal band: suggested stays at initial (10), then *0.7 = 7
        assert_eq!(c.suggest_max_concurrent(load, 6.0), 7);
    }

    #[test]
    fn result_never_drops_below_one() {
        let c = AdaptiveController::new(1);
        let load = SystemLoad {
            cpu_percent: 95.0,
            memory_percent: 95.0,
        };
        assert!(c.suggest_max_concurrent(load, 10.0) >= 1);
    }
}
