//! Per-system profiler: total, last and call count per named system

use crate::SystemTiming;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy)]
struct Sample {
    total: Duration,
    last: Duration,
    calls: u64,
}

#[derive(Debug)]
pub struct SystemProfiler {
    timings: HashMap<String, Sample>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
        }
    }

    pub fn time_system<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let sample = self.timings.entry(name.to_string()).or_default();
        sample.total += elapsed;
        sample.last = elapsed;
        sample.calls += 1;
        result
    }

    pub fn get_timing(&self, name: &str) -> Duration {
        self.timings
            .get(name)
            .map(|sample| sample.total)
            .unwrap_or(Duration::ZERO)
    }

    /// Timings sorted by total time spent, most expensive first.
    pub fn report(&self) -> Vec<SystemTiming> {
        let mut report: Vec<SystemTiming> = self
            .timings
            .iter()
            .map(|(name, sample)| SystemTiming {
                name: name.clone(),
                total: sample.total,
                last: sample.last,
                calls: sample.calls,
            })
            .collect();
        report.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
        report
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }
}

impl Default for SystemProfiler {
    fn default() -> Self {
        Self::new()
    }
}
