//! Skirmish Metrics - per-system timing and named counters
//!
//! Provides zero-cost abstractions for metrics collection that completely
//! vanish in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use skirmish_metrics::{time_scope, SystemProfiler};
//!
//! let mut profiler = SystemProfiler::new();
//! let hits = time_scope!(profiler, "collision", { resolve_hits() });
//! for timing in profiler.report() {
//!     println!("{}: {:?}", timing.name, timing.total);
//! }
//! ```
//!
//! In production builds (without `metrics` feature), all instrumentation
//! is compiled out to zero overhead.

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod system_profiler;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use system_profiler::SystemProfiler;

use std::time::Duration;

/// Aggregated timing for one named system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTiming {
    pub name: String,
    pub total: Duration,
    pub last: Duration,
    pub calls: u64,
}

impl SystemTiming {
    /// Mean duration per call, zero when never called.
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Time a block under `name` (zero-cost when metrics disabled)
#[macro_export]
macro_rules! time_scope {
    ($profiler:expr, $name:expr, $body:block) => {{
        #[cfg(feature = "metrics")]
        let scoped = $profiler.time_system($name, || $body);
        #[cfg(not(feature = "metrics"))]
        let scoped = $body;
        scoped
    }};
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &str, _value: usize) {}
    pub fn get(&self, _name: &str) -> usize { 0 }
    pub fn reset_all(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct SystemProfiler;

#[cfg(not(feature = "metrics"))]
impl SystemProfiler {
    pub fn new() -> Self { Self }
    pub fn time_system<F, R>(&mut self, _name: &str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn get_timing(&self, _name: &str) -> Duration { Duration::ZERO }
    pub fn report(&self) -> Vec<SystemTiming> { Vec::new() }
    pub fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_scope_returns_block_value() {
        let mut profiler = SystemProfiler::new();
        let value = time_scope!(profiler, "sum", { 2 + 3 });
        assert_eq!(value, 5);
    }

    #[test]
    fn average_of_unused_timing_is_zero() {
        let timing = SystemTiming {
            name: "idle".into(),
            total: Duration::ZERO,
            last: Duration::ZERO,
            calls: 0,
        };
        assert_eq!(timing.average(), Duration::ZERO);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn profiler_accumulates_calls() {
        let mut profiler = SystemProfiler::new();
        profiler.time_system("collision", || ());
        profiler.time_system("collision", || ());
        profiler.time_system("damage", || ());

        let report = profiler.report();
        let collision = report.iter().find(|t| t.name == "collision").map(|t| t.calls);
        assert_eq!(collision, Some(2));
        assert_eq!(report.len(), 2);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn counter_tracks_named_values() {
        let mut counter = Counter::new();
        counter.increment("system_failures", 1);
        counter.increment("system_failures", 2);
        assert_eq!(counter.get("system_failures"), 3);
        assert_eq!(counter.get("unknown"), 0);
    }
}
