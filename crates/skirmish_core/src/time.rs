//! Simulation time
//!
//! Fixed-rate ticks by default; callers with their own frame clock can
//! advance by an explicit delta instead.

use std::time::Duration;

/// Default simulation tick rate (30 Hz)
pub const TICK_RATE_HZ: u32 = 30;

/// Timing handed to every system for one tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TickTime {
    /// Tick number, starting at 1 for the first tick.
    pub tick: u64,
    /// Seconds covered by this tick.
    pub dt: f64,
    /// Seconds simulated including this tick.
    pub elapsed: f64,
}

#[derive(Debug, Clone)]
pub struct SimulationClock {
    tick_rate_hz: u32,
    tick: u64,
    elapsed: f64,
}

impl SimulationClock {
    pub fn new(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz: tick_rate_hz.max(1),
            tick: 0,
            elapsed: 0.0,
        }
    }

    pub fn fixed_dt(&self) -> f64 {
        1.0 / self.tick_rate_hz as f64
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(self.fixed_dt())
    }

    pub fn advance(&mut self, dt: f64) -> TickTime {
        self.tick += 1;
        self.elapsed += dt;
        TickTime {
            tick: self.tick,
            dt,
            elapsed: self.elapsed,
        }
    }

    pub fn advance_fixed(&mut self) -> TickTime {
        self.advance(self.fixed_dt())
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(TICK_RATE_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_ticks_accumulate() {
        let mut clock = SimulationClock::new(10);
        let first = clock.advance_fixed();
        let second = clock.advance_fixed();

        assert_eq!(first.tick, 1);
        assert_eq!(second.tick, 2);
        assert!((second.elapsed - 0.2).abs() < 1e-9);
    }
}
