//! Deterministic math utilities
//!
//! Re-exports glam with additional deterministic utilities

pub use glam::*;

/// Deterministic random number generator (LCG).
///
/// `Copy` so it can sit in a `Cell` behind shared hooks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeterministicRng {
    seed: u64,
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, state: seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn next_u32(&mut self) -> u32 {
        // LCG constants
        const A: u64 = 1664525;
        const C: u64 = 1013904223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        self.state as u32
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / (u32::MAX as f64 + 1.0)
    }

    /// True with probability `p` (clamped to [0, 1]).
    pub fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.next_f64() < p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = DeterministicRng::new(42);
        let mut b = DeterministicRng::new(42);
        for _ in 0..8 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn chance_edges_do_not_roll() {
        let mut rng = DeterministicRng::new(1);
        let before = rng;
        assert!(!rng.chance(0.0));
        assert!(rng.chance(1.0));
        assert_eq!(rng, before);
    }
}
