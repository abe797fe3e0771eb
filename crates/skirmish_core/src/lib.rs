//! Skirmish Core
//!
//! Contains the fundamental simulation building blocks:
//! - Entity/component store with synchronous secondary indices
//! - Dual-context world (per-instance + singleton) and typed resources
//! - Phased system scheduler with reactive (collector driven) systems
//! - Object pooling, tick queue, deterministic time and math

pub mod ecs;
pub mod math;
pub mod pool;
pub mod time;

pub use glam;

/// Kernel version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
