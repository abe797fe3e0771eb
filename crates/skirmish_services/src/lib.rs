//! Skirmish Services Layer
//!
//! Platform side of the kernel: everything that touches the filesystem.
//! Settings and content are read here and handed to the arena as plain
//! values, so the simulation crates never do I/O.

pub mod catalog;
pub mod error;
pub mod settings;

pub use catalog::load_catalog;
pub use error::ServiceError;
pub use settings::{load_settings, save_settings, KernelSettings};
