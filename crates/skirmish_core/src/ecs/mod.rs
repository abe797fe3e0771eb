//! Entity Component System core types.
//!
//! Storage is split per context: every context owns one column per
//! registered component type, a generational entity allocator, the
//! secondary indices declared against its components and the collectors
//! feeding reactive systems. All structural mutation goes through
//! [`Context`] so indices and collectors are updated before the call
//! returns.

mod cleanup;
mod collector;
mod column;
mod component;
mod context;
mod entity;
mod error;
mod inbox;
mod index;
mod mask;
mod resources;
mod scheduler;
mod signal;
mod system;
mod world;

pub use cleanup::{DestroySystem, PendingDestroy};
pub use collector::{CollectorId, GroupEvent, Trigger};
pub use component::{
    Component, ComponentId, ComponentLayout, LayoutManifest, ManifestEntry, MAX_COMPONENTS,
};
pub use context::{Context, ContextKind};
pub use entity::Entity;
pub use error::{EcsError, SchedulerError, SystemError};
pub use inbox::{TickQueue, TickSender};
pub use index::{IndexHandle, IndexKind, KeyedIndex};
pub use mask::ComponentMask;
pub use resources::Resources;
pub use scheduler::{Phase, Scheduler, SchedulerState, SystemFailure, TickReport};
pub use signal::{Signal, SignalBus, SignalEnvelope, SubscriberId};
pub use system::{ReactiveSystem, System, SystemDescriptor, SystemHandle};
pub use world::World;
