//! Presentation boundary.
//!
//! The kernel never talks to a renderer. It reports view/transform pairs
//! to a [`ViewSink`] and lets the host mirror them however it likes.

use crate::components::{Transform, View};
use skirmish_core::ecs::Entity;

pub trait ViewSink {
    /// An entity gained a view and a transform.
    fn view_added(&mut self, entity: Entity, view: &View, transform: &Transform);

    fn view_removed(&mut self, entity: Entity, view: &View);

    /// Called once per tick for every mirrored entity, after logic moved it.
    fn sync_transform(&mut self, entity: Entity, view: &View, transform: &Transform);
}

/// Ignores everything; for headless hosts.
#[derive(Debug, Default)]
pub struct NullViewSink;

impl ViewSink for NullViewSink {
    fn view_added(&mut self, _entity: Entity, _view: &View, _transform: &Transform) {}

    fn view_removed(&mut self, _entity: Entity, _view: &View) {}

    fn sync_transform(&mut self, _entity: Entity, _view: &View, _transform: &Transform) {}
}
