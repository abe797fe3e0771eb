//! Battle systems, in the order the arena registers them.
//!
//! | order | system          | kind     | group   |
//! |-------|-----------------|----------|---------|
//! | 1     | network         | execute  | network |
//! | 2     | cast            | reactive | battle  |
//! | 3     | motion          | execute  | battle  |
//! | 4     | collision       | execute  | battle  |
//! | 5     | effect_assign   | execute  | battle  |
//! | 6     | status          | execute  | battle  |
//! | 7     | cast_lifetime   | execute  | battle  |
//! | 8     | health_clamp    | reactive | battle  |
//! | 9     | death_reaction  | reactive | death   |
//! | 10    | corpse          | execute  | death   |
//! | 11    | destroy         | reactive | cleanup |
//! | 12    | view_sync       | execute  | render  |

mod cast;
mod cast_lifetime;
mod collision;
mod corpse;
mod death;
mod effect_assign;
mod health_clamp;
mod motion;
mod network;
mod status;
mod view_sync;

pub use cast::CastSystem;
pub use cast_lifetime::{end_cast, CastLifetimeSystem};
pub use collision::CollisionSystem;
pub use corpse::CorpseSystem;
pub use death::DeathReactionSystem;
pub use effect_assign::EffectAssignSystem;
pub use health_clamp::HealthClampSystem;
pub use motion::MotionSystem;
pub use network::NetworkSystem;
pub use status::StatusSystem;
pub use view_sync::ViewSyncSystem;

use crate::error::BattleError;
use skirmish_core::ecs::Entity;

/// Run the per-entity body of a system. A failure is logged and swallowed
/// so the remaining entities still run this tick.
pub(crate) fn isolate<F>(system: &'static str, entity: Entity, body: F) -> bool
where
    F: FnOnce() -> Result<(), BattleError>,
{
    match body() {
        Ok(()) => true,
        Err(error) => {
            tracing::error!(system, %entity, %error, "entity update failed");
            false
        }
    }
}
