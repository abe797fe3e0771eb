//! Skirmish Battle
//!
//! Combat rules built on the core ECS:
//! - Property engine with reason-keyed modifiers and flags
//! - Damage/recovery resolution and the death pipeline
//! - Collision/hit pipeline over an external physics query
//! - Ability/effect/decorator pipeline driven by a content catalog
//! - The [`Arena`] that wires all of it into one scheduled world

pub mod arena;
pub mod collision;
pub mod components;
pub mod config;
pub mod damage;
pub mod effect;
pub mod error;
pub mod formula;
pub mod net;
pub mod property;
pub mod signal;
pub mod singletons;
pub mod status;
pub mod systems;
pub mod view;

pub use arena::{
    init_component, init_system, setup_component_layout, Arena, ArenaConfig, ArenaIndices,
    ArenaServices, CombatantSpec, IdentityAllocator,
};
pub use config::{Catalog, CatalogReport, ContentId};
pub use error::{BattleError, ConfigError, FormulaError};
pub use formula::ExpressionEvaluator;
pub use property::{FlagKey, Properties, PropertyKey, ReasonKey};
