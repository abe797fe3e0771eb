// effect/mod.rs - runtime effects of an ability cast
//
// Each effect config maps to one runtime behavior chosen by its tag from
// an `EffectRegistry`. Behaviors never run on their own: the assign system
// fills a pooled `EffectAction` from a start-assign or hit signal and hands
// it to every matching behavior of the cast.

mod behaviors;
mod decorator;
mod ledger;

pub use behaviors::{
    formula_params, ActionControlEffect, AddStatusEffect, AttributeModifyEffect, CureEffect,
    DamageEffect,
};
pub use decorator::{
    DecoratorFactory, DecoratorHelper, DecoratorRegistry, DecoratorTag, FlatScale,
    TargetCountFalloff,
};
pub use ledger::{LedgerEntry, ModifierLedger};

use crate::config::{Catalog, LoadedAbility, LoadedEffect, LoadedEffectKind};
use crate::damage::{DamageOutcome, DamageResolver, RecoveryOutcome};
use crate::error::BattleError;
use crate::formula::FormulaParams;
use crate::property::PropertyKey;
use crate::status::StatusOutcome;
use skirmish_core::define_component;
use skirmish_core::ecs::{EcsError, Entity, World};
use skirmish_core::pool::Poolable;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EffectTag {
    Damage,
    Cure,
    AttributeModify,
    AddStatus,
    ActionControl,
}

impl EffectTag {
    pub fn of(kind: &LoadedEffectKind) -> Self {
        match kind {
            LoadedEffectKind::Damage { .. } => EffectTag::Damage,
            LoadedEffectKind::Cure { .. } => EffectTag::Cure,
            LoadedEffectKind::AttributeModify { .. } => EffectTag::AttributeModify,
            LoadedEffectKind::AddStatus { .. } => EffectTag::AddStatus,
            LoadedEffectKind::ActionControl { .. } => EffectTag::ActionControl,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectTag::Damage => "damage",
            EffectTag::Cure => "cure",
            EffectTag::AttributeModify => "attribute_modify",
            EffectTag::AddStatus => "add_status",
            EffectTag::ActionControl => "action_control",
        }
    }
}

/// One application of one effect to one target. Pooled and reused.
#[derive(Debug, Clone, Default)]
pub struct EffectAction {
    /// The cast entity owning the effect.
    pub cast: Option<Entity>,
    /// Stable key of the cast, used to build modifier reasons.
    pub cast_key: u64,
    pub slot: u32,
    pub caster: Option<Entity>,
    pub target: Option<Entity>,
    /// Targets hit in the same check, this one included.
    pub targets: u32,
    /// Product of the effect's decorators for `targets`.
    pub multiplier: f64,
    pub params: FormulaParams,
}

impl Poolable for EffectAction {
    fn reset(&mut self) {
        self.cast = None;
        self.cast_key = 0;
        self.slot = 0;
        self.caster = None;
        self.target = None;
        self.targets = 0;
        self.multiplier = 0.0;
        self.params.clear();
    }
}

/// Collaborators a behavior needs besides the world.
pub struct EffectEnv<'a> {
    pub resolver: &'a DamageResolver,
    pub catalog: &'a Catalog,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EffectOutcome {
    Damage(DamageOutcome),
    Recovery(RecoveryOutcome),
    Modified { property: PropertyKey, value: f64 },
    Status(StatusOutcome),
    Control(StatusOutcome),
    /// The action had no usable target.
    Skipped,
}

pub trait EffectBehavior: fmt::Debug {
    fn tag(&self) -> EffectTag;

    /// Apply to `action.target`. Anything written under a reason that must
    /// be undone when the cast ends goes into `ledger`.
    fn apply(
        &self,
        env: &EffectEnv<'_>,
        world: &mut World,
        action: &EffectAction,
        ledger: &mut ModifierLedger,
    ) -> Result<EffectOutcome, BattleError>;
}

pub type EffectFactory = fn(&LoadedEffectKind) -> Option<Rc<dyn EffectBehavior>>;

/// Tag to factory table filled at startup.
pub struct EffectRegistry {
    factories: HashMap<EffectTag, EffectFactory>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Every effect kind the kernel ships with.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(EffectTag::Damage, DamageEffect::build);
        registry.register(EffectTag::Cure, CureEffect::build);
        registry.register(EffectTag::AttributeModify, AttributeModifyEffect::build);
        registry.register(EffectTag::AddStatus, AddStatusEffect::build);
        registry.register(EffectTag::ActionControl, ActionControlEffect::build);
        registry
    }

    pub fn register(&mut self, tag: EffectTag, factory: EffectFactory) {
        if self.factories.insert(tag, factory).is_some() {
            tracing::debug!(tag = tag.name(), "effect factory replaced");
        }
    }

    pub fn instantiate(&self, effect: &LoadedEffect) -> Result<Rc<dyn EffectBehavior>, BattleError> {
        let tag = EffectTag::of(&effect.kind);
        self.factories
            .get(&tag)
            .and_then(|factory| factory(&effect.kind))
            .ok_or(BattleError::UnregisteredEffect(tag.name()))
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// An effect attached to a cast.
#[derive(Debug, Clone)]
pub struct RuntimeEffect {
    pub slot: u32,
    pub config: Rc<LoadedEffect>,
    pub behavior: Rc<dyn EffectBehavior>,
    pub decorators: Vec<Rc<dyn DecoratorHelper>>,
    pub ledger: ModifierLedger,
}

impl RuntimeEffect {
    /// Combined decorator multiplier, computed fresh for `targets`.
    pub fn multiplier(&self, targets: u32) -> f64 {
        self.decorators
            .iter()
            .map(|helper| helper.multiplier(targets))
            .product()
    }
}

/// Runtime effects of a cast entity, in config order.
#[derive(Debug, Clone, Default)]
pub struct ActiveEffects {
    pub effects: Vec<RuntimeEffect>,
}
define_component!(ActiveEffects, "ActiveEffects");

impl ActiveEffects {
    /// Instantiate every effect of `ability` and its decorators.
    pub fn attach(
        ability: &LoadedAbility,
        effects: &EffectRegistry,
        decorators: &DecoratorRegistry,
    ) -> Result<Self, BattleError> {
        let mut attached = Vec::with_capacity(ability.effects.len());
        for (slot, config) in ability.effects.iter().enumerate() {
            let behavior = effects.instantiate(config)?;
            let helpers = config
                .decorators
                .iter()
                .filter_map(|decorator| decorators.instantiate(decorator))
                .collect();
            attached.push(RuntimeEffect {
                slot: slot as u32,
                config: Rc::clone(config),
                behavior,
                decorators: helpers,
                ledger: ModifierLedger::default(),
            });
        }
        Ok(Self { effects: attached })
    }

    /// Revert every ledger; returns how many contributions were cleared.
    pub fn revert_all(&mut self, world: &mut World) -> Result<usize, EcsError> {
        let mut cleared = 0;
        for effect in &mut self.effects {
            cleared += effect.ledger.revert(world)?;
        }
        Ok(cleared)
    }
}
