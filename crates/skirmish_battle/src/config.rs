// config.rs - static content: abilities, effects, decorators, statuses
//
// Content is authored as JSON, parsed once and compiled into a `Catalog`.
// Formulas are compiled at load; an effect whose formula does not compile,
// reads an unknown parameter or points at a missing status is skipped with
// a warning, and an ability left without effects is skipped with it. The
// rest of the catalog still loads.

use crate::collision::ColliderSpec;
use crate::error::ConfigError;
use crate::formula::{CompiledFormula, FormulaEvaluator, COMBAT_PARAMETERS};
use crate::property::{FlagKey, ModifierMode, PropertyKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Content id of an ability, effect or status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub u32);

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityConfig {
    pub id: ContentId,
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Seconds the cast stays alive.
    pub duration: f64,
    #[serde(default)]
    pub hitbox: Option<HitboxConfig>,
    pub effects: Vec<EffectConfig>,
}

/// Collider spawned with the cast, optionally travelling along the
/// caster's facing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitboxConfig {
    pub collider: ColliderSpec,
    #[serde(default)]
    pub speed: f32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTrigger {
    /// Applied once when the cast starts.
    OnCast,
    /// Applied for every hit the cast's collider dispatches.
    OnHit,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRule {
    Caster,
    Target,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageMode {
    /// Formula value scales attack minus defense.
    #[default]
    Rate,
    /// Formula value is the damage.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    pub id: ContentId,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub trigger: EffectTrigger,
    pub target: TargetRule,
    pub kind: EffectKindConfig,
    #[serde(default)]
    pub decorators: Vec<DecoratorConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKindConfig {
    Damage {
        formula: String,
        #[serde(default)]
        mode: DamageMode,
    },
    Cure {
        formula: String,
    },
    AttributeModify {
        property: PropertyKey,
        #[serde(default)]
        mode: ModifierMode,
        formula: String,
        /// Revert when the cast ends; otherwise the base value changes.
        #[serde(default = "enabled_by_default")]
        revert_on_end: bool,
    },
    AddStatus {
        status: ContentId,
    },
    ActionControl {
        locks: Vec<FlagKey>,
        duration: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecoratorConfig {
    /// Lose `per_extra_target` of the outcome for every target beyond the
    /// first hit in the same check, never dropping below `floor`.
    TargetCountFalloff { per_extra_target: f64, floor: f64 },
    FlatScale { factor: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusModifier {
    pub property: PropertyKey,
    #[serde(default)]
    pub mode: ModifierMode,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagOverride {
    pub flag: FlagKey,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusConfig {
    pub id: ContentId,
    pub name: String,
    pub duration: f64,
    #[serde(default)]
    pub modifiers: Vec<StatusModifier>,
    #[serde(default)]
    pub flags: Vec<FlagOverride>,
}

/// On-disk shape of the content catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub abilities: Vec<AbilityConfig>,
    #[serde(default)]
    pub statuses: Vec<StatusConfig>,
}

// ----------------------------------------------------------------------
// Loaded (compiled) content
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum LoadedEffectKind {
    Damage {
        formula: Rc<dyn CompiledFormula>,
        mode: DamageMode,
    },
    Cure {
        formula: Rc<dyn CompiledFormula>,
    },
    AttributeModify {
        property: PropertyKey,
        mode: ModifierMode,
        formula: Rc<dyn CompiledFormula>,
        revert_on_end: bool,
    },
    AddStatus {
        status: ContentId,
    },
    ActionControl {
        locks: Vec<FlagKey>,
        duration: f64,
    },
}

#[derive(Debug, Clone)]
pub struct LoadedEffect {
    pub id: ContentId,
    pub trigger: EffectTrigger,
    pub target: TargetRule,
    pub kind: LoadedEffectKind,
    pub decorators: Vec<DecoratorConfig>,
}

#[derive(Debug, Clone)]
pub struct LoadedAbility {
    pub id: ContentId,
    pub name: String,
    pub duration: f64,
    pub hitbox: Option<HitboxConfig>,
    pub effects: Vec<Rc<LoadedEffect>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub what: String,
    pub reason: String,
}

/// What happened while loading a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogReport {
    pub abilities: usize,
    pub effects: usize,
    pub statuses: usize,
    pub skipped: Vec<SkippedEntry>,
}

impl CatalogReport {
    fn skip(&mut self, what: String, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(%what, %reason, "skipping content");
        self.skipped.push(SkippedEntry { what, reason });
    }
}

/// Immutable, compiled content keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    abilities: HashMap<ContentId, Rc<LoadedAbility>>,
    statuses: HashMap<ContentId, Rc<StatusConfig>>,
}

impl Catalog {
    pub fn from_json(
        json: &str,
        evaluator: &dyn FormulaEvaluator,
    ) -> Result<(Catalog, CatalogReport), ConfigError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::load(file, evaluator))
    }

    pub fn load(file: CatalogFile, evaluator: &dyn FormulaEvaluator) -> (Catalog, CatalogReport) {
        let mut catalog = Catalog::default();
        let mut report = CatalogReport::default();

        for status in file.statuses {
            let what = format!("status {} '{}'", status.id, status.name);
            if catalog.statuses.contains_key(&status.id) {
                report.skip(what, "duplicate id");
                continue;
            }
            if status.duration <= 0.0 {
                report.skip(what, "duration must be positive");
                continue;
            }
            catalog.statuses.insert(status.id, Rc::new(status));
            report.statuses += 1;
        }

        for ability in file.abilities {
            let what = format!("ability {} '{}'", ability.id, ability.name);
            if !ability.enabled {
                tracing::debug!(%what, "ability disabled");
                continue;
            }
            if catalog.abilities.contains_key(&ability.id) {
                report.skip(what, "duplicate id");
                continue;
            }

            let mut effects = Vec::with_capacity(ability.effects.len());
            for effect in &ability.effects {
                if !effect.enabled {
                    continue;
                }
                match catalog.compile_effect(effect, evaluator) {
                    Ok(loaded) => effects.push(Rc::new(loaded)),
                    Err(reason) => report.skip(format!("{what} effect {}", effect.id), reason),
                }
            }

            if effects.is_empty() {
                report.skip(what, "no usable effects");
                continue;
            }

            report.effects += effects.len();
            report.abilities += 1;
            catalog.abilities.insert(
                ability.id,
                Rc::new(LoadedAbility {
                    id: ability.id,
                    name: ability.name,
                    duration: ability.duration,
                    hitbox: ability.hitbox,
                    effects,
                }),
            );
        }

        tracing::info!(
            abilities = report.abilities,
            effects = report.effects,
            statuses = report.statuses,
            skipped = report.skipped.len(),
            "catalog loaded"
        );
        (catalog, report)
    }

    pub fn ability(&self, id: ContentId) -> Option<&Rc<LoadedAbility>> {
        self.abilities.get(&id)
    }

    pub fn status(&self, id: ContentId) -> Option<&Rc<StatusConfig>> {
        self.statuses.get(&id)
    }

    pub fn ability_ids(&self) -> Vec<ContentId> {
        let mut ids: Vec<ContentId> = self.abilities.keys().copied().collect();
        ids.sort();
        ids
    }

    fn compile_effect(
        &self,
        effect: &EffectConfig,
        evaluator: &dyn FormulaEvaluator,
    ) -> Result<LoadedEffect, String> {
        let compile = |source: &str| -> Result<Rc<dyn CompiledFormula>, String> {
            let formula = evaluator
                .compile(source)
                .map_err(|error| format!("formula '{source}': {error}"))?;
            if let Some(unknown) = formula
                .parameters()
                .iter()
                .find(|name| !COMBAT_PARAMETERS.contains(&name.as_str()))
            {
                return Err(format!("formula '{source}' reads unknown parameter '{unknown}'"));
            }
            Ok(formula)
        };

        let kind = match &effect.kind {
            EffectKindConfig::Damage { formula, mode } => LoadedEffectKind::Damage {
                formula: compile(formula)?,
                mode: *mode,
            },
            EffectKindConfig::Cure { formula } => LoadedEffectKind::Cure {
                formula: compile(formula)?,
            },
            EffectKindConfig::AttributeModify {
                property,
                mode,
                formula,
                revert_on_end,
            } => LoadedEffectKind::AttributeModify {
                property: *property,
                mode: *mode,
                formula: compile(formula)?,
                revert_on_end: *revert_on_end,
            },
            EffectKindConfig::AddStatus { status } => {
                if !self.statuses.contains_key(status) {
                    return Err(format!("unknown status {status}"));
                }
                LoadedEffectKind::AddStatus { status: *status }
            }
            EffectKindConfig::ActionControl { locks, duration } => {
                if locks.is_empty() || *duration <= 0.0 {
                    return Err("action control needs locks and a positive duration".into());
                }
                LoadedEffectKind::ActionControl {
                    locks: locks.clone(),
                    duration: *duration,
                }
            }
        };

        Ok(LoadedEffect {
            id: effect.id,
            trigger: effect.trigger,
            target: effect.target,
            kind,
            decorators: effect.decorators.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::ExpressionEvaluator;

    const CATALOG: &str = r#"{
        "statuses": [
            { "id": 1, "name": "haste", "duration": 2.0,
              "modifiers": [{ "property": "move_speed", "mode": "percent", "value": 0.5 }] }
        ],
        "abilities": [
            { "id": 10, "name": "slash", "duration": 0.5,
              "hitbox": { "collider": { "shape": { "type": "sphere", "radius": 1.5 } } },
              "effects": [
                { "id": 100, "trigger": "on_hit", "target": "target",
                  "kind": { "type": "damage", "formula": "1.0" },
                  "decorators": [{ "type": "target_count_falloff", "per_extra_target": 0.2, "floor": 0.4 }] },
                { "id": 101, "trigger": "on_cast", "target": "caster",
                  "kind": { "type": "add_status", "status": 1 } }
              ] },
            { "id": 11, "name": "broken", "duration": 1.0,
              "effects": [
                { "id": 110, "trigger": "on_cast", "target": "target",
                  "kind": { "type": "damage", "formula": "atk * (" } },
                { "id": 111, "trigger": "on_cast", "target": "target",
                  "kind": { "type": "cure", "formula": "mana * 2" } }
              ] },
            { "id": 12, "name": "half broken", "duration": 1.0,
              "effects": [
                { "id": 120, "trigger": "on_cast", "target": "target",
                  "kind": { "type": "add_status", "status": 99 } },
                { "id": 121, "trigger": "on_cast", "target": "target",
                  "kind": { "type": "cure", "formula": "target_max_hp * 0.1", "mode": "fixed" } }
              ] },
            { "id": 13, "name": "retired", "enabled": false, "duration": 1.0, "effects": [] }
        ]
    }"#;

    #[test]
    fn bad_effects_are_skipped_not_fatal() {
        let (catalog, report) = Catalog::from_json(CATALOG, &ExpressionEvaluator).unwrap();

        assert_eq!(catalog.ability_ids(), vec![ContentId(10), ContentId(12)]);
        assert_eq!(catalog.ability(ContentId(12)).map(|a| a.effects.len()), Some(1));
        assert!(catalog.ability(ContentId(11)).is_none());
        assert!(catalog.ability(ContentId(13)).is_none());

        // two broken effects of 11, 11 itself, the missing status of 12
        assert_eq!(report.skipped.len(), 4);
        assert_eq!(report.abilities, 2);
        assert_eq!(report.statuses, 1);
    }

    #[test]
    fn decorators_and_hitbox_survive_loading() {
        let (catalog, _) = Catalog::from_json(CATALOG, &ExpressionEvaluator).unwrap();
        let slash = catalog.ability(ContentId(10)).unwrap();

        assert!(slash.hitbox.is_some());
        assert_eq!(
            slash.effects[0].decorators,
            vec![DecoratorConfig::TargetCountFalloff {
                per_extra_target: 0.2,
                floor: 0.4
            }]
        );
        assert_eq!(slash.effects[0].trigger, EffectTrigger::OnHit);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            Catalog::from_json("{ not json", &ExpressionEvaluator),
            Err(ConfigError::Parse(_))
        ));
    }
}
