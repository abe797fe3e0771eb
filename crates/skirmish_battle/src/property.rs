// property.rs - keyed attributes with reason-keyed modifiers
//
// Each numeric property is a base value plus modifiers stored under the
// reason (effect instance, status, control lock) that contributed them.
// The effective value is recomputed on every read:
//
//     (base + sum(additive)) * (1 + sum(percent)), then clamped per key
//
// Storing a modifier under a reason that already has one overwrites it, so
// removing a reason always restores the value it found. Flags use the same
// reasons with last-writer-wins instead of summation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKey {
    MaxHp,
    Attack,
    Defense,
    CritRate,
    DamageRate,
    DamageTakenRate,
    HealRate,
    MoveSpeed,
}

impl PropertyKey {
    pub const ALL: [PropertyKey; 8] = [
        PropertyKey::MaxHp,
        PropertyKey::Attack,
        PropertyKey::Defense,
        PropertyKey::CritRate,
        PropertyKey::DamageRate,
        PropertyKey::DamageTakenRate,
        PropertyKey::HealRate,
        PropertyKey::MoveSpeed,
    ];

    /// Value before any base is set.
    pub fn default_base(self) -> f64 {
        match self {
            PropertyKey::MaxHp => 1.0,
            PropertyKey::DamageRate | PropertyKey::DamageTakenRate | PropertyKey::HealRate => 1.0,
            _ => 0.0,
        }
    }

    pub fn clamp(self, value: f64) -> f64 {
        match self {
            PropertyKey::MaxHp => value.max(1.0),
            PropertyKey::CritRate => value.clamp(0.0, 1.0),
            _ => value.max(0.0),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKey {
    Alive,
    Damageable,
    Targetable,
    Hitbackable,
    Stunnable,
    Blockable,
    Hittable,
    CanDie,
    CanHeal,
    CanMove,
    CanAct,
}

impl FlagKey {
    pub const ALL: [FlagKey; 11] = [
        FlagKey::Alive,
        FlagKey::Damageable,
        FlagKey::Targetable,
        FlagKey::Hitbackable,
        FlagKey::Stunnable,
        FlagKey::Blockable,
        FlagKey::Hittable,
        FlagKey::CanDie,
        FlagKey::CanHeal,
        FlagKey::CanMove,
        FlagKey::CanAct,
    ];

    /// Flags cleared when an entity enters the death state.
    pub const DEATH_GATES: [FlagKey; 5] = [
        FlagKey::Alive,
        FlagKey::Damageable,
        FlagKey::Targetable,
        FlagKey::Hitbackable,
        FlagKey::Stunnable,
    ];
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonOrigin {
    Effect,
    Status,
    Control,
    External,
}

/// Identifies the source of a modifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReasonKey {
    pub origin: ReasonOrigin,
    pub id: u64,
    pub slot: u32,
}

impl ReasonKey {
    pub const fn new(origin: ReasonOrigin, id: u64, slot: u32) -> Self {
        Self { origin, id, slot }
    }

    /// Effect `slot` of the cast identified by `cast`.
    pub const fn effect(cast: u64, slot: u32) -> Self {
        Self::new(ReasonOrigin::Effect, cast, slot)
    }

    pub const fn status(status: u64) -> Self {
        Self::new(ReasonOrigin::Status, status, 0)
    }

    pub const fn control(cast: u64, slot: u32) -> Self {
        Self::new(ReasonOrigin::Control, cast, slot)
    }

    pub const fn external(id: u64) -> Self {
        Self::new(ReasonOrigin::External, id, 0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierMode {
    #[default]
    Additive,
    Percent,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct NumericProperty {
    base: f64,
    additive: BTreeMap<ReasonKey, f64>,
    percent: BTreeMap<ReasonKey, f64>,
}

impl NumericProperty {
    fn with_base(base: f64) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    fn effective(&self) -> f64 {
        let added: f64 = self.additive.values().sum();
        let scale: f64 = self.percent.values().sum();
        (self.base + added) * (1.0 + scale)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FlagProperty {
    base: bool,
    // Oldest writer first; the last entry wins.
    writers: Vec<(ReasonKey, bool)>,
}

/// Attribute set of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Properties {
    numeric: HashMap<PropertyKey, NumericProperty>,
    flags: HashMap<FlagKey, FlagProperty>,
}

impl Properties {
    /// Every flag on, every numeric property at its default base.
    pub fn new() -> Self {
        let numeric = PropertyKey::ALL
            .iter()
            .map(|key| (*key, NumericProperty::with_base(key.default_base())))
            .collect();
        let flags = FlagKey::ALL
            .iter()
            .map(|flag| {
                (
                    *flag,
                    FlagProperty {
                        base: true,
                        writers: Vec::new(),
                    },
                )
            })
            .collect();
        Self { numeric, flags }
    }

    pub fn with_base(mut self, key: PropertyKey, value: f64) -> Self {
        self.set_base(key, value);
        self
    }

    pub fn set_base(&mut self, key: PropertyKey, value: f64) {
        self.numeric_mut(key).base = value;
    }

    pub fn base(&self, key: PropertyKey) -> f64 {
        self.numeric
            .get(&key)
            .map(|property| property.base)
            .unwrap_or_else(|| key.default_base())
    }

    /// Additive contribution under `reason`, replacing any earlier one.
    pub fn add_modifier(&mut self, key: PropertyKey, reason: ReasonKey, delta: f64) {
        self.set_modifier(key, reason, ModifierMode::Additive, delta);
    }

    /// Contribution of either mode under `reason`, replacing any earlier
    /// one regardless of its mode.
    pub fn set_modifier(
        &mut self,
        key: PropertyKey,
        reason: ReasonKey,
        mode: ModifierMode,
        value: f64,
    ) {
        let property = self.numeric_mut(key);
        property.additive.remove(&reason);
        property.percent.remove(&reason);
        match mode {
            ModifierMode::Additive => property.additive.insert(reason, value),
            ModifierMode::Percent => property.percent.insert(reason, value),
        };
    }

    /// Remove the contribution of `reason`; false if there was none.
    pub fn clear_modifier(&mut self, key: PropertyKey, reason: ReasonKey) -> bool {
        let Some(property) = self.numeric.get_mut(&key) else {
            return false;
        };
        let additive = property.additive.remove(&reason).is_some();
        let percent = property.percent.remove(&reason).is_some();
        additive || percent
    }

    pub fn get(&self, key: PropertyKey) -> f64 {
        let raw = self
            .numeric
            .get(&key)
            .map(NumericProperty::effective)
            .unwrap_or_else(|| key.default_base());
        key.clamp(raw)
    }

    /// Reasons currently contributing to `key`.
    pub fn reasons(&self, key: PropertyKey) -> Vec<ReasonKey> {
        self.numeric
            .get(&key)
            .map(|property| {
                let mut reasons: Vec<ReasonKey> = property
                    .additive
                    .keys()
                    .chain(property.percent.keys())
                    .copied()
                    .collect();
                reasons.sort();
                reasons
            })
            .unwrap_or_default()
    }

    pub fn set_flag_base(&mut self, flag: FlagKey, value: bool) {
        self.flag_mut(flag).base = value;
    }

    pub fn flag_base(&self, flag: FlagKey) -> bool {
        self.flags.get(&flag).map(|f| f.base).unwrap_or(true)
    }

    /// Override `flag` under `reason`; `reason` becomes the latest writer.
    pub fn set_flag(&mut self, flag: FlagKey, reason: ReasonKey, value: bool) {
        let property = self.flag_mut(flag);
        property.writers.retain(|(writer, _)| *writer != reason);
        property.writers.push((reason, value));
    }

    pub fn clear_flag(&mut self, flag: FlagKey, reason: ReasonKey) -> bool {
        let Some(property) = self.flags.get_mut(&flag) else {
            return false;
        };
        let before = property.writers.len();
        property.writers.retain(|(writer, _)| *writer != reason);
        property.writers.len() != before
    }

    pub fn flag(&self, flag: FlagKey) -> bool {
        self.flags
            .get(&flag)
            .map(|property| {
                property
                    .writers
                    .last()
                    .map(|(_, value)| *value)
                    .unwrap_or(property.base)
            })
            .unwrap_or(true)
    }

    pub fn flag_reasons(&self, flag: FlagKey) -> Vec<ReasonKey> {
        self.flags
            .get(&flag)
            .map(|property| property.writers.iter().map(|(reason, _)| *reason).collect())
            .unwrap_or_default()
    }

    /// Drop every numeric and flag contribution made under `reason`.
    pub fn clear_reason(&mut self, reason: ReasonKey) -> usize {
        let mut cleared = 0;
        for property in self.numeric.values_mut() {
            cleared += usize::from(property.additive.remove(&reason).is_some());
            cleared += usize::from(property.percent.remove(&reason).is_some());
        }
        for property in self.flags.values_mut() {
            let before = property.writers.len();
            property.writers.retain(|(writer, _)| *writer != reason);
            cleared += before - property.writers.len();
        }
        cleared
    }

    fn numeric_mut(&mut self, key: PropertyKey) -> &mut NumericProperty {
        self.numeric
            .entry(key)
            .or_insert_with(|| NumericProperty::with_base(key.default_base()))
    }

    fn flag_mut(&mut self, flag: FlagKey) -> &mut FlagProperty {
        self.flags.entry(flag).or_insert(FlagProperty {
            base: true,
            writers: Vec::new(),
        })
    }
}

impl Default for Properties {
    fn default() -> Self {
        Self::new()
    }
}

skirmish_core::define_component!(Properties, "Properties");
