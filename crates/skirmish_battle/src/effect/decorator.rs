// decorator.rs - numeric wrappers around an effect's outcome
//
// Helpers are built from the effect's decorator list when the effect is
// attached. They are pure: the multiplier is recomputed from the current
// target count on every call because the count changes within one pass.

use crate::config::DecoratorConfig;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DecoratorTag {
    TargetCountFalloff,
    FlatScale,
}

impl DecoratorTag {
    pub fn of(config: &DecoratorConfig) -> Self {
        match config {
            DecoratorConfig::TargetCountFalloff { .. } => DecoratorTag::TargetCountFalloff,
            DecoratorConfig::FlatScale { .. } => DecoratorTag::FlatScale,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DecoratorTag::TargetCountFalloff => "target_count_falloff",
            DecoratorTag::FlatScale => "flat_scale",
        }
    }
}

pub trait DecoratorHelper: fmt::Debug {
    fn multiplier(&self, target_count: u32) -> f64;
}

/// Loses a share of the outcome for every target beyond the first.
#[derive(Debug, Clone, Copy)]
pub struct TargetCountFalloff {
    pub per_extra_target: f64,
    pub floor: f64,
}

impl DecoratorHelper for TargetCountFalloff {
    fn multiplier(&self, target_count: u32) -> f64 {
        let extra = f64::from(target_count.saturating_sub(1));
        (1.0 - self.per_extra_target * extra).max(self.floor)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FlatScale {
    pub factor: f64,
}

impl DecoratorHelper for FlatScale {
    fn multiplier(&self, _target_count: u32) -> f64 {
        self.factor
    }
}

pub type DecoratorFactory = fn(&DecoratorConfig) -> Option<Rc<dyn DecoratorHelper>>;

/// Tag to factory table filled at startup.
pub struct DecoratorRegistry {
    factories: HashMap<DecoratorTag, DecoratorFactory>,
}

impl DecoratorRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Every decorator the kernel ships with.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(DecoratorTag::TargetCountFalloff, build_falloff);
        registry.register(DecoratorTag::FlatScale, build_flat_scale);
        registry
    }

    pub fn register(&mut self, tag: DecoratorTag, factory: DecoratorFactory) {
        if self.factories.insert(tag, factory).is_some() {
            tracing::debug!(tag = tag.name(), "decorator factory replaced");
        }
    }

    /// `None` when no factory handles the config's tag.
    pub fn instantiate(&self, config: &DecoratorConfig) -> Option<Rc<dyn DecoratorHelper>> {
        let tag = DecoratorTag::of(config);
        let helper = self.factories.get(&tag).and_then(|factory| factory(config));
        if helper.is_none() {
            tracing::warn!(tag = tag.name(), "no decorator factory, decorator ignored");
        }
        helper
    }
}

fn build_falloff(config: &DecoratorConfig) -> Option<Rc<dyn DecoratorHelper>> {
    let DecoratorConfig::TargetCountFalloff {
        per_extra_target,
        floor,
    } = *config
    else {
        return None;
    };
    Some(Rc::new(TargetCountFalloff {
        per_extra_target,
        floor,
    }))
}

fn build_flat_scale(config: &DecoratorConfig) -> Option<Rc<dyn DecoratorHelper>> {
    let DecoratorConfig::FlatScale { factor } = *config else {
        return None;
    };
    Some(Rc::new(FlatScale { factor }))
}

impl Default for DecoratorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
