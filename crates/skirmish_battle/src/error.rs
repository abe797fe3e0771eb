use crate::config::ContentId;
use skirmish_core::ecs::{EcsError, SchedulerError, SystemError};
use thiserror::Error;

/// Errors raised while resolving combat.
#[derive(Debug, Error)]
pub enum BattleError {
    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("ability {0} is not in the catalog")]
    UnknownAbility(ContentId),

    #[error("status {0} is not in the catalog")]
    UnknownStatus(ContentId),

    #[error("no factory registered for {0} effects")]
    UnregisteredEffect(&'static str),
}

impl From<BattleError> for SystemError {
    fn from(error: BattleError) -> Self {
        match error {
            BattleError::Ecs(ecs) => SystemError::Ecs(ecs),
            other => SystemError::failed(other.to_string()),
        }
    }
}

/// Errors raised while parsing or evaluating a formula.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' takes {expected} arguments, got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("formula '{0}' produced a non-finite value")]
    NonFinite(String),
}

/// Errors raised while loading static content.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),
}
