use crate::ecs::{CollectorId, ComponentId, Entity, SchedulerState};
use thiserror::Error;

/// Errors raised by the component store, indices and world resources.
///
/// All of these are programming errors: callers propagate them instead of
/// substituting defaults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    #[error("entity {entity} is stale or was destroyed")]
    StaleEntity { entity: Entity },

    #[error("entity {entity} has no {component} component")]
    MissingComponent { entity: Entity, component: &'static str },

    #[error("entity {entity} already has a {component} component")]
    ComponentAlreadyPresent { entity: Entity, component: &'static str },

    #[error("component {component} is not part of this context's layout")]
    UnregisteredComponent { component: &'static str },

    #[error("component {component} is already registered")]
    DuplicateComponent { component: &'static str },

    #[error("component layout is full ({max} slots)")]
    LayoutFull { max: usize },

    #[error("layout slot {slot} expected '{expected}' but found '{found}'")]
    LayoutMismatch { slot: u16, expected: String, found: String },

    #[error("index '{index}' already maps key {key} to {holder}; refusing {entity}")]
    IndexKeyConflict {
        index: &'static str,
        key: String,
        holder: Entity,
        entity: Entity,
    },

    #[error("no index registered at {component} position {position}")]
    UnknownIndex { component: ComponentId, position: usize },

    #[error("resource {resource} is not registered")]
    MissingResource { resource: &'static str },

    #[error("{0} does not exist")]
    UnknownCollector(CollectorId),

    #[error("signal subscriber {0} does not exist")]
    UnknownSubscriber(usize),
}

/// Failure reported by a system phase.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error(transparent)]
    Domain(Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("{0}")]
    Failed(String),
}

impl SystemError {
    /// Wrap an error from a crate built on top of the kernel.
    pub fn domain<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SystemError::Domain(Box::new(error))
    }

    pub fn failed(message: impl Into<String>) -> Self {
        SystemError::Failed(message.into())
    }
}

/// Errors that can occur while registering or driving systems.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("system '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("cannot {action} while the scheduler is {state:?}")]
    InvalidTransition {
        state: SchedulerState,
        action: &'static str,
    },

    #[error("system '{system}' failed to initialize")]
    InitializationFailed {
        system: String,
        #[source]
        source: SystemError,
    },
}
