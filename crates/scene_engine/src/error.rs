//! Error taxonomy shared by every scene-core operation

use crate::config::ConfigError;
use thiserror::Error;

/// Errors surfaced by entities, components, events and scenes
#[derive(Error, Debug)]
pub enum EcsError {
    /// Attribute, behaviour, system, entity or registered type lookup missed
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What was being looked up ("attribute", "entity", ...)
        kind: &'static str,
        /// Name or type that was requested
        name: String,
    },

    /// Operation invoked outside its legal lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Two constructors or instances registered under the same name or type
    #[error("Duplicate {kind} registration: {name}")]
    DuplicateRegistration {
        /// Catalog the registration was attempted in
        kind: &'static str,
        /// Offending name
        name: String,
    },

    /// Selection over an entity set that is too small
    #[error("Cannot select from {available} entities: {reason}")]
    Bounds {
        /// Number of entities in the set
        available: usize,
        /// Why the selection is impossible
        reason: &'static str,
    },

    /// Scene refused to allocate another entity
    #[error("Entity limit of {limit} reached")]
    CapacityExceeded {
        /// Configured maximum
        limit: usize,
    },

    /// Failure reported by a user component
    #[error("{0}")]
    Custom(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EcsError {
    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound { kind, name: name.into() }
    }

    pub(crate) fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateRegistration { kind, name: name.into() }
    }

    pub(crate) fn scene_gone() -> Self {
        Self::InvalidState("scene has been destroyed".to_string())
    }

    pub(crate) fn busy(what: &str) -> Self {
        Self::InvalidState(format!("{what} is already borrowed"))
    }
}

/// Result alias used throughout the crate
pub type EcsResult<T> = Result<T, EcsError>;
