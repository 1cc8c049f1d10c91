use eb_core::entity::EntityId;
use eb_core::error::EbError;

/// Result alias for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised by the orchestrator, the context, and law systems.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// No entity with this ID exists.
    #[error("entity not found in simulation: {0}")]
    EntityNotFound(EntityId),

    /// A system returned an error from a lifecycle hook.
    #[error("system '{system}' failed: {message}")]
    SystemFailed {
        /// Name of the failing system.
        system: String,
        /// The underlying error message.
        message: String,
    },

    /// A system that needs `init` was updated without it.
    #[error("system '{0}' used before initialization")]
    NotInitialized(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration document could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// The entity container rejected an operation.
    #[error(transparent)]
    World(#[from] EbError),
}
