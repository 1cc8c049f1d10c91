use crate::entity::EntityId;

/// Alias for `Result<T, EbError>`.
pub type EbResult<T> = Result<T, EbError>;

/// Errors that can occur when manipulating the entity container.
#[derive(Debug, thiserror::Error)]
pub enum EbError {
    /// The requested entity ID does not exist in the world.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An entity with the same ID is already present.
    #[error("entity already exists: {0}")]
    DuplicateId(EntityId),

    /// A genome string contained a symbol outside the four-letter alphabet.
    #[error("invalid genome symbol '{symbol}' at position {position}")]
    InvalidGenome {
        /// The offending character.
        symbol: char,
        /// Zero-based index of the offending character.
        position: usize,
    },

    /// A generic validation error with a descriptive message.
    #[error("validation error: {0}")]
    Validation(String),
}
