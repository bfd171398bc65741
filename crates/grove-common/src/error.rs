//! Error types shared across Grove crates.

use thiserror::Error;

use crate::coords::CellCoord;
use crate::ids::EntityId;

/// Top-level error type for Grove operations.
#[derive(Debug, Error)]
pub enum GroveError {
    /// Entity is not known to the simulation
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// Cell lies outside the world bounds
    #[error("Cell {0} is outside the world bounds")]
    OutOfBounds(CellCoord),
}

/// Result type alias for Grove operations.
pub type GroveResult<T> = Result<T, GroveError>;
