//! # Grove Common
//!
//! Common types shared by the Grove crates:
//! - Entity IDs and a per-world ID allocator
//! - Cell coordinates, bounds and world-space helpers
//! - Common error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;
