//! # Grove Gameplay
//!
//! Autonomous agent behavior for a 2D world simulation.
//!
//! This crate provides:
//! - Agent state machine (idle, travel, task execution, interruption)
//! - Harvest and melee combat tasks
//! - Shared resource grid with probabilistic spawning
//! - Tagged target registry with nearest-target queries
//! - Attack resolution with windup and cooldown
//! - Rarity-weighted stat budgets
//! - TOML configuration
//! - Event bus for animation, VFX and inventory consumers
//! - A headless world tying it all together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod agent;
pub mod combat;
pub mod config;
pub mod events;
pub mod health;
pub mod movement;
pub mod resource_grid;
pub mod stats;
pub mod targets;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::combat::*;
    pub use crate::config::*;
    pub use crate::events::*;
    pub use crate::health::*;
    pub use crate::movement::*;
    pub use crate::resource_grid::*;
    pub use crate::stats::*;
    pub use crate::targets::*;
    pub use crate::world::*;
}

pub use prelude::*;
