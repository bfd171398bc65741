//! Motion output and the movement executor boundary.
//!
//! Agents only decide a desired velocity and facing. Turning that into an
//! actual position (and colliding with things) belongs to the executor.

use glam::Vec2;
use grove_common::EntityId;
use serde::{Deserialize, Serialize};

/// Horizontal facing used for sprite flipping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Facing negative x
    Left,
    /// Facing positive x
    #[default]
    Right,
}

impl Facing {
    /// Facing implied by a horizontal velocity, keeping `previous` when the
    /// velocity has no horizontal component.
    #[must_use]
    pub fn from_velocity(previous: Self, velocity: Vec2) -> Self {
        if velocity.x > f32::EPSILON {
            Self::Right
        } else if velocity.x < -f32::EPSILON {
            Self::Left
        } else {
            previous
        }
    }

    /// Unit x sign for this facing.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Desired motion for one agent for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    /// Desired velocity in world units per second
    pub velocity: Vec2,
    /// Desired facing
    pub facing: Facing,
}

impl Motion {
    /// Zero-velocity motion keeping a facing.
    #[must_use]
    pub const fn still(facing: Facing) -> Self {
        Self {
            velocity: Vec2::ZERO,
            facing,
        }
    }

    /// Returns true if the velocity is zero.
    #[must_use]
    pub fn is_still(&self) -> bool {
        self.velocity == Vec2::ZERO
    }
}

/// Applies motion to the world. Fire-and-forget: nothing flows back.
pub trait MovementExecutor {
    /// Moves `entity` from `position` according to `motion` over `dt`
    /// seconds and returns its new position.
    fn apply(&mut self, entity: EntityId, position: Vec2, motion: Motion, dt: f32) -> Vec2;
}

/// Straight-line integration with no collision.
#[derive(Debug, Clone, Copy, Default)]
pub struct KinematicMover;

impl MovementExecutor for KinematicMover {
    fn apply(&mut self, _entity: EntityId, position: Vec2, motion: Motion, dt: f32) -> Vec2 {
        position + motion.velocity * dt
    }
}
