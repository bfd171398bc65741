//! Grid coordinates and world-space helpers.
//!
//! World positions are `glam::Vec2` in world units. One grid cell spans one
//! world unit, with cell `(x, y)` covering `[x, x+1) x [y, y+1)`.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer coordinate of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    /// X coordinate in cell space
    pub x: i32,
    /// Y coordinate in cell space
    pub y: i32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the cell containing a world position.
    #[must_use]
    pub fn from_world(pos: Vec2) -> Self {
        Self {
            x: pos.x.floor() as i32,
            y: pos.y.floor() as i32,
        }
    }

    /// Returns the world-space center of this cell.
    #[must_use]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }

    /// Chebyshev (king-move) distance between two cells.
    #[must_use]
    pub const fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy {
            dx
        } else {
            dy
        }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive rectangular cell bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBounds {
    /// Minimum corner (inclusive)
    pub min: CellCoord,
    /// Maximum corner (inclusive)
    pub max: CellCoord,
}

impl CellBounds {
    /// Creates bounds from two inclusive corners.
    #[must_use]
    pub const fn new(min: CellCoord, max: CellCoord) -> Self {
        Self { min, max }
    }

    /// Bounds spanning `width x height` cells starting at the origin.
    #[must_use]
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self {
            min: CellCoord::new(0, 0),
            max: CellCoord::new(width - 1, height - 1),
        }
    }

    /// Returns true if the bounds contain no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y
    }

    /// Checks if a cell lies within the bounds.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }

    /// Number of cells covered.
    #[must_use]
    pub fn area(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        let w = u64::from(self.min.x.abs_diff(self.max.x)) + 1;
        let h = u64::from(self.min.y.abs_diff(self.max.y)) + 1;
        w * h
    }
}

/// Unit direction from `from` to `to`, or zero when the points coincide.
#[must_use]
pub fn direction_to(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or_zero()
}
