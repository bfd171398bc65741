//! Shared grid of harvestable resource cells.
//!
//! The grid is the sole owner of cell contents. Agents only hold advisory
//! claims (a coordinate they are walking toward), so two agents may chase the
//! same cell; whoever finishes first consumes it and the loser's removal is a
//! no-op.

use std::cmp::Ordering;

use ahash::AHashMap;
use glam::Vec2;
use grove_common::{CellBounds, CellCoord};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::GridConfig;

/// Kind of harvestable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Trees
    Wood,
    /// Rocks
    Stone,
}

impl ResourceKind {
    /// Get display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Wood => "Wood",
            Self::Stone => "Stone",
        }
    }

    /// Get all resource kinds.
    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::Wood, Self::Stone]
    }
}

/// Errors from direct cell placement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceError {
    /// Cell lies outside the grid bounds
    #[error("cell {0} is out of bounds")]
    OutOfBounds(CellCoord),
    /// Cell already holds a resource
    #[error("cell {0} already holds {1:?}")]
    Occupied(CellCoord, ResourceKind),
}

/// Result of one spawn attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// A resource was placed
    Spawned(CellCoord),
    /// The probability roll failed (always the case at capacity)
    RollFailed,
    /// The picked cell failed the clearance check
    Blocked(CellCoord),
}

impl SpawnOutcome {
    /// Returns the placed cell, if any.
    #[must_use]
    pub const fn spawned(self) -> Option<CellCoord> {
        match self {
            Self::Spawned(cell) => Some(cell),
            _ => None,
        }
    }
}

/// Bounded grid of resource cells with a capped spawn policy.
#[derive(Debug, Clone)]
pub struct ResourceGrid {
    config: GridConfig,
    cells: AHashMap<CellCoord, ResourceKind>,
    spawn_timer: f32,
}

impl ResourceGrid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            cells: AHashMap::new(),
            spawn_timer: 0.0,
        }
    }

    /// Returns the grid configuration.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Returns the grid bounds.
    #[must_use]
    pub fn bounds(&self) -> CellBounds {
        self.config.bounds
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns whether no cell is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns what a cell holds.
    #[must_use]
    pub fn kind_at(&self, cell: CellCoord) -> Option<ResourceKind> {
        self.cells.get(&cell).copied()
    }

    /// Iterates over occupied cells in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, ResourceKind)> + '_ {
        self.cells.iter().map(|(&c, &k)| (c, k))
    }

    /// Current population of one kind.
    #[must_use]
    pub fn population(&self, kind: ResourceKind) -> usize {
        self.cells.values().filter(|&&k| k == kind).count()
    }

    /// Places a resource directly, bypassing the spawn policy.
    ///
    /// Used for seeding a world. The clearance rule is not applied, but a
    /// cell never holds two resources.
    pub fn place(&mut self, cell: CellCoord, kind: ResourceKind) -> Result<(), PlaceError> {
        if !self.config.bounds.contains(cell) {
            return Err(PlaceError::OutOfBounds(cell));
        }
        if let Some(existing) = self.kind_at(cell) {
            return Err(PlaceError::Occupied(cell, existing));
        }
        self.cells.insert(cell, kind);
        Ok(())
    }

    /// Empties a cell, returning what it held.
    ///
    /// Removing an empty cell is a no-op, so calling this twice leaves the
    /// grid exactly as calling it once.
    pub fn remove_cell(&mut self, cell: CellCoord) -> Option<ResourceKind> {
        let removed = self.cells.remove(&cell);
        if let Some(kind) = removed {
            trace!(x = cell.x, y = cell.y, ?kind, "cell cleared");
        }
        removed
    }

    /// Empties a cell only if it still holds `kind`.
    ///
    /// Returns true when the resource was consumed by this call.
    pub fn remove_if_kind(&mut self, cell: CellCoord, kind: ResourceKind) -> bool {
        if self.kind_at(cell) == Some(kind) {
            self.remove_cell(cell);
            true
        } else {
            false
        }
    }

    /// Nearest cell of `kind` to `origin` by Euclidean distance to cell
    /// centers, ties broken by coordinate order.
    #[must_use]
    pub fn nearest_cell_of_kind(&self, kind: ResourceKind, origin: Vec2) -> Option<CellCoord> {
        self.nearest_cell_within(kind, origin, f32::INFINITY)
    }

    /// Like [`nearest_cell_of_kind`](Self::nearest_cell_of_kind), limited to
    /// cells whose center lies within `max_range` of `origin`.
    #[must_use]
    pub fn nearest_cell_within(
        &self,
        kind: ResourceKind,
        origin: Vec2,
        max_range: f32,
    ) -> Option<CellCoord> {
        let max_sq = max_range * max_range;
        self.cells
            .iter()
            .filter(|(_, &k)| k == kind)
            .map(|(&cell, _)| (cell, cell.center().distance_squared(origin)))
            .filter(|&(_, d)| d <= max_sq)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)))
            .map(|(cell, _)| cell)
    }

    /// Configured population cap for `kind` (0 when the kind never spawns).
    #[must_use]
    pub fn cap(&self, kind: ResourceKind) -> u32 {
        self.config
            .spawn_rules
            .iter()
            .find(|rule| rule.kind == kind)
            .map_or(0, |rule| rule.cap)
    }

    /// Spawn probability for `kind`: 1.0 when empty, 0.0 at the cap, linear
    /// in between.
    #[must_use]
    pub fn spawn_probability(&self, kind: ResourceKind) -> f32 {
        let cap = self.cap(kind);
        if cap == 0 {
            return 0.0;
        }
        let population = self.population(kind) as f32;
        (1.0 - population / cap as f32).clamp(0.0, 1.0)
    }

    /// Returns true if no occupied cell lies within the clearance radius.
    #[must_use]
    pub fn is_clear(&self, cell: CellCoord) -> bool {
        let r = self.config.clearance_radius;
        let side = 2 * u64::from(r) + 1;
        if side * side < self.cells.len() as u64 {
            let r = r as i32;
            for dy in -r..=r {
                for dx in -r..=r {
                    if self.cells.contains_key(&CellCoord::new(cell.x + dx, cell.y + dy)) {
                        return false;
                    }
                }
            }
            true
        } else {
            self.cells.keys().all(|&other| other.chebyshev(cell) > r)
        }
    }

    /// One spawn attempt for `kind`.
    ///
    /// Rolls against [`spawn_probability`](Self::spawn_probability), then
    /// picks a uniformly random cell within bounds and places the resource
    /// only if the clearance check passes. A blocked attempt is not retried.
    pub fn try_spawn(&mut self, kind: ResourceKind, rng: &mut fastrand::Rng) -> SpawnOutcome {
        let probability = self.spawn_probability(kind);
        if probability <= 0.0 || self.config.bounds.is_empty() || rng.f32() >= probability {
            return SpawnOutcome::RollFailed;
        }

        let bounds = self.config.bounds;
        let cell = CellCoord::new(
            rng.i32(bounds.min.x..=bounds.max.x),
            rng.i32(bounds.min.y..=bounds.max.y),
        );

        if !self.is_clear(cell) {
            trace!(x = cell.x, y = cell.y, ?kind, "spawn blocked by clearance");
            return SpawnOutcome::Blocked(cell);
        }

        self.cells.insert(cell, kind);
        debug!(x = cell.x, y = cell.y, ?kind, "resource spawned");
        SpawnOutcome::Spawned(cell)
    }

    /// Advances the spawn interval; when it elapses, attempts one spawn per
    /// configured kind. Returns the cells placed this tick.
    pub fn tick(&mut self, dt: f32, rng: &mut fastrand::Rng) -> Vec<(CellCoord, ResourceKind)> {
        let mut spawned = Vec::new();
        if self.config.spawn_interval <= 0.0 {
            return spawned;
        }

        self.spawn_timer += dt;
        while self.spawn_timer >= self.config.spawn_interval {
            self.spawn_timer -= self.config.spawn_interval;
            let kinds: Vec<ResourceKind> = self.config.spawn_rules.iter().map(|r| r.kind).collect();
            for kind in kinds {
                if let Some(cell) = self.try_spawn(kind, rng).spawned() {
                    spawned.push((cell, kind));
                }
            }
        }
        spawned
    }
}
