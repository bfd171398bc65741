//! Boundary with the health collaborator.
//!
//! The engine never decides death itself. It reports damage through
//! [`HealthSink`] and reacts to the outcome. [`HealthLedger`] is the plain
//! in-memory implementation used by the headless world and the tests.

use ahash::AHashMap;
use glam::Vec2;
use grove_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Reference to a loot table owned by the inventory side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LootTableId(u32);

impl LootTableId {
    /// Creates a loot table ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// What happened when damage was applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Target took damage and is still alive
    Survived {
        /// Health left
        remaining: f32,
    },
    /// This hit killed the target
    Killed {
        /// Loot table attached to the target
        loot: Option<LootTableId>,
    },
    /// Target has no health record (already dead, or invulnerable structure)
    Ignored,
}

/// Receiver of damage reports.
pub trait HealthSink {
    /// Applies damage from a source at `source_position`.
    fn apply_damage(&mut self, target: EntityId, amount: f32, source_position: Vec2) -> DamageOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HealthRecord {
    current: f32,
    max: f32,
    loot: Option<LootTableId>,
}

/// Simple health bookkeeping keyed by entity.
#[derive(Debug, Clone, Default)]
pub struct HealthLedger {
    records: AHashMap<EntityId, HealthRecord>,
}

impl HealthLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks an entity at full health.
    pub fn insert(&mut self, id: EntityId, max_health: f32, loot: Option<LootTableId>) {
        let max = max_health.max(1.0);
        self.records.insert(
            id,
            HealthRecord {
                current: max,
                max,
                loot,
            },
        );
    }

    /// Stops tracking an entity.
    pub fn remove(&mut self, id: EntityId) {
        self.records.remove(&id);
    }

    /// Current health, if tracked.
    #[must_use]
    pub fn health(&self, id: EntityId) -> Option<f32> {
        self.records.get(&id).map(|r| r.current)
    }

    /// Health as a fraction of max (0.0-1.0), if tracked.
    #[must_use]
    pub fn health_percent(&self, id: EntityId) -> Option<f32> {
        self.records
            .get(&id)
            .map(|r| (r.current / r.max).clamp(0.0, 1.0))
    }

    /// Returns whether an entity is tracked and alive.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.records.get(&id).is_some_and(|r| r.current > 0.0)
    }
}

impl HealthSink for HealthLedger {
    fn apply_damage(&mut self, target: EntityId, amount: f32, source_position: Vec2) -> DamageOutcome {
        let Some(record) = self.records.get_mut(&target) else {
            return DamageOutcome::Ignored;
        };
        record.current -= amount.max(0.0);
        if record.current > 0.0 {
            return DamageOutcome::Survived {
                remaining: record.current,
            };
        }

        let loot = record.loot;
        self.records.remove(&target);
        debug!(%target, from_x = source_position.x, from_y = source_position.y, "entity killed");
        DamageOutcome::Killed { loot }
    }
}
