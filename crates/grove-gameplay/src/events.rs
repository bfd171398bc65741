//! Event bus carrying agent events to external collaborators.
//!
//! Animation triggers, inventory grants and health displays live outside the
//! engine. The engine only publishes what happened; consumers drain the bus
//! once per tick.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use grove_common::EntityId;

use crate::health::LootTableId;
use crate::resource_grid::ResourceKind;

/// What happened to (or was done by) an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    /// Velocity went from zero to non-zero
    StartedMoving,
    /// Velocity went from non-zero to zero
    StoppedMoving,
    /// Harvest progress timer started on a cell
    StartedHarvest {
        /// Kind being harvested
        kind: ResourceKind,
    },
    /// In-flight harvest was abandoned
    CanceledHarvest,
    /// Attack windup began
    StartedAttack {
        /// Entity being attacked
        target: EntityId,
    },
    /// Entity took damage
    Damaged {
        /// Attacking entity
        source: EntityId,
        /// Damage amount
        amount: f32,
    },
    /// Windup elapsed but the target was gone or out of range
    AttackMissed {
        /// Intended target
        target: EntityId,
    },
    /// Entity died
    Died,
    /// Harvest completed and the cell was consumed
    ResourceHarvested {
        /// Kind harvested
        kind: ResourceKind,
        /// Amount granted
        amount: u32,
    },
    /// Attacker landed the killing blow
    TargetDefeated {
        /// Entity that died
        target: EntityId,
        /// Loot table to roll, if any
        loot: Option<LootTableId>,
    },
}

/// An event tagged with the entity it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Entity the event concerns
    pub entity: EntityId,
    /// Event payload
    pub kind: SimEventKind,
}

impl SimEvent {
    /// Creates a new event.
    #[must_use]
    pub const fn new(entity: EntityId, kind: SimEventKind) -> Self {
        Self { entity, kind }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<SimEvent>,
    /// Receiver for collecting events
    receiver: Receiver<SimEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: SimEvent) {
        // Non-blocking send - if full, event is dropped
        if self.sender.try_send(event).is_err() {
            tracing::warn!(capacity = self.capacity, "event bus full, dropping event");
        }
    }

    /// Shorthand for publishing an event about `entity`.
    pub fn emit(&self, entity: EntityId, kind: SimEventKind) {
        self.publish(SimEvent::new(entity, kind));
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<SimEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}
