//! Tallies of what happened during a run.

use std::collections::BTreeMap;

use grove_gameplay::{ResourceKind, SimEvent, SimEventKind};
use serde::Serialize;
use tracing::info;

/// Counters accumulated from drained simulation events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Ticks simulated
    pub ticks: u64,
    /// Simulated seconds
    pub elapsed_secs: f32,
    /// Units harvested per resource kind
    pub harvested: BTreeMap<ResourceKind, u32>,
    /// Harvests that started
    pub harvests_started: u32,
    /// Harvests abandoned by a task change
    pub harvests_canceled: u32,
    /// Attacks started
    pub attacks: u32,
    /// Attacks that landed
    pub hits: u32,
    /// Attacks that missed
    pub misses: u32,
    /// Entities killed
    pub deaths: u32,
    /// Kills credited to an attacker
    pub targets_defeated: u32,
    /// Kills that dropped a loot table
    pub loot_drops: u32,
    /// Agents still alive at the end
    pub survivors: usize,
}

impl RunSummary {
    /// Counts one event.
    pub fn record(&mut self, event: &SimEvent) {
        match &event.kind {
            SimEventKind::ResourceHarvested { kind, amount } => {
                *self.harvested.entry(*kind).or_default() += amount;
            },
            SimEventKind::StartedHarvest { .. } => self.harvests_started += 1,
            SimEventKind::CanceledHarvest => self.harvests_canceled += 1,
            SimEventKind::StartedAttack { .. } => self.attacks += 1,
            SimEventKind::Damaged { .. } => self.hits += 1,
            SimEventKind::AttackMissed { .. } => self.misses += 1,
            SimEventKind::Died => self.deaths += 1,
            SimEventKind::TargetDefeated { loot, .. } => {
                self.targets_defeated += 1;
                if loot.is_some() {
                    self.loot_drops += 1;
                }
            },
            SimEventKind::StartedMoving | SimEventKind::StoppedMoving => {},
        }
    }

    /// Counts a batch of events.
    pub fn record_all<'a>(&mut self, events: impl IntoIterator<Item = &'a SimEvent>) {
        for event in events {
            self.record(event);
        }
    }

    /// Total units harvested of all kinds.
    #[must_use]
    pub fn total_harvested(&self) -> u32 {
        self.harvested.values().sum()
    }

    /// Writes the summary to the log.
    pub fn log(&self) {
        info!(
            "Simulated {} ticks ({:.1}s): {} survivors",
            self.ticks, self.elapsed_secs, self.survivors
        );
        for kind in ResourceKind::all() {
            let amount = self.harvested.get(&kind).copied().unwrap_or(0);
            info!("  {}: {} harvested", kind.display_name(), amount);
        }
        info!(
            "  harvests: {} started, {} canceled",
            self.harvests_started, self.harvests_canceled
        );
        info!(
            "  combat: {} attacks, {} hits, {} misses, {} deaths ({} with loot)",
            self.attacks, self.hits, self.misses, self.deaths, self.loot_drops
        );
    }
}
