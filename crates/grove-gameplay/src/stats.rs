//! Agent stats and rarity rolls.
//!
//! This module provides:
//! - Rarity tiers with spawn weights and budget multipliers
//! - Per-type stat tables (base stats plus a point budget)
//! - Point-by-point budget distribution at spawn
//! - Buffs, the only way stats change after spawn

use serde::{Deserialize, Serialize};

// ============================================================================
// Rarity
// ============================================================================

/// Rarity tier rolled once per agent at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    /// Most agents
    Common,
    /// Slightly stronger
    Uncommon,
    /// Noticeably stronger
    Rare,
    /// Much stronger
    Epic,
    /// Extremely rare, strongest
    Legendary,
}

impl Rarity {
    /// Get display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
        }
    }

    /// Relative weight used by [`Rarity::roll`].
    #[must_use]
    pub const fn spawn_weight(self) -> u32 {
        match self {
            Self::Common => 60,
            Self::Uncommon => 25,
            Self::Rare => 10,
            Self::Epic => 4,
            Self::Legendary => 1,
        }
    }

    /// Multiplier applied to the stat point budget.
    #[must_use]
    pub const fn budget_multiplier(self) -> f32 {
        match self {
            Self::Common => 1.0,
            Self::Uncommon => 1.25,
            Self::Rare => 1.5,
            Self::Epic => 2.0,
            Self::Legendary => 3.0,
        }
    }

    /// Get all rarity tiers, most common first.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::Common,
            Self::Uncommon,
            Self::Rare,
            Self::Epic,
            Self::Legendary,
        ]
    }

    /// Rolls a tier using the spawn weights.
    pub fn roll(rng: &mut fastrand::Rng) -> Self {
        let total: u32 = Self::all().iter().map(|r| r.spawn_weight()).sum();
        let mut pick = rng.u32(0..total);
        for rarity in Self::all() {
            if pick < rarity.spawn_weight() {
                return rarity;
            }
            pick -= rarity.spawn_weight();
        }
        Self::Common
    }
}

// ============================================================================
// Stats
// ============================================================================

/// A single derived stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Damage per landed attack
    Attack,
    /// Maximum health handed to the health collaborator
    MaxHealth,
    /// Movement speed in world units per second
    Speed,
    /// Resource units granted per completed harvest
    HarvestPower,
}

impl StatKind {
    /// Get all stat kinds.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Attack, Self::MaxHealth, Self::Speed, Self::HarvestPower]
    }
}

/// Derived agent statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentStats {
    /// Attack power.
    pub attack: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Movement speed.
    pub speed: f32,
    /// Harvesting power.
    pub harvest_power: f32,
}

impl Default for AgentStats {
    fn default() -> Self {
        Self {
            attack: 5.0,
            max_health: 50.0,
            speed: 2.0,
            harvest_power: 1.0,
        }
    }
}

impl AgentStats {
    /// Create new stats with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set attack power.
    #[must_use]
    pub fn with_attack(mut self, attack: f32) -> Self {
        self.attack = attack.max(0.0);
        self
    }

    /// Set max health.
    #[must_use]
    pub fn with_max_health(mut self, max_health: f32) -> Self {
        self.max_health = max_health.max(1.0);
        self
    }

    /// Set movement speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.max(0.0);
        self
    }

    /// Set harvesting power.
    #[must_use]
    pub fn with_harvest_power(mut self, power: f32) -> Self {
        self.harvest_power = power.max(0.0);
        self
    }

    /// Reads one stat.
    #[must_use]
    pub fn get(&self, kind: StatKind) -> f32 {
        match kind {
            StatKind::Attack => self.attack,
            StatKind::MaxHealth => self.max_health,
            StatKind::Speed => self.speed,
            StatKind::HarvestPower => self.harvest_power,
        }
    }

    fn slot_mut(&mut self, kind: StatKind) -> &mut f32 {
        match kind {
            StatKind::Attack => &mut self.attack,
            StatKind::MaxHealth => &mut self.max_health,
            StatKind::Speed => &mut self.speed,
            StatKind::HarvestPower => &mut self.harvest_power,
        }
    }

    /// Units granted per completed harvest (at least one).
    #[must_use]
    pub fn harvest_yield(&self) -> u32 {
        (self.harvest_power.round() as u32).max(1)
    }

    /// Applies a buff. Values are clamped so an agent never ends up with
    /// negative stats or zero max health.
    pub fn apply_buff(&mut self, buff: Buff) {
        let slot = self.slot_mut(buff.stat);
        *slot = match buff.mode {
            BuffMode::Flat(amount) => *slot + amount,
            BuffMode::Percent(pct) => *slot * (1.0 + pct),
        };
        let floor = if buff.stat == StatKind::MaxHealth { 1.0 } else { 0.0 };
        if *slot < floor {
            *slot = floor;
        }
    }
}

/// How a buff changes its stat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BuffMode {
    /// Adds a flat amount.
    Flat(f32),
    /// Scales by `1 + pct` (0.1 = +10%).
    Percent(f32),
}

/// A permanent stat change applied explicitly by gameplay code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    /// Stat affected.
    pub stat: StatKind,
    /// Change applied.
    pub mode: BuffMode,
}

impl Buff {
    /// Flat buff.
    #[must_use]
    pub const fn flat(stat: StatKind, amount: f32) -> Self {
        Self {
            stat,
            mode: BuffMode::Flat(amount),
        }
    }

    /// Percentage buff.
    #[must_use]
    pub const fn percent(stat: StatKind, pct: f32) -> Self {
        Self {
            stat,
            mode: BuffMode::Percent(pct),
        }
    }
}

// ============================================================================
// Stat budget
// ============================================================================

/// Relative weights deciding where budget points go.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatWeights {
    /// Weight for attack.
    pub attack: f32,
    /// Weight for max health.
    pub max_health: f32,
    /// Weight for speed.
    pub speed: f32,
    /// Weight for harvest power.
    pub harvest_power: f32,
}

impl Default for StatWeights {
    fn default() -> Self {
        Self {
            attack: 1.0,
            max_health: 1.0,
            speed: 1.0,
            harvest_power: 1.0,
        }
    }
}

impl StatWeights {
    /// Weight for one stat, never negative.
    #[must_use]
    pub fn get(&self, kind: StatKind) -> f32 {
        let w = match kind {
            StatKind::Attack => self.attack,
            StatKind::MaxHealth => self.max_health,
            StatKind::Speed => self.speed,
            StatKind::HarvestPower => self.harvest_power,
        };
        w.max(0.0)
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> f32 {
        StatKind::all().iter().map(|&k| self.get(k)).sum()
    }

    fn pick(&self, rng: &mut fastrand::Rng) -> Option<StatKind> {
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        let mut roll = rng.f32() * total;
        for kind in StatKind::all() {
            let w = self.get(kind);
            if roll < w {
                return Some(kind);
            }
            roll -= w;
        }
        // Float drift: fall back to the last weighted stat
        StatKind::all().into_iter().rev().find(|&k| self.get(k) > 0.0)
    }
}

/// Per-type stat table: base stats plus a budget of points spread at spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatTable {
    /// Stats every agent of the type starts with.
    pub base: AgentStats,
    /// Points spent at spawn, before the rarity multiplier.
    pub budget_points: u32,
    /// Where points tend to go.
    pub weights: StatWeights,
    /// How much one point adds to each stat.
    pub per_point: AgentStats,
}

impl Default for StatTable {
    fn default() -> Self {
        Self {
            base: AgentStats::default(),
            budget_points: 10,
            weights: StatWeights::default(),
            per_point: AgentStats {
                attack: 1.0,
                max_health: 5.0,
                speed: 0.1,
                harvest_power: 0.25,
            },
        }
    }
}

impl StatTable {
    /// Number of points an agent of `rarity` receives.
    #[must_use]
    pub fn points_for(&self, rarity: Rarity) -> u32 {
        (self.budget_points as f32 * rarity.budget_multiplier()).round() as u32
    }

    /// Derives stats for a freshly spawned agent.
    ///
    /// Points are assigned one at a time to a stat drawn by weight.
    pub fn derive(&self, rarity: Rarity, rng: &mut fastrand::Rng) -> AgentStats {
        let mut stats = self.base;
        for _ in 0..self.points_for(rarity) {
            let Some(kind) = self.weights.pick(rng) else {
                break;
            };
            *stats.slot_mut(kind) += self.per_point.get(kind);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_roll_distribution() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut commons = 0;
        let mut legendaries = 0;
        for _ in 0..10_000 {
            match Rarity::roll(&mut rng) {
                Rarity::Common => commons += 1,
                Rarity::Legendary => legendaries += 1,
                _ => {},
            }
        }
        assert!(commons > 5_000);
        assert!(legendaries < 300);
    }

    #[test]
    fn test_rarity_budget_scaling() {
        let table = StatTable::default();
        assert_eq!(table.points_for(Rarity::Common), 10);
        assert_eq!(table.points_for(Rarity::Legendary), 30);
    }

    #[test]
    fn test_derive_spends_whole_budget() {
        let table = StatTable {
            base: AgentStats::new()
                .with_attack(0.0)
                .with_speed(0.0)
                .with_harvest_power(0.0),
            budget_points: 8,
            weights: StatWeights::default(),
            per_point: AgentStats {
                attack: 1.0,
                max_health: 1.0,
                speed: 1.0,
                harvest_power: 1.0,
            },
        };
        let mut rng = fastrand::Rng::with_seed(42);
        let stats = table.derive(Rarity::Common, &mut rng);
        let spent = stats.attack + (stats.max_health - table.base.max_health) + stats.speed + stats.harvest_power;
        assert!((spent - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_derive_respects_zero_weights() {
        let table = StatTable {
            weights: StatWeights {
                attack: 1.0,
                max_health: 0.0,
                speed: 0.0,
                harvest_power: 0.0,
            },
            ..StatTable::default()
        };
        let mut rng = fastrand::Rng::with_seed(1);
        let stats = table.derive(Rarity::Rare, &mut rng);
        assert_eq!(stats.max_health, table.base.max_health);
        assert_eq!(stats.speed, table.base.speed);
        assert!((stats.attack - (table.base.attack + 15.0)).abs() < 1e-4);
    }

    #[test]
    fn test_derive_is_deterministic() {
        let table = StatTable::default();
        let a = table.derive(Rarity::Epic, &mut fastrand::Rng::with_seed(99));
        let b = table.derive(Rarity::Epic, &mut fastrand::Rng::with_seed(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_apply_buff() {
        let mut stats = AgentStats::new().with_attack(10.0);
        stats.apply_buff(Buff::flat(StatKind::Attack, 5.0));
        assert_eq!(stats.attack, 15.0);
        stats.apply_buff(Buff::percent(StatKind::Attack, 0.5));
        assert!((stats.attack - 22.5).abs() < 1e-4);
    }

    #[test]
    fn test_apply_buff_clamps() {
        let mut stats = AgentStats::new().with_speed(1.0);
        stats.apply_buff(Buff::flat(StatKind::Speed, -10.0));
        assert_eq!(stats.speed, 0.0);
        stats.apply_buff(Buff::flat(StatKind::MaxHealth, -1000.0));
        assert_eq!(stats.max_health, 1.0);
    }

    #[test]
    fn test_harvest_yield_minimum() {
        let stats = AgentStats::new().with_harvest_power(0.0);
        assert_eq!(stats.harvest_yield(), 1);
        let stats = AgentStats::new().with_harvest_power(2.6);
        assert_eq!(stats.harvest_yield(), 3);
    }
}
