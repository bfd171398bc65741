//! Static simulation configuration.
//!
//! This module provides:
//! - Grid bounds, spawn caps and spawn interval
//! - Per-agent-type stat tables, timer ranges and ranges
//! - The roster of agents and static targets placed at world load
//! - Loading from TOML with validation
//!
//! Everything here is read once at construction. Errors are fatal at that
//! point and never surface during a tick.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use grove_common::{CellBounds, CellCoord};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::agent::Task;
use crate::health::LootTableId;
use crate::resource_grid::ResourceKind;
use crate::stats::StatTable;
use crate::targets::{Tag, TagSet};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Agent type has no stat table.
    #[error("Agent type '{0}' has no stat table")]
    MissingStatTable(String),

    /// Roster references an unknown agent type.
    #[error("Unknown agent type: {0}")]
    UnknownAgentType(String),

    /// Two agent types share a name.
    #[error("Duplicate agent type: {0}")]
    DuplicateAgentType(String),

    /// A `[min, max]` range is inverted or negative.
    #[error("Invalid range for {field}: [{min}, {max}]")]
    InvalidRange {
        /// Offending field
        field: String,
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
    },

    /// A scalar value is out of its allowed domain.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

// ============================================================================
// Grid
// ============================================================================

/// Population cap for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRule {
    /// Kind spawned
    pub kind: ResourceKind,
    /// Population at which spawn probability reaches zero
    pub cap: u32,
}

/// Resource grid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cells that may hold resources
    pub bounds: CellBounds,
    /// Seconds between spawn attempts
    pub spawn_interval: f32,
    /// Chebyshev radius that must be free of resources around a new one
    pub clearance_radius: u32,
    /// Caps per kind; kinds without a rule never spawn
    pub spawn_rules: Vec<SpawnRule>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            bounds: CellBounds::from_size(64, 16),
            spawn_interval: 2.0,
            clearance_radius: 1,
            spawn_rules: vec![
                SpawnRule {
                    kind: ResourceKind::Wood,
                    cap: 12,
                },
                SpawnRule {
                    kind: ResourceKind::Stone,
                    cap: 8,
                },
            ],
        }
    }
}

impl GridConfig {
    /// Checks the grid settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.bounds.is_empty() {
            return Err(invalid("grid.bounds", "bounds contain no cells"));
        }
        if !self.spawn_interval.is_finite() || self.spawn_interval <= 0.0 {
            return Err(invalid("grid.spawn_interval", "must be a positive number of seconds"));
        }
        for (i, rule) in self.spawn_rules.iter().enumerate() {
            if self.spawn_rules[..i].iter().any(|r| r.kind == rule.kind) {
                return Err(invalid(
                    "grid.spawn_rules",
                    &format!("{:?} listed more than once", rule.kind),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Agent types
// ============================================================================

/// Inclusive `[min, max]` range of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimerRange {
    /// Shortest duration
    pub min: f32,
    /// Longest duration
    pub max: f32,
}

impl TimerRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Draws a duration uniformly from the range.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> f32 {
        self.min + (self.max - self.min) * rng.f32()
    }

    fn validate(&self, field: &str) -> ConfigResult<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min < 0.0 || self.min > self.max {
            return Err(ConfigError::InvalidRange {
                field: field.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Axes an agent may move along while chasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementAxis {
    /// Straight line toward the goal
    #[default]
    Free,
    /// Horizontal component only
    Horizontal,
}

/// Static description of one agent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTypeConfig {
    /// Type name, referenced by the roster
    pub name: String,
    /// Tags the agent is registered with
    pub tags: TagSet,
    /// Stat table; required
    pub stats: Option<StatTable>,
    /// Idle duration range
    pub idle_time: TimerRange,
    /// Wander travel duration range
    pub travel_time: TimerRange,
    /// Maximum wander distance from the anchor
    pub wander_radius: f32,
    /// How far the agent looks for resources
    pub perception_range: f32,
    /// Distance at which harvesting starts
    pub engage_distance: f32,
    /// Seconds to harvest one cell
    pub harvest_duration: f32,
    /// How far the agent looks for targets
    pub detection_range: f32,
    /// Distance at which an attack can start and land
    pub attack_range: f32,
    /// Attack windup in seconds
    pub windup: f32,
    /// Attack cooldown in seconds
    pub cooldown: f32,
    /// Movement restriction while chasing
    pub movement_axis: MovementAxis,
    /// Tags this type attacks in combat
    pub target_tags: TagSet,
    /// Loot dropped when killed
    pub loot_table: Option<LootTableId>,
}

impl Default for AgentTypeConfig {
    fn default() -> Self {
        Self {
            name: "villager".to_string(),
            tags: TagSet::single(Tag::Npc),
            stats: Some(StatTable::default()),
            idle_time: TimerRange::new(1.0, 3.0),
            travel_time: TimerRange::new(1.0, 2.5),
            wander_radius: 5.0,
            perception_range: 20.0,
            engage_distance: 1.0,
            harvest_duration: 2.0,
            detection_range: 8.0,
            attack_range: 1.5,
            windup: 0.3,
            cooldown: 1.0,
            movement_axis: MovementAxis::Free,
            target_tags: TagSet::single(Tag::Enemy),
            loot_table: None,
        }
    }
}

impl AgentTypeConfig {
    /// Creates a type with defaults and the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the stat table, or the fatal configuration error.
    pub fn stat_table(&self) -> ConfigResult<&StatTable> {
        self.stats
            .as_ref()
            .ok_or_else(|| ConfigError::MissingStatTable(self.name.clone()))
    }

    /// Checks the type's settings.
    pub fn validate(&self) -> ConfigResult<()> {
        self.stat_table()?;
        self.idle_time.validate(&format!("{}.idle_time", self.name))?;
        self.travel_time
            .validate(&format!("{}.travel_time", self.name))?;

        let non_negative = [
            ("wander_radius", self.wander_radius),
            ("perception_range", self.perception_range),
            ("engage_distance", self.engage_distance),
            ("harvest_duration", self.harvest_duration),
            ("detection_range", self.detection_range),
            ("attack_range", self.attack_range),
            ("windup", self.windup),
            ("cooldown", self.cooldown),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(
                    &format!("{}.{field}", self.name),
                    "must be a non-negative number",
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// World contents
// ============================================================================

/// Agents placed at world load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Agent type name
    pub agent_type: String,
    /// Spawn anchor for the agents
    pub anchor: Vec2,
    /// How many to spawn at this anchor
    #[serde(default = "default_count")]
    pub count: u32,
    /// Task assigned right after spawning
    #[serde(default)]
    pub task: Task,
}

const fn default_count() -> u32 {
    1
}

/// Non-agent target placed at world load (players, structures).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTarget {
    /// Tags for the registry
    pub tags: TagSet,
    /// World position
    pub position: Vec2,
    /// Health; `None` makes the target indestructible
    #[serde(default)]
    pub health: Option<f32>,
    /// Loot dropped when destroyed
    #[serde(default)]
    pub loot_table: Option<LootTableId>,
}

/// Resource placed at world load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourcePlacement {
    /// Cell to fill
    pub cell: CellCoord,
    /// Kind placed
    pub kind: ResourceKind,
}

/// Complete simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed
    pub seed: u64,
    /// Ticks per simulated second
    pub tick_rate: u32,
    /// Resource grid settings
    pub grid: GridConfig,
    /// Known agent types
    pub agent_types: Vec<AgentTypeConfig>,
    /// Agents spawned at load
    pub roster: Vec<RosterEntry>,
    /// Players and structures registered at load
    pub targets: Vec<StaticTarget>,
    /// Resources placed at load
    pub resources: Vec<ResourcePlacement>,
}

impl Default for SimConfig {
    fn default() -> Self {
        let villager = AgentTypeConfig::named("villager");
        let slime = AgentTypeConfig {
            name: "slime".to_string(),
            tags: TagSet::single(Tag::Enemy),
            movement_axis: MovementAxis::Horizontal,
            target_tags: TagSet::single(Tag::Npc).with(Tag::Player),
            wander_radius: 4.0,
            loot_table: Some(LootTableId::new(1)),
            ..AgentTypeConfig::default()
        };

        Self {
            seed: 12345,
            tick_rate: 20,
            grid: GridConfig::default(),
            agent_types: vec![villager, slime],
            roster: vec![
                RosterEntry {
                    agent_type: "villager".to_string(),
                    anchor: Vec2::new(8.0, 4.0),
                    count: 2,
                    task: Task::HarvestWood,
                },
                RosterEntry {
                    agent_type: "villager".to_string(),
                    anchor: Vec2::new(40.0, 8.0),
                    count: 1,
                    task: Task::HarvestStone,
                },
                RosterEntry {
                    agent_type: "slime".to_string(),
                    anchor: Vec2::new(24.0, 6.0),
                    count: 2,
                    task: Task::None,
                },
            ],
            targets: Vec::new(),
            resources: Vec::new(),
        }
    }
}

impl SimConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(
            "Loaded config from {} ({} agent types, {} roster entries)",
            path.display(),
            config.agent_types.len(),
            config.roster.len()
        );
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Fixed timestep implied by `tick_rate`.
    #[must_use]
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Looks up an agent type by name.
    #[must_use]
    pub fn agent_type(&self, name: &str) -> Option<&AgentTypeConfig> {
        self.agent_types.iter().find(|t| t.name == name)
    }

    /// Checks the whole configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tick_rate == 0 {
            return Err(invalid("tick_rate", "must be at least 1"));
        }
        self.grid.validate()?;

        for (i, agent_type) in self.agent_types.iter().enumerate() {
            if self.agent_types[..i].iter().any(|t| t.name == agent_type.name) {
                return Err(ConfigError::DuplicateAgentType(agent_type.name.clone()));
            }
            agent_type.validate()?;
        }

        for entry in &self.roster {
            if self.agent_type(&entry.agent_type).is_none() {
                return Err(ConfigError::UnknownAgentType(entry.agent_type.clone()));
            }
        }

        for target in &self.targets {
            if target.tags.is_empty() {
                return Err(invalid("targets.tags", "a target needs at least one tag"));
            }
        }

        debug!("configuration validated");
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
