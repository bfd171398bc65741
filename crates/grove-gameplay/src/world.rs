//! Headless simulation world.
//!
//! Owns every shared collaborator and advances them in a fixed order:
//! 1. Resource spawning
//! 2. Agent state machines, each followed by its movement
//! 3. Registry position refresh
//! 4. Attack resolution and death handling
//!
//! Events produced during a tick are collected on the world's [`EventBus`]
//! and drained by the caller.

use glam::Vec2;
use grove_common::{CellCoord, EntityId, EntityIdAllocator, GroveError};
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::agent::{Agent, AgentBuilder, AgentContext, Task};
use crate::combat::{CombatOutcome, CombatResolver};
use crate::config::{ConfigError, SimConfig};
use crate::events::{EventBus, SimEvent, SimEventKind};
use crate::health::{DamageOutcome, HealthLedger, LootTableId};
use crate::movement::{KinematicMover, MovementExecutor};
use crate::resource_grid::{PlaceError, ResourceGrid, ResourceKind};
use crate::targets::{TagSet, TargetRegistry};

/// World error types.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Entity lookup or placement failed
    #[error(transparent)]
    Entity(#[from] GroveError),

    /// Resource could not be placed
    #[error("Resource placement failed: {0}")]
    Placement(#[from] PlaceError),
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

/// The complete simulation.
pub struct World {
    config: SimConfig,
    grid: ResourceGrid,
    targets: TargetRegistry,
    combat: CombatResolver,
    health: HealthLedger,
    events: EventBus,
    rng: fastrand::Rng,
    ids: EntityIdAllocator,
    agents: Vec<Agent>,
    mover: Box<dyn MovementExecutor>,
    elapsed: f32,
    tick_count: u64,
}

impl World {
    /// Builds a world from configuration: places resources and static
    /// targets, then spawns the roster and hands out initial tasks.
    pub fn from_config(config: SimConfig) -> WorldResult<Self> {
        config.validate()?;

        let mut world = Self {
            grid: ResourceGrid::new(config.grid.clone()),
            targets: TargetRegistry::new(),
            combat: CombatResolver::new(),
            health: HealthLedger::new(),
            events: EventBus::default(),
            rng: fastrand::Rng::with_seed(config.seed),
            ids: EntityIdAllocator::new(),
            agents: Vec::new(),
            mover: Box::new(KinematicMover),
            elapsed: 0.0,
            tick_count: 0,
            config,
        };

        let resources = world.config.resources.clone();
        for placement in resources {
            world.grid.place(placement.cell, placement.kind)?;
        }

        let targets = world.config.targets.clone();
        for target in targets {
            world.add_target(target.tags, target.position, target.health, target.loot_table);
        }

        let roster = world.config.roster.clone();
        for entry in roster {
            for _ in 0..entry.count {
                let id = world.spawn_agent(&entry.agent_type, entry.anchor)?;
                world.assign_task(id, entry.task)?;
            }
        }

        info!(
            seed = world.config.seed,
            agents = world.agents.len(),
            targets = world.targets.len(),
            resources = world.grid.len(),
            "World created"
        );
        Ok(world)
    }

    /// Replaces the movement executor.
    #[must_use]
    pub fn with_mover(mut self, mover: impl MovementExecutor + 'static) -> Self {
        self.mover = Box::new(mover);
        self
    }

    // ========================================================================
    // Population
    // ========================================================================

    /// Builds an agent of the named type at `anchor` and registers it.
    pub fn spawn_agent(&mut self, agent_type: &str, anchor: Vec2) -> WorldResult<EntityId> {
        let cell = CellCoord::from_world(anchor);
        if !self.grid.bounds().contains(cell) {
            return Err(GroveError::OutOfBounds(cell).into());
        }
        let config = self
            .config
            .agent_type(agent_type)
            .ok_or_else(|| ConfigError::UnknownAgentType(agent_type.to_string()))?;

        let id = self.ids.allocate();
        let agent = AgentBuilder::new(config)
            .with_anchor(anchor)
            .build(id, &mut self.rng)?;

        self.targets.add(id, agent.position(), config.tags);
        self.health
            .insert(id, agent.stats().max_health, config.loot_table);
        info!(%id, name = agent.name(), x = anchor.x, y = anchor.y, "Agent spawned");

        self.agents.push(agent);
        Ok(id)
    }

    /// Registers a non-agent target such as a player or a structure.
    ///
    /// Targets without health can be attacked but never die.
    pub fn add_target(
        &mut self,
        tags: TagSet,
        position: Vec2,
        health: Option<f32>,
        loot: Option<LootTableId>,
    ) -> EntityId {
        let id = self.ids.allocate();
        self.targets.add(id, position, tags);
        if let Some(max) = health {
            self.health.insert(id, max, loot);
        }
        debug!(%id, ?tags, "target added");
        id
    }

    /// Moves a non-agent target (a player walking around).
    pub fn move_target(&mut self, id: EntityId, position: Vec2) -> WorldResult<()> {
        if !self.targets.contains(id) || self.agent_index(id).is_some() {
            return Err(GroveError::UnknownEntity(id).into());
        }
        self.targets.update_position(id, position);
        Ok(())
    }

    /// Places a resource directly.
    pub fn place_resource(&mut self, cell: CellCoord, kind: ResourceKind) -> WorldResult<()> {
        self.grid.place(cell, kind)?;
        Ok(())
    }

    // ========================================================================
    // External requests
    // ========================================================================

    /// Assigns a task to an agent.
    pub fn assign_task(&mut self, id: EntityId, task: Task) -> WorldResult<()> {
        let index = self.require_agent(id)?;
        let mut ctx = AgentContext {
            grid: &mut self.grid,
            targets: &self.targets,
            combat: &mut self.combat,
            events: &self.events,
            rng: &mut self.rng,
        };
        self.agents[index].assign_task(task, &mut ctx);
        Ok(())
    }

    /// Freezes an agent (e.g. while a player talks to it), including any
    /// attack it has in windup or cooldown.
    pub fn interrupt(&mut self, id: EntityId) -> WorldResult<()> {
        let index = self.require_agent(id)?;
        self.agents[index].interrupt();
        self.combat.freeze(id);
        Ok(())
    }

    /// Ends an interruption.
    pub fn release(&mut self, id: EntityId) -> WorldResult<()> {
        let index = self.require_agent(id)?;
        self.agents[index].release(&mut self.rng);
        self.combat.thaw(id);
        Ok(())
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advances the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        let spawned = self.grid.tick(dt, &mut self.rng);
        if !spawned.is_empty() {
            trace!(count = spawned.len(), "resources spawned");
        }

        let mut ctx = AgentContext {
            grid: &mut self.grid,
            targets: &self.targets,
            combat: &mut self.combat,
            events: &self.events,
            rng: &mut self.rng,
        };
        for agent in &mut self.agents {
            let motion = agent.tick(dt, &mut ctx);
            let position = self
                .mover
                .apply(agent.id(), agent.position(), motion, dt);
            agent.set_position(position);
        }

        for agent in &self.agents {
            self.targets.update_position(agent.id(), agent.position());
        }

        let outcomes = self.combat.tick(dt, &self.targets, &mut self.health);
        for outcome in outcomes {
            self.handle_outcome(outcome);
        }

        self.elapsed += dt;
        self.tick_count += 1;
    }

    fn handle_outcome(&mut self, outcome: CombatOutcome) {
        match outcome {
            CombatOutcome::Missed { attacker, target } => {
                self.events
                    .emit(attacker, SimEventKind::AttackMissed { target });
            },
            CombatOutcome::Hit {
                attacker,
                target,
                damage,
                outcome,
            } => match outcome {
                DamageOutcome::Survived { .. } => {
                    self.events.emit(
                        target,
                        SimEventKind::Damaged {
                            source: attacker,
                            amount: damage,
                        },
                    );
                },
                DamageOutcome::Killed { loot } => {
                    self.events.emit(
                        target,
                        SimEventKind::Damaged {
                            source: attacker,
                            amount: damage,
                        },
                    );
                    self.events.emit(target, SimEventKind::Died);
                    self.events
                        .emit(attacker, SimEventKind::TargetDefeated { target, loot });
                    self.remove_entity(target);
                },
                DamageOutcome::Ignored => {
                    trace!(%attacker, %target, "hit on entity without health");
                },
            },
        }
    }

    fn remove_entity(&mut self, id: EntityId) {
        self.targets.remove(id);
        self.health.remove(id);
        self.combat.forget(id);
        if let Some(index) = self.agent_index(id) {
            let agent = self.agents.remove(index);
            info!(%id, name = agent.name(), "Agent died");
        } else {
            info!(%id, "Target destroyed");
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    fn agent_index(&self, id: EntityId) -> Option<usize> {
        self.agents.binary_search_by_key(&id, Agent::id).ok()
    }

    fn require_agent(&self, id: EntityId) -> WorldResult<usize> {
        self.agent_index(id)
            .ok_or_else(|| GroveError::UnknownEntity(id).into())
    }

    /// Live agents in spawn order.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Looks up a live agent.
    #[must_use]
    pub fn agent(&self, id: EntityId) -> Option<&Agent> {
        self.agent_index(id).map(|i| &self.agents[i])
    }

    /// Mutable access to a live agent (buffs, teleports).
    pub fn agent_mut(&mut self, id: EntityId) -> Option<&mut Agent> {
        self.agent_index(id).map(move |i| &mut self.agents[i])
    }

    /// The resource grid.
    #[must_use]
    pub fn grid(&self) -> &ResourceGrid {
        &self.grid
    }

    /// The target registry.
    #[must_use]
    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    /// The attack resolver.
    #[must_use]
    pub fn combat(&self) -> &CombatResolver {
        &self.combat
    }

    /// The health ledger.
    #[must_use]
    pub fn health(&self) -> &HealthLedger {
        &self.health
    }

    /// The event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Takes every event published since the last drain.
    #[must_use]
    pub fn drain_events(&self) -> Vec<SimEvent> {
        self.events.drain()
    }

    /// Configuration the world was built from.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Simulated seconds so far.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
