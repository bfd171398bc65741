//! Per-agent behavior state machine.
//!
//! Each agent is advanced once per tick and produces a [`Motion`]:
//! - **Idle**: stands still until its idle timer runs out
//! - **Traveling**: wanders horizontally around its anchor, or walks back to
//!   it after a task ends far away
//! - **Executing**: runs the assigned harvest or combat task
//! - **Interrupted**: frozen by an outside request until released
//!
//! Shared state (grid, registry, resolver, events, RNG) is borrowed through an
//! [`AgentContext`] for the duration of a call. Claims on cells and targets
//! are advisory and re-validated before anything changes.

use glam::Vec2;
use grove_common::{direction_to, CellCoord, EntityId};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::combat::{AttackProfile, CombatResolver};
use crate::config::{AgentTypeConfig, ConfigResult, MovementAxis, TimerRange};
use crate::events::{EventBus, SimEventKind};
use crate::movement::{Facing, Motion};
use crate::resource_grid::{ResourceGrid, ResourceKind};
use crate::stats::{AgentStats, Buff, Rarity};
use crate::targets::{TagSet, TargetRegistry};

/// Top-level behavior state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// Standing still, waiting for the idle timer
    #[default]
    Idle,
    /// Wandering or returning to the anchor
    Traveling,
    /// Working on the assigned task
    Executing,
    /// Frozen by an external request
    Interrupted,
}

/// Work an agent can be assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Task {
    /// No task
    #[default]
    None,
    /// Harvest wood cells
    HarvestWood,
    /// Harvest stone cells
    HarvestStone,
    /// Attack entities carrying the agent's target tags
    Combat,
}

impl Task {
    /// Resource kind harvested by this task, if it is a harvest task.
    #[must_use]
    pub const fn resource_kind(self) -> Option<ResourceKind> {
        match self {
            Self::HarvestWood => Some(ResourceKind::Wood),
            Self::HarvestStone => Some(ResourceKind::Stone),
            Self::None | Self::Combat => None,
        }
    }
}

/// What an agent currently has its eye on. Never owned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Claim {
    /// Nothing claimed
    #[default]
    None,
    /// A grid cell expected to hold a resource
    Cell(CellCoord),
    /// A registered entity
    Target(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TravelMode {
    Wander { direction: f32 },
    ReturnToAnchor,
}

/// Per-type tuning copied out of [`AgentTypeConfig`] at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentBehavior {
    /// Idle duration range
    pub idle_time: TimerRange,
    /// Wander duration range
    pub travel_time: TimerRange,
    /// Maximum wander distance from the anchor
    pub wander_radius: f32,
    /// Resource search radius
    pub perception_range: f32,
    /// Distance at which harvesting starts
    pub engage_distance: f32,
    /// Seconds to harvest one cell
    pub harvest_duration: f32,
    /// Target search radius
    pub detection_range: f32,
    /// Distance at which attacks start and land
    pub attack_range: f32,
    /// Attack windup in seconds
    pub windup: f32,
    /// Attack cooldown in seconds
    pub cooldown: f32,
    /// Movement restriction while chasing
    pub movement_axis: MovementAxis,
    /// Tags attacked in combat
    pub target_tags: TagSet,
}

impl From<&AgentTypeConfig> for AgentBehavior {
    fn from(config: &AgentTypeConfig) -> Self {
        Self {
            idle_time: config.idle_time,
            travel_time: config.travel_time,
            wander_radius: config.wander_radius,
            perception_range: config.perception_range,
            engage_distance: config.engage_distance,
            harvest_duration: config.harvest_duration,
            detection_range: config.detection_range,
            attack_range: config.attack_range,
            windup: config.windup,
            cooldown: config.cooldown,
            movement_axis: config.movement_axis,
            target_tags: config.target_tags,
        }
    }
}

impl AgentBehavior {
    /// Attack profile for an agent with the given attack power.
    #[must_use]
    pub fn attack_profile(&self, attack: f32) -> AttackProfile {
        AttackProfile::default()
            .with_damage(attack)
            .with_range(self.attack_range)
            .with_timing(self.windup, self.cooldown)
    }
}

/// Shared simulation state borrowed by agents during a tick.
pub struct AgentContext<'a> {
    /// Harvestable cells
    pub grid: &'a mut ResourceGrid,
    /// Targetable entities
    pub targets: &'a TargetRegistry,
    /// Attack windups and cooldowns
    pub combat: &'a mut CombatResolver,
    /// Outgoing events
    pub events: &'a EventBus,
    /// Shared seeded RNG
    pub rng: &'a mut fastrand::Rng,
}

// ============================================================================
// Agent
// ============================================================================

/// One autonomous NPC or enemy.
#[derive(Debug, Clone)]
pub struct Agent {
    id: EntityId,
    name: String,
    type_name: String,
    rarity: Rarity,
    stats: AgentStats,
    behavior: AgentBehavior,
    position: Vec2,
    facing: Facing,
    anchor: Vec2,
    state: AgentState,
    resume_state: AgentState,
    task: Task,
    travel: TravelMode,
    idle_timer: f32,
    travel_timer: f32,
    harvest_remaining: Option<f32>,
    claim: Claim,
    moving: bool,
}

impl Agent {
    /// Stable id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Display name, e.g. `Rare villager #3`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the agent type this agent was built from.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Rarity rolled at spawn.
    #[must_use]
    pub const fn rarity(&self) -> Rarity {
        self.rarity
    }

    /// Current stats.
    #[must_use]
    pub const fn stats(&self) -> &AgentStats {
        &self.stats
    }

    /// Per-type tuning.
    #[must_use]
    pub const fn behavior(&self) -> &AgentBehavior {
        &self.behavior
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Records the position reported back by the movement executor.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Horizontal facing.
    #[must_use]
    pub const fn facing(&self) -> Facing {
        self.facing
    }

    /// Spawn anchor.
    #[must_use]
    pub const fn anchor(&self) -> Vec2 {
        self.anchor
    }

    /// Behavior state.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// Assigned task.
    #[must_use]
    pub const fn task(&self) -> Task {
        self.task
    }

    /// Current advisory claim.
    #[must_use]
    pub const fn claim(&self) -> Claim {
        self.claim
    }

    /// Seconds left on the running harvest, if one is in progress.
    #[must_use]
    pub const fn harvest_remaining(&self) -> Option<f32> {
        self.harvest_remaining
    }

    /// True if the last produced motion had a non-zero velocity.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.moving
    }

    /// Applies a buff to the agent's stats.
    pub fn apply_buff(&mut self, buff: Buff) {
        self.stats.apply_buff(buff);
        debug!(agent = %self.id, ?buff, "buff applied");
    }

    // ------------------------------------------------------------------------
    // External requests
    // ------------------------------------------------------------------------

    /// Assigns a task, replacing the current one.
    ///
    /// Any in-flight harvest is canceled, a pending attack windup is dropped
    /// and claims are released. Assigning the task already held is a no-op.
    /// While interrupted the task is stored and takes effect on release.
    pub fn assign_task(&mut self, task: Task, ctx: &mut AgentContext<'_>) {
        if task == self.task {
            return;
        }

        self.reset_task_progress(ctx);
        debug!(agent = %self.id, from = ?self.task, to = ?task, "task assigned");
        self.task = task;

        match (self.state, task) {
            (AgentState::Interrupted, _) => {},
            (_, Task::None) => self.settle_after_task(ctx.rng),
            _ => self.state = AgentState::Executing,
        }
    }

    /// Freezes the agent. Timers stop and velocity is zero until released.
    pub fn interrupt(&mut self) {
        if self.state == AgentState::Interrupted {
            return;
        }
        debug!(agent = %self.id, from = ?self.state, "agent interrupted");
        self.resume_state = self.state;
        self.state = AgentState::Interrupted;
    }

    /// Ends an interruption.
    ///
    /// Resumes the assigned task if there is one; otherwise returns to
    /// whatever the agent was doing before.
    pub fn release(&mut self, rng: &mut fastrand::Rng) {
        if self.state != AgentState::Interrupted {
            return;
        }
        if self.task != Task::None {
            self.state = AgentState::Executing;
        } else if self.resume_state == AgentState::Executing {
            self.settle_after_task(rng);
        } else {
            self.state = self.resume_state;
        }
        debug!(agent = %self.id, to = ?self.state, "agent released");
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Advances the agent by `dt` seconds and returns its desired motion.
    pub fn tick(&mut self, dt: f32, ctx: &mut AgentContext<'_>) -> Motion {
        let velocity = match self.state {
            AgentState::Interrupted => Vec2::ZERO,
            AgentState::Idle => self.tick_idle(dt, ctx.rng),
            AgentState::Traveling => self.tick_travel(dt, ctx.rng),
            AgentState::Executing => self.tick_task(dt, ctx),
        };
        self.finish_motion(velocity, ctx.events)
    }

    fn finish_motion(&mut self, velocity: Vec2, events: &EventBus) -> Motion {
        self.facing = Facing::from_velocity(self.facing, velocity);
        let moving = velocity != Vec2::ZERO;
        if moving != self.moving {
            let kind = if moving {
                SimEventKind::StartedMoving
            } else {
                SimEventKind::StoppedMoving
            };
            events.emit(self.id, kind);
            self.moving = moving;
        }
        Motion {
            velocity,
            facing: self.facing,
        }
    }

    fn tick_idle(&mut self, dt: f32, rng: &mut fastrand::Rng) -> Vec2 {
        self.idle_timer -= dt;
        if self.idle_timer <= 0.0 {
            let direction = if rng.bool() { 1.0 } else { -1.0 };
            self.travel = TravelMode::Wander { direction };
            self.travel_timer = self.behavior.travel_time.sample(rng);
            self.state = AgentState::Traveling;
            trace!(agent = %self.id, direction, "idle elapsed, wandering");
        }
        Vec2::ZERO
    }

    fn tick_travel(&mut self, dt: f32, rng: &mut fastrand::Rng) -> Vec2 {
        let speed = self.stats.speed;
        match self.travel {
            TravelMode::Wander { direction } => {
                self.travel_timer -= dt;
                if self.travel_timer <= 0.0 {
                    self.enter_idle(rng);
                    return Vec2::ZERO;
                }

                let offset = self.position.x - self.anchor.x;
                let mut direction = direction;
                if offset.abs() > self.behavior.wander_radius && offset * direction > 0.0 {
                    direction = -direction;
                    self.travel = TravelMode::Wander { direction };
                    trace!(agent = %self.id, offset, "wander radius reached, reversing");
                }
                Vec2::new(direction * speed, 0.0)
            },
            TravelMode::ReturnToAnchor => {
                if self.position.distance(self.anchor) <= self.behavior.wander_radius {
                    debug!(agent = %self.id, "back near anchor");
                    self.enter_idle(rng);
                    return Vec2::ZERO;
                }
                self.steer_toward(self.anchor, MovementAxis::Free, dt)
            },
        }
    }

    fn tick_task(&mut self, dt: f32, ctx: &mut AgentContext<'_>) -> Vec2 {
        match self.task {
            Task::HarvestWood => self.tick_harvest(ResourceKind::Wood, dt, ctx),
            Task::HarvestStone => self.tick_harvest(ResourceKind::Stone, dt, ctx),
            Task::Combat => self.tick_combat(dt, ctx),
            Task::None => {
                self.settle_after_task(ctx.rng);
                Vec2::ZERO
            },
        }
    }

    fn tick_harvest(&mut self, kind: ResourceKind, dt: f32, ctx: &mut AgentContext<'_>) -> Vec2 {
        if let (Some(remaining), Claim::Cell(cell)) = (self.harvest_remaining, self.claim) {
            let remaining = remaining - dt;
            if remaining > 0.0 {
                self.harvest_remaining = Some(remaining);
            } else {
                self.complete_harvest(cell, kind, ctx);
            }
            return Vec2::ZERO;
        }

        // A claimed cell that no longer holds the kind is dropped and the
        // search starts over.
        let claimed = match self.claim {
            Claim::Cell(cell) if ctx.grid.kind_at(cell) == Some(kind) => Some(cell),
            _ => None,
        };
        let Some(cell) = claimed.or_else(|| {
            ctx.grid
                .nearest_cell_within(kind, self.position, self.behavior.perception_range)
        }) else {
            self.claim = Claim::None;
            return Vec2::ZERO;
        };
        if self.claim != Claim::Cell(cell) {
            trace!(agent = %self.id, x = cell.x, y = cell.y, ?kind, "cell claimed");
            self.claim = Claim::Cell(cell);
        }

        let target = cell.center();
        if self.position.distance(target) > self.behavior.engage_distance {
            return self.steer_toward(target, MovementAxis::Free, dt);
        }

        self.harvest_remaining = Some(self.behavior.harvest_duration);
        ctx.events.emit(self.id, SimEventKind::StartedHarvest { kind });
        debug!(agent = %self.id, x = cell.x, y = cell.y, ?kind, "harvest started");
        Vec2::ZERO
    }

    fn complete_harvest(&mut self, cell: CellCoord, kind: ResourceKind, ctx: &mut AgentContext<'_>) {
        self.harvest_remaining = None;
        self.claim = Claim::None;

        if ctx.grid.remove_if_kind(cell, kind) {
            let amount = self.stats.harvest_yield();
            ctx.events
                .emit(self.id, SimEventKind::ResourceHarvested { kind, amount });
            debug!(agent = %self.id, x = cell.x, y = cell.y, ?kind, amount, "resource harvested");
        } else {
            debug!(agent = %self.id, x = cell.x, y = cell.y, "claimed cell was already taken");
        }
    }

    fn tick_combat(&mut self, dt: f32, ctx: &mut AgentContext<'_>) -> Vec2 {
        if let Claim::Target(claimed) = self.claim {
            if !ctx.targets.contains(claimed) {
                trace!(agent = %self.id, target = %claimed, "claimed target is gone");
                self.claim = Claim::None;
            }
        }
        if ctx.combat.is_cooldown_active(self.id) {
            return Vec2::ZERO;
        }

        let found = ctx
            .targets
            .nearest_with_tag(
                self.behavior.target_tags,
                self.position,
                self.behavior.detection_range,
                self.id,
            )
            .and_then(|target| ctx.targets.position(target).map(|pos| (target, pos)));
        let Some((target, target_pos)) = found else {
            self.claim = Claim::None;
            return Vec2::ZERO;
        };
        if self.claim != Claim::Target(target) {
            trace!(agent = %self.id, %target, "target acquired");
            self.claim = Claim::Target(target);
        }

        if self.position.distance(target_pos) > self.behavior.attack_range {
            return self.steer_toward(target_pos, self.behavior.movement_axis, dt);
        }

        let profile = self.behavior.attack_profile(self.stats.attack);
        match ctx.combat.attack(self.id, target, profile) {
            Ok(()) => ctx
                .events
                .emit(self.id, SimEventKind::StartedAttack { target }),
            Err(err) => trace!(agent = %self.id, %err, "attack attempt ignored"),
        }
        Vec2::ZERO
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Velocity toward `goal` at the agent's speed, shortened so a single
    /// step never overshoots.
    fn steer_toward(&self, goal: Vec2, axis: MovementAxis, dt: f32) -> Vec2 {
        let goal = match axis {
            MovementAxis::Free => goal,
            MovementAxis::Horizontal => Vec2::new(goal.x, self.position.y),
        };
        let distance = self.position.distance(goal);
        let mut speed = self.stats.speed;
        if dt > 0.0 {
            speed = speed.min(distance / dt);
        }
        direction_to(self.position, goal) * speed
    }

    fn reset_task_progress(&mut self, ctx: &mut AgentContext<'_>) {
        if self.harvest_remaining.take().is_some() {
            ctx.events.emit(self.id, SimEventKind::CanceledHarvest);
            debug!(agent = %self.id, "harvest canceled");
        }
        if self.task == Task::Combat {
            ctx.combat.cancel(self.id);
        }
        self.claim = Claim::None;
    }

    fn settle_after_task(&mut self, rng: &mut fastrand::Rng) {
        if self.position.distance(self.anchor) > self.behavior.wander_radius {
            self.travel = TravelMode::ReturnToAnchor;
            self.state = AgentState::Traveling;
            debug!(agent = %self.id, "returning to anchor");
        } else {
            self.enter_idle(rng);
        }
    }

    fn enter_idle(&mut self, rng: &mut fastrand::Rng) {
        self.state = AgentState::Idle;
        self.idle_timer = self.behavior.idle_time.sample(rng);
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds agents from their type configuration.
#[derive(Debug, Clone)]
pub struct AgentBuilder<'a> {
    agent_type: &'a AgentTypeConfig,
    anchor: Vec2,
    position: Option<Vec2>,
    rarity: Option<Rarity>,
}

impl<'a> AgentBuilder<'a> {
    /// Starts a builder for the given type.
    #[must_use]
    pub const fn new(agent_type: &'a AgentTypeConfig) -> Self {
        Self {
            agent_type,
            anchor: Vec2::ZERO,
            position: None,
            rarity: None,
        }
    }

    /// Sets the spawn anchor. The agent starts here unless a position is set.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Vec2) -> Self {
        self.anchor = anchor;
        self
    }

    /// Sets a starting position different from the anchor.
    #[must_use]
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    /// Forces a rarity instead of rolling one.
    #[must_use]
    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = Some(rarity);
        self
    }

    /// Rolls rarity, derives stats and builds an idle agent.
    ///
    /// Fails without building anything if the type has no stat table.
    pub fn build(self, id: EntityId, rng: &mut fastrand::Rng) -> ConfigResult<Agent> {
        let table = self.agent_type.stat_table()?;
        let rarity = self.rarity.unwrap_or_else(|| Rarity::roll(rng));
        let stats = table.derive(rarity, rng);
        let behavior = AgentBehavior::from(self.agent_type);
        let name = format!("{} {} {id}", rarity.display_name(), self.agent_type.name);

        debug!(%id, %name, ?stats, "agent built");
        Ok(Agent {
            id,
            name,
            type_name: self.agent_type.name.clone(),
            rarity,
            stats,
            behavior,
            position: self.position.unwrap_or(self.anchor),
            facing: Facing::default(),
            anchor: self.anchor,
            state: AgentState::Idle,
            resume_state: AgentState::Idle,
            task: Task::None,
            travel: TravelMode::Wander { direction: 1.0 },
            idle_timer: behavior.idle_time.sample(rng),
            travel_timer: 0.0,
            harvest_remaining: None,
            claim: Claim::None,
            moving: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::events::SimEvent;
    use crate::targets::Tag;

    struct Harness {
        grid: ResourceGrid,
        targets: TargetRegistry,
        combat: CombatResolver,
        events: EventBus,
        rng: fastrand::Rng,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                grid: ResourceGrid::new(GridConfig {
                    spawn_rules: Vec::new(),
                    ..GridConfig::default()
                }),
                targets: TargetRegistry::new(),
                combat: CombatResolver::new(),
                events: EventBus::default(),
                rng: fastrand::Rng::with_seed(11),
            }
        }

        fn ctx(&mut self) -> AgentContext<'_> {
            AgentContext {
                grid: &mut self.grid,
                targets: &self.targets,
                combat: &mut self.combat,
                events: &self.events,
                rng: &mut self.rng,
            }
        }

        fn kinds(&self) -> Vec<SimEventKind> {
            self.events.drain().into_iter().map(|e: SimEvent| e.kind).collect()
        }
    }

    fn agent_type() -> AgentTypeConfig {
        AgentTypeConfig {
            idle_time: TimerRange::new(1.0, 1.0),
            travel_time: TimerRange::new(2.0, 2.0),
            ..AgentTypeConfig::named("tester")
        }
    }

    fn build(h: &mut Harness, anchor: Vec2) -> Agent {
        AgentBuilder::new(&agent_type())
            .with_anchor(anchor)
            .with_rarity(Rarity::Common)
            .build(EntityId::from_raw(1), &mut h.rng)
            .expect("agent should build")
    }

    #[test]
    fn test_builder_rejects_missing_stats() {
        let mut rng = fastrand::Rng::with_seed(1);
        let config = AgentTypeConfig {
            stats: None,
            ..AgentTypeConfig::named("broken")
        };
        assert!(AgentBuilder::new(&config)
            .build(EntityId::from_raw(1), &mut rng)
            .is_err());
    }

    #[test]
    fn test_builder_names_agent() {
        let mut h = Harness::new();
        let agent = build(&mut h, Vec2::ZERO);
        assert_eq!(agent.name(), "Common tester #1");
        assert_eq!(agent.state(), AgentState::Idle);
        assert_eq!(agent.task(), Task::None);
    }

    #[test]
    fn test_idle_then_travel_then_idle() {
        let mut h = Harness::new();
        let mut agent = build(&mut h, Vec2::ZERO);

        let motion = agent.tick(0.5, &mut h.ctx());
        assert!(motion.is_still());
        assert_eq!(agent.state(), AgentState::Idle);

        agent.tick(0.5, &mut h.ctx());
        assert_eq!(agent.state(), AgentState::Traveling);

        let motion = agent.tick(0.1, &mut h.ctx());
        assert_eq!(motion.velocity.y, 0.0);
        assert!(motion.velocity.x.abs() > 0.0);
        assert!(h.kinds().contains(&SimEventKind::StartedMoving));

        agent.tick(2.0, &mut h.ctx());
        assert_eq!(agent.state(), AgentState::Idle);
        assert!(h.kinds().contains(&SimEventKind::StoppedMoving));
    }

    #[test]
    fn test_assign_and_clear_task() {
        let mut h = Harness::new();
        let mut agent = build(&mut h, Vec2::ZERO);

        agent.assign_task(Task::HarvestWood, &mut h.ctx());
        assert_eq!(agent.state(), AgentState::Executing);

        agent.assign_task(Task::None, &mut h.ctx());
        assert_eq!(agent.state(), AgentState::Idle);
        assert_eq!(agent.claim(), Claim::None);
    }

    #[test]
    fn test_clearing_task_far_from_anchor_returns_home() {
        let mut h = Harness::new();
        let mut agent = build(&mut h, Vec2::ZERO);
        agent.set_position(Vec2::new(20.0, 0.0));
        agent.assign_task(Task::Combat, &mut h.ctx());
        agent.assign_task(Task::None, &mut h.ctx());
        assert_eq!(agent.state(), AgentState::Traveling);

        let motion = agent.tick(0.1, &mut h.ctx());
        assert!(motion.velocity.x < 0.0);
        assert_eq!(agent.facing(), Facing::Left);

        agent.set_position(Vec2::new(1.0, 0.0));
        agent.tick(0.1, &mut h.ctx());
        assert_eq!(agent.state(), AgentState::Idle);
    }

    #[test]
    fn test_harvest_cycle() {
        let mut h = Harness::new();
        let cell = CellCoord::new(3, 0);
        h.grid.place(cell, ResourceKind::Wood).expect("place wood");
        let mut agent = build(&mut h, Vec2::new(0.5, 0.5));
        agent.assign_task(Task::HarvestWood, &mut h.ctx());

        let motion = agent.tick(0.1, &mut h.ctx());
        assert!(motion.velocity.x > 0.0);
        assert_eq!(agent.claim(), Claim::Cell(cell));

        agent.set_position(cell.center());
        agent.tick(0.1, &mut h.ctx());
        assert!(agent.harvest_remaining().is_some());

        agent.tick(1.0, &mut h.ctx());
        assert_eq!(h.grid.kind_at(cell), Some(ResourceKind::Wood));
        agent.tick(1.0, &mut h.ctx());
        assert_eq!(h.grid.kind_at(cell), None);
        assert_eq!(agent.harvest_remaining(), None);
        assert_eq!(agent.state(), AgentState::Executing);

        let kinds = h.kinds();
        assert!(kinds.contains(&SimEventKind::StartedHarvest {
            kind: ResourceKind::Wood
        }));
        assert!(kinds
            .iter()
            .any(|k| matches!(k, SimEventKind::ResourceHarvested { kind: ResourceKind::Wood, .. })));
    }

    #[test]
    fn test_reassign_cancels_harvest() {
        let mut h = Harness::new();
        let cell = CellCoord::new(0, 0);
        h.grid.place(cell, ResourceKind::Stone).expect("place stone");
        let mut agent = build(&mut h, cell.center());
        agent.assign_task(Task::HarvestStone, &mut h.ctx());
        agent.tick(0.1, &mut h.ctx());
        assert!(agent.harvest_remaining().is_some());

        agent.assign_task(Task::HarvestWood, &mut h.ctx());
        assert_eq!(agent.harvest_remaining(), None);
        assert_eq!(agent.claim(), Claim::None);
        assert_eq!(h.grid.kind_at(cell), Some(ResourceKind::Stone));
        assert!(h.kinds().contains(&SimEventKind::CanceledHarvest));
    }

    #[test]
    fn test_interrupt_freezes_timers() {
        let mut h = Harness::new();
        let cell = CellCoord::new(0, 0);
        h.grid.place(cell, ResourceKind::Wood).expect("place wood");
        let mut agent = build(&mut h, cell.center());
        agent.assign_task(Task::HarvestWood, &mut h.ctx());
        agent.tick(0.1, &mut h.ctx());
        let before = agent.harvest_remaining();

        agent.interrupt();
        for _ in 0..50 {
            let motion = agent.tick(0.5, &mut h.ctx());
            assert!(motion.is_still());
        }
        assert_eq!(agent.harvest_remaining(), before);
        assert_eq!(h.grid.kind_at(cell), Some(ResourceKind::Wood));

        agent.release(&mut h.rng);
        assert_eq!(agent.state(), AgentState::Executing);
    }

    #[test]
    fn test_task_assigned_while_interrupted_applies_on_release() {
        let mut h = Harness::new();
        let mut agent = build(&mut h, Vec2::ZERO);
        agent.interrupt();
        agent.assign_task(Task::Combat, &mut h.ctx());
        assert_eq!(agent.state(), AgentState::Interrupted);
        agent.release(&mut h.rng);
        assert_eq!(agent.state(), AgentState::Executing);
        assert_eq!(agent.task(), Task::Combat);
    }

    #[test]
    fn test_combat_chases_then_attacks() {
        let mut h = Harness::new();
        let enemy = EntityId::from_raw(9);
        h.targets
            .add(enemy, Vec2::new(5.0, 0.0), TagSet::single(Tag::Enemy));
        let mut agent = build(&mut h, Vec2::ZERO);
        h.targets
            .add(agent.id(), agent.position(), TagSet::single(Tag::Npc));
        agent.assign_task(Task::Combat, &mut h.ctx());

        let motion = agent.tick(0.1, &mut h.ctx());
        assert!(motion.velocity.x > 0.0);
        assert_eq!(agent.claim(), Claim::Target(enemy));

        agent.set_position(Vec2::new(4.0, 0.0));
        let motion = agent.tick(0.1, &mut h.ctx());
        assert!(motion.is_still());
        assert!(h.combat.is_cooldown_active(agent.id()));
        assert!(h
            .kinds()
            .contains(&SimEventKind::StartedAttack { target: enemy }));

        // Busy: no second attack event.
        agent.tick(0.1, &mut h.ctx());
        assert!(!h
            .kinds()
            .contains(&SimEventKind::StartedAttack { target: enemy }));
    }

    #[test]
    fn test_target_vanishing_mid_approach_stops_and_reacquires() {
        let mut h = Harness::new();
        let first = EntityId::from_raw(9);
        h.targets
            .add(first, Vec2::new(5.0, 0.0), TagSet::single(Tag::Enemy));
        let mut agent = build(&mut h, Vec2::ZERO);
        agent.assign_task(Task::Combat, &mut h.ctx());

        let motion = agent.tick(0.1, &mut h.ctx());
        assert!(motion.velocity.x > 0.0);
        assert_eq!(agent.claim(), Claim::Target(first));

        h.targets.remove(first);
        let motion = agent.tick(0.1, &mut h.ctx());
        assert!(motion.is_still());
        assert_eq!(agent.state(), AgentState::Executing);
        assert_eq!(agent.claim(), Claim::None);

        let second = EntityId::from_raw(10);
        h.targets
            .add(second, Vec2::new(-4.0, 0.0), TagSet::single(Tag::Enemy));
        let motion = agent.tick(0.1, &mut h.ctx());
        assert!(motion.velocity.x < 0.0);
        assert_eq!(agent.claim(), Claim::Target(second));
    }

    #[test]
    fn test_claim_dropped_when_target_dies_during_cooldown() {
        let mut h = Harness::new();
        let enemy = EntityId::from_raw(9);
        h.targets.add(enemy, Vec2::new(1.0, 0.0), TagSet::single(Tag::Enemy));
        let mut agent = build(&mut h, Vec2::ZERO);
        agent.assign_task(Task::Combat, &mut h.ctx());
        agent.tick(0.05, &mut h.ctx());
        assert!(h.combat.is_cooldown_active(agent.id()));
        assert_eq!(agent.claim(), Claim::Target(enemy));

        h.targets.remove(enemy);
        let motion = agent.tick(0.05, &mut h.ctx());
        assert!(motion.is_still());
        assert!(h.combat.is_cooldown_active(agent.id()));
        assert_eq!(agent.claim(), Claim::None);
    }

    #[test]
    fn test_switching_away_from_combat_cancels_windup() {
        let mut h = Harness::new();
        let enemy = EntityId::from_raw(9);
        h.targets.add(enemy, Vec2::new(1.0, 0.0), TagSet::single(Tag::Enemy));
        let mut agent = build(&mut h, Vec2::ZERO);
        agent.assign_task(Task::Combat, &mut h.ctx());
        agent.tick(0.05, &mut h.ctx());
        assert_eq!(
            h.combat.phase(agent.id()),
            Some(crate::combat::AttackPhase::Windup)
        );

        agent.assign_task(Task::HarvestWood, &mut h.ctx());
        assert_eq!(
            h.combat.phase(agent.id()),
            Some(crate::combat::AttackPhase::Cooldown)
        );
    }

    #[test]
    fn test_horizontal_lock_ignores_vertical_offset() {
        let mut h = Harness::new();
        let enemy = EntityId::from_raw(9);
        h.targets
            .add(enemy, Vec2::new(6.0, 3.0), TagSet::single(Tag::Enemy));
        let config = AgentTypeConfig {
            movement_axis: MovementAxis::Horizontal,
            ..agent_type()
        };
        let mut agent = AgentBuilder::new(&config)
            .build(EntityId::from_raw(2), &mut h.rng)
            .expect("agent");
        agent.assign_task(Task::Combat, &mut h.ctx());
        let motion = agent.tick(0.1, &mut h.ctx());
        assert!(motion.velocity.x > 0.0);
        assert_eq!(motion.velocity.y, 0.0);
    }

    #[test]
    fn test_buff_changes_stats() {
        let mut h = Harness::new();
        let mut agent = build(&mut h, Vec2::ZERO);
        let speed = agent.stats().speed;
        agent.apply_buff(Buff::flat(crate::stats::StatKind::Speed, 1.0));
        assert!((agent.stats().speed - speed - 1.0).abs() < 1e-6);
    }
}
