//! Melee attack resolution.
//!
//! Every attack goes through two timed phases:
//! - **Windup**: the attack is committed but has not landed yet
//! - **Cooldown**: the attacker may not start another attack
//!
//! Damage is applied once, when the windup runs out, and only if the target
//! is still registered and within range of the attacker's *current*
//! position. A miss still costs the full cooldown. A frozen attacker's
//! timers stand still until it is thawed.

use ahash::{AHashMap, AHashSet};
use grove_common::EntityId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::health::{DamageOutcome, HealthSink};
use crate::targets::TargetRegistry;

/// Combat error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CombatError {
    /// Attacker is still in windup or cooldown
    #[error("attack rejected for {attacker}: cooldown active ({remaining}s remaining)")]
    AttackRejectedCooldownActive {
        /// Attacking entity
        attacker: EntityId,
        /// Time until another attack is accepted
        remaining: f32,
    },
}

/// Result type for combat operations.
pub type CombatResult<T> = Result<T, CombatError>;

/// Numbers describing one attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackProfile {
    /// Damage applied on hit
    pub damage: f32,
    /// Maximum distance at which the hit lands
    pub range: f32,
    /// Seconds between starting the attack and applying damage
    pub windup: f32,
    /// Seconds after the windup before the next attack is accepted
    pub cooldown: f32,
}

impl Default for AttackProfile {
    fn default() -> Self {
        Self {
            damage: 5.0,
            range: 1.5,
            windup: 0.3,
            cooldown: 1.0,
        }
    }
}

impl AttackProfile {
    /// Sets the damage.
    #[must_use]
    pub fn with_damage(mut self, damage: f32) -> Self {
        self.damage = damage.max(0.0);
        self
    }

    /// Sets the range.
    #[must_use]
    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range.max(0.0);
        self
    }

    /// Sets windup and cooldown.
    #[must_use]
    pub fn with_timing(mut self, windup: f32, cooldown: f32) -> Self {
        self.windup = windup.max(0.0);
        self.cooldown = cooldown.max(0.0);
        self
    }
}

/// Phase of an in-flight attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackPhase {
    /// Preparing to strike.
    Windup,
    /// Recovering after the strike.
    Cooldown,
}

#[derive(Debug, Clone, PartialEq)]
struct AttackRecord {
    target: EntityId,
    profile: AttackProfile,
    phase: AttackPhase,
    remaining: f32,
}

impl AttackRecord {
    fn total_remaining(&self) -> f32 {
        match self.phase {
            AttackPhase::Windup => self.remaining + self.profile.cooldown,
            AttackPhase::Cooldown => self.remaining,
        }
        .max(0.0)
    }
}

/// What happened when a windup elapsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombatOutcome {
    /// Damage was applied
    Hit {
        /// Attacking entity
        attacker: EntityId,
        /// Entity hit
        target: EntityId,
        /// Damage dealt
        damage: f32,
        /// What the health side reported
        outcome: DamageOutcome,
    },
    /// Target had left range or the registry
    Missed {
        /// Attacking entity
        attacker: EntityId,
        /// Intended target
        target: EntityId,
    },
}

/// Tracks windups and cooldowns for every attacker.
#[derive(Debug, Clone, Default)]
pub struct CombatResolver {
    attacks: AHashMap<EntityId, AttackRecord>,
    frozen: AHashSet<EntityId>,
}

impl CombatResolver {
    /// Creates a new resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an attack.
    ///
    /// Rejected while the attacker is still winding up or cooling down from a
    /// previous attack; a rejection schedules nothing.
    pub fn attack(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        profile: AttackProfile,
    ) -> CombatResult<()> {
        if let Some(record) = self.attacks.get(&attacker) {
            return Err(CombatError::AttackRejectedCooldownActive {
                attacker,
                remaining: record.total_remaining(),
            });
        }

        debug!(%attacker, %target, windup = profile.windup, "attack started");
        self.attacks.insert(
            attacker,
            AttackRecord {
                target,
                profile,
                phase: AttackPhase::Windup,
                remaining: profile.windup,
            },
        );
        Ok(())
    }

    /// True while the attacker is in windup or cooldown.
    #[must_use]
    pub fn is_cooldown_active(&self, attacker: EntityId) -> bool {
        self.attacks.contains_key(&attacker)
    }

    /// Current phase for an attacker, if any.
    #[must_use]
    pub fn phase(&self, attacker: EntityId) -> Option<AttackPhase> {
        self.attacks.get(&attacker).map(|r| r.phase)
    }

    /// Seconds until the attacker may attack again.
    #[must_use]
    pub fn remaining(&self, attacker: EntityId) -> f32 {
        self.attacks
            .get(&attacker)
            .map_or(0.0, AttackRecord::total_remaining)
    }

    /// Number of attackers currently in windup or cooldown.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.attacks.len()
    }

    /// Drops a pending windup so it can never land.
    ///
    /// The attacker goes straight into cooldown; an attack in cooldown is
    /// left alone.
    pub fn cancel(&mut self, attacker: EntityId) {
        if let Some(record) = self.attacks.get_mut(&attacker) {
            if record.phase == AttackPhase::Windup {
                debug!(%attacker, "attack windup canceled");
                record.phase = AttackPhase::Cooldown;
                record.remaining = record.profile.cooldown;
            }
        }
    }

    /// Stops the attacker's windup and cooldown from counting down.
    pub fn freeze(&mut self, attacker: EntityId) {
        if self.frozen.insert(attacker) {
            debug!(%attacker, "attack timers frozen");
        }
    }

    /// Lets a frozen attacker's timers run again.
    pub fn thaw(&mut self, attacker: EntityId) {
        if self.frozen.remove(&attacker) {
            debug!(%attacker, "attack timers thawed");
        }
    }

    /// True while the attacker's timers are frozen.
    #[must_use]
    pub fn is_frozen(&self, attacker: EntityId) -> bool {
        self.frozen.contains(&attacker)
    }

    /// Forgets everything about an entity that left the simulation.
    pub fn forget(&mut self, attacker: EntityId) {
        self.attacks.remove(&attacker);
        self.frozen.remove(&attacker);
    }

    /// Advances all timers by `dt`.
    ///
    /// Windups that elapse re-validate range against the registry and apply
    /// damage through `health`. Attackers are processed in id order; one
    /// killed earlier in the same tick never lands its own hit. Frozen
    /// attackers are skipped.
    pub fn tick<H: HealthSink + ?Sized>(
        &mut self,
        dt: f32,
        registry: &TargetRegistry,
        health: &mut H,
    ) -> Vec<CombatOutcome> {
        let mut attackers: Vec<EntityId> = self.attacks.keys().copied().collect();
        attackers.sort_unstable();

        let mut outcomes = Vec::new();
        let mut fallen: Vec<EntityId> = Vec::new();
        for attacker in attackers {
            if fallen.contains(&attacker) {
                self.attacks.remove(&attacker);
                continue;
            }
            if self.frozen.contains(&attacker) {
                continue;
            }
            let Some(record) = self.attacks.get_mut(&attacker) else {
                continue;
            };
            record.remaining -= dt;

            if record.phase == AttackPhase::Windup && record.remaining <= 0.0 {
                let overshoot = -record.remaining;
                let outcome = Self::resolve(attacker, record, registry, health);
                if let CombatOutcome::Hit {
                    target,
                    outcome: DamageOutcome::Killed { .. },
                    ..
                } = outcome
                {
                    fallen.push(target);
                }
                outcomes.push(outcome);
                record.phase = AttackPhase::Cooldown;
                record.remaining = record.profile.cooldown - overshoot;
            }

            if record.phase == AttackPhase::Cooldown && record.remaining <= 0.0 {
                trace!(%attacker, "cooldown elapsed");
                self.attacks.remove(&attacker);
            }
        }
        outcomes
    }

    fn resolve<H: HealthSink + ?Sized>(
        attacker: EntityId,
        record: &AttackRecord,
        registry: &TargetRegistry,
        health: &mut H,
    ) -> CombatOutcome {
        let target = record.target;
        let in_range = match (registry.position(attacker), registry.position(target)) {
            (Some(from), Some(to)) => from.distance(to) <= record.profile.range,
            _ => false,
        };

        let Some(from) = registry.position(attacker).filter(|_| in_range) else {
            debug!(%attacker, %target, "attack missed");
            return CombatOutcome::Missed { attacker, target };
        };

        let damage = record.profile.damage;
        let outcome = health.apply_damage(target, damage, from);
        debug!(%attacker, %target, damage, ?outcome, "attack landed");
        CombatOutcome::Hit {
            attacker,
            target,
            damage,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthLedger;
    use crate::targets::{Tag, TagSet};
    use glam::Vec2;

    fn setup(distance: f32) -> (TargetRegistry, HealthLedger, EntityId, EntityId) {
        let attacker = EntityId::from_raw(1);
        let target = EntityId::from_raw(2);
        let mut registry = TargetRegistry::new();
        registry.add(attacker, Vec2::ZERO, TagSet::single(Tag::Enemy));
        registry.add(target, Vec2::new(distance, 0.0), TagSet::single(Tag::Npc));
        let mut health = HealthLedger::new();
        health.insert(target, 100.0, None);
        (registry, health, attacker, target)
    }

    fn profile() -> AttackProfile {
        AttackProfile::default()
            .with_damage(10.0)
            .with_range(2.0)
            .with_timing(0.5, 1.0)
    }

    #[test]
    fn test_damage_applied_after_windup() {
        let (registry, mut health, attacker, target) = setup(1.0);
        let mut combat = CombatResolver::new();
        combat.attack(attacker, target, profile()).expect("attack should start");

        assert!(combat.tick(0.25, &registry, &mut health).is_empty());
        assert_eq!(health.health(target), Some(100.0));

        let outcomes = combat.tick(0.25, &registry, &mut health);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], CombatOutcome::Hit { damage, .. } if damage == 10.0));
        assert_eq!(health.health(target), Some(90.0));
        assert_eq!(combat.phase(attacker), Some(AttackPhase::Cooldown));
    }

    #[test]
    fn test_second_attack_rejected_until_cooldown_elapses() {
        let (registry, mut health, attacker, target) = setup(1.0);
        let mut combat = CombatResolver::new();
        combat.attack(attacker, target, profile()).expect("first attack");
        let second = combat.attack(attacker, target, profile());
        assert!(matches!(
            second,
            Err(CombatError::AttackRejectedCooldownActive { .. })
        ));

        // Windup lands exactly one hit.
        combat.tick(0.5, &registry, &mut health);
        assert_eq!(health.health(target), Some(90.0));

        // Still cooling down.
        combat.tick(0.5, &registry, &mut health);
        assert!(combat.is_cooldown_active(attacker));
        assert!(combat.attack(attacker, target, profile()).is_err());

        combat.tick(0.5, &registry, &mut health);
        assert!(!combat.is_cooldown_active(attacker));
        combat.attack(attacker, target, profile()).expect("third attack");
        combat.tick(0.5, &registry, &mut health);
        assert_eq!(health.health(target), Some(80.0));
    }

    #[test]
    fn test_target_out_of_range_misses_but_cools_down() {
        let (mut registry, mut health, attacker, target) = setup(1.0);
        let mut combat = CombatResolver::new();
        combat.attack(attacker, target, profile()).expect("attack");

        registry.update_position(target, Vec2::new(5.0, 0.0));
        let outcomes = combat.tick(0.5, &registry, &mut health);
        assert_eq!(outcomes, vec![CombatOutcome::Missed { attacker, target }]);
        assert_eq!(health.health(target), Some(100.0));
        assert!(combat.is_cooldown_active(attacker));
    }

    #[test]
    fn test_attacker_moving_away_misses() {
        let (mut registry, mut health, attacker, target) = setup(1.0);
        let mut combat = CombatResolver::new();
        combat.attack(attacker, target, profile()).expect("attack");
        registry.update_position(attacker, Vec2::new(-5.0, 0.0));
        let outcomes = combat.tick(0.5, &registry, &mut health);
        assert!(matches!(outcomes[0], CombatOutcome::Missed { .. }));
    }

    #[test]
    fn test_removed_target_misses() {
        let (mut registry, mut health, attacker, target) = setup(1.0);
        let mut combat = CombatResolver::new();
        combat.attack(attacker, target, profile()).expect("attack");
        registry.remove(target);
        let outcomes = combat.tick(0.5, &registry, &mut health);
        assert!(matches!(outcomes[0], CombatOutcome::Missed { .. }));
    }

    #[test]
    fn test_cancel_drops_pending_damage() {
        let (registry, mut health, attacker, target) = setup(1.0);
        let mut combat = CombatResolver::new();
        combat.attack(attacker, target, profile()).expect("attack");
        combat.cancel(attacker);
        assert_eq!(combat.phase(attacker), Some(AttackPhase::Cooldown));

        let outcomes = combat.tick(0.5, &registry, &mut health);
        assert!(outcomes.is_empty());
        assert_eq!(health.health(target), Some(100.0));
        combat.tick(0.5, &registry, &mut health);
        assert!(!combat.is_cooldown_active(attacker));
    }

    #[test]
    fn test_killing_blow_reports_outcome() {
        let (registry, mut health, attacker, target) = setup(1.0);
        let mut combat = CombatResolver::new();
        combat
            .attack(attacker, target, profile().with_damage(500.0))
            .expect("attack");
        let outcomes = combat.tick(0.5, &registry, &mut health);
        assert!(matches!(
            outcomes[0],
            CombatOutcome::Hit {
                outcome: DamageOutcome::Killed { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_attacker_killed_same_tick_does_not_strike() {
        let a = EntityId::from_raw(1);
        let b = EntityId::from_raw(2);
        let mut registry = TargetRegistry::new();
        registry.add(a, Vec2::ZERO, TagSet::single(Tag::Npc));
        registry.add(b, Vec2::new(1.0, 0.0), TagSet::single(Tag::Enemy));
        let mut health = HealthLedger::new();
        health.insert(a, 10.0, None);
        health.insert(b, 10.0, None);

        let mut combat = CombatResolver::new();
        combat.attack(a, b, profile().with_damage(50.0)).expect("a attacks");
        combat.attack(b, a, profile().with_damage(50.0)).expect("b attacks");

        let outcomes = combat.tick(0.5, &registry, &mut health);
        assert_eq!(outcomes.len(), 1);
        assert!(health.is_alive(a));
        assert!(!health.is_alive(b));
        assert!(!combat.is_cooldown_active(b));
    }

    #[test]
    fn test_frozen_windup_waits_for_thaw() {
        let (registry, mut health, attacker, target) = setup(1.0);
        let mut combat = CombatResolver::new();
        combat.attack(attacker, target, profile()).expect("attack");
        combat.tick(0.25, &registry, &mut health);

        combat.freeze(attacker);
        for _ in 0..10 {
            assert!(combat.tick(0.5, &registry, &mut health).is_empty());
        }
        assert_eq!(health.health(target), Some(100.0));
        assert_eq!(combat.phase(attacker), Some(AttackPhase::Windup));
        assert!((combat.remaining(attacker) - 1.25).abs() < 1e-6);

        combat.thaw(attacker);
        assert!(!combat.is_frozen(attacker));
        let outcomes = combat.tick(0.25, &registry, &mut health);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(health.health(target), Some(90.0));
    }

    #[test]
    fn test_remaining_covers_windup_and_cooldown() {
        let (_, _, attacker, target) = setup(1.0);
        let mut combat = CombatResolver::new();
        assert_eq!(combat.remaining(attacker), 0.0);
        combat.attack(attacker, target, profile()).expect("attack");
        assert!((combat.remaining(attacker) - 1.5).abs() < 1e-6);
        combat.forget(attacker);
        assert_eq!(combat.active_count(), 0);
    }
}
