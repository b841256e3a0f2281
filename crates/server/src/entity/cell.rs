//! Player cell: mass, stake, protection and timed effects.

use crate::math::mass_to_radius;
use glam::Vec2;

/// Simulation tick counter.
pub type Tick = u64;

/// Round a stake amount to two decimal places.
#[inline]
pub fn round_stake(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Timed power-food effect kinds, one slot per kind.
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Speed = 0,
    Mass = 1,
    Shield = 2,
}

impl EffectKind {
    pub const COUNT: usize = 3;
}

/// A running timed effect on a cell.
#[derive(Debug, Clone, Copy)]
pub struct ActiveEffect {
    pub ends_at: Tick,
    pub multiplier: f32,
}

/// One cell belonging to a player.
#[derive(Debug, Clone)]
pub struct Cell {
    pub id: u32,
    pub position: Vec2,
    mass: f32,
    radius: f32,
    /// Current boost speed; decays toward the floor each tick.
    pub speed: f32,
    stake: f64,
    /// Eat-immunity deadline for fresh spawns and rescue fragments.
    pub protected_until: Option<Tick>,
    effects: [Option<ActiveEffect>; EffectKind::COUNT],
    /// Set on every piece a split produces; cleared only by merging.
    pub split_lineage: bool,
    /// Tombstone used during merge passes, compacted afterwards.
    pub removed: bool,
}

impl Cell {
    pub fn new(id: u32, position: Vec2, mass: f32, stake: f64, speed: f32) -> Self {
        Self {
            id,
            position,
            mass: mass.max(0.0),
            radius: mass_to_radius(mass),
            speed,
            stake: stake.max(0.0),
            protected_until: None,
            effects: [None; EffectKind::COUNT],
            split_lineage: false,
            removed: false,
        }
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn stake(&self) -> f64 {
        self.stake
    }

    /// Set mass and recompute the radius.
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass.max(0.0);
        self.radius = mass_to_radius(self.mass);
    }

    pub fn add_mass(&mut self, delta: f32) {
        self.set_mass(self.mass + delta);
    }

    pub fn set_stake(&mut self, stake: f64) {
        self.stake = stake.max(0.0);
    }

    /// Add a won stake amount, rounding the sum to cents.
    pub fn add_stake(&mut self, amount: f64) {
        self.stake = round_stake(self.stake + amount).max(0.0);
    }

    pub fn grant_protection(&mut self, until: Tick) {
        self.protected_until = Some(until);
    }

    /// Whether the cell may currently be eaten by nobody: either the spawn
    /// protection window is open or a shield effect is running.
    pub fn is_protected(&self, now: Tick) -> bool {
        if self.protected_until.is_some_and(|until| now < until) {
            return true;
        }
        self.effects[EffectKind::Shield as usize].is_some_and(|e| now < e.ends_at)
    }

    pub fn protection_remaining_secs(&self, now: Tick, dt: f32) -> f32 {
        match self.protected_until {
            Some(until) if now < until => (until - now) as f32 * dt,
            _ => 0.0,
        }
    }

    pub fn apply_effect(&mut self, kind: EffectKind, ends_at: Tick, multiplier: f32) {
        self.effects[kind as usize] = Some(ActiveEffect {
            ends_at,
            multiplier,
        });
    }

    /// Multiplier for a running effect, 1.0 when none. Expired slots are
    /// pruned on read.
    pub fn effect_multiplier(&mut self, kind: EffectKind, now: Tick) -> f32 {
        let slot = &mut self.effects[kind as usize];
        match *slot {
            Some(e) if now < e.ends_at => e.multiplier,
            Some(_) => {
                *slot = None;
                1.0
            }
            None => 1.0,
        }
    }

    pub fn has_effect(&self, kind: EffectKind, now: Tick) -> bool {
        self.effects[kind as usize].is_some_and(|e| now < e.ends_at)
    }

    pub fn prune_effects(&mut self, now: Tick) {
        for slot in &mut self.effects {
            if slot.is_some_and(|e| now >= e.ends_at) {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_mass_recomputes_radius() {
        let mut cell = Cell::new(1, Vec2::ZERO, 10.0, 0.0, 0.0);
        let before = cell.radius();
        cell.set_mass(40.0);
        assert!(cell.radius() > before);
        assert_eq!(cell.radius(), mass_to_radius(40.0));
    }

    #[test]
    fn test_stake_rounds_to_cents() {
        let mut cell = Cell::new(1, Vec2::ZERO, 10.0, 0.1, 0.0);
        cell.add_stake(0.2);
        assert_eq!(cell.stake(), 0.3);
    }

    #[test]
    fn test_protection_window_expires() {
        let mut cell = Cell::new(1, Vec2::ZERO, 10.0, 0.0, 0.0);
        cell.grant_protection(10);
        assert!(cell.is_protected(9));
        assert!(!cell.is_protected(10));
    }

    #[test]
    fn test_shield_counts_as_protection() {
        let mut cell = Cell::new(1, Vec2::ZERO, 10.0, 0.0, 0.0);
        cell.apply_effect(EffectKind::Shield, 20, 1.0);
        assert!(cell.is_protected(15));
        assert!(!cell.is_protected(25));
    }

    #[test]
    fn test_effect_multiplier_prunes_expired() {
        let mut cell = Cell::new(1, Vec2::ZERO, 10.0, 0.0, 0.0);
        cell.apply_effect(EffectKind::Mass, 5, 2.0);
        assert_eq!(cell.effect_multiplier(EffectKind::Mass, 3), 2.0);
        assert_eq!(cell.effect_multiplier(EffectKind::Mass, 5), 1.0);
        assert!(!cell.has_effect(EffectKind::Mass, 6));
    }
}
