use super::Tick;
use crate::math::mass_to_radius;
use glam::Vec2;
use protocol::Hue;

/// Ticks a fresh pellet stays inedible so the ejector clears it.
pub const EJECT_GRACE_TICKS: Tick = 2;

/// A pellet of mass ejected by a player. Carries no stake.
#[derive(Debug, Clone)]
pub struct EjectedMass {
    pub id: u32,
    pub position: Vec2,
    pub mass: f32,
    pub radius: f32,
    pub hue: Hue,
    pub direction: Vec2,
    /// Remaining boost speed; the pellet stops once it reaches zero.
    pub speed: f32,
    pub spawned_at: Tick,
}

impl EjectedMass {
    pub fn new(
        id: u32,
        position: Vec2,
        mass: f32,
        hue: Hue,
        direction: Vec2,
        speed: f32,
        spawned_at: Tick,
    ) -> Self {
        Self {
            id,
            position,
            mass,
            radius: mass_to_radius(mass),
            hue,
            direction,
            speed,
            spawned_at,
        }
    }

    /// Advance the boost one tick.
    pub fn update_boost(&mut self, decrement: f32) {
        if self.speed <= 0.0 {
            return;
        }
        self.position += self.direction * self.speed;
        self.speed = (self.speed - decrement).max(0.0);
    }

    pub fn is_edible(&self, now: Tick) -> bool {
        now >= self.spawned_at + EJECT_GRACE_TICKS
    }
}
