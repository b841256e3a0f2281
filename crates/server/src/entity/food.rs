use crate::math::mass_to_radius;
use glam::Vec2;
use protocol::Hue;

/// Passive food pellet.
#[derive(Debug, Clone)]
pub struct Food {
    pub id: u32,
    pub position: Vec2,
    pub mass: f32,
    pub radius: f32,
    pub hue: Hue,
}

impl Food {
    pub fn new(id: u32, position: Vec2, mass: f32, hue: Hue) -> Self {
        Self {
            id,
            position,
            mass,
            radius: mass_to_radius(mass),
            hue,
        }
    }
}
