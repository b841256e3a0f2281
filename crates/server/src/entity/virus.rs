use crate::math::mass_to_radius;
use glam::Vec2;
use protocol::Hue;

pub const VIRUS_HUE: Hue = Hue(120);

/// Stationary hazard; engulfing one force-splits the cell.
#[derive(Debug, Clone)]
pub struct Virus {
    pub id: u32,
    pub position: Vec2,
    pub mass: f32,
    pub radius: f32,
}

impl Virus {
    pub fn new(id: u32, position: Vec2, mass: f32) -> Self {
        Self {
            id,
            position,
            mass,
            radius: mass_to_radius(mass),
        }
    }
}
