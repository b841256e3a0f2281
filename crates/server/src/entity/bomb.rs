use glam::Vec2;

/// Wandering hazard; touching one force-splits the cell.
#[derive(Debug, Clone)]
pub struct Bomb {
    pub id: u32,
    pub position: Vec2,
    pub radius: f32,
    pub direction: Vec2,
}

impl Bomb {
    pub fn new(id: u32, position: Vec2, radius: f32, direction: Vec2) -> Self {
        Self {
            id,
            position,
            radius,
            direction,
        }
    }
}
