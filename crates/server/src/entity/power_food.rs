use super::EffectKind;
use glam::Vec2;

pub const POWER_FOOD_RADIUS: f32 = 14.0;

/// What a power-food pellet grants when consumed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerKind {
    Speed = 0,
    Mass = 1,
    Shield = 2,
}

impl PowerKind {
    pub const ALL: [PowerKind; 3] = [PowerKind::Speed, PowerKind::Mass, PowerKind::Shield];

    pub fn effect(self) -> EffectKind {
        match self {
            PowerKind::Speed => EffectKind::Speed,
            PowerKind::Mass => EffectKind::Mass,
            PowerKind::Shield => EffectKind::Shield,
        }
    }
}

/// Special pellet granting a timed effect.
#[derive(Debug, Clone)]
pub struct PowerFood {
    pub id: u32,
    pub position: Vec2,
    pub kind: PowerKind,
    pub radius: f32,
}

impl PowerFood {
    pub fn new(id: u32, position: Vec2, kind: PowerKind) -> Self {
        Self {
            id,
            position,
            kind,
            radius: POWER_FOOD_RADIUS,
        }
    }
}
