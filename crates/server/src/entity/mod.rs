//! World entities.

mod bomb;
mod cell;
mod ejected_mass;
mod food;
mod power_food;
mod virus;

pub use bomb::Bomb;
pub use cell::{ActiveEffect, Cell, EffectKind, Tick, round_stake};
pub use ejected_mass::EjectedMass;
pub use food::Food;
pub use power_food::{PowerFood, PowerKind};
pub use virus::{VIRUS_HUE, Virus};

/// Monotonic entity id source, shared by everything the world spawns.
#[derive(Debug, Default)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(1).max(1);
        id
    }
}
