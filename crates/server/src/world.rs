//! World state: entity collections, mass balancing, visibility.

use crate::bombs::BombField;
use crate::config::Config;
use crate::entity::{Cell, EjectedMass, Food, IdGen, PowerFood, PowerKind, Tick, VIRUS_HUE, Virus};
use crate::hazard::HazardZone;
use crate::math::{self, ViewRect};
use crate::player::Player;
use glam::Vec2;
use protocol::packets::{
    CellView, HazardView, ObjectView, PlayerView, PowerView, SnapshotView,
};
use protocol::Hue;
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// Half extents of the per-client view rectangle.
const VIEW_HALF_WIDTH: f32 = 960.0;
const VIEW_HALF_HEIGHT: f32 = 540.0;
/// Extra visibility margin against border pop-in.
const VIEW_MARGIN: f32 = 20.0;

const BOMB_HUE: Hue = Hue(0);

/// Rectangular world bounds, centered on the origin.
#[derive(Debug, Clone, Copy)]
pub struct WorldBorder {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl WorldBorder {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            min_x: -width / 2.0,
            min_y: -height / 2.0,
            max_x: width / 2.0,
            max_y: height / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Clamp a cell center to the bounds, letting a third of the radius hang
    /// over the edge.
    pub fn clamp_cell(&self, position: Vec2, radius: f32) -> Vec2 {
        let overhang = radius / 3.0;
        Vec2::new(
            position
                .x
                .clamp(self.min_x - overhang, self.max_x + overhang),
            position
                .y
                .clamp(self.min_y - overhang, self.max_y + overhang),
        )
    }
}

/// Owns every entity collection for one arena.
///
/// All simulation passes borrow this exclusively for the duration of a tick.
#[derive(Debug)]
pub struct World {
    pub border: WorldBorder,
    pub ids: IdGen,
    pub players: HashMap<u32, Player>,
    pub food: Vec<Food>,
    pub viruses: Vec<Virus>,
    pub ejected: Vec<EjectedMass>,
    pub power_food: Vec<PowerFood>,
    pub bombs: BombField,
    pub hazard: Option<HazardZone>,
}

impl World {
    pub fn new(config: &Config) -> Self {
        Self {
            border: WorldBorder::new(config.border.width, config.border.height),
            ids: IdGen::new(),
            players: HashMap::new(),
            food: Vec::new(),
            viruses: Vec::new(),
            ejected: Vec::new(),
            power_food: Vec::new(),
            bombs: BombField::new(),
            hazard: config.hazard.enabled.then(|| HazardZone::new(&config.hazard)),
        }
    }

    pub fn live_player_count(&self) -> usize {
        self.players.values().filter(|p| p.is_alive()).count()
    }

    /// Spawn a player with one protected cell, placed clear of viruses and
    /// other players and inside the hazard zone when one is active.
    pub fn spawn_player<R: Rng>(
        &mut self,
        id: u32,
        name: String,
        hue: Hue,
        stake: f64,
        config: &Config,
        now: Tick,
        rng: &mut R,
    ) {
        let radius = math::mass_to_radius(config.player.default_mass);
        let mut avoid: Vec<(Vec2, f32)> = self
            .viruses
            .iter()
            .map(|v| (v.position, v.radius))
            .collect();
        for player in self.players.values() {
            for cell in &player.cells {
                avoid.push((cell.position, cell.radius()));
            }
        }
        let inside = self.hazard.as_ref().map(|z| (z.center, z.radius()));
        let position = math::scatter_position(
            rng,
            self.border.width(),
            self.border.height(),
            radius,
            &avoid,
            inside,
            64,
        );

        let mut cell = Cell::new(
            self.ids.next(),
            position,
            config.player.default_mass,
            stake,
            0.0,
        );
        cell.grant_protection(now + config.secs_to_ticks(config.player.protection_secs));
        self.players
            .insert(id, Player::new(id, name, hue, cell, stake, now));
    }

    /// Mass held by everything edible plus every live player.
    pub fn total_system_mass(&self) -> f32 {
        let food: f32 = self.food.iter().map(|f| f.mass).sum();
        let ejected: f32 = self.ejected.iter().map(|e| e.mass).sum();
        let players: f32 = self.players.values().map(|p| p.total_mass()).sum();
        food + ejected + players
    }

    /// Keep total system mass near the configured target: add or remove food
    /// in bulk, top up viruses, power-food and bombs to their caps.
    pub fn balance_mass<R: Rng>(&mut self, config: &Config, rng: &mut R) {
        let gap = config.food.target_system_mass - self.total_system_mass();
        if gap > 0.0 {
            let wanted = (gap / config.food.mass) as usize;
            let room = config.food.max_amount.saturating_sub(self.food.len());
            let count = wanted.min(room);
            for _ in 0..count {
                let position =
                    math::random_position(rng, self.border.width(), self.border.height());
                let hue = Hue::new(rng.random_range(0..360));
                self.food
                    .push(Food::new(self.ids.next(), position, config.food.mass, hue));
            }
            if count > 0 {
                debug!(added = count, "food balance");
            }
        } else if gap < 0.0 {
            let excess = ((-gap) / config.food.mass) as usize;
            let count = excess.min(self.food.len());
            self.food.truncate(self.food.len() - count);
            if count > 0 {
                debug!(removed = count, "food balance");
            }
        }

        while self.viruses.len() < config.virus.max_amount {
            let position = math::random_position(rng, self.border.width(), self.border.height());
            self.viruses
                .push(Virus::new(self.ids.next(), position, config.virus.mass));
        }

        while self.power_food.len() < config.power.max_amount {
            let position = math::random_position(rng, self.border.width(), self.border.height());
            let kind = PowerKind::ALL[rng.random_range(0..PowerKind::ALL.len())];
            self.power_food
                .push(PowerFood::new(self.ids.next(), position, kind));
        }

        self.bombs
            .top_up(&config.bomb, &self.border, &mut self.ids, rng);
    }

    /// Build the visibility-filtered snapshot for one player.
    pub fn visible_snapshot(
        &self,
        player_id: u32,
        config: &Config,
        now: Tick,
    ) -> Option<SnapshotView> {
        let player = self.players.get(&player_id)?;
        if !player.is_alive() {
            return None;
        }
        let rect = ViewRect::around(player.centroid(), VIEW_HALF_WIDTH, VIEW_HALF_HEIGHT);
        let dt = config.dt();

        let others = self
            .players
            .values()
            .filter(|p| p.id != player_id && p.is_alive())
            .filter(|p| {
                p.cells
                    .iter()
                    .any(|c| rect.contains_circle(c.position, c.radius(), VIEW_MARGIN))
            })
            .map(|p| player_view(p, now, dt))
            .collect();

        let food = self
            .food
            .iter()
            .filter(|f| rect.contains_circle(f.position, f.radius, VIEW_MARGIN))
            .map(|f| ObjectView {
                x: f.position.x,
                y: f.position.y,
                radius: f.radius,
                hue: f.hue,
            })
            .collect();

        let viruses = self
            .viruses
            .iter()
            .filter(|v| rect.contains_circle(v.position, v.radius, VIEW_MARGIN))
            .map(|v| ObjectView {
                x: v.position.x,
                y: v.position.y,
                radius: v.radius,
                hue: VIRUS_HUE,
            })
            .collect();

        let ejected = self
            .ejected
            .iter()
            .filter(|e| rect.contains_circle(e.position, e.radius, VIEW_MARGIN))
            .map(|e| ObjectView {
                x: e.position.x,
                y: e.position.y,
                radius: e.radius,
                hue: e.hue,
            })
            .collect();

        let power_food = self
            .power_food
            .iter()
            .filter(|p| rect.contains_circle(p.position, p.radius, VIEW_MARGIN))
            .map(|p| PowerView {
                x: p.position.x,
                y: p.position.y,
                kind: p.kind as u8,
            })
            .collect();

        let bombs = self
            .bombs
            .bombs
            .iter()
            .filter(|b| rect.contains_circle(b.position, b.radius, VIEW_MARGIN))
            .map(|b| ObjectView {
                x: b.position.x,
                y: b.position.y,
                radius: b.radius,
                hue: BOMB_HUE,
            })
            .collect();

        let hazard = self.hazard.as_ref().map(|z| HazardView {
            center_x: z.center.x,
            center_y: z.center.y,
            radius: z.radius(),
            damage_per_sec: z.damage_per_sec(),
        });

        Some(SnapshotView {
            own: player_view(player, now, dt),
            total_mass: player.total_mass(),
            original_stake: player.original_stake,
            others,
            food,
            viruses,
            ejected,
            power_food,
            bombs,
            hazard,
        })
    }
}

fn player_view(player: &Player, now: Tick, dt: f32) -> PlayerView {
    PlayerView {
        player_id: player.id,
        name: player.name.clone(),
        hue: player.hue,
        cells: player
            .cells
            .iter()
            .map(|c| CellView {
                cell_id: c.id,
                x: c.position.x,
                y: c.position.y,
                mass: c.mass(),
                radius: c.radius(),
                stake: c.stake(),
                protection_remaining: c.protection_remaining_secs(now, dt),
                shielded: c.has_effect(crate::entity::EffectKind::Shield, now),
            })
            .collect(),
    }
}
