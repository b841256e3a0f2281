//! Player state machine: movement, split/merge, stake accounting.

use crate::collision::circle_overlap;
use crate::config::Config;
use crate::entity::{Cell, EffectKind, EjectedMass, IdGen, Tick, round_stake};
use crate::hazard::HazardZone;
use crate::math::mass_slowdown;
use crate::world::WorldBorder;
use glam::Vec2;
use protocol::Hue;

/// Separation speed for overlapping siblings during the merge cooldown.
pub const PUSH_APART_SPEED: f32 = 2.0;

/// Slack tolerated before the stake corrective pass kicks in.
const STAKE_EPSILON: f64 = 1e-9;

/// Inputs recorded during the tick and consumed at the next tick boundary.
#[derive(Debug, Default, Clone, Copy)]
pub struct PendingInput {
    pub split: bool,
    pub eject: bool,
}

#[derive(Debug)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub hue: Hue,
    pub cells: Vec<Cell>,
    /// Heading target relative to the cell-group centroid.
    pub target: Vec2,
    pub merge_cooldown_until: Tick,
    /// Entitlement ceiling: the sum of cell stakes never exceeds this.
    pub original_stake: f64,
    /// The last-chance fragment conversion fires at most once per life.
    pub fragment_rescue_used: bool,
    pub pending: PendingInput,
    pub spawned_at: Tick,
}

impl Player {
    pub fn new(
        id: u32,
        name: String,
        hue: Hue,
        first_cell: Cell,
        original_stake: f64,
        now: Tick,
    ) -> Self {
        Self {
            id,
            name,
            hue,
            cells: vec![first_cell],
            target: Vec2::ZERO,
            merge_cooldown_until: 0,
            original_stake,
            fragment_rescue_used: false,
            pending: PendingInput::default(),
            spawned_at: now,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.cells.is_empty()
    }

    pub fn centroid(&self) -> Vec2 {
        if self.cells.is_empty() {
            return Vec2::ZERO;
        }
        self.cells.iter().map(|c| c.position).sum::<Vec2>() / self.cells.len() as f32
    }

    pub fn total_mass(&self) -> f32 {
        self.cells.iter().map(|c| c.mass()).sum()
    }

    pub fn total_stake(&self) -> f64 {
        self.cells.iter().map(|c| c.stake()).sum()
    }

    /// Move every cell toward the shared heading target.
    ///
    /// Boost speed decays toward the floor; at the floor the step follows the
    /// logarithmic mass slowdown. Position is clamped to the border and, when
    /// a hazard zone is active, back inside its current radius.
    pub fn move_cells(
        &mut self,
        cfg: &Config,
        border: &WorldBorder,
        hazard: Option<&HazardZone>,
        now: Tick,
    ) {
        let heading_target = self.centroid() + self.target;
        let p = &cfg.player;
        for cell in &mut self.cells {
            let to_target = heading_target - cell.position;
            let dist = to_target.length();

            let speed = if cell.speed > p.min_speed {
                let s = cell.speed;
                cell.speed = (cell.speed - p.speed_decrement).max(p.min_speed);
                s
            } else {
                p.min_speed
            };
            let multiplier =
                cell.effect_multiplier(EffectKind::Speed, now) * p.event_speed_multiplier;
            let slow = mass_slowdown(cell.mass(), p.default_mass, p.slow_base);
            let mut step = speed * multiplier / slow;

            let approach = p.min_distance + cell.radius();
            if dist < approach {
                step *= dist / approach;
            }

            if dist > f32::EPSILON {
                cell.position += to_target / dist * step.min(dist);
            }
            cell.position = border.clamp_cell(cell.position, cell.radius());
            if let Some(zone) = hazard {
                cell.position = zone.clamp_inside(cell.position, 0.0);
            }
            cell.prune_effects(now);
        }
    }

    /// Resolve overlaps between the player's own cells.
    ///
    /// During the merge cooldown overlapping pairs repel along the connecting
    /// axis; afterwards they merge. Cascading merges within one pass skip
    /// already-absorbed cells, and the list is compacted before returning.
    pub fn resolve_overlaps(&mut self, now: Tick) {
        let can_merge = now >= self.merge_cooldown_until;
        let count = self.cells.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (head, tail) = self.cells.split_at_mut(j);
                let a = &mut head[i];
                let b = &mut tail[0];
                if a.removed || b.removed {
                    continue;
                }
                let overlap = circle_overlap(a.position, a.radius(), b.position, b.radius());
                if !overlap.is_touching() {
                    continue;
                }
                if can_merge {
                    a.add_mass(b.mass());
                    a.set_stake(round_stake(a.stake() + b.stake()));
                    a.split_lineage = a.split_lineage || b.split_lineage;
                    b.removed = true;
                } else {
                    let push = overlap.axis * (PUSH_APART_SPEED / 2.0);
                    a.position -= push;
                    b.position += push;
                }
            }
        }
        self.cells.retain(|c| !c.removed);
    }

    /// Split the cell at `index` into `pieces` cells, bounded by the cap.
    ///
    /// Mass divides evenly; stake divides with exact fractional shares that
    /// sum back to the pre-split stake. Returns the number of cells added.
    pub fn split_cell(&mut self, index: usize, pieces: usize, cfg: &Config, now: Tick, ids: &mut IdGen) -> usize {
        let cap = cfg.player.max_cells;
        let room = cap.saturating_sub(self.cells.len().saturating_sub(1));
        let k = pieces.min(room);
        if k < 2 || index >= self.cells.len() {
            return 0;
        }

        let (origin, total_mass, total_stake) = {
            let cell = &self.cells[index];
            (cell.position, cell.mass(), cell.stake())
        };
        let piece_mass = total_mass / k as f32;
        let share = total_stake / k as f64;
        let last_share = total_stake - share * (k - 1) as f64;

        for piece in 1..k {
            let angle = std::f32::consts::TAU * piece as f32 / k as f32;
            let offset = Vec2::new(angle.cos(), angle.sin()) * 2.0;
            let stake = if piece == k - 1 { last_share } else { share };
            let mut cell = Cell::new(ids.next(), origin + offset, piece_mass, stake, cfg.player.split_speed);
            cell.split_lineage = true;
            self.cells.push(cell);
        }

        let first = &mut self.cells[index];
        first.set_mass(piece_mass);
        first.set_stake(share);
        first.speed = cfg.player.split_speed;
        first.split_lineage = true;

        self.merge_cooldown_until = now + cfg.secs_to_ticks(cfg.player.merge_cooldown_secs);
        k - 1
    }

    /// User split: halve every eligible cell, largest first, until the cap.
    pub fn split_all(&mut self, cfg: &Config, now: Tick, ids: &mut IdGen) {
        let mut eligible: Vec<usize> = (0..self.cells.len())
            .filter(|&i| self.cells[i].mass() >= cfg.player.min_split_mass)
            .collect();
        eligible.sort_by(|&a, &b| {
            self.cells[b]
                .mass()
                .partial_cmp(&self.cells[a].mass())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for index in eligible {
            if self.cells.len() >= cfg.player.max_cells {
                break;
            }
            self.split_cell(index, 2, cfg, now, ids);
        }
    }

    /// Virus and bomb strikes force a 4-way split of the struck cell.
    pub fn force_split(&mut self, cell_id: u32, cfg: &Config, now: Tick, ids: &mut IdGen) -> usize {
        match self.cells.iter().position(|c| c.id == cell_id) {
            Some(index) => self.split_cell(index, 4, cfg, now, ids),
            None => 0,
        }
    }

    /// Eject a fixed-mass pellet forward from every cell with enough mass.
    /// Pellets carry no stake.
    pub fn eject(&mut self, cfg: &Config, now: Tick, ids: &mut IdGen) -> Vec<EjectedMass> {
        let heading_target = self.centroid() + self.target;
        let mut out = Vec::new();
        for cell in &mut self.cells {
            if cell.mass() < cfg.player.default_mass + cfg.eject.mass {
                continue;
            }
            let to_target = heading_target - cell.position;
            let direction = if to_target.length() > f32::EPSILON {
                to_target.normalize()
            } else {
                Vec2::X
            };
            cell.add_mass(-cfg.eject.mass);
            out.push(EjectedMass::new(
                ids.next(),
                cell.position + direction * cell.radius(),
                cfg.eject.mass,
                self.hue,
                direction,
                cfg.eject.speed,
                now,
            ));
        }
        out
    }

    /// Last-chance conversion of the final cell into 4 guarded fragments.
    ///
    /// Fires at most once per life, only when stake remains. Each fragment
    /// holds a quarter of the mass and an exact quarter share of the stake,
    /// and gets a fresh protection window.
    pub fn try_fragment_rescue(&mut self, cfg: &Config, now: Tick, ids: &mut IdGen) -> bool {
        if self.fragment_rescue_used || self.cells.len() != 1 {
            return false;
        }
        let doomed = &self.cells[0];
        if doomed.stake() <= 0.0 {
            return false;
        }
        let origin = doomed.position;
        let mass = doomed.mass() / 4.0;
        let total_stake = doomed.stake();
        let share = total_stake / 4.0;
        let last_share = total_stake - share * 3.0;
        let until = now + cfg.secs_to_ticks(cfg.player.protection_secs);

        self.cells.clear();
        for piece in 0..4 {
            let angle = std::f32::consts::TAU * piece as f32 / 4.0;
            let offset = Vec2::new(angle.cos(), angle.sin()) * 4.0;
            let stake = if piece == 3 { last_share } else { share };
            let mut cell = Cell::new(ids.next(), origin + offset, mass, stake, cfg.player.split_speed);
            cell.split_lineage = true;
            cell.grant_protection(until);
            self.cells.push(cell);
        }
        self.merge_cooldown_until = now + cfg.secs_to_ticks(cfg.player.merge_cooldown_secs);
        self.fragment_rescue_used = true;
        true
    }

    /// Record a stake amount won through predation; the entitlement ceiling
    /// grows with it so conservation keeps holding for the winner.
    pub fn record_win(&mut self, amount: f64) {
        self.original_stake = round_stake(self.original_stake + amount);
    }

    /// Corrective pass for stake drift. When `Σ stake` exceeds the ceiling,
    /// every cell's stake is scaled down proportionally. Returns the excess
    /// that was removed, if any.
    pub fn enforce_stake_ceiling(&mut self) -> Option<f64> {
        let total = self.total_stake();
        if total <= self.original_stake + STAKE_EPSILON {
            return None;
        }
        let scale = self.original_stake / total;
        for cell in &mut self.cells {
            let scaled = cell.stake() * scale;
            cell.set_stake(scaled);
        }
        Some(total - self.original_stake)
    }

    /// Mass damage for cells caught outside the hazard zone, floored at the
    /// spawn mass.
    pub fn apply_hazard_damage(&mut self, zone: &HazardZone, dt: f32, floor: f32) {
        let damage = zone.damage_per_sec() * dt;
        for cell in &mut self.cells {
            if !zone.contains(cell.position) {
                cell.set_mass((cell.mass() - damage).max(floor));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::default()
    }

    fn player_with_cell(mass: f32, stake: f64) -> (Player, IdGen) {
        let mut ids = IdGen::new();
        let cell = Cell::new(ids.next(), Vec2::ZERO, mass, stake, 0.0);
        let player = Player::new(1, "p".into(), Hue::new(0), cell, stake, 0);
        (player, ids)
    }

    #[test]
    fn test_split_stake_sums_exactly() {
        let cfg = test_config();
        for stake in [0.0_f64, 1.0, 2.5, 100.0] {
            for k in 2..=4 {
                let (mut player, mut ids) = player_with_cell(180.0, stake);
                player.split_cell(0, k, &cfg, 0, &mut ids);
                assert_eq!(player.cells.len(), k);
                let sum: f64 = player.total_stake();
                assert_eq!(sum, stake, "stake {stake} split into {k}");
            }
        }
    }

    #[test]
    fn test_virus_split_scenario() {
        // Mass 180, stake 40, k=4 with full cap room.
        let cfg = test_config();
        let (mut player, mut ids) = player_with_cell(180.0, 40.0);
        let cell_id = player.cells[0].id;
        player.force_split(cell_id, &cfg, 0, &mut ids);
        assert_eq!(player.cells.len(), 4);
        for cell in &player.cells {
            assert_eq!(cell.mass(), 45.0);
            assert_eq!(cell.stake(), 10.0);
            assert!(cell.split_lineage);
        }
    }

    #[test]
    fn test_cell_cap_is_never_exceeded() {
        let cfg = test_config();
        let (mut player, mut ids) = player_with_cell(400.0, 100.0);
        player.split_all(&cfg, 0, &mut ids);
        assert!(player.cells.len() <= cfg.player.max_cells);
        // Further triggers must not push past the cap.
        let ids_snapshot: Vec<u32> = player.cells.iter().map(|c| c.id).collect();
        for id in ids_snapshot {
            player.force_split(id, &cfg, 0, &mut ids);
        }
        player.split_all(&cfg, 0, &mut ids);
        assert_eq!(player.cells.len(), cfg.player.max_cells);
        assert!((player.total_stake() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_below_minimum_room_is_noop() {
        let cfg = test_config();
        let (mut player, mut ids) = player_with_cell(180.0, 40.0);
        player.split_cell(0, 4, &cfg, 0, &mut ids);
        // One slot of room cannot host a 2-piece split.
        let added = player.split_cell(0, 4, &cfg, 0, &mut ids);
        assert_eq!(added, 0);
        assert_eq!(player.cells.len(), 4);
    }

    #[test]
    fn test_siblings_push_apart_during_cooldown() {
        let cfg = test_config();
        let (mut player, mut ids) = player_with_cell(100.0, 0.0);
        player.split_cell(0, 2, &cfg, 10, &mut ids);
        let before = player.cells[0].position.distance(player.cells[1].position);
        player.resolve_overlaps(11);
        assert_eq!(player.cells.len(), 2);
        let after = player.cells[0].position.distance(player.cells[1].position);
        assert!(after > before);
    }

    #[test]
    fn test_siblings_merge_after_cooldown() {
        let cfg = test_config();
        let (mut player, mut ids) = player_with_cell(100.0, 20.0);
        player.split_cell(0, 2, &cfg, 0, &mut ids);
        player.cells[0].set_stake(12.0);
        player.cells[1].set_stake(8.0);
        let pre_mass = player.total_mass();

        player.resolve_overlaps(player.merge_cooldown_until);
        assert_eq!(player.cells.len(), 1);
        assert_eq!(player.cells[0].stake(), 20.0);
        assert_eq!(player.cells[0].mass(), pre_mass);
        assert!(player.cells[0].split_lineage);
    }

    #[test]
    fn test_stake_conservation_over_split_merge_sequences() {
        let cfg = test_config();
        let (mut player, mut ids) = player_with_cell(300.0, 77.77);
        player.split_all(&cfg, 0, &mut ids);
        assert!(player.total_stake() <= player.original_stake + 1e-9);
        player.resolve_overlaps(player.merge_cooldown_until);
        player.split_all(&cfg, player.merge_cooldown_until, &mut ids);
        assert!(player.total_stake() <= player.original_stake + 1e-9);
        assert!(player.enforce_stake_ceiling().is_none());
    }

    #[test]
    fn test_corrective_pass_scales_down_drift() {
        let (mut player, mut ids) = player_with_cell(100.0, 50.0);
        let cell = Cell::new(ids.next(), Vec2::new(500.0, 0.0), 50.0, 30.0, 0.0);
        player.cells.push(cell);
        player.cells[0].set_stake(40.0);
        // 70 total against a ceiling of 50.
        let excess = player.enforce_stake_ceiling().expect("drift detected");
        assert!((excess - 20.0).abs() < 1e-9);
        assert!((player.total_stake() - 50.0).abs() < 1e-9);
        // Proportions survive the scale-down.
        assert!((player.cells[0].stake() / player.cells[1].stake() - 40.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_fragment_rescue_quarters_and_protection() {
        let cfg = test_config();
        let (mut player, mut ids) = player_with_cell(80.0, 10.0);
        assert!(player.try_fragment_rescue(&cfg, 100, &mut ids));
        assert_eq!(player.cells.len(), 4);
        assert_eq!(player.total_stake(), 10.0);
        for cell in &player.cells {
            assert_eq!(cell.mass(), 20.0);
            assert!(cell.is_protected(101));
        }
        // Once per life.
        assert!(!player.try_fragment_rescue(&cfg, 100, &mut ids));
    }

    #[test]
    fn test_fragment_rescue_requires_stake() {
        let cfg = test_config();
        let (mut player, mut ids) = player_with_cell(80.0, 0.0);
        assert!(!player.try_fragment_rescue(&cfg, 0, &mut ids));
    }

    #[test]
    fn test_eject_requires_spare_mass() {
        let cfg = test_config();
        let (mut player, mut ids) = player_with_cell(cfg.player.default_mass + 1.0, 5.0);
        assert!(player.eject(&cfg, 0, &mut ids).is_empty());

        let (mut fat, mut ids2) = player_with_cell(100.0, 5.0);
        let pellets = fat.eject(&cfg, 0, &mut ids2);
        assert_eq!(pellets.len(), 1);
        assert_eq!(pellets[0].mass, cfg.eject.mass);
        assert_eq!(fat.total_mass(), 100.0 - cfg.eject.mass);
        // Stake stays behind.
        assert_eq!(fat.total_stake(), 5.0);
    }

    #[test]
    fn test_hazard_damage_floors_at_spawn_mass() {
        let cfg = test_config();
        let zone = HazardZone::new(&cfg.hazard);
        let (mut player, _ids) = player_with_cell(30.0, 0.0);
        player.cells[0].position = Vec2::new(cfg.hazard.max_radius + 100.0, 0.0);
        // Two seconds at 10 mass/sec.
        for _ in 0..40 {
            player.apply_hazard_damage(&zone, 0.05, cfg.player.default_mass);
        }
        assert!((player.total_mass() - 10.0).abs() < 1e-3);
        // Stays floored from here on.
        player.apply_hazard_damage(&zone, 0.05, cfg.player.default_mass);
        assert_eq!(player.total_mass(), cfg.player.default_mass);
    }
}
