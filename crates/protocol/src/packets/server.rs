//! Server -> Client packet building.

use crate::{BinaryWriter, Hue};

/// Per-cell data inside a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct CellView {
    pub cell_id: u32,
    pub x: f32,
    pub y: f32,
    pub mass: f32,
    pub radius: f32,
    pub stake: f64,
    /// Seconds of spawn/fragment protection left, 0 when unprotected.
    pub protection_remaining: f32,
    pub shielded: bool,
}

/// A visible player inside a snapshot (the owner or another player).
#[derive(Debug, Clone)]
pub struct PlayerView {
    pub player_id: u32,
    pub name: String,
    pub hue: Hue,
    pub cells: Vec<CellView>,
}

/// A passive world object inside a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ObjectView {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub hue: Hue,
}

/// A power-up pellet inside a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct PowerView {
    pub x: f32,
    pub y: f32,
    pub kind: u8,
}

/// Hazard-zone descriptor inside a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct HazardView {
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
    pub damage_per_sec: f32,
}

/// One visibility-filtered world snapshot for a single client.
#[derive(Debug, Clone)]
pub struct SnapshotView {
    pub own: PlayerView,
    pub total_mass: f32,
    pub original_stake: f64,
    pub others: Vec<PlayerView>,
    pub food: Vec<ObjectView>,
    pub viruses: Vec<ObjectView>,
    pub ejected: Vec<ObjectView>,
    pub power_food: Vec<PowerView>,
    pub bombs: Vec<ObjectView>,
    pub hazard: Option<HazardView>,
}

fn put_cell(w: &mut BinaryWriter, c: &CellView) {
    w.put_u32(c.cell_id);
    w.put_f32(c.x);
    w.put_f32(c.y);
    w.put_f32(c.mass);
    w.put_f32(c.radius);
    w.put_f64(c.stake);
    w.put_f32(c.protection_remaining);
    w.put_u8(c.shielded as u8);
}

fn put_player(w: &mut BinaryWriter, p: &PlayerView) {
    w.put_u32(p.player_id);
    w.put_string(&p.name);
    w.put_u16(p.hue.0);
    w.put_u8(p.cells.len() as u8);
    for c in &p.cells {
        put_cell(w, c);
    }
}

fn put_objects(w: &mut BinaryWriter, objects: &[ObjectView]) {
    w.put_u16(objects.len() as u16);
    for o in objects {
        w.put_f32(o.x);
        w.put_f32(o.y);
        w.put_f32(o.radius);
        w.put_u16(o.hue.0);
    }
}

/// Build a Welcome packet (0x01), sent once after a respawn is accepted.
pub fn build_welcome(player_id: u32, world_width: f32, world_height: f32) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(13);
    w.put_u8(0x01);
    w.put_u32(player_id);
    w.put_f32(world_width);
    w.put_f32(world_height);
    w
}

/// Build a Snapshot packet (0x10), sent once per tick per client.
pub fn build_snapshot(view: &SnapshotView) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(4096);
    w.put_u8(0x10);

    put_player(&mut w, &view.own);
    w.put_f32(view.total_mass);
    w.put_f64(view.original_stake);

    w.put_u16(view.others.len() as u16);
    for p in &view.others {
        put_player(&mut w, p);
    }

    put_objects(&mut w, &view.food);
    put_objects(&mut w, &view.viruses);
    put_objects(&mut w, &view.ejected);

    w.put_u16(view.power_food.len() as u16);
    for p in &view.power_food {
        w.put_f32(p.x);
        w.put_f32(p.y);
        w.put_u8(p.kind);
    }

    put_objects(&mut w, &view.bombs);

    match view.hazard {
        Some(h) => {
            w.put_u8(1);
            w.put_f32(h.center_x);
            w.put_f32(h.center_y);
            w.put_f32(h.radius);
            w.put_f32(h.damage_per_sec);
        }
        None => w.put_u8(0),
    }

    w
}

/// Build a Death packet (0x30) with the stake the player left the arena with.
pub fn build_death(final_stake: f64) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(9);
    w.put_u8(0x30);
    w.put_f64(final_stake);
    w
}

/// Build a ForcedDisconnect packet (0x31).
pub fn build_forced_disconnect(reason: &str) -> BinaryWriter {
    let mut w = BinaryWriter::new();
    w.put_u8(0x31);
    w.put_string(reason);
    w
}

/// Stake-affecting event kinds.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeEventKind {
    Ate = 0,
    WasEaten = 1,
    SurvivedBeingEaten = 2,
    VirusSplit = 3,
    BombCollision = 4,
}

/// Build a StakeEvent packet (0x32).
pub fn build_stake_event(kind: StakeEventKind, amount: f64, other_name: &str) -> BinaryWriter {
    let mut w = BinaryWriter::new();
    w.put_u8(0x32);
    w.put_u8(kind as u8);
    w.put_f64(amount);
    w.put_string(other_name);
    w
}

/// Build a PowerActivated packet (0x33).
pub fn build_power_activated(kind: u8, duration_secs: f32, multiplier: f32) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(10);
    w.put_u8(0x33);
    w.put_u8(kind);
    w.put_f32(duration_secs);
    w.put_f32(multiplier);
    w
}

/// Build a Leaderboard packet (0x34): ranked (name, total mass) pairs.
pub fn build_leaderboard(entries: &[(String, f32)]) -> BinaryWriter {
    let mut w = BinaryWriter::new();
    w.put_u8(0x34);
    w.put_u16(entries.len() as u16);
    for (name, mass) in entries {
        w.put_string(name);
        w.put_f32(*mass);
    }
    w
}

/// Build a SettlementResult packet (0x35).
///
/// `ok == false` reports a collaborator fault; the session still ends.
pub fn build_settlement_result(ok: bool, amount: f64) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(10);
    w.put_u8(0x35);
    w.put_u8(ok as u8);
    w.put_f64(amount);
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(stake: f64) -> CellView {
        CellView {
            cell_id: 1,
            x: 0.0,
            y: 0.0,
            mass: 10.0,
            radius: 22.97,
            stake,
            protection_remaining: 0.0,
            shielded: false,
        }
    }

    #[test]
    fn test_snapshot_opcode_and_hazard_flag() {
        let view = SnapshotView {
            own: PlayerView {
                player_id: 7,
                name: "p".into(),
                hue: Hue::new(120),
                cells: vec![cell(5.0)],
            },
            total_mass: 10.0,
            original_stake: 5.0,
            others: vec![],
            food: vec![],
            viruses: vec![],
            ejected: vec![],
            power_food: vec![],
            bombs: vec![],
            hazard: None,
        };
        let data = build_snapshot(&view).finish();
        assert_eq!(data[0], 0x10);
        // Last byte is the hazard-presence flag.
        assert_eq!(data[data.len() - 1], 0);
    }

    #[test]
    fn test_stake_event_roundtrip_fields() {
        let data = build_stake_event(StakeEventKind::VirusSplit, 12.5, "v").finish();
        assert_eq!(data[0], 0x32);
        assert_eq!(data[1], StakeEventKind::VirusSplit as u8);
    }
}
