//! Tick orchestration: input consumption, simulation passes, snapshots.

use crate::collision::{circle_overlap, covers_center, engulfs};
use crate::config::Config;
use crate::entity::{EffectKind, PowerKind, Tick, round_stake};
use crate::player::Player;
use crate::server::client::Client;
use crate::settlement::{ResultKind, SessionResult, SettlementSink};
use crate::world::World;
use bytes::Bytes;
use fixedbitset::FixedBitSet;
use glam::Vec2;
use protocol::Hue;
use protocol::packets::{self, ClientPacket, StakeEventKind};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

/// Ticks between leaderboard broadcasts.
const LEADERBOARD_INTERVAL: Tick = 25;
const LEADERBOARD_SIZE: usize = 10;
/// Longest accepted heading-target offset from the centroid.
const MAX_TARGET_DISTANCE: f32 = 2000.0;

/// A packet addressed to a single client; connection tasks filter by id.
#[derive(Debug, Clone)]
pub struct TargetedMessage {
    pub client_id: u32,
    pub payload: Bytes,
}

/// A packet addressed to every connected client.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    pub payload: Bytes,
}

struct EatEvent {
    eater: u32,
    eater_cell: u32,
    victim: u32,
    victim_cell: u32,
}

/// Authoritative game state; one instance per arena.
///
/// Everything here is mutated only from the tick loop (or from the packet
/// path, which the caller serializes with the same lock), so the simulation
/// itself is single-threaded per tick.
pub struct GameState {
    pub config: Config,
    pub world: World,
    pub clients: HashMap<u32, Client>,
    pub tick_count: Tick,
    next_client_id: u32,
    settlement: Arc<dyn SettlementSink>,
    targeted_tx: broadcast::Sender<TargetedMessage>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    outbox: Vec<TargetedMessage>,
}

impl GameState {
    pub fn new(
        config: Config,
        settlement: Arc<dyn SettlementSink>,
        targeted_tx: broadcast::Sender<TargetedMessage>,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
    ) -> Self {
        let world = World::new(&config);
        Self {
            config,
            world,
            clients: HashMap::new(),
            tick_count: 0,
            next_client_id: 1,
            settlement,
            targeted_tx,
            broadcast_tx,
            outbox: Vec::new(),
        }
    }

    pub fn add_client(&mut self, addr: std::net::SocketAddr) -> u32 {
        let id = self.next_client_id;
        self.next_client_id = self.next_client_id.wrapping_add(1).max(1);
        self.clients.insert(id, Client::new(id, addr));
        info!(client_id = id, %addr, "client connected");
        id
    }

    /// Transport-level disconnect. Connection faults never attempt
    /// settlement; the player's cells are simply removed.
    pub fn remove_client(&mut self, client_id: u32) {
        self.clients.remove(&client_id);
        if self.world.players.remove(&client_id).is_some() {
            info!(client_id, "player removed on disconnect");
        }
    }

    /// Handle one inbound packet. Gameplay intent is recorded against the
    /// player's pending state and consumed at the next tick boundary.
    pub fn handle_packet(&mut self, client_id: u32, data: &[u8]) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };
        client.touch();

        let packet = match ClientPacket::parse(data) {
            Ok(packet) => packet,
            Err(err) => {
                debug!(client_id, %err, "dropping malformed packet");
                return;
            }
        };

        match packet {
            ClientPacket::Respawn { name, stake } => self.handle_respawn(client_id, name, stake),
            ClientPacket::SetTarget { x, y } => {
                if let Some(player) = self.world.players.get_mut(&client_id) {
                    let target = Vec2::new(x, y);
                    player.target = target.clamp_length_max(MAX_TARGET_DISTANCE);
                }
            }
            ClientPacket::Split => {
                if let Some(player) = self.world.players.get_mut(&client_id) {
                    player.pending.split = true;
                }
            }
            ClientPacket::Eject => {
                if let Some(player) = self.world.players.get_mut(&client_id) {
                    player.pending.eject = true;
                }
            }
            ClientPacket::Ping => {}
            ClientPacket::Leave => self.handle_leave(client_id),
        }
    }

    fn handle_respawn(&mut self, client_id: u32, name: String, stake: Option<f64>) {
        if self.world.players.get(&client_id).is_some_and(|p| p.is_alive()) {
            return;
        }
        let name: String = name
            .chars()
            .filter(|c| !c.is_control())
            .take(self.config.player.max_nick_length)
            .collect();
        let stake = round_stake(
            stake
                .unwrap_or(self.config.stake.min)
                .clamp(self.config.stake.min, self.config.stake.max),
        );
        let mut rng = rand::rng();
        let hue = Hue::new(rng.random_range(0..360));
        self.world.players.remove(&client_id);
        self.world.spawn_player(
            client_id,
            name,
            hue,
            stake,
            &self.config,
            self.tick_count,
            &mut rng,
        );
        info!(client_id, stake, "player spawned");
        self.queue(
            client_id,
            packets::build_welcome(
                client_id,
                self.config.border.width,
                self.config.border.height,
            )
            .finish(),
        );
        self.flush_outbox();
    }

    /// Voluntary exit: the player cashes out with whatever stake remains.
    fn handle_leave(&mut self, client_id: u32) {
        let Some(player) = self.world.players.remove(&client_id) else {
            return;
        };
        let final_stake = round_stake(player.total_stake());
        let ok = self.settle(&player, final_stake, ResultKind::VoluntaryExit);
        self.queue(
            client_id,
            packets::build_settlement_result(ok, final_stake).finish(),
        );
        info!(client_id, final_stake, "player cashed out");
        self.flush_outbox();
    }

    /// Dispatch a session result; a collaborator fault is reported but never
    /// blocks or rolls back the simulation.
    fn settle(&self, player: &Player, final_stake: f64, kind: ResultKind) -> bool {
        let ticks_alive = self.tick_count.saturating_sub(player.spawned_at);
        let result = SessionResult {
            player_id: player.id,
            final_stake,
            duration_alive: Duration::from_secs_f64(
                ticks_alive as f64 * self.config.dt() as f64,
            ),
            kind,
        };
        match self.settlement.settle(result) {
            Ok(()) => true,
            Err(err) => {
                warn!(player_id = player.id, %err, "settlement failed");
                false
            }
        }
    }

    fn queue(&mut self, client_id: u32, payload: Bytes) {
        self.outbox.push(TargetedMessage { client_id, payload });
    }

    fn flush_outbox(&mut self) {
        for message in self.outbox.drain(..) {
            let _ = self.targeted_tx.send(message);
        }
    }

    /// Run one simulation step. All passes execute serially; snapshots go
    /// out only after the world has fully settled.
    pub fn tick(&mut self) {
        self.tick_count += 1;
        let now = self.tick_count;

        self.sweep_heartbeats();
        self.consume_pending_inputs(now);
        self.move_players(now);
        self.update_loose_entities();
        self.eat_world_objects(now);
        self.process_predation(now);
        self.update_hazard();
        self.correct_stake_drift();
        {
            let mut rng = rand::rng();
            self.world.balance_mass(&self.config, &mut rng);
        }
        self.emit_snapshots(now);
        if now % LEADERBOARD_INTERVAL == 0 {
            self.emit_leaderboard();
        }
        self.flush_outbox();
    }

    /// Drop clients that have gone silent past the heartbeat timeout.
    fn sweep_heartbeats(&mut self) {
        let timeout = self.config.server.heartbeat_timeout_secs;
        let stale: Vec<u32> = self
            .clients
            .values()
            .filter(|c| c.idle_secs() > timeout)
            .map(|c| c.id)
            .collect();
        for client_id in stale {
            warn!(client_id, "heartbeat timeout");
            self.queue(
                client_id,
                packets::build_forced_disconnect("heartbeat timeout").finish(),
            );
            self.remove_client(client_id);
        }
    }

    /// Apply inputs recorded since the previous tick, at most once each.
    fn consume_pending_inputs(&mut self, now: Tick) {
        let config = &self.config;
        let world = &mut self.world;
        let ids: Vec<u32> = world.players.keys().copied().collect();
        let mut pellets = Vec::new();
        for id in ids {
            let world_ids = &mut world.ids;
            let Some(player) = world.players.get_mut(&id) else {
                continue;
            };
            let pending = std::mem::take(&mut player.pending);
            if pending.split {
                player.split_all(config, now, world_ids);
            }
            if pending.eject {
                pellets.extend(player.eject(config, now, world_ids));
            }
        }
        world.ejected.extend(pellets);
    }

    fn move_players(&mut self, now: Tick) {
        let border = self.world.border;
        let hazard = self.world.hazard.clone();
        for player in self.world.players.values_mut() {
            player.move_cells(&self.config, &border, hazard.as_ref(), now);
            player.resolve_overlaps(now);
        }
    }

    /// Advance ejected-pellet boosts and wandering bombs.
    fn update_loose_entities(&mut self) {
        let border = self.world.border;
        let decrement = self.config.player.speed_decrement;
        for pellet in &mut self.world.ejected {
            pellet.update_boost(decrement);
            pellet.position = border.clamp_cell(pellet.position, pellet.radius);
        }
        let mut rng = rand::rng();
        self.world
            .bombs
            .update(&self.config.bomb, &border, self.config.dt(), &mut rng);
    }

    /// Food, ejected mass, power-food, virus and bomb interactions.
    fn eat_world_objects(&mut self, now: Tick) {
        let config = &self.config;
        let world = &mut self.world;
        let max_mass = config.player.max_mass;

        let mut eaten_food = FixedBitSet::with_capacity(world.food.len());
        let mut eaten_ejected = FixedBitSet::with_capacity(world.ejected.len());
        let mut eaten_power = FixedBitSet::with_capacity(world.power_food.len());
        let mut eaten_viruses = FixedBitSet::with_capacity(world.viruses.len());
        // (player, cell) pairs struck by a virus or bomb this tick.
        let mut force_splits: Vec<(u32, u32, StakeEventKind)> = Vec::new();
        let mut power_hits: Vec<(u32, PowerKind)> = Vec::new();
        let mut exploded_bombs: Vec<u32> = Vec::new();

        let food = &world.food;
        let ejected = &world.ejected;
        let power_food = &world.power_food;
        let viruses = &world.viruses;
        let bombs = &world.bombs.bombs;

        for player in world.players.values_mut() {
            for cell in &mut player.cells {
                let gain_multiplier = cell.effect_multiplier(EffectKind::Mass, now);

                for (i, pellet) in food.iter().enumerate() {
                    if eaten_food.contains(i) {
                        continue;
                    }
                    if covers_center(cell.position, cell.radius(), pellet.position) {
                        eaten_food.insert(i);
                        cell.set_mass((cell.mass() + pellet.mass * gain_multiplier).min(max_mass));
                    }
                }

                for (i, pellet) in ejected.iter().enumerate() {
                    if eaten_ejected.contains(i) || !pellet.is_edible(now) {
                        continue;
                    }
                    if covers_center(cell.position, cell.radius(), pellet.position) {
                        eaten_ejected.insert(i);
                        cell.set_mass((cell.mass() + pellet.mass * gain_multiplier).min(max_mass));
                    }
                }

                for (i, power) in power_food.iter().enumerate() {
                    if eaten_power.contains(i) {
                        continue;
                    }
                    if covers_center(cell.position, cell.radius(), power.position) {
                        eaten_power.insert(i);
                        let multiplier = match power.kind {
                            PowerKind::Speed => config.power.speed_multiplier,
                            PowerKind::Mass => config.power.mass_multiplier,
                            PowerKind::Shield => 1.0,
                        };
                        cell.apply_effect(
                            power.kind.effect(),
                            now + config.secs_to_ticks(config.power.duration_secs),
                            multiplier,
                        );
                        power_hits.push((player.id, power.kind));
                    }
                }

                for (i, virus) in viruses.iter().enumerate() {
                    if eaten_viruses.contains(i) {
                        continue;
                    }
                    if engulfs(cell.position, cell.radius(), virus.position, virus.radius) {
                        eaten_viruses.insert(i);
                        force_splits.push((player.id, cell.id, StakeEventKind::VirusSplit));
                    }
                }

                for bomb in bombs.iter() {
                    if exploded_bombs.contains(&bomb.id) {
                        continue;
                    }
                    let overlap =
                        circle_overlap(cell.position, cell.radius(), bomb.position, bomb.radius);
                    if overlap.is_touching() {
                        exploded_bombs.push(bomb.id);
                        force_splits.push((player.id, cell.id, StakeEventKind::BombCollision));
                    }
                }
            }
        }

        retain_unmarked(&mut world.food, &eaten_food);
        retain_unmarked(&mut world.ejected, &eaten_ejected);
        retain_unmarked(&mut world.power_food, &eaten_power);
        retain_unmarked(&mut world.viruses, &eaten_viruses);
        for bomb_id in &exploded_bombs {
            world.bombs.remove(*bomb_id);
        }

        for (player_id, cell_id, kind) in force_splits {
            let world_ids = &mut world.ids;
            let Some(player) = world.players.get_mut(&player_id) else {
                continue;
            };
            let stake = player
                .cells
                .iter()
                .find(|c| c.id == cell_id)
                .map(|c| c.stake())
                .unwrap_or(0.0);
            let added = player.force_split(cell_id, config, now, world_ids);
            debug!(player_id, cell_id, added, "forced split");
            self.outbox.push(TargetedMessage {
                client_id: player_id,
                payload: packets::build_stake_event(kind, stake, "").finish(),
            });
        }

        for (player_id, kind) in power_hits {
            let multiplier = match kind {
                PowerKind::Speed => config.power.speed_multiplier,
                PowerKind::Mass => config.power.mass_multiplier,
                PowerKind::Shield => 1.0,
            };
            self.outbox.push(TargetedMessage {
                client_id: player_id,
                payload: packets::build_power_activated(
                    kind as u8,
                    config.power.duration_secs,
                    multiplier,
                )
                .finish(),
            });
        }
    }

    /// Predation between different players' cells.
    fn process_predation(&mut self, now: Tick) {
        // Immutable sweep first; mutation happens event by event below.
        let snapshot: Vec<(u32, u32, Vec2, f32, bool)> = self
            .world
            .players
            .values()
            .flat_map(|p| {
                p.cells
                    .iter()
                    .map(move |c| (p.id, c.id, c.position, c.radius(), c.is_protected(now)))
            })
            .collect();

        let mut consumed = FixedBitSet::with_capacity(snapshot.len());
        let mut events = Vec::new();
        for i in 0..snapshot.len() {
            for j in (i + 1)..snapshot.len() {
                let a = &snapshot[i];
                let b = &snapshot[j];
                if a.0 == b.0 || consumed.contains(i) || consumed.contains(j) {
                    continue;
                }
                // Protection voids the interaction for both sides.
                if a.4 || b.4 {
                    continue;
                }
                if engulfs(a.2, a.3, b.2, b.3) {
                    consumed.insert(j);
                    events.push(EatEvent {
                        eater: a.0,
                        eater_cell: a.1,
                        victim: b.0,
                        victim_cell: b.1,
                    });
                } else if engulfs(b.2, b.3, a.2, a.3) {
                    consumed.insert(i);
                    events.push(EatEvent {
                        eater: b.0,
                        eater_cell: b.1,
                        victim: a.0,
                        victim_cell: a.1,
                    });
                }
            }
        }

        for event in events {
            self.apply_eat_event(event, now);
        }
    }

    fn apply_eat_event(&mut self, event: EatEvent, now: Tick) {
        let config = &self.config;
        let world = &mut self.world;

        // Victim side first: rescue, or removal with transfer.
        let (victim_mass, victim_stake, victim_name, victim_died) = {
            let world_ids = &mut world.ids;
            let Some(victim) = world.players.get_mut(&event.victim) else {
                return;
            };
            if !victim.cells.iter().any(|c| c.id == event.victim_cell) {
                return;
            }
            if victim.cells.len() == 1 && victim.try_fragment_rescue(config, now, world_ids) {
                info!(player_id = victim.id, "player survived as fragments");
                let stake = victim.total_stake();
                self.outbox.push(TargetedMessage {
                    client_id: victim.id,
                    payload: packets::build_stake_event(
                        StakeEventKind::SurvivedBeingEaten,
                        stake,
                        "",
                    )
                    .finish(),
                });
                return;
            }
            let index = victim
                .cells
                .iter()
                .position(|c| c.id == event.victim_cell)
                .unwrap_or(0);
            let cell = victim.cells.remove(index);
            (
                cell.mass(),
                cell.stake(),
                victim.name.clone(),
                victim.cells.is_empty(),
            )
        };

        let stake_won = round_stake(victim_stake);
        if let Some(eater) = world.players.get_mut(&event.eater) {
            let eater_name = eater.name.clone();
            if let Some(cell) = eater.cells.iter_mut().find(|c| c.id == event.eater_cell) {
                let gain = victim_mass * cell.effect_multiplier(EffectKind::Mass, now);
                cell.set_mass((cell.mass() + gain).min(config.player.max_mass));
                cell.add_stake(stake_won);
            }
            if stake_won > 0.0 {
                eater.record_win(stake_won);
            }
            self.outbox.push(TargetedMessage {
                client_id: event.eater,
                payload: packets::build_stake_event(StakeEventKind::Ate, stake_won, &victim_name)
                    .finish(),
            });
            self.outbox.push(TargetedMessage {
                client_id: event.victim,
                payload: packets::build_stake_event(
                    StakeEventKind::WasEaten,
                    stake_won,
                    &eater_name,
                )
                .finish(),
            });
        }

        if victim_died {
            let Some(player) = self.world.players.remove(&event.victim) else {
                return;
            };
            // The last cell's stake just transferred to the eater.
            let ok = self.settle(&player, 0.0, ResultKind::Death);
            self.queue(event.victim, packets::build_death(0.0).finish());
            if !ok {
                self.queue(
                    event.victim,
                    packets::build_settlement_result(false, 0.0).finish(),
                );
            }
            info!(player_id = event.victim, "player eaten");
        }
    }

    fn update_hazard(&mut self) {
        let live = self.world.live_player_count();
        let dt = self.config.dt();
        if let Some(zone) = self.world.hazard.as_mut() {
            zone.update(live, dt);
        }
        let floor = self.config.player.default_mass;
        if let Some(zone) = &self.world.hazard {
            for player in self.world.players.values_mut() {
                player.apply_hazard_damage(zone, dt, floor);
            }
        }
    }

    /// Invariant watchdog: proportionally scale down any player whose cell
    /// stakes drifted above the entitlement ceiling.
    fn correct_stake_drift(&mut self) {
        for player in self.world.players.values_mut() {
            if let Some(excess) = player.enforce_stake_ceiling() {
                warn!(player_id = player.id, excess, "stake drift corrected");
            }
        }
    }

    fn emit_snapshots(&mut self, now: Tick) {
        let client_ids: Vec<u32> = self.clients.keys().copied().collect();
        for client_id in client_ids {
            let Some(view) = self.world.visible_snapshot(client_id, &self.config, now) else {
                continue;
            };
            self.queue(client_id, packets::build_snapshot(&view).finish());
        }
    }

    fn emit_leaderboard(&mut self) {
        let mut entries: Vec<(String, f32)> = self
            .world
            .players
            .values()
            .filter(|p| p.is_alive())
            .map(|p| (p.name.clone(), p.total_mass()))
            .collect();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        entries.truncate(LEADERBOARD_SIZE);
        let _ = self.broadcast_tx.send(BroadcastMessage {
            payload: packets::build_leaderboard(&entries).finish(),
        });
    }
}

fn retain_unmarked<T>(items: &mut Vec<T>, marked: &FixedBitSet) {
    let mut index = 0;
    items.retain(|_| {
        let keep = !marked.contains(index);
        index += 1;
        keep
    });
}

/// Drive the simulation at the configured tick rate.
///
/// The loop skips missed ticks instead of bursting to catch up, and idles
/// while no clients are connected.
pub async fn run_game_loop(state: Arc<RwLock<GameState>>) {
    let interval_ms = {
        let state = state.read().await;
        state.config.server.tick_interval_ms
    };
    let period = Duration::from_millis(interval_ms);
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut slow_ticks: u32 = 0;
    loop {
        interval.tick().await;
        let started = std::time::Instant::now();
        {
            let mut state = state.write().await;
            if state.clients.is_empty() {
                continue;
            }
            state.tick();
        }
        let elapsed = started.elapsed();
        if elapsed > period {
            slow_ticks += 1;
            if slow_ticks % 20 == 1 {
                warn!(?elapsed, "tick exceeded interval");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::{ChannelSettlement, SessionResult};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tokio::sync::mpsc;

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000)
    }

    fn game() -> (GameState, mpsc::UnboundedReceiver<SessionResult>) {
        let mut config = Config::default();
        config.hazard.enabled = false;
        config.bomb.max_amount = 0;
        config.virus.max_amount = 0;
        config.power.max_amount = 0;
        config.food.target_system_mass = 0.0;
        let (sink, rx) = ChannelSettlement::new();
        let (targeted_tx, _) = broadcast::channel(512);
        let (broadcast_tx, _) = broadcast::channel(64);
        (
            GameState::new(config, Arc::new(sink), targeted_tx, broadcast_tx),
            rx,
        )
    }

    fn spawn(game: &mut GameState, stake: f64) -> u32 {
        let id = game.add_client(test_addr());
        let mut rng = rand::rng();
        let config = game.config.clone();
        game.world
            .spawn_player(id, format!("p{id}"), Hue::new(0), stake, &config, 0, &mut rng);
        id
    }

    fn place(game: &mut GameState, id: u32, position: Vec2, mass: f32) {
        let cell = &mut game.world.players.get_mut(&id).unwrap().cells[0];
        cell.position = position;
        cell.set_mass(mass);
    }

    fn clear_protection(game: &mut GameState, id: u32) {
        for cell in &mut game.world.players.get_mut(&id).unwrap().cells {
            cell.protected_until = None;
        }
    }

    #[test]
    fn test_split_input_is_consumed_at_tick_boundary() {
        let (mut game, _rx) = game();
        let id = spawn(&mut game, 10.0);
        place(&mut game, id, Vec2::ZERO, 200.0);

        let mut w = protocol::BinaryWriter::new();
        w.put_u8(0x11);
        game.handle_packet(id, w.as_slice());
        // Not applied synchronously.
        assert_eq!(game.world.players[&id].cells.len(), 1);
        game.tick();
        assert_eq!(game.world.players[&id].cells.len(), 2);
        // Consumed exactly once.
        game.tick();
        assert_eq!(game.world.players[&id].cells.len(), 2);
    }

    #[test]
    fn test_protected_cell_cannot_be_eaten() {
        let (mut game, _rx) = game();
        let big = spawn(&mut game, 0.0);
        let small = spawn(&mut game, 5.0);
        place(&mut game, big, Vec2::ZERO, 400.0);
        place(&mut game, small, Vec2::new(5.0, 0.0), 10.0);
        clear_protection(&mut game, big);
        // The small cell keeps its spawn protection.
        game.process_predation(1);
        assert!(game.world.players.contains_key(&small));
        assert_eq!(game.world.players[&small].total_stake(), 5.0);

        clear_protection(&mut game, small);
        game.world.players.get_mut(&small).unwrap().fragment_rescue_used = true;
        game.process_predation(2);
        assert!(!game.world.players.contains_key(&small));
    }

    #[test]
    fn test_predation_transfers_stake_and_grows_ceiling() {
        let (mut game, mut rx) = game();
        let big = spawn(&mut game, 20.0);
        let small = spawn(&mut game, 7.5);
        place(&mut game, big, Vec2::ZERO, 400.0);
        place(&mut game, small, Vec2::new(5.0, 0.0), 10.0);
        clear_protection(&mut game, big);
        clear_protection(&mut game, small);
        game.world.players.get_mut(&small).unwrap().fragment_rescue_used = true;

        game.process_predation(1);
        let eater = &game.world.players[&big];
        assert_eq!(eater.total_stake(), 27.5);
        assert_eq!(eater.original_stake, 27.5);
        assert!(eater.total_stake() <= eater.original_stake);

        // Terminal death settles with zero remaining stake.
        let result = rx.try_recv().unwrap();
        assert_eq!(result.player_id, small);
        assert_eq!(result.final_stake, 0.0);
        assert_eq!(result.kind, ResultKind::Death);
    }

    #[test]
    fn test_last_cell_predation_triggers_fragment_rescue_once() {
        let (mut game, mut rx) = game();
        let big = spawn(&mut game, 0.0);
        let small = spawn(&mut game, 8.0);
        place(&mut game, big, Vec2::ZERO, 400.0);
        place(&mut game, small, Vec2::new(5.0, 0.0), 40.0);
        clear_protection(&mut game, big);
        clear_protection(&mut game, small);

        game.process_predation(1);
        let survivor = &game.world.players[&small];
        assert_eq!(survivor.cells.len(), 4);
        assert_eq!(survivor.total_stake(), 8.0);
        assert!(survivor.fragment_rescue_used);
        // Nothing transferred to the eater.
        assert_eq!(game.world.players[&big].total_stake(), 0.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_eject_input_adds_pellets_to_world() {
        let (mut game, _rx) = game();
        let id = spawn(&mut game, 0.0);
        place(&mut game, id, Vec2::ZERO, 100.0);

        let mut w = protocol::BinaryWriter::new();
        w.put_u8(0x12);
        game.handle_packet(id, w.as_slice());
        game.tick();
        assert_eq!(game.world.ejected.len(), 1);
        let expected = 100.0 - game.config.eject.mass;
        assert!((game.world.players[&id].total_mass() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_voluntary_exit_settles_remaining_stake() {
        let (mut game, mut rx) = game();
        let id = spawn(&mut game, 42.5);

        let mut w = protocol::BinaryWriter::new();
        w.put_u8(0x21);
        game.handle_packet(id, w.as_slice());
        assert!(!game.world.players.contains_key(&id));
        let result = rx.try_recv().unwrap();
        assert_eq!(result.final_stake, 42.5);
        assert_eq!(result.kind, ResultKind::VoluntaryExit);
    }

    #[test]
    fn test_disconnect_does_not_settle() {
        let (mut game, mut rx) = game();
        let id = spawn(&mut game, 42.5);
        game.remove_client(id);
        assert!(!game.world.players.contains_key(&id));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_virus_strike_splits_into_four() {
        let (mut game, _rx) = game();
        let id = spawn(&mut game, 40.0);
        place(&mut game, id, Vec2::ZERO, 180.0);
        let virus_id = game.world.ids.next();
        game.world.viruses.push(crate::entity::Virus::new(
            virus_id,
            Vec2::new(2.0, 0.0),
            100.0,
        ));

        game.eat_world_objects(1);
        let player = &game.world.players[&id];
        assert_eq!(player.cells.len(), 4);
        assert!(game.world.viruses.is_empty());
        for cell in &player.cells {
            assert_eq!(cell.mass(), 45.0);
            assert_eq!(cell.stake(), 10.0);
        }
    }

    #[test]
    fn test_respawn_resets_fragment_rescue() {
        let (mut game, _rx) = game();
        let id = spawn(&mut game, 5.0);
        game.world.players.get_mut(&id).unwrap().fragment_rescue_used = true;
        game.world.players.get_mut(&id).unwrap().cells.clear();

        let mut w = protocol::BinaryWriter::new();
        w.put_u8(0x01);
        w.put_u8(0);
        w.put_string("again");
        game.handle_packet(id, w.as_slice());
        let player = &game.world.players[&id];
        assert!(!player.fragment_rescue_used);
        assert!(player.is_alive());
    }

    #[test]
    fn test_stake_drift_watchdog_runs_every_tick() {
        let (mut game, _rx) = game();
        let id = spawn(&mut game, 10.0);
        game.world.players.get_mut(&id).unwrap().cells[0].set_stake(25.0);
        game.tick();
        let player = &game.world.players[&id];
        assert!((player.total_stake() - 10.0).abs() < 1e-9);
    }
}
