//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub border: BorderConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub virus: VirusConfig,
    #[serde(default)]
    pub eject: EjectConfig,
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default)]
    pub hazard: HazardConfig,
    #[serde(default)]
    pub bomb: BombConfig,
    #[serde(default)]
    pub stake: StakeConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Seconds per simulation tick.
    #[inline]
    pub fn dt(&self) -> f32 {
        self.server.tick_interval_ms as f32 / 1000.0
    }

    /// Convert a second-valued duration to whole ticks (at least one).
    #[inline]
    pub fn secs_to_ticks(&self, secs: f32) -> u64 {
        ((secs * 1000.0 / self.server.tick_interval_ms as f32).ceil() as u64).max(1)
    }
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Server name shown to clients.
    #[serde(default = "default_name")]
    pub name: String,
    /// Tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Seconds without any packet before a player is dropped.
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            name: default_name(),
            tick_interval_ms: default_tick_interval(),
            heartbeat_timeout_secs: default_heartbeat_timeout(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    8
}
fn default_name() -> String {
    "Stake Arena".to_string()
}
fn default_tick_interval() -> u64 {
    50
}
fn default_heartbeat_timeout() -> f32 {
    30.0
}

/// World border configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BorderConfig {
    #[serde(default = "default_border_size")]
    pub width: f32,
    #[serde(default = "default_border_size")]
    pub height: f32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            width: default_border_size(),
            height: default_border_size(),
        }
    }
}

fn default_border_size() -> f32 {
    5000.0
}

/// Player tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Mass a fresh spawn (and the hazard damage floor) uses.
    #[serde(default = "default_player_mass")]
    pub default_mass: f32,
    /// Per-cell mass ceiling; gains beyond it are discarded.
    #[serde(default = "default_player_max_mass")]
    pub max_mass: f32,
    /// Hard cap on simultaneous cells.
    #[serde(default = "default_player_max_cells")]
    pub max_cells: usize,
    /// Minimum cell mass required before a user split halves it.
    #[serde(default = "default_player_min_split_mass")]
    pub min_split_mass: f32,
    /// Speed a freshly split cell starts with.
    #[serde(default = "default_player_split_speed")]
    pub split_speed: f32,
    /// Per-tick decrement applied while above the speed floor.
    #[serde(default = "default_player_speed_decrement")]
    pub speed_decrement: f32,
    /// Speed floor; below it speed follows the mass slowdown curve.
    #[serde(default = "default_player_min_speed")]
    pub min_speed: f32,
    /// Logarithm base for the mass slowdown curve.
    #[serde(default = "default_player_slow_base")]
    pub slow_base: f32,
    /// Approach distance under which the step is scaled down.
    #[serde(default = "default_player_min_distance")]
    pub min_distance: f32,
    /// Seconds after a split during which sibling cells repel.
    #[serde(default = "default_player_merge_cooldown")]
    pub merge_cooldown_secs: f32,
    /// Seconds of eat-immunity granted to spawns and rescue fragments.
    #[serde(default = "default_player_protection")]
    pub protection_secs: f32,
    /// Global event speed multiplier applied to every cell.
    #[serde(default = "default_event_speed_multiplier")]
    pub event_speed_multiplier: f32,
    #[serde(default = "default_max_nick_length")]
    pub max_nick_length: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_mass: default_player_mass(),
            max_mass: default_player_max_mass(),
            max_cells: default_player_max_cells(),
            min_split_mass: default_player_min_split_mass(),
            split_speed: default_player_split_speed(),
            speed_decrement: default_player_speed_decrement(),
            min_speed: default_player_min_speed(),
            slow_base: default_player_slow_base(),
            min_distance: default_player_min_distance(),
            merge_cooldown_secs: default_player_merge_cooldown(),
            protection_secs: default_player_protection(),
            event_speed_multiplier: default_event_speed_multiplier(),
            max_nick_length: default_max_nick_length(),
        }
    }
}

fn default_player_mass() -> f32 {
    10.0
}
fn default_player_max_mass() -> f32 {
    500.0
}
fn default_player_max_cells() -> usize {
    4
}
fn default_player_min_split_mass() -> f32 {
    36.0
}
fn default_player_split_speed() -> f32 {
    25.0
}
fn default_player_speed_decrement() -> f32 {
    0.5
}
fn default_player_min_speed() -> f32 {
    6.25
}
fn default_player_slow_base() -> f32 {
    4.5
}
fn default_player_min_distance() -> f32 {
    50.0
}
fn default_player_merge_cooldown() -> f32 {
    15.0
}
fn default_player_protection() -> f32 {
    6.0
}
fn default_event_speed_multiplier() -> f32 {
    1.0
}
fn default_max_nick_length() -> usize {
    25
}

/// Food configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    /// Mass of one pellet.
    #[serde(default = "default_food_mass")]
    pub mass: f32,
    /// Hard cap on pellet count.
    #[serde(default = "default_food_max_amount")]
    pub max_amount: usize,
    /// Total system mass (food + ejected + players) the balancer aims for.
    #[serde(default = "default_target_system_mass")]
    pub target_system_mass: f32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            mass: default_food_mass(),
            max_amount: default_food_max_amount(),
            target_system_mass: default_target_system_mass(),
        }
    }
}

fn default_food_mass() -> f32 {
    1.0
}
fn default_food_max_amount() -> usize {
    1200
}
fn default_target_system_mass() -> f32 {
    2000.0
}

/// Virus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirusConfig {
    #[serde(default = "default_virus_mass")]
    pub mass: f32,
    #[serde(default = "default_virus_max_amount")]
    pub max_amount: usize,
}

impl Default for VirusConfig {
    fn default() -> Self {
        Self {
            mass: default_virus_mass(),
            max_amount: default_virus_max_amount(),
        }
    }
}

fn default_virus_mass() -> f32 {
    100.0
}
fn default_virus_max_amount() -> usize {
    10
}

/// Ejected mass configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EjectConfig {
    /// Mass of one ejected pellet.
    #[serde(default = "default_eject_mass")]
    pub mass: f32,
    /// Boost speed of a fresh pellet.
    #[serde(default = "default_eject_speed")]
    pub speed: f32,
}

impl Default for EjectConfig {
    fn default() -> Self {
        Self {
            mass: default_eject_mass(),
            speed: default_eject_speed(),
        }
    }
}

fn default_eject_mass() -> f32 {
    12.0
}
fn default_eject_speed() -> f32 {
    25.0
}

/// Power-food configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PowerConfig {
    #[serde(default = "default_power_max_amount")]
    pub max_amount: usize,
    #[serde(default = "default_power_duration")]
    pub duration_secs: f32,
    #[serde(default = "default_power_speed_multiplier")]
    pub speed_multiplier: f32,
    #[serde(default = "default_power_mass_multiplier")]
    pub mass_multiplier: f32,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            max_amount: default_power_max_amount(),
            duration_secs: default_power_duration(),
            speed_multiplier: default_power_speed_multiplier(),
            mass_multiplier: default_power_mass_multiplier(),
        }
    }
}

fn default_power_max_amount() -> usize {
    5
}
fn default_power_duration() -> f32 {
    10.0
}
fn default_power_speed_multiplier() -> f32 {
    1.5
}
fn default_power_mass_multiplier() -> f32 {
    2.0
}

/// Hazard-zone configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HazardConfig {
    #[serde(default = "default_hazard_enabled")]
    pub enabled: bool,
    /// Target radius for one player or fewer.
    #[serde(default = "default_hazard_min_radius")]
    pub min_radius: f32,
    /// Target radius for two or three players.
    #[serde(default = "default_hazard_base_radius")]
    pub base_radius: f32,
    /// Radius added per player above three.
    #[serde(default = "default_hazard_radius_per_player")]
    pub radius_per_player: f32,
    #[serde(default = "default_hazard_max_radius")]
    pub max_radius: f32,
    /// Maximum radius change per second.
    #[serde(default = "default_hazard_shrink_rate")]
    pub shrink_rate_per_sec: f32,
    /// Mass lost per second by cells outside the zone.
    #[serde(default = "default_hazard_damage")]
    pub damage_per_sec: f32,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            enabled: default_hazard_enabled(),
            min_radius: default_hazard_min_radius(),
            base_radius: default_hazard_base_radius(),
            radius_per_player: default_hazard_radius_per_player(),
            max_radius: default_hazard_max_radius(),
            shrink_rate_per_sec: default_hazard_shrink_rate(),
            damage_per_sec: default_hazard_damage(),
        }
    }
}

fn default_hazard_enabled() -> bool {
    true
}
fn default_hazard_min_radius() -> f32 {
    1500.0
}
fn default_hazard_base_radius() -> f32 {
    2500.0
}
fn default_hazard_radius_per_player() -> f32 {
    400.0
}
fn default_hazard_max_radius() -> f32 {
    4000.0
}
fn default_hazard_shrink_rate() -> f32 {
    40.0
}
fn default_hazard_damage() -> f32 {
    10.0
}

/// Bomb-field configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BombConfig {
    #[serde(default = "default_bomb_max_amount")]
    pub max_amount: usize,
    #[serde(default = "default_bomb_radius")]
    pub radius: f32,
    /// Travel speed in units per second.
    #[serde(default = "default_bomb_speed")]
    pub speed: f32,
    /// Per-tick probability of picking a new wander direction.
    #[serde(default = "default_bomb_turn_chance")]
    pub turn_chance: f32,
}

impl Default for BombConfig {
    fn default() -> Self {
        Self {
            max_amount: default_bomb_max_amount(),
            radius: default_bomb_radius(),
            speed: default_bomb_speed(),
            turn_chance: default_bomb_turn_chance(),
        }
    }
}

fn default_bomb_max_amount() -> usize {
    3
}
fn default_bomb_radius() -> f32 {
    30.0
}
fn default_bomb_speed() -> f32 {
    80.0
}
fn default_bomb_turn_chance() -> f32 {
    0.02
}

/// Stake limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StakeConfig {
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_stake_max")]
    pub max: f64,
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: default_stake_max(),
        }
    }
}

fn default_stake_max() -> f64 {
    1000.0
}
