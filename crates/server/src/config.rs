//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub room: RoomConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub gem: GemConfig,
    #[serde(default)]
    pub trap: TrapConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub quadtree: QuadTreeConfig,
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
}

/// Networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum simultaneous connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
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

/// World geometry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    /// Side length of the square world, centered on the origin.
    #[serde(default = "default_world_size")]
    pub size: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: default_world_size(),
        }
    }
}

fn default_world_size() -> f32 {
    6000.0
}

/// Per-room population limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoomConfig {
    #[serde(default = "default_room_max_players")]
    pub max_players: usize,
    /// Target live gem count, topped up by the regeneration tick.
    #[serde(default = "default_room_max_gems")]
    pub max_gems: usize,
    /// Target live trap count.
    #[serde(default = "default_room_max_traps")]
    pub max_traps: usize,
    /// Leaderboard rows kept and broadcast.
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: default_room_max_players(),
            max_gems: default_room_max_gems(),
            max_traps: default_room_max_traps(),
            leaderboard_size: default_leaderboard_size(),
        }
    }
}

fn default_room_max_players() -> usize {
    5
}
fn default_room_max_gems() -> usize {
    200
}
fn default_room_max_traps() -> usize {
    20
}
fn default_leaderboard_size() -> usize {
    5
}

/// Player physics parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_start_radius")]
    pub start_radius: f32,
    /// Lower bound enforced when traps shrink a player.
    #[serde(default = "default_player_min_radius")]
    pub min_radius: f32,
    /// World units traveled per physics step.
    #[serde(default = "default_player_velocity")]
    pub velocity: f32,
    /// Area ratio a player must exceed to eat another player.
    #[serde(default = "default_eat_margin")]
    pub eat_margin: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_radius: default_player_start_radius(),
            min_radius: default_player_min_radius(),
            velocity: default_player_velocity(),
            eat_margin: default_eat_margin(),
        }
    }
}

fn default_player_start_radius() -> f32 {
    30.0
}
fn default_player_min_radius() -> f32 {
    15.0
}
fn default_player_velocity() -> f32 {
    5.0
}
fn default_eat_margin() -> f32 {
    1.1
}

/// Gem parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GemConfig {
    #[serde(default = "default_gem_radius")]
    pub radius: f32,
    /// Score granted per eaten gem.
    #[serde(default = "default_gem_reward")]
    pub reward: u32,
}

impl Default for GemConfig {
    fn default() -> Self {
        Self {
            radius: default_gem_radius(),
            reward: default_gem_reward(),
        }
    }
}

fn default_gem_radius() -> f32 {
    9.0
}
fn default_gem_reward() -> u32 {
    1
}

/// Trap parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrapConfig {
    #[serde(default = "default_trap_radius")]
    pub radius: f32,
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            radius: default_trap_radius(),
        }
    }
}

fn default_trap_radius() -> f32 {
    20.0
}

/// Scheduled task periods and the fixed physics cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Duration of one physics step; also the plausibility bound for
    /// input batches (one angle sample per step).
    #[serde(default = "default_physics_tick_ms")]
    pub physics_tick_ms: u64,
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,
    #[serde(default = "default_gem_regen_interval_ms")]
    pub gem_regen_interval_ms: u64,
    #[serde(default = "default_trap_regen_interval_ms")]
    pub trap_regen_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            physics_tick_ms: default_physics_tick_ms(),
            broadcast_interval_ms: default_broadcast_interval_ms(),
            gem_regen_interval_ms: default_gem_regen_interval_ms(),
            trap_regen_interval_ms: default_trap_regen_interval_ms(),
        }
    }
}

fn default_physics_tick_ms() -> u64 {
    15
}
fn default_broadcast_interval_ms() -> u64 {
    40
}
fn default_gem_regen_interval_ms() -> u64 {
    10_000
}
fn default_trap_regen_interval_ms() -> u64 {
    10_000
}

/// Spatial index tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuadTreeConfig {
    /// Objects a node holds before subdividing.
    #[serde(default = "default_quadtree_max_objects")]
    pub max_objects: usize,
    /// Maximum subdivision depth.
    #[serde(default = "default_quadtree_max_levels")]
    pub max_levels: u32,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            max_objects: default_quadtree_max_objects(),
            max_levels: default_quadtree_max_levels(),
        }
    }
}

fn default_quadtree_max_objects() -> usize {
    15
}

fn default_quadtree_max_levels() -> u32 {
    5
}
