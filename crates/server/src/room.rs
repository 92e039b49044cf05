//! Room simulation.
//!
//! A room is an isolated, capacity-bounded partition of the world:
//! its own players, gems and traps, a per-batch quadtree, a
//! leaderboard, and changed-since-last-broadcast tracking for delta
//! snapshots. Rooms are mutated only through their own methods.

use crate::collision::{area_dominates, circles_overlap};
use crate::config::Config;
use crate::entity::{Collectible, Player};
use crate::spatial::{Bounds, Collidable, CollidableKind, QuadTree};
use crate::world::WorldBorder;
use protocol::{
    AnglesBuffer, CollectiblePhase, CollectibleState, Color, InputSync, LeaderboardEntry,
    PlayerState, RoomStatus, RoomDelta,
};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One simulation partition.
#[derive(Debug)]
pub struct Room {
    pub id: u32,
    config: Arc<Config>,
    pub border: WorldBorder,

    pub(crate) players: HashMap<u32, Player>,
    pub(crate) gems: HashMap<u32, Collectible>,
    pub(crate) traps: HashMap<u32, Collectible>,

    /// Next player id; unique for the room's lifetime.
    next_player_id: u32,
    /// Next gem/trap id; gems and traps share the counter so removed
    /// id lists can never alias across kinds.
    next_collectible_id: u32,

    leaderboard: Vec<LeaderboardEntry>,

    // Changed-since-last-broadcast tracking, drained by
    // `changed_status`.
    new_gems: Vec<u32>,
    removed_gems: Vec<u32>,
    new_traps: Vec<u32>,
    removed_traps: Vec<u32>,
}

impl Room {
    /// Create a room with its initial collectible population. The
    /// initial spawn is not recorded for deltas: the first member
    /// receives it in the full snapshot.
    pub fn new(id: u32, config: Arc<Config>) -> Self {
        let border = WorldBorder::new(config.world.size);
        let mut room = Self {
            id,
            border,
            players: HashMap::new(),
            gems: HashMap::with_capacity(config.room.max_gems),
            traps: HashMap::with_capacity(config.room.max_traps),
            next_player_id: 0,
            next_collectible_id: 0,
            leaderboard: Vec::new(),
            new_gems: Vec::new(),
            removed_gems: Vec::new(),
            new_traps: Vec::new(),
            removed_traps: Vec::new(),
            config,
        };
        room.spawn_gems(false);
        room.spawn_traps(false);
        room
    }

    fn next_collectible_id(&mut self) -> u32 {
        let id = self.next_collectible_id;
        self.next_collectible_id += 1;
        id
    }

    fn random_color() -> Color {
        let mut rng = rand::rng();
        Color::ALL[rng.random_range(0..Color::ALL.len())]
    }

    /// Top gems up to the configured target. `record` queues the new
    /// ids for the next delta.
    fn spawn_gems(&mut self, record: bool) {
        while self.gems.len() < self.config.room.max_gems {
            let id = self.next_collectible_id();
            let gem = Collectible::gem(
                id,
                self.border.random_position(),
                self.config.gem.radius,
                Self::random_color(),
            );
            self.gems.insert(id, gem);
            if record {
                self.new_gems.push(id);
            }
        }
    }

    fn spawn_traps(&mut self, record: bool) {
        while self.traps.len() < self.config.room.max_traps {
            let id = self.next_collectible_id();
            let trap = Collectible::trap(
                id,
                self.border.random_position(),
                self.config.trap.radius,
                Self::random_color(),
            );
            self.traps.insert(id, trap);
            if record {
                self.new_traps.push(id);
            }
        }
    }

    /// Regenerate gems up to the target count.
    pub fn generate_gems(&mut self) {
        self.spawn_gems(true);
    }

    /// Regenerate traps up to the target count.
    pub fn generate_traps(&mut self) {
        self.spawn_traps(true);
    }

    /// Add a player at a random position. The caller has already
    /// checked capacity.
    pub fn add_player(&mut self, name: Option<String>, now_ms: u64) -> u32 {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let name = name.unwrap_or_else(|| format!("Player {}", id + 1));
        let position = self
            .border
            .clamp(self.border.random_position(), self.config.player.start_radius);
        let player = Player::new(
            id,
            name,
            position,
            self.config.player.start_radius,
            self.config.player.velocity,
            now_ms,
        );
        self.players.insert(id, player);
        id
    }

    /// Remove a player (disconnect). Returns false when already gone.
    pub fn remove_player(&mut self, player_id: u32) -> bool {
        self.players.remove(&player_id).is_some()
    }

    pub fn player(&self, player_id: u32) -> Option<&Player> {
        self.players.get(&player_id)
    }

    pub fn is_player_alive(&self, player_id: u32) -> bool {
        self.players.get(&player_id).is_some_and(|p| p.alive)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.room.max_players
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.players.keys().copied()
    }

    /// Run one simulation batch for a single player. Returns the ids
    /// of players eaten while processing it (the acting player's own
    /// id included when a larger opponent consumed it).
    pub fn simulate_player(
        &mut self,
        player_id: u32,
        buffer: &AnglesBuffer,
        now_ms: u64,
    ) -> Vec<u32> {
        let physics_tick = self.config.timing.physics_tick_ms;
        let Some(player) = self.players.get_mut(&player_id) else {
            return Vec::new();
        };

        let prev_timestamp = player.last_angle_timestamp;
        player.last_angle_id = buffer.id;
        player.last_angle_timestamp = buffer.timestamp;

        let accepted = check_angles(buffer, prev_timestamp, now_ms, physics_tick);
        player.force_position = !accepted;
        if !accepted {
            debug!(
                room = self.id,
                player = player_id,
                samples = buffer.angles.len(),
                "rejected implausible input batch"
            );
            return Vec::new();
        }

        // One index per batch; collectible staleness is resolved
        // against the live maps, player positions against the live
        // players.
        let index = self.build_index();
        let mut eaten = Vec::new();

        for &angle in &buffer.angles {
            let Some(player) = self.players.get_mut(&player_id) else {
                break;
            };
            player.angle = angle;
            player.step(&self.border);
            self.resolve_collisions(player_id, &index, &mut eaten);
            if eaten.contains(&player_id) {
                break;
            }
        }

        self.update_leaderboard();
        eaten
    }

    /// Rebuild the spatial index over every live gem, trap and player.
    fn build_index(&self) -> QuadTree {
        let bounds = Bounds::new(
            self.border.min_x,
            self.border.min_y,
            self.border.max_x,
            self.border.max_y,
        );
        let mut tree = QuadTree::new(
            bounds,
            self.config.quadtree.max_objects,
            self.config.quadtree.max_levels,
        );
        for gem in self.gems.values() {
            tree.insert(Collidable::new(
                CollidableKind::Gem,
                gem.id,
                gem.position.x,
                gem.position.y,
                gem.radius,
            ));
        }
        for trap in self.traps.values() {
            tree.insert(Collidable::new(
                CollidableKind::Trap,
                trap.id,
                trap.position.x,
                trap.position.y,
                trap.radius,
            ));
        }
        for player in self.players.values() {
            tree.insert(Collidable::new(
                CollidableKind::Player,
                player.id,
                player.position.x,
                player.position.y,
                player.radius,
            ));
        }
        tree
    }

    /// Resolve all collisions for one player after a physics step.
    fn resolve_collisions(&mut self, player_id: u32, index: &QuadTree, eaten: &mut Vec<u32>) {
        let Some(actor) = self.players.get(&player_id) else {
            return;
        };
        let max_collectible = self.config.gem.radius.max(self.config.trap.radius);
        let region = Bounds::from_center(
            actor.position.x,
            actor.position.y,
            actor.radius + max_collectible,
        );

        for item in index.query(&region) {
            // Re-read the actor every iteration; it grows as it eats
            // and may itself have been eaten.
            let Some(actor) = self.players.get(&player_id) else {
                return;
            };
            let (actor_pos, actor_radius) = (actor.position, actor.radius);

            match item.kind {
                CollidableKind::Gem => {
                    // Stale index entries for already-eaten gems fall
                    // through here as a no-op.
                    let Some(gem) = self.gems.get(&item.id) else {
                        continue;
                    };
                    if circles_overlap(actor_pos, actor_radius, gem.position, gem.radius) {
                        self.eat_gem(player_id, item.id);
                    }
                }
                CollidableKind::Trap => {
                    let Some(trap) = self.traps.get(&item.id) else {
                        continue;
                    };
                    if circles_overlap(actor_pos, actor_radius, trap.position, trap.radius) {
                        self.hit_trap(player_id, item.id);
                    }
                }
                CollidableKind::Player => {
                    if item.id == player_id {
                        continue;
                    }
                    let Some(other) = self.players.get(&item.id) else {
                        continue;
                    };
                    if !other.alive {
                        continue;
                    }
                    // The index holds positions from the start of the
                    // batch; test against live state.
                    let (other_pos, other_radius) = (other.position, other.radius);
                    if !circles_overlap(actor_pos, actor_radius, other_pos, other_radius) {
                        continue;
                    }
                    let margin = self.config.player.eat_margin;
                    // The margin is strict, so at most one direction
                    // can dominate; near-equal areas eliminate nobody.
                    if area_dominates(actor_radius, other_radius, margin) {
                        self.eat_player(player_id, item.id);
                        eaten.push(item.id);
                    } else if area_dominates(other_radius, actor_radius, margin) {
                        self.eat_player(item.id, player_id);
                        eaten.push(player_id);
                        return;
                    }
                }
            }
        }
    }

    /// Remove an eaten gem and reward the eater. Removing an id that
    /// is already gone is a silent no-op.
    fn eat_gem(&mut self, player_id: u32, gem_id: u32) {
        let Some(gem) = self.gems.remove(&gem_id) else {
            return;
        };
        // A gem eaten before its creation was ever broadcast is
        // dropped from the added set instead of entering the removed
        // set; clients never saw it.
        if let Some(pos) = self.new_gems.iter().position(|&id| id == gem_id) {
            self.new_gems.swap_remove(pos);
        } else {
            self.removed_gems.push(gem_id);
        }
        if let Some(player) = self.players.get_mut(&player_id) {
            player.score += self.config.gem.reward;
            player.grow(gem.radius);
        }
    }

    /// Remove a sprung trap and shrink the player, floored at the
    /// configured minimum radius.
    fn hit_trap(&mut self, player_id: u32, trap_id: u32) {
        let Some(trap) = self.traps.remove(&trap_id) else {
            return;
        };
        if let Some(pos) = self.new_traps.iter().position(|&id| id == trap_id) {
            self.new_traps.swap_remove(pos);
        } else {
            self.removed_traps.push(trap_id);
        }
        if let Some(player) = self.players.get_mut(&player_id) {
            player.shrink(trap.radius, self.config.player.min_radius);
        }
    }

    /// Transfer the loser's score to the winner and remove the loser.
    fn eat_player(&mut self, winner_id: u32, loser_id: u32) {
        let Some(loser) = self.players.get(&loser_id) else {
            return;
        };
        let (loser_score, loser_radius) = (loser.score, loser.radius);

        if let Some(winner) = self.players.get_mut(&winner_id) {
            winner.score += loser_score;
            winner.grow(loser_radius);
        }
        if let Some(loser) = self.players.get_mut(&loser_id) {
            loser.alive = false;
        }
        self.players.remove(&loser_id);
        debug!(
            room = self.id,
            winner = winner_id,
            loser = loser_id,
            transferred = loser_score,
            "player eaten"
        );
    }

    /// Recompute the top-N leaderboard.
    fn update_leaderboard(&mut self) {
        let mut entries: Vec<LeaderboardEntry> = self
            .players
            .values()
            .map(|p| LeaderboardEntry {
                player: p.id,
                score: p.score,
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.player.cmp(&b.player)));
        entries.truncate(self.config.room.leaderboard_size);
        self.leaderboard = entries;
    }

    fn player_state(player: &Player) -> PlayerState {
        PlayerState {
            id: player.id,
            name: player.name.clone(),
            x: player.position.x,
            y: player.position.y,
            radius: player.radius,
            angle: player.angle,
            score: player.score,
            color: player.color,
            sync: InputSync {
                last_angle_id: player.last_angle_id,
                last_angle_timestamp: player.last_angle_timestamp,
                force_position: player.force_position,
            },
        }
    }

    fn collectible_state(c: &Collectible, phase: CollectiblePhase) -> CollectibleState {
        CollectibleState {
            id: c.id,
            x: c.position.x,
            y: c.position.y,
            radius: c.radius,
            color: c.color,
            phase,
        }
    }

    /// Full snapshot for a newly joined player. Does not touch the
    /// delta tracking sets.
    pub fn initial_status(&self) -> RoomStatus {
        RoomStatus {
            players: self.players.values().map(Self::player_state).collect(),
            gems: self
                .gems
                .values()
                .map(|g| Self::collectible_state(g, CollectiblePhase::Active))
                .collect(),
            traps: self
                .traps
                .values()
                .map(|t| Self::collectible_state(t, CollectiblePhase::Active))
                .collect(),
            leaderboard: self.leaderboard.clone(),
        }
    }

    /// Delta since the previous call. Drains the tracking sets and
    /// clears resync markers, so every change is reported exactly
    /// once.
    pub fn changed_status(&mut self) -> RoomDelta {
        let new_gems = std::mem::take(&mut self.new_gems)
            .into_iter()
            .filter_map(|id| self.gems.get(&id))
            .map(|g| Self::collectible_state(g, CollectiblePhase::New))
            .collect();
        let new_traps = std::mem::take(&mut self.new_traps)
            .into_iter()
            .filter_map(|id| self.traps.get(&id))
            .map(|t| Self::collectible_state(t, CollectiblePhase::New))
            .collect();

        let delta = RoomDelta {
            players: self.players.values().map(Self::player_state).collect(),
            new_gems,
            removed_gem_ids: std::mem::take(&mut self.removed_gems),
            new_traps,
            removed_trap_ids: std::mem::take(&mut self.removed_traps),
            leaderboard: self.leaderboard.clone(),
        };

        for player in self.players.values_mut() {
            player.force_position = false;
        }
        delta
    }
}

/// Plausibility check for one input batch: the timestamp must not be
/// in the future, and the sample count must fit in the elapsed time
/// at one sample per physics tick, with one sample of slack for clock
/// skew.
fn check_angles(
    buffer: &AnglesBuffer,
    prev_timestamp: u64,
    now_ms: u64,
    physics_tick_ms: u64,
) -> bool {
    if buffer.timestamp > now_ms {
        return false;
    }
    let elapsed = buffer.timestamp.saturating_sub(prev_timestamp);
    let plausible = elapsed.div_ceil(physics_tick_ms) as usize + 1;
    buffer.angles.len() <= plausible
}
