//! Room registry and connection dispatch.
//!
//! Owns every room plus the connection -> (room, player) side table.
//! All mutation funnels through these methods, invoked under the one
//! registry lock, so rooms never observe each other's state.

use crate::config::Config;
use crate::room::Room;
use protocol::{AnglesBuffer, ServerEvent};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Outbound handle for one connection. Sends never block; a dropped
/// receiver ends the connection task.
pub type EventSender = UnboundedSender<ServerEvent>;

/// Where a connection's player lives.
#[derive(Debug)]
struct Session {
    room_id: u32,
    player_id: u32,
    tx: EventSender,
}

/// Registry state: rooms, sessions and the reverse player index.
pub struct RoomRegistry {
    config: Arc<Config>,
    /// Ordered so new-player assignment scans rooms first-fit.
    rooms: BTreeMap<u32, Room>,
    next_room_id: u32,
    sessions: HashMap<u64, Session>,
    /// (room, player) -> connection, for targeted notifications.
    player_conns: HashMap<(u32, u32), u64>,
}

impl RoomRegistry {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            rooms: BTreeMap::new(),
            next_room_id: 0,
            sessions: HashMap::new(),
            player_conns: HashMap::new(),
        }
    }

    /// Assign a new connection to the first room with spare capacity,
    /// creating a room when none qualifies, and send it the initial
    /// full snapshot.
    pub fn add_new_player(
        &mut self,
        conn_id: u64,
        name: Option<String>,
        tx: EventSender,
        now_ms: u64,
    ) {
        if self.sessions.contains_key(&conn_id) {
            // Duplicate subscribe from the same connection.
            return;
        }

        let room_id = match self.rooms.values().find(|room| !room.is_full()) {
            Some(room) => room.id,
            None => {
                let id = self.next_room_id;
                self.next_room_id += 1;
                self.rooms.insert(id, Room::new(id, Arc::clone(&self.config)));
                info!(room = id, "created room");
                id
            }
        };

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        let player_id = room.add_player(name, now_ms);
        let player_name = room
            .player(player_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        info!(room = room_id, player = player_id, name = %player_name, "player joined");

        let status = room.initial_status();
        // A send failure means the connection is already gone; the
        // disconnect path will clean the session up.
        let _ = tx.send(ServerEvent::InitialGameStatus {
            room_id,
            player_id,
            name: player_name,
            server_time: now_ms,
            status,
        });

        self.sessions.insert(
            conn_id,
            Session {
                room_id,
                player_id,
                tx,
            },
        );
        self.player_conns.insert((room_id, player_id), conn_id);
    }

    /// Route an input batch to the owning room. Unknown connections
    /// are an expected disconnect race, not an error.
    pub fn update_player_position(&mut self, conn_id: u64, buffer: &AnglesBuffer, now_ms: u64) {
        let Some(session) = self.sessions.get(&conn_id) else {
            return;
        };
        let (room_id, player_id) = (session.room_id, session.player_id);
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        if !room.is_player_alive(player_id) {
            return;
        }

        let eaten = room.simulate_player(player_id, buffer, now_ms);
        for loser_id in eaten {
            self.notify_game_over(room_id, loser_id);
        }
    }

    /// Tell an eaten player and drop its session; closing the
    /// outbound channel closes the socket.
    fn notify_game_over(&mut self, room_id: u32, player_id: u32) {
        let Some(conn_id) = self.player_conns.remove(&(room_id, player_id)) else {
            return;
        };
        if let Some(session) = self.sessions.remove(&conn_id) {
            let _ = session.tx.send(ServerEvent::GameOver {});
        }
        debug!(room = room_id, player = player_id, "player eliminated");
    }

    /// Handle a disconnect. Unknown connections are silently ignored;
    /// an empty room is destroyed.
    pub fn remove_player(&mut self, conn_id: u64) {
        let Some(session) = self.sessions.remove(&conn_id) else {
            return;
        };
        let (room_id, player_id) = (session.room_id, session.player_id);
        self.player_conns.remove(&(room_id, player_id));

        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.remove_player(player_id);
            info!(room = room_id, player = player_id, "player left");
            if room.is_empty() {
                self.rooms.remove(&room_id);
                info!(room = room_id, "destroyed empty room");
            }
        }
    }

    /// Build one delta per room and fan it out to every member.
    pub fn broadcast_tick(&mut self) {
        for room in self.rooms.values_mut() {
            let delta = room.changed_status();
            let room_id = room.id;
            for player_id in room.player_ids() {
                let Some(conn_id) = self.player_conns.get(&(room_id, player_id)) else {
                    continue;
                };
                if let Some(session) = self.sessions.get(conn_id) {
                    let _ = session.tx.send(ServerEvent::GameStatus {
                        room_id,
                        status: delta.clone(),
                    });
                }
            }
        }
    }

    /// Top up gems in every populated room.
    pub fn regenerate_gems(&mut self) {
        for room in self.rooms.values_mut() {
            if !room.is_empty() {
                room.generate_gems();
            }
        }
    }

    /// Top up traps in every populated room.
    pub fn regenerate_traps(&mut self) {
        for room in self.rooms.values_mut() {
            if !room.is_empty() {
                room.generate_traps();
            }
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::ServerEvent;
    use tokio::sync::mpsc;

    const NOW: u64 = 1_000_000;

    fn registry() -> RoomRegistry {
        let mut config = Config::default();
        config.room.max_gems = 4;
        config.room.max_traps = 0;
        RoomRegistry::new(Arc::new(config))
    }

    fn subscribe(
        registry: &mut RoomRegistry,
        conn_id: u64,
    ) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry.add_new_player(conn_id, None, tx, NOW);
        rx
    }

    #[test]
    fn join_sends_the_initial_snapshot() {
        let mut registry = registry();
        let mut rx = subscribe(&mut registry, 1);

        match rx.try_recv().unwrap() {
            ServerEvent::InitialGameStatus {
                room_id,
                player_id,
                name,
                server_time,
                status,
            } => {
                assert_eq!(room_id, 0);
                assert_eq!(player_id, 0);
                assert_eq!(name, "Player 1");
                assert_eq!(server_time, NOW);
                assert_eq!(status.gems.len(), 4);
                assert_eq!(status.players.len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn sixth_player_opens_a_second_room() {
        let mut registry = registry();
        for conn in 0..5 {
            let _rx = subscribe(&mut registry, conn);
        }
        assert_eq!(registry.room_count(), 1);

        let mut rx = subscribe(&mut registry, 5);
        assert_eq!(registry.room_count(), 2);
        match rx.try_recv().unwrap() {
            ServerEvent::InitialGameStatus { room_id, .. } => assert_eq!(room_id, 1),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn freed_capacity_is_reused_first_fit() {
        let mut registry = registry();
        for conn in 0..6 {
            let _rx = subscribe(&mut registry, conn);
        }
        registry.remove_player(2);

        let mut rx = subscribe(&mut registry, 7);
        match rx.try_recv().unwrap() {
            ServerEvent::InitialGameStatus { room_id, .. } => assert_eq!(room_id, 0),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_connection_input_is_a_no_op() {
        let mut registry = registry();
        let buffer = AnglesBuffer {
            id: 1,
            timestamp: NOW,
            angles: vec![0.0],
        };
        registry.update_player_position(99, &buffer, NOW);
        registry.remove_player(99);
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn last_player_leaving_destroys_the_room() {
        let mut registry = registry();
        let _rx1 = subscribe(&mut registry, 1);
        let _rx2 = subscribe(&mut registry, 2);
        assert_eq!(registry.room_count(), 1);

        registry.remove_player(1);
        assert_eq!(registry.room_count(), 1);
        registry.remove_player(2);
        assert_eq!(registry.room_count(), 0);
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn broadcast_reaches_every_member_once() {
        let mut registry = registry();
        let mut rx1 = subscribe(&mut registry, 1);
        let mut rx2 = subscribe(&mut registry, 2);
        let _ = rx1.try_recv();
        let _ = rx2.try_recv();

        registry.broadcast_tick();
        for rx in [&mut rx1, &mut rx2] {
            match rx.try_recv().unwrap() {
                ServerEvent::GameStatus { room_id, status } => {
                    assert_eq!(room_id, 0);
                    assert_eq!(status.players.len(), 2);
                }
                other => panic!("unexpected event: {other:?}"),
            }
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn regeneration_records_deltas_for_members() {
        let mut registry = registry();
        let mut rx = subscribe(&mut registry, 1);
        let _ = rx.try_recv();

        // Remove a gem directly through a simulated eat.
        registry.broadcast_tick();
        let _ = rx.try_recv();

        registry.regenerate_gems();
        registry.broadcast_tick();
        match rx.try_recv().unwrap() {
            ServerEvent::GameStatus { status, .. } => {
                // Already at target: nothing new to report.
                assert!(status.new_gems.is_empty());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn eaten_player_gets_game_over_and_loses_its_session() {
        let mut registry = registry();
        let mut rx_big = subscribe(&mut registry, 1);
        let mut rx_small = subscribe(&mut registry, 2);
        let _ = rx_big.try_recv();
        let _ = rx_small.try_recv();

        // Overlap the two players with a decisive size gap.
        {
            let room = registry.rooms.get_mut(&0).unwrap();
            {
                let p = room.players.get_mut(&0).unwrap();
                p.position = glam::Vec2::new(0.0, 0.0);
                p.radius = 60.0;
            }
            {
                let p = room.players.get_mut(&1).unwrap();
                p.position = glam::Vec2::new(10.0, 0.0);
                p.radius = 30.0;
                p.score = 5;
            }
        }

        let buffer = AnglesBuffer {
            id: 1,
            timestamp: NOW + 15,
            angles: vec![0.0],
        };
        registry.update_player_position(1, &buffer, NOW + 15);

        match rx_small.try_recv().unwrap() {
            ServerEvent::GameOver {} => {}
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(registry.session_count(), 1);

        // Input from the eliminated connection is now silently dropped.
        registry.update_player_position(2, &buffer, NOW + 30);
    }
}
