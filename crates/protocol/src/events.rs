//! Client <-> server event definitions.
//!
//! Every WebSocket frame carries exactly one JSON object tagged by an
//! `"event"` field. Field names are stable within a deployment; the
//! tests below pin the tags the clients depend on.

use crate::Color;
use serde::{Deserialize, Serialize};

/// An ordered batch of heading samples submitted by one client,
/// tagged with a client-assigned sequence id and send timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnglesBuffer {
    /// Monotonically increasing client-assigned sequence number.
    pub id: u64,
    /// Client wall-clock at send time, milliseconds since the epoch.
    pub timestamp: u64,
    /// Radian headings sampled since the previous send, in order.
    pub angles: Vec<f32>,
}

/// Events received from clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join request. The server assigns a display name when absent.
    Subscribe {
        #[serde(default)]
        name: Option<String>,
    },
    /// Input batch since the previous send.
    Angle(AnglesBuffer),
}

/// Events sent to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full room snapshot, sent exactly once on join.
    InitialGameStatus {
        room_id: u32,
        player_id: u32,
        name: String,
        /// Server wall-clock in milliseconds, for client clock-offset
        /// calibration.
        server_time: u64,
        status: RoomStatus,
    },
    /// Periodic delta snapshot.
    GameStatus { room_id: u32, status: RoomDelta },
    /// The recipient's player was eaten and removed from its room.
    GameOver {},
}

/// Full state of a room, for newly joined players.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoomStatus {
    pub players: Vec<PlayerState>,
    pub gems: Vec<CollectibleState>,
    pub traps: Vec<CollectibleState>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Changes since the previous broadcast. Players are always sent in
/// full; their positions change every tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoomDelta {
    pub players: Vec<PlayerState>,
    pub new_gems: Vec<CollectibleState>,
    pub removed_gem_ids: Vec<u32>,
    pub new_traps: Vec<CollectibleState>,
    pub removed_trap_ids: Vec<u32>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Wire projection of a player.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    pub id: u32,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub angle: f32,
    pub score: u32,
    pub color: Color,
    pub sync: InputSync,
}

/// Input reconciliation data echoed back to the owning client.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct InputSync {
    /// Sequence id of the last input batch the server recorded.
    pub last_angle_id: u64,
    /// Timestamp of that batch.
    pub last_angle_timestamp: u64,
    /// Set when the last batch was rejected; the client must snap to
    /// the authoritative position instead of reconciling prediction.
    pub force_position: bool,
}

/// Lifecycle of a client-visible collectible projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectiblePhase {
    /// Present in a full snapshot.
    Active,
    /// Added since the previous broadcast.
    New,
}

/// Wire projection of a gem or trap. Removal is conveyed by the id
/// lists on [`RoomDelta`].
#[derive(Debug, Clone, Serialize)]
pub struct CollectibleState {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Color,
    pub phase: CollectiblePhase,
}

/// One leaderboard row: player id and score, ordered by descending
/// score on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub player: u32,
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_tag_and_optional_name() {
        let ev = crate::parse_client_event(r#"{"event":"subscribe"}"#).unwrap();
        assert!(matches!(ev, ClientEvent::Subscribe { name: None }));

        let ev = crate::parse_client_event(r#"{"event":"subscribe","name":"sam"}"#).unwrap();
        match ev {
            ClientEvent::Subscribe { name } => assert_eq!(name.as_deref(), Some("sam")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn angle_event_carries_buffer_fields() {
        let ev = crate::parse_client_event(
            r#"{"event":"angle","id":7,"timestamp":1500,"angles":[0.0,1.5707964]}"#,
        )
        .unwrap();
        match ev {
            ClientEvent::Angle(buf) => {
                assert_eq!(buf.id, 7);
                assert_eq!(buf.timestamp, 1500);
                assert_eq!(buf.angles.len(), 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(crate::parse_client_event(r#"{"event":"warp"}"#).is_err());
        assert!(crate::parse_client_event("not json").is_err());
    }

    #[test]
    fn server_event_tags_are_stable() {
        let text = crate::encode_server_event(&ServerEvent::GameOver {}).unwrap();
        assert_eq!(text, r#"{"event":"game_over"}"#);

        let text = crate::encode_server_event(&ServerEvent::GameStatus {
            room_id: 3,
            status: RoomDelta::default(),
        })
        .unwrap();
        assert!(text.starts_with(r#"{"event":"game_status","room_id":3"#));
        assert!(text.contains(r#""removed_gem_ids":[]"#));
    }

    #[test]
    fn sync_fields_are_named_for_reconciliation() {
        let state = PlayerState {
            id: 1,
            name: "a".into(),
            x: 0.0,
            y: 0.0,
            radius: 30.0,
            angle: 0.0,
            score: 0,
            color: Color::Red,
            sync: InputSync {
                last_angle_id: 4,
                last_angle_timestamp: 99,
                force_position: true,
            },
        };
        let text = serde_json::to_string(&state).unwrap();
        assert!(text.contains(r#""last_angle_id":4"#));
        assert!(text.contains(r#""force_position":true"#));
    }
}
