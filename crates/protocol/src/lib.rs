//! Shared protocol crate for the arena server.
//!
//! This crate contains:
//! - Client -> server and server -> client event definitions
//! - Snapshot / delta payload types
//! - JSON encode/parse helpers and the protocol error type

mod error;
pub mod events;

pub use error::ProtocolError;
pub use events::{
    AnglesBuffer, ClientEvent, CollectiblePhase, CollectibleState, InputSync, LeaderboardEntry,
    PlayerState, RoomDelta, RoomStatus, ServerEvent,
};

use serde::{Deserialize, Serialize};

/// Display color assigned to players and collectibles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
    Purple,
    Pink,
}

impl Color {
    /// The full palette, indexable by player id or a random draw.
    pub const ALL: [Color; 7] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Orange,
        Color::Purple,
        Color::Pink,
    ];

    /// Palette color for an index (wraps around).
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }
}

/// Parse one inbound text frame into a client event.
pub fn parse_client_event(text: &str) -> Result<ClientEvent, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Malformed)
}

/// Encode an outbound event as a JSON text frame.
pub fn encode_server_event(event: &ServerEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(ProtocolError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_wraps() {
        assert_eq!(Color::from_index(0), Color::Red);
        assert_eq!(Color::from_index(7), Color::Red);
        assert_eq!(Color::from_index(9), Color::Blue);
    }
}
