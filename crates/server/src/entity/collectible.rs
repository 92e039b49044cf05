//! Gems and traps.

use glam::Vec2;
use protocol::Color;

/// The two collectible variants share one shape; collision effect is
/// looked up by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectibleKind {
    /// Grants score and growth when eaten.
    Gem,
    /// Shrinks the colliding player instead.
    Trap,
}

/// A stationary collectible. Immutable except for the alive flag.
#[derive(Debug, Clone)]
pub struct Collectible {
    /// Unique within the owning room; never reused while the room
    /// lives.
    pub id: u32,
    pub kind: CollectibleKind,
    pub position: Vec2,
    pub radius: f32,
    pub color: Color,
    pub alive: bool,
}

impl Collectible {
    pub fn gem(id: u32, position: Vec2, radius: f32, color: Color) -> Self {
        Self {
            id,
            kind: CollectibleKind::Gem,
            position,
            radius,
            color,
            alive: true,
        }
    }

    pub fn trap(id: u32, position: Vec2, radius: f32, color: Color) -> Self {
        Self {
            id,
            kind: CollectibleKind::Trap,
            position,
            radius,
            color,
            alive: true,
        }
    }
}
