//! Player entity.

use crate::world::WorldBorder;
use glam::Vec2;
use protocol::Color;

/// A player blob owned by exactly one room.
#[derive(Debug, Clone)]
pub struct Player {
    /// Unique within the owning room.
    pub id: u32,
    pub name: String,
    pub color: Color,
    pub position: Vec2,
    pub radius: f32,
    /// World units traveled per physics step.
    pub velocity: f32,
    /// Current heading in radians.
    pub angle: f32,
    pub alive: bool,
    pub score: u32,
    /// Sequence id of the last recorded input batch.
    pub last_angle_id: u64,
    /// Timestamp (ms) of the last recorded input batch.
    pub last_angle_timestamp: u64,
    /// Set when the last batch failed plausibility checks; cleared
    /// once a delta has carried the resync marker.
    pub force_position: bool,
}

impl Player {
    pub fn new(id: u32, name: String, position: Vec2, radius: f32, velocity: f32, now_ms: u64) -> Self {
        Self {
            id,
            name,
            color: Color::from_index(id as usize),
            position,
            radius,
            velocity,
            angle: 0.0,
            alive: true,
            score: 0,
            last_angle_id: 0,
            last_angle_timestamp: now_ms,
            force_position: false,
        }
    }

    /// Advance one physics step along the current heading. Each axis
    /// is clamped independently so the blob never crosses the border.
    pub fn step(&mut self, border: &WorldBorder) {
        let next = Vec2::new(
            self.position.x + self.angle.cos() * self.velocity,
            self.position.y + self.angle.sin() * self.velocity,
        );
        self.position = border.clamp(next, self.radius);
    }

    /// Grow by the area of a circle with `other_radius`.
    #[inline]
    pub fn grow(&mut self, other_radius: f32) {
        self.radius = (self.radius * self.radius + other_radius * other_radius).sqrt();
    }

    /// Shrink by the area of a circle with `other_radius`, floored at
    /// `min_radius`.
    #[inline]
    pub fn shrink(&mut self, other_radius: f32, min_radius: f32) {
        let remaining = (self.radius * self.radius - other_radius * other_radius).max(0.0);
        self.radius = remaining.sqrt().max(min_radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(x: f32, y: f32, radius: f32) -> Player {
        Player::new(0, "p".into(), Vec2::new(x, y), radius, 5.0, 0)
    }

    #[test]
    fn step_moves_along_heading() {
        let border = WorldBorder::new(6000.0);
        let mut p = player(0.0, 0.0, 30.0);
        p.angle = 0.0;
        p.step(&border);
        assert!((p.position.x - 5.0).abs() < 1e-5);
        assert!(p.position.y.abs() < 1e-5);

        p.angle = std::f32::consts::FRAC_PI_2;
        p.step(&border);
        assert!((p.position.y - 5.0).abs() < 1e-4);
    }

    #[test]
    fn step_is_contained_by_the_border() {
        let border = WorldBorder::new(200.0);
        let mut p = player(95.0, 0.0, 30.0);
        p.angle = 0.0;
        for _ in 0..50 {
            p.step(&border);
            assert!(p.position.x + p.radius <= border.max_x + 1e-4);
        }
        // The clamped axis holds position; the other axis still moves.
        p.angle = std::f32::consts::FRAC_PI_4;
        let before_x = p.position.x;
        p.step(&border);
        assert!((p.position.x - before_x).abs() < 1e-4);
        assert!(p.position.y > 0.0);
    }

    #[test]
    fn grow_and_shrink_conserve_area() {
        let mut p = player(0.0, 0.0, 30.0);
        p.grow(9.0);
        let expected = (30.0f32 * 30.0 + 9.0 * 9.0).sqrt();
        assert!((p.radius - expected).abs() < 1e-4);

        p.shrink(9.0, 15.0);
        assert!((p.radius - 30.0).abs() < 1e-4);
    }

    #[test]
    fn shrink_floors_at_min_radius() {
        let mut p = player(0.0, 0.0, 16.0);
        p.shrink(100.0, 15.0);
        assert_eq!(p.radius, 15.0);
    }
}
