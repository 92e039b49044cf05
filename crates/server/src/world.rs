//! World geometry.

use glam::Vec2;
use rand::Rng;

/// World border bounds: a square centered on the origin.
#[derive(Debug, Clone, Copy)]
pub struct WorldBorder {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub size: f32,
}

impl WorldBorder {
    pub fn new(size: f32) -> Self {
        let half = size / 2.0;
        Self {
            min_x: -half,
            min_y: -half,
            max_x: half,
            max_y: half,
            size,
        }
    }

    /// Get a random position within the border.
    #[inline]
    pub fn random_position(&self) -> Vec2 {
        let mut rng = rand::rng();
        Vec2::new(
            rng.random_range(self.min_x..self.max_x),
            rng.random_range(self.min_y..self.max_y),
        )
    }

    /// Clamp a circle of `radius` at `position` to stay inside.
    #[inline]
    pub fn clamp(&self, position: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            position.x.clamp(self.min_x + radius, self.max_x - radius),
            position.y.clamp(self.min_y + radius, self.max_y - radius),
        )
    }
}
