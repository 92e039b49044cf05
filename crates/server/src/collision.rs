//! Collision tests.
//!
//! Squared-distance circle overlap and the area-dominance rule for
//! player-vs-player eating. All comparisons carry an epsilon so
//! touching circles do not flicker in and out of contact.

use glam::Vec2;

/// Margin for floating-point comparisons.
pub const EPSILON: f32 = 1e-6;

/// Exact circle-overlap test on squared distance (no sqrt).
#[inline]
pub fn circles_overlap(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    let r = a_radius + b_radius;
    r * r - a.distance_squared(b) > EPSILON
}

/// Strict area dominance: a circle of `radius` out-areas one of
/// `other_radius` by more than `margin`. Area scales with radius
/// squared, so the test stays sqrt-free.
#[inline]
pub fn area_dominates(radius: f32, other_radius: f32, margin: f32) -> bool {
    radius * radius - margin * other_radius * other_radius > EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_on_squared_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(30.0, 0.0);
        assert!(circles_overlap(a, 20.0, b, 20.0)); // r = 40 > d = 30
        assert!(!circles_overlap(a, 10.0, b, 10.0)); // r = 20 < d = 30
    }

    #[test]
    fn touching_circles_do_not_overlap() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(20.0, 0.0);
        assert!(!circles_overlap(a, 10.0, b, 10.0));
    }

    #[test]
    fn dominance_is_asymmetric_around_the_margin() {
        // 33² = 1089 > 1.1 · 30² = 990; the reverse fails.
        assert!(area_dominates(33.0, 30.0, 1.1));
        assert!(!area_dominates(30.0, 33.0, 1.1));
        // Near-equal sizes dominate in neither direction.
        assert!(!area_dominates(30.5, 30.0, 1.1));
        assert!(!area_dominates(30.0, 30.5, 1.1));
    }
}
