//! Geometry helpers and unit conversions.

use glam::Vec2;
use rand::Rng;

/// Convert mass to radius.
#[inline]
pub fn mass_to_radius(mass: f32) -> f32 {
    4.0 + mass.max(0.0).sqrt() * 6.0
}

/// Convert radius back to mass.
#[inline]
pub fn radius_to_mass(radius: f32) -> f32 {
    let r = (radius - 4.0).max(0.0) / 6.0;
    r * r
}

#[inline]
pub fn log_base(n: f32, base: f32) -> f32 {
    n.ln() / base.ln()
}

/// Speed divisor for a cell coasting at the floor speed. Grows
/// logarithmically with mass relative to the spawn mass.
#[inline]
pub fn mass_slowdown(mass: f32, spawn_mass: f32, slow_base: f32) -> f32 {
    (log_base(mass.max(1.0), slow_base) - log_base(spawn_mass.max(1.0), slow_base) + 1.0).max(1.0)
}

/// Axis-aligned view rectangle used for per-client visibility culling.
#[derive(Debug, Clone, Copy)]
pub struct ViewRect {
    pub center: Vec2,
    pub half_width: f32,
    pub half_height: f32,
}

impl ViewRect {
    pub fn around(center: Vec2, half_width: f32, half_height: f32) -> Self {
        Self {
            center,
            half_width,
            half_height,
        }
    }

    /// Whether a circle touches the rectangle, expanded by `margin`.
    pub fn contains_circle(&self, position: Vec2, radius: f32, margin: f32) -> bool {
        let reach = radius + margin;
        (position.x - self.center.x).abs() <= self.half_width + reach
            && (position.y - self.center.y).abs() <= self.half_height + reach
    }
}

/// Random point uniformly distributed over a centered rectangle.
pub fn random_position<R: Rng>(rng: &mut R, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        rng.random_range(-width / 2.0..width / 2.0),
        rng.random_range(-height / 2.0..height / 2.0),
    )
}

/// Random point inside a circle, uniform over the area.
pub fn random_position_in_circle<R: Rng>(rng: &mut R, center: Vec2, radius: f32) -> Vec2 {
    let angle = rng.random_range(0.0..std::f32::consts::TAU);
    let dist = radius * rng.random::<f32>().sqrt();
    center + Vec2::new(angle.cos(), angle.sin()) * dist
}

/// Pick a spawn point that keeps clear of the listed circles. Falls back to
/// the last candidate when the area is too crowded.
pub fn scatter_position<R: Rng>(
    rng: &mut R,
    width: f32,
    height: f32,
    own_radius: f32,
    avoid: &[(Vec2, f32)],
    inside: Option<(Vec2, f32)>,
    attempts: usize,
) -> Vec2 {
    let mut candidate = Vec2::ZERO;
    for _ in 0..attempts.max(1) {
        candidate = match inside {
            Some((center, radius)) => {
                random_position_in_circle(rng, center, (radius - own_radius).max(0.0))
            }
            None => random_position(rng, width, height),
        };
        let clear = avoid
            .iter()
            .all(|(pos, radius)| candidate.distance(*pos) > radius + own_radius);
        if clear {
            return candidate;
        }
    }
    candidate
}
