//! Shrinking circular hazard zone.
//!
//! The zone is centered on the arena. Its target radius follows the live
//! player count; the actual radius chases the target at a bounded rate, and
//! cells caught outside take mass damage down to the spawn-mass floor.

use crate::config::HazardConfig;
use glam::Vec2;

#[derive(Debug, Clone)]
pub struct HazardZone {
    pub center: Vec2,
    radius: f32,
    cfg: HazardConfig,
}

impl HazardZone {
    pub fn new(cfg: &HazardConfig) -> Self {
        Self {
            center: Vec2::ZERO,
            radius: cfg.max_radius,
            cfg: cfg.clone(),
        }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn damage_per_sec(&self) -> f32 {
        self.cfg.damage_per_sec
    }

    /// Radius the zone heads toward for a given live player count.
    pub fn target_radius(&self, players: usize) -> f32 {
        match players {
            0 | 1 => self.cfg.min_radius,
            2 | 3 => self.cfg.base_radius,
            n => (self.cfg.base_radius + self.cfg.radius_per_player * (n - 3) as f32)
                .min(self.cfg.max_radius),
        }
    }

    /// Step the radius toward the target, at most `shrink_rate_per_sec * dt`
    /// per call in either direction.
    pub fn update(&mut self, players: usize, dt: f32) {
        let target = self.target_radius(players);
        let max_step = self.cfg.shrink_rate_per_sec * dt;
        let delta = (target - self.radius).clamp(-max_step, max_step);
        self.radius += delta;
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.distance(self.center) <= self.radius
    }

    /// Pull a point back inside the zone, keeping `margin` away from the rim.
    pub fn clamp_inside(&self, point: Vec2, margin: f32) -> Vec2 {
        let limit = (self.radius - margin).max(0.0);
        let offset = point - self.center;
        let dist = offset.length();
        if dist <= limit {
            return point;
        }
        self.center + offset / dist * limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> HazardConfig {
        HazardConfig {
            enabled: true,
            min_radius: 1500.0,
            base_radius: 2500.0,
            radius_per_player: 400.0,
            max_radius: 4000.0,
            shrink_rate_per_sec: 40.0,
            damage_per_sec: 10.0,
        }
    }

    #[test]
    fn test_target_radius_bands() {
        let zone = HazardZone::new(&cfg());
        assert_eq!(zone.target_radius(0), 1500.0);
        assert_eq!(zone.target_radius(1), 1500.0);
        assert_eq!(zone.target_radius(2), 2500.0);
        assert_eq!(zone.target_radius(3), 2500.0);
        assert_eq!(zone.target_radius(4), 2900.0);
        assert_eq!(zone.target_radius(50), 4000.0);
    }

    #[test]
    fn test_radius_step_is_bounded() {
        let mut zone = HazardZone::new(&cfg());
        let dt = 0.05;
        zone.update(1, dt);
        assert_eq!(zone.radius(), 4000.0 - 40.0 * dt);

        // Growing back is bounded the same way.
        let mut grow = HazardZone::new(&cfg());
        grow.update(1, 100.0); // drop far below base
        let before = grow.radius();
        grow.update(50, dt);
        assert_eq!(grow.radius(), before + 40.0 * dt);
    }

    #[test]
    fn test_player_count_transition_scenario() {
        let mut zone = HazardZone::new(&cfg());
        let dt = 0.05;
        let step = 40.0 * dt;

        // One player: chase the minimum band from the starting maximum.
        let ticks_to_min = ((4000.0_f32 - 1500.0) / step).ceil() as usize;
        for _ in 0..ticks_to_min {
            zone.update(1, dt);
        }
        assert_eq!(zone.radius(), 1500.0);

        // Two players: grow back to the base band, no overshoot.
        let ticks_to_base = ((2500.0_f32 - 1500.0) / step).ceil() as usize;
        for _ in 0..ticks_to_base - 1 {
            zone.update(2, dt);
        }
        assert!(zone.radius() < 2500.0);
        zone.update(2, dt);
        assert_eq!(zone.radius(), 2500.0);

        // Four players: expanding band at base + one per-player increment.
        let ticks_to_four = ((2900.0_f32 - 2500.0) / step).ceil() as usize;
        for _ in 0..ticks_to_four {
            zone.update(4, dt);
        }
        assert_eq!(zone.radius(), 2900.0);
        zone.update(4, dt);
        assert_eq!(zone.radius(), 2900.0);
    }

    #[test]
    fn test_clamp_inside_pulls_to_rim() {
        let mut zone = HazardZone::new(&cfg());
        zone.update(1, 1000.0); // settle at min radius
        assert_eq!(zone.radius(), 1500.0);
        let outside = Vec2::new(5000.0, 0.0);
        let clamped = zone.clamp_inside(outside, 10.0);
        assert!((clamped.length() - 1490.0).abs() < 1e-3);
        assert!(zone.contains(clamped));
    }
}
