//! Circle collision predicates shared by the simulation passes.

use glam::Vec2;

/// Result of a pairwise circle check.
#[derive(Debug, Clone, Copy)]
pub struct CircleOverlap {
    pub distance: f32,
    pub radius_sum: f32,
    /// Unit vector from `a` toward `b`; x-axis when the centers coincide.
    pub axis: Vec2,
}

impl CircleOverlap {
    pub fn is_touching(&self) -> bool {
        self.distance < self.radius_sum
    }

    pub fn overlap_depth(&self) -> f32 {
        (self.radius_sum - self.distance).max(0.0)
    }
}

pub fn circle_overlap(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CircleOverlap {
    let delta = b_pos - a_pos;
    let distance = delta.length();
    let axis = if distance > f32::EPSILON {
        delta / distance
    } else {
        Vec2::X
    };
    CircleOverlap {
        distance,
        radius_sum: a_radius + b_radius,
        axis,
    }
}

/// Predation test: the prey circle must sit fully inside the eater circle.
pub fn engulfs(eater_pos: Vec2, eater_radius: f32, prey_pos: Vec2, prey_radius: f32) -> bool {
    eater_pos.distance(prey_pos) + prey_radius <= eater_radius
}

/// Pellet pickup test: the pellet center lies inside the cell.
pub fn covers_center(cell_pos: Vec2, cell_radius: f32, point: Vec2) -> bool {
    cell_pos.distance(point) < cell_radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_detection() {
        let o = circle_overlap(Vec2::ZERO, 10.0, Vec2::new(15.0, 0.0), 10.0);
        assert!(o.is_touching());
        assert!((o.overlap_depth() - 5.0).abs() < 1e-6);

        let far = circle_overlap(Vec2::ZERO, 10.0, Vec2::new(25.0, 0.0), 10.0);
        assert!(!far.is_touching());
        assert_eq!(far.overlap_depth(), 0.0);
    }

    #[test]
    fn test_coincident_centers_fall_back_to_x_axis() {
        let o = circle_overlap(Vec2::ZERO, 5.0, Vec2::ZERO, 5.0);
        assert_eq!(o.axis, Vec2::X);
    }

    #[test]
    fn test_engulf_requires_full_containment() {
        // Overlapping but not contained.
        assert!(!engulfs(Vec2::ZERO, 20.0, Vec2::new(15.0, 0.0), 10.0));
        // Fully inside.
        assert!(engulfs(Vec2::ZERO, 20.0, Vec2::new(5.0, 0.0), 10.0));
        // Boundary case: touching from inside counts.
        assert!(engulfs(Vec2::ZERO, 20.0, Vec2::new(10.0, 0.0), 10.0));
    }
}
