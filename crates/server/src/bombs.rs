//! Wandering bomb hazards.

use crate::config::BombConfig;
use crate::entity::{Bomb, IdGen};
use crate::world::WorldBorder;
use glam::Vec2;
use rand::Rng;

/// Owns the pool of mobile bombs and their wander behavior.
#[derive(Debug, Default)]
pub struct BombField {
    pub bombs: Vec<Bomb>,
}

impl BombField {
    pub fn new() -> Self {
        Self { bombs: Vec::new() }
    }

    /// Spawn bombs until the configured pool size is reached.
    pub fn top_up<R: Rng>(
        &mut self,
        cfg: &BombConfig,
        border: &WorldBorder,
        ids: &mut IdGen,
        rng: &mut R,
    ) {
        while self.bombs.len() < cfg.max_amount {
            let position = crate::math::random_position(rng, border.width(), border.height());
            self.bombs
                .push(Bomb::new(ids.next(), position, cfg.radius, random_direction(rng)));
        }
    }

    /// Advance every bomb one tick: occasional random turns, straight-line
    /// travel, reflection off the border.
    pub fn update<R: Rng>(&mut self, cfg: &BombConfig, border: &WorldBorder, dt: f32, rng: &mut R) {
        for bomb in &mut self.bombs {
            if rng.random::<f32>() < cfg.turn_chance {
                bomb.direction = random_direction(rng);
            }
            bomb.position += bomb.direction * cfg.speed * dt;

            if bomb.position.x - bomb.radius < border.min_x {
                bomb.position.x = border.min_x + bomb.radius;
                bomb.direction.x = bomb.direction.x.abs();
            } else if bomb.position.x + bomb.radius > border.max_x {
                bomb.position.x = border.max_x - bomb.radius;
                bomb.direction.x = -bomb.direction.x.abs();
            }
            if bomb.position.y - bomb.radius < border.min_y {
                bomb.position.y = border.min_y + bomb.radius;
                bomb.direction.y = bomb.direction.y.abs();
            } else if bomb.position.y + bomb.radius > border.max_y {
                bomb.position.y = border.max_y - bomb.radius;
                bomb.direction.y = -bomb.direction.y.abs();
            }
        }
    }

    pub fn remove(&mut self, bomb_id: u32) {
        self.bombs.retain(|b| b.id != bomb_id);
    }
}

fn random_direction<R: Rng>(rng: &mut R) -> Vec2 {
    let angle = rng.random_range(0.0..std::f32::consts::TAU);
    Vec2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldBorder;

    fn cfg() -> BombConfig {
        BombConfig {
            max_amount: 3,
            radius: 30.0,
            speed: 80.0,
            turn_chance: 0.0,
        }
    }

    #[test]
    fn test_top_up_fills_pool() {
        let border = WorldBorder::new(1000.0, 1000.0);
        let mut field = BombField::new();
        let mut ids = IdGen::new();
        let mut rng = rand::rng();
        field.top_up(&cfg(), &border, &mut ids, &mut rng);
        assert_eq!(field.bombs.len(), 3);
        field.top_up(&cfg(), &border, &mut ids, &mut rng);
        assert_eq!(field.bombs.len(), 3);
    }

    #[test]
    fn test_bombs_bounce_off_border() {
        let border = WorldBorder::new(1000.0, 1000.0);
        let mut field = BombField::new();
        field
            .bombs
            .push(Bomb::new(1, Vec2::new(480.0, 0.0), 30.0, Vec2::X));
        let mut rng = rand::rng();
        field.update(&cfg(), &border, 1.0, &mut rng);
        let bomb = &field.bombs[0];
        assert!(bomb.position.x + bomb.radius <= border.max_x + 1e-3);
        assert!(bomb.direction.x < 0.0);
    }
}
