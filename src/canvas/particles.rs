//! Decorative particles emitted along strokes

use rand::Rng;

use super::raster::{Canvas, Color};
use crate::vision::landmarks::Point;

pub const DEFAULT_PARTICLE_LIFETIME_MS: u64 = 600;
pub const DEFAULT_MAX_PARTICLES: usize = 256;

/// Initial speed range in pixels per second
const SPEED_RANGE: (f32, f32) = (20.0, 90.0);

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Point,
    /// Pixels per second
    pub velocity: Point,
    pub color: Color,
    pub created_ms: u64,
    pub lifetime_ms: u64,
}

impl Particle {
    pub fn age(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_ms)
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.age(now_ms) >= self.lifetime_ms
    }

    /// Remaining life in `[0, 1]`
    pub fn vitality(&self, now_ms: u64) -> f32 {
        if self.lifetime_ms == 0 {
            return 0.0;
        }
        1.0 - (self.age(now_ms) as f32 / self.lifetime_ms as f32).min(1.0)
    }
}

#[derive(Debug, Clone)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    lifetime_ms: u64,
    max_particles: usize,
    last_update_ms: Option<u64>,
}

impl ParticleSystem {
    pub fn new(lifetime_ms: u64, max_particles: usize) -> Self {
        Self {
            particles: Vec::new(),
            lifetime_ms,
            max_particles,
            last_update_ms: None,
        }
    }

    /// Emit `count` particles from a point in random directions. When the
    /// cap is exceeded the oldest particles are dropped.
    pub fn spawn_burst(&mut self, at: Point, count: usize, color: Color, now_ms: u64) {
        let mut rng = rand::thread_rng();
        for _ in 0..count {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let speed = rng.gen_range(SPEED_RANGE.0..SPEED_RANGE.1);
            self.particles.push(Particle {
                position: at,
                velocity: Point::new(angle.cos() * speed, angle.sin() * speed),
                color,
                created_ms: now_ms,
                lifetime_ms: self.lifetime_ms,
            });
        }

        if self.particles.len() > self.max_particles {
            let excess = self.particles.len() - self.max_particles;
            self.particles.drain(..excess);
        }
    }

    /// Drop expired particles and move the rest
    pub fn update(&mut self, now_ms: u64) {
        self.particles.retain(|p| !p.is_expired(now_ms));

        let dt = match self.last_update_ms {
            Some(last) => now_ms.saturating_sub(last) as f32 / 1000.0,
            None => 0.0,
        };
        self.last_update_ms = Some(now_ms);

        for p in &mut self.particles {
            p.position.x += p.velocity.x * dt;
            p.position.y += p.velocity.y * dt;
        }
    }

    /// Stamp live particles onto a surface, shrinking with age
    pub fn render(&self, canvas: &mut Canvas, now_ms: u64) {
        for p in &self.particles {
            let radius = 3.0 * p.vitality(now_ms);
            if radius > 0.0 {
                canvas.fill_circle(p.position, radius, p.color);
            }
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new(DEFAULT_PARTICLE_LIFETIME_MS, DEFAULT_MAX_PARTICLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particles_expire() {
        let mut system = ParticleSystem::default();
        system.spawn_burst(Point::new(10.0, 10.0), 5, Color::RED, 1000);
        system.update(1599);
        assert_eq!(system.len(), 5);
        system.update(1600);
        assert!(system.is_empty());
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut system = ParticleSystem::new(600, 10);
        system.spawn_burst(Point::new(0.0, 0.0), 8, Color::RED, 0);
        system.spawn_burst(Point::new(0.0, 0.0), 8, Color::BLUE, 100);
        assert_eq!(system.len(), 10);
        assert_eq!(system.particles()[0].color, Color::RED);
        assert_eq!(system.particles()[2].color, Color::BLUE);
        assert!(system.particles()[2..].iter().all(|p| p.created_ms == 100));
    }

    #[test]
    fn test_particles_move() {
        let mut system = ParticleSystem::default();
        let origin = Point::new(50.0, 50.0);
        system.spawn_burst(origin, 3, Color::GREEN, 0);
        system.update(0);
        system.update(100);
        for p in system.particles() {
            let moved = p.position.distance(&origin);
            // 0.1 s at 20..90 px/s
            assert!((1.9..=9.1).contains(&moved), "moved {moved}");
        }
    }

    #[test]
    fn test_vitality() {
        let p = Particle {
            position: Point::default(),
            velocity: Point::default(),
            color: Color::BLACK,
            created_ms: 0,
            lifetime_ms: 600,
        };
        assert_eq!(p.vitality(0), 1.0);
        assert_eq!(p.vitality(300), 0.5);
        assert_eq!(p.vitality(900), 0.0);
    }
}
