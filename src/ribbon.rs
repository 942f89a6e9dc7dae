//! Trailing-particle "ribbon" stroke.
//!
//! A pool of particles chases the pointer on damped springs. Pointer moves
//! only retarget the pool; the particles advance (and leave trails) on a
//! fixed tick owned by the stroke session.

use egui::{Pos2, Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tunables of the ribbon simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RibbonConfig {
    pub particle_count: usize,
    /// Per-particle damping is drawn uniformly from `ease_min..ease_max`
    pub ease_min: f32,
    pub ease_max: f32,
    /// Spring stiffness shared by every particle
    pub spring: f32,
    /// Trail opacity, multiplied by the tool alpha
    pub trail_alpha: f32,
    pub tick_secs: f64,
    /// Most ticks replayed by one poll after a stall
    pub max_catch_up: u32,
}

impl Default for RibbonConfig {
    fn default() -> Self {
        Self {
            particle_count: 50,
            ease_min: 0.6,
            ease_max: 0.8,
            spring: 0.1,
            trail_alpha: 0.05,
            tick_secs: 0.016,
            max_catch_up: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Pos2,
    accel: Vec2,
    ease: f32,
}

impl Particle {
    pub fn ease(&self) -> f32 {
        self.ease
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RibbonSimulator {
    particles: Vec<Particle>,
    target: Pos2,
    spring: f32,
}

impl RibbonSimulator {
    /// Spawn the particle pool at `start`
    pub fn spawn<R: Rng + ?Sized>(start: Pos2, config: &RibbonConfig, rng: &mut R) -> Self {
        let (lo, hi) = if config.ease_min < config.ease_max {
            (config.ease_min, config.ease_max)
        } else {
            (config.ease_max, config.ease_max + f32::EPSILON)
        };
        let particles = (0..config.particle_count)
            .map(|_| Particle {
                position: start,
                accel: Vec2::ZERO,
                ease: rng.gen_range(lo..hi),
            })
            .collect();
        Self {
            particles,
            target: start,
            spring: config.spring,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn target(&self) -> Pos2 {
        self.target
    }

    pub fn set_target(&mut self, target: Pos2) {
        self.target = target;
    }

    /// Advance every particle one tick; returns the `(from, to)` move of each
    pub fn step(&mut self) -> Vec<(Pos2, Pos2)> {
        let target = self.target;
        let spring = self.spring;
        self.particles
            .iter_mut()
            .map(|p| {
                let from = p.position;
                p.accel = (p.accel + (p.position - target) * spring) * p.ease;
                p.position -= p.accel;
                (from, p.position)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn simulator() -> RibbonSimulator {
        let mut rng = StdRng::seed_from_u64(7);
        RibbonSimulator::spawn(Pos2::new(0.0, 0.0), &RibbonConfig::default(), &mut rng)
    }

    #[test]
    fn spawns_pool_at_start_with_ease_in_range() {
        let sim = simulator();
        assert_eq!(sim.particles().len(), 50);
        for p in sim.particles() {
            assert_eq!(p.position, Pos2::ZERO);
            assert!((0.6..0.8).contains(&p.ease()));
        }
    }

    #[test]
    fn particles_rest_when_target_is_unchanged() {
        let mut sim = simulator();
        for (from, to) in sim.step() {
            assert_eq!(from, to);
        }
    }

    #[test]
    fn particles_converge_on_the_target() {
        let mut sim = simulator();
        sim.set_target(Pos2::new(100.0, 50.0));
        let first = sim.step();
        assert!(first.iter().all(|(from, to)| to.distance(sim.target()) < from.distance(sim.target())));
        for _ in 0..400 {
            sim.step();
        }
        for p in sim.particles() {
            assert!(p.position.distance(Pos2::new(100.0, 50.0)) < 0.5);
        }
    }
}
