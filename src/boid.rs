/*
 * Boid Module
 *
 * This module defines the two agent variants of the simulation.
 * Boids flock according to the classic rules plus predator avoidance and a
 * per-agent curvature bias; hawks chase the nearest boid in range.
 *
 * Agents have no identity beyond their index in the owning collection.
 */

use std::f64::consts::TAU;

use glam::DVec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::noise_field::NoiseField;
use crate::params::SimulationParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Boid,
    Hawk,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Boid {
    pub position: DVec3,
    pub velocity: DVec3,
    // Smoothed steering force, carried across ticks
    pub acceleration: DVec3,
    pub base_size_factor: f64,
    pub color: [f32; 3],
    pub arc_phase: f64,
    pub arc_rate: f64,
    pub arc_seed: f64,
}

impl Boid {
    /// A boid with neutral visual attributes and curvature constants.
    pub fn new(position: DVec3, velocity: DVec3) -> Self {
        Self {
            position,
            velocity,
            acceleration: DVec3::ZERO,
            base_size_factor: 1.0,
            color: [0.86, 0.86, 0.86],
            arc_phase: 0.0,
            arc_rate: 1.0,
            arc_seed: 0.0,
        }
    }

    // Create a boid at a random spot in the inner part of the volume
    pub fn spawn<R, N>(rng: &mut R, noise: &N, params: &SimulationParams, world_size: f64) -> Self
    where
        R: Rng + ?Sized,
        N: NoiseField + ?Sized,
    {
        let position = DVec3::new(
            spread(rng, world_size * 0.45),
            spread(rng, world_size * 0.45),
            spread(rng, world_size * 0.45),
        );
        let speed = rng.gen_range(params.min_speed * 0.85..=params.max_speed);
        let velocity = random_direction(rng) * speed;

        let size_noise = noise.noise3(
            position.x * 0.02 + 31.7,
            position.y * 0.02 + 53.1,
            position.z * 0.02 + 79.9,
        );
        let color_noise = noise.noise3(
            position.x * 0.014 + 111.3,
            position.y * 0.014 + 241.9,
            position.z * 0.014 + 77.4,
        );

        Self {
            position,
            velocity,
            acceleration: DVec3::ZERO,
            base_size_factor: 1.0 + size_noise * 0.1,
            color: plumage_color(color_noise),
            arc_phase: rng.gen::<f64>() * TAU,
            arc_rate: rng.gen_range(0.7..1.35),
            arc_seed: rng.gen::<f64>() * 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hawk {
    pub position: DVec3,
    pub velocity: DVec3,
    // Rebuilt from zero every tick
    pub acceleration: DVec3,
    // Index of the boid chased during the last tick
    pub target: Option<usize>,
}

impl Hawk {
    pub fn new(position: DVec3, velocity: DVec3) -> Self {
        Self {
            position,
            velocity,
            acceleration: DVec3::ZERO,
            target: None,
        }
    }

    // Hawks start closer to the centre than boids
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, params: &SimulationParams, world_size: f64) -> Self {
        let position = DVec3::new(
            spread(rng, world_size * 0.25),
            spread(rng, world_size * 0.25),
            spread(rng, world_size * 0.25),
        );
        let speed = rng.gen_range(params.hawk_min_speed..=params.hawk_max_speed);
        Self::new(position, random_direction(rng) * speed)
    }
}

/// Uniform sample in `[-range / 2, range / 2)`.
#[inline]
pub fn spread<R: Rng + ?Sized>(rng: &mut R, range: f64) -> f64 {
    (rng.gen::<f64>() - 0.5) * range
}

fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> DVec3 {
    DVec3::new(spread(rng, 2.0), spread(rng, 2.0), spread(rng, 2.0))
        .try_normalize()
        .unwrap_or(DVec3::X)
}

// Pale blue-white tint that drifts slightly with the noise sample
fn plumage_color(noise: f64) -> [f32; 3] {
    let t = (noise * 0.5 + 0.5).clamp(0.0, 1.0);
    let hue = 0.56 + (t - 0.5) * 0.03;
    let saturation = 0.32 + (1.0 - t) * 0.2;
    let lightness = 0.74 + t * 0.22;
    hsl_to_rgb(hue, saturation, lightness)
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> [f32; 3] {
    let h = hue.rem_euclid(1.0);
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    if s == 0.0 {
        return [l as f32; 3];
    }

    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_to_channel(p, q, h + 1.0 / 3.0) as f32,
        hue_to_channel(p, q, h) as f32,
        hue_to_channel(p, q, h - 1.0 / 3.0) as f32,
    ]
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise_field::PerlinField;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn spawned_boids_start_inside_inner_volume() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let noise = PerlinField::new(3);
        let params = SimulationParams::default();
        let world_size = 1000.0;

        for _ in 0..500 {
            let boid = Boid::spawn(&mut rng, &noise, &params, world_size);
            assert!(boid.position.abs().max_element() <= world_size * 0.225);

            let speed = boid.velocity.length();
            assert!(speed >= params.min_speed * 0.85 - 1e-9 && speed <= params.max_speed + 1e-9);

            assert!((0.0..TAU).contains(&boid.arc_phase));
            assert!((0.7..1.35).contains(&boid.arc_rate));
            assert!((0.0..1000.0).contains(&boid.arc_seed));
            assert!(boid.color.iter().all(|c| (0.0..=1.0).contains(c)));
            assert_eq!(boid.acceleration, DVec3::ZERO);
        }
    }

    #[test]
    fn spawned_hawks_use_hawk_speed_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let params = SimulationParams::default();

        for _ in 0..200 {
            let hawk = Hawk::spawn(&mut rng, &params, 1000.0);
            assert!(hawk.position.abs().max_element() <= 125.0);
            let speed = hawk.velocity.length();
            assert!(speed >= params.hawk_min_speed - 1e-9 && speed <= params.hawk_max_speed + 1e-9);
            assert_eq!(hawk.target, None);
        }
    }

    #[test]
    fn hsl_conversion_matches_known_colors() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), [1.0, 0.0, 0.0]);
        assert_eq!(hsl_to_rgb(0.3, 0.0, 0.25), [0.25, 0.25, 0.25]);
        let blue = hsl_to_rgb(2.0 / 3.0, 1.0, 0.5);
        assert!(blue[0].abs() < 1e-6 && blue[1].abs() < 1e-6 && (blue[2] - 1.0).abs() < 1e-6);
    }
}
