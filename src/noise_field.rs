/*
 * Noise Field Module
 *
 * Coherent 3D noise sampled by the curvature term and by boid spawning
 * (size and colour). The field is owned by the Simulation controller and
 * seeded once, so runs with the same seed sample identical values.
 */

use noise::{NoiseFn, Perlin};

/// A deterministic scalar field over 3D space, roughly in `[-1, 1]`.
///
/// Implementors must be `Sync`: the steering pass samples the field from
/// rayon worker threads.
pub trait NoiseField: Send + Sync {
    fn noise3(&self, x: f64, y: f64, z: f64) -> f64;
}

/// Perlin noise backed by the `noise` crate.
#[derive(Clone)]
pub struct PerlinField {
    perlin: Perlin,
}

impl PerlinField {
    pub fn new(seed: u32) -> Self {
        Self { perlin: Perlin::new(seed) }
    }
}

impl NoiseField for PerlinField {
    #[inline]
    fn noise3(&self, x: f64, y: f64, z: f64) -> f64 {
        self.perlin.get([x, y, z])
    }
}

/// Constant field, used to take noise out of the picture in tests and benches.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatField(pub f64);

impl NoiseField for FlatField {
    #[inline]
    fn noise3(&self, _x: f64, _y: f64, _z: f64) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_samples() {
        let a = PerlinField::new(7);
        let b = PerlinField::new(7);
        for i in 0..32 {
            let t = i as f64 * 0.37;
            assert_eq!(a.noise3(t, t * 1.3, t * 0.2), b.noise3(t, t * 1.3, t * 0.2));
        }
    }

    #[test]
    fn perlin_stays_in_unit_range() {
        let field = PerlinField::new(1);
        for i in 0..200 {
            let t = i as f64 * 0.173;
            let n = field.noise3(t, -t * 0.5, t * 2.1);
            assert!((-1.5..=1.5).contains(&n), "sample {n} out of range");
        }
    }
}
