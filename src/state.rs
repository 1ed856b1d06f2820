/*
 * Simulation State Module
 *
 * The mutable world advanced by each tick: both agent populations, the
 * bounding cube, and the simulation clock. Agent storage is allocated for the
 * maximum population up front; shrinking only truncates the tail, so growing
 * again never reallocates.
 */

use glam::DVec3;

use crate::boid::{Boid, Hawk};
use crate::{MAX_BOIDS, MAX_HAWKS};

/// Axis-aligned cube centred at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    pub half_extent: f64,
}

impl BoundingVolume {
    pub fn new(half_extent: f64) -> Self {
        Self { half_extent }
    }

    #[inline]
    pub fn min(&self) -> DVec3 {
        DVec3::splat(-self.half_extent)
    }

    #[inline]
    pub fn max(&self) -> DVec3 {
        DVec3::splat(self.half_extent)
    }

    #[inline]
    pub fn clamp(&self, position: DVec3) -> DVec3 {
        position.clamp(self.min(), self.max())
    }

    #[inline]
    pub fn contains(&self, position: DVec3) -> bool {
        position.abs().max_element() <= self.half_extent
    }
}

#[derive(Debug, Clone)]
pub struct SimulationState {
    pub boids: Vec<Boid>,
    pub hawks: Vec<Hawk>,
    pub volume: BoundingVolume,
    // Seconds of simulated time, drives the curvature oscillation
    pub sim_time: f64,
    pub tick: u64,
}

impl SimulationState {
    pub fn new(half_extent: f64) -> Self {
        Self {
            boids: Vec::with_capacity(MAX_BOIDS),
            hawks: Vec::with_capacity(MAX_HAWKS),
            volume: BoundingVolume::new(half_extent),
            sim_time: 0.0,
            tick: 0,
        }
    }

    // Pull every agent back inside the volume, leaving velocities untouched
    pub fn clamp_positions(&mut self) {
        let volume = self.volume;
        for boid in &mut self.boids {
            boid.position = volume.clamp(boid.position);
        }
        for hawk in &mut self.hawks {
            hawk.position = volume.clamp(hawk.position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_positions_keeps_velocity() {
        let mut state = SimulationState::new(10.0);
        state.boids.push(Boid::new(DVec3::new(25.0, -3.0, -40.0), DVec3::new(1.0, 2.0, 3.0)));
        state.hawks.push(Hawk::new(DVec3::new(0.0, 11.0, 0.0), DVec3::X));

        state.clamp_positions();

        assert_eq!(state.boids[0].position, DVec3::new(10.0, -3.0, -10.0));
        assert_eq!(state.boids[0].velocity, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(state.hawks[0].position, DVec3::new(0.0, 10.0, 0.0));
        assert!(state.volume.contains(state.hawks[0].position));
    }

    #[test]
    fn storage_is_preallocated() {
        let state = SimulationState::new(500.0);
        assert!(state.boids.capacity() >= MAX_BOIDS);
        assert!(state.hawks.capacity() >= MAX_HAWKS);
    }
}
