/*
 * Simulation Parameters Module
 *
 * This module defines the SimulationParams struct that holds every tunable
 * scalar read by the flock and predator updates. Parameters are read-only
 * during a tick and may be swapped between ticks through the Simulation
 * controller, which validates them first.
 *
 * Parameters deserialize from partial JSON documents: any field left out
 * keeps its default value.
 */

use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::{MAX_BOIDS, MAX_HAWKS, MAX_WORLD_SIZE, MIN_BOIDS, MIN_WORLD_SIZE};

// Smallest grid cell; keeps the largest volume within a million cells per axis
const MIN_CELL_SIZE: f64 = MAX_WORLD_SIZE / 1.0e6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    // Classic flocking rules
    pub separation_radius: f64,
    pub alignment_radius: f64,
    pub cohesion_radius: f64,
    pub separation_weight: f64,
    pub alignment_weight: f64,
    pub cohesion_weight: f64,

    // Path curvature bias
    pub arc_turn_strength: f64,
    pub arc_vertical_strength: f64,
    pub arc_noise_scale: f64,

    // Boid kinematics
    pub min_speed: f64,
    pub max_speed: f64,
    pub max_force: f64,

    // Predator avoidance as seen by boids
    pub hawk_fear_radius: f64,
    pub hawk_fear_weight: f64,

    // Hawk kinematics and pursuit
    pub hawk_min_speed: f64,
    pub hawk_max_speed: f64,
    pub hawk_max_force: f64,
    pub hawk_chase_radius: f64,

    // Boundary containment
    pub boundary_margin: f64,
    pub boundary_turn_factor: f64,
    pub hawk_boundary_margin: f64,
    pub hawk_boundary_turn_factor: f64,

    // Visual scale factors handed to the renderer through snapshots
    pub bird_scale: f64,
    pub hawk_scale: f64,

    // Initial population and volume
    pub boid_count: usize,
    pub hawk_count: usize,
    pub world_size: f64,

    // Performance settings
    pub enable_parallel: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            separation_radius: 6.0,
            alignment_radius: 24.0,
            cohesion_radius: 36.0,
            separation_weight: 1.45,
            alignment_weight: 0.9,
            cohesion_weight: 0.68,
            arc_turn_strength: 1.4,
            arc_vertical_strength: 0.35,
            arc_noise_scale: 0.012,
            min_speed: 7.0,
            max_speed: 14.0,
            max_force: 6.0,
            hawk_fear_radius: 45.0,
            hawk_fear_weight: 2.8,
            hawk_min_speed: 9.0,
            hawk_max_speed: 20.0,
            hawk_max_force: 8.0,
            hawk_chase_radius: 120.0,
            boundary_margin: 20.0,
            boundary_turn_factor: 2.5,
            hawk_boundary_margin: 40.0,
            hawk_boundary_turn_factor: 3.2,
            bird_scale: 0.4,
            hawk_scale: 0.7,
            boid_count: 150,
            hawk_count: 0,
            world_size: 1000.0,
            enable_parallel: true,
        }
    }
}

impl SimulationParams {
    /// Parse a (possibly partial) JSON document and validate the result.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check every invariant the update loop relies on.
    ///
    /// The spatial grid uses the cohesion radius as its cell size, so no other
    /// interaction radius may exceed it or the 27-cell query would miss pairs.
    pub fn validate(&self) -> Result<()> {
        let scalars = [
            self.separation_radius,
            self.alignment_radius,
            self.cohesion_radius,
            self.separation_weight,
            self.alignment_weight,
            self.cohesion_weight,
            self.arc_turn_strength,
            self.arc_vertical_strength,
            self.arc_noise_scale,
            self.min_speed,
            self.max_speed,
            self.max_force,
            self.hawk_fear_radius,
            self.hawk_fear_weight,
            self.hawk_min_speed,
            self.hawk_max_speed,
            self.hawk_max_force,
            self.hawk_chase_radius,
            self.boundary_margin,
            self.boundary_turn_factor,
            self.hawk_boundary_margin,
            self.hawk_boundary_turn_factor,
            self.bird_scale,
            self.hawk_scale,
            self.world_size,
        ];
        if scalars.iter().any(|value| !value.is_finite()) {
            return Err(SimulationError::NonFinite { what: "simulation parameter" });
        }

        if self.separation_radius <= 0.0 || self.alignment_radius <= 0.0 || self.cohesion_radius <= 0.0 {
            return Err(SimulationError::InvalidConfig("interaction radii must be positive"));
        }
        if self.cohesion_radius < MIN_CELL_SIZE {
            return Err(SimulationError::InvalidConfig("cohesion_radius is too small to size the spatial grid"));
        }
        if self.separation_radius > self.cohesion_radius || self.alignment_radius > self.cohesion_radius {
            return Err(SimulationError::InvalidConfig(
                "separation and alignment radii must not exceed the cohesion radius",
            ));
        }
        if self.min_speed <= 0.0 || self.min_speed > self.max_speed {
            return Err(SimulationError::InvalidConfig("boid speeds must satisfy 0 < min_speed <= max_speed"));
        }
        if self.hawk_min_speed <= 0.0 || self.hawk_min_speed > self.hawk_max_speed {
            return Err(SimulationError::InvalidConfig(
                "hawk speeds must satisfy 0 < hawk_min_speed <= hawk_max_speed",
            ));
        }
        if self.max_force < 0.0 || self.hawk_max_force < 0.0 {
            return Err(SimulationError::InvalidConfig("steering forces must not be negative"));
        }
        if self.hawk_fear_radius < 0.0 || self.hawk_chase_radius < 0.0 {
            return Err(SimulationError::InvalidConfig("hawk radii must not be negative"));
        }
        if self.boundary_margin < 0.0 || self.hawk_boundary_margin < 0.0 {
            return Err(SimulationError::InvalidConfig("boundary margins must not be negative"));
        }
        if !Self::world_size_range().contains(&self.world_size) {
            return Err(SimulationError::InvalidConfig("world_size is outside the supported range"));
        }
        if !Self::boid_count_range().contains(&self.boid_count) {
            return Err(SimulationError::InvalidConfig("boid_count is outside the supported range"));
        }
        if !Self::hawk_count_range().contains(&self.hawk_count) {
            return Err(SimulationError::InvalidConfig("hawk_count is outside the supported range"));
        }
        Ok(())
    }

    // Edge length of a spatial grid cell
    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cohesion_radius
    }

    // Bounds accepted by the population and volume setters
    pub fn boid_count_range() -> RangeInclusive<usize> {
        MIN_BOIDS..=MAX_BOIDS
    }

    pub fn hawk_count_range() -> RangeInclusive<usize> {
        0..=MAX_HAWKS
    }

    pub fn world_size_range() -> RangeInclusive<f64> {
        MIN_WORLD_SIZE..=MAX_WORLD_SIZE
    }

    pub fn half_extent_range() -> RangeInclusive<f64> {
        (MIN_WORLD_SIZE * 0.5)..=(MAX_WORLD_SIZE * 0.5)
    }

    pub fn bird_size_percent_range() -> RangeInclusive<u32> {
        50..=300
    }
}
