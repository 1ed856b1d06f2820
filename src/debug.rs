/*
 * Debug Information Module
 *
 * This module defines the StepStats struct that records what happened during
 * the most recent tick, for logging and for tools that want to display it.
 *
 * Includes metrics for:
 * - Population sizes and grid occupancy
 * - Neighbor candidates examined through the grid
 * - Boids fleeing a hawk and hawks chasing a boid
 * - Wall bounces
 * - Wall-clock time spent in the tick
 */

use std::time::Duration;

use serde::Serialize;

use crate::physics::{FlockOutcome, HawkOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StepStats {
    pub tick: u64,
    pub dt: f64,
    pub boids: usize,
    pub hawks: usize,
    pub occupied_cells: usize,
    pub neighbor_candidates: usize,
    pub frightened_boids: usize,
    pub chasing_hawks: usize,
    pub boundary_contacts: usize,
    pub elapsed: Duration,
}

impl StepStats {
    pub(crate) fn record(&mut self, flock: FlockOutcome, hawks: HawkOutcome) {
        self.neighbor_candidates = flock.neighbor_candidates;
        self.frightened_boids = flock.frightened_boids;
        self.chasing_hawks = hawks.chasing_hawks;
        self.boundary_contacts = flock.boundary_contacts + hawks.boundary_contacts;
    }

    // Mean number of grid candidates looked at per boid
    pub fn candidates_per_boid(&self) -> f64 {
        if self.boids == 0 {
            0.0
        } else {
            self.neighbor_candidates as f64 / self.boids as f64
        }
    }
}
