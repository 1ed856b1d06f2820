/*
 * Physics Module
 *
 * This module advances both populations by one tick.
 *
 * Boids are updated in two passes. The first pass computes every boid's
 * steering force against an untouched snapshot of the previous tick, so the
 * result does not depend on iteration order; it is free to run in parallel.
 * The second pass blends the new force into the carried acceleration and
 * integrates.
 *
 * Hawks run after the boids and therefore chase this tick's positions. Their
 * acceleration is rebuilt from zero every tick with no smoothing, which makes
 * them twitchier than the flock.
 *
 * Optimized for performance by:
 * - Using the spatial grid for boid neighbor lookups
 * - Comparing squared distances and taking one square root per close pair
 * - Processing the steering pass in parallel chunks for large flocks
 */

use glam::DVec3;
use rand::Rng;
use rayon::prelude::*;

use crate::boid::{spread, Boid, Hawk};
use crate::noise_field::NoiseField;
use crate::params::SimulationParams;
use crate::spatial_grid::SpatialGrid;
use crate::state::{BoundingVolume, SimulationState};
use crate::steering::{boundary_push, curvature, seek, DEGENERATE_DISTANCE_SQ};

// Weight of the previous acceleration in the low-pass filter
const ACCELERATION_CARRY: f64 = 0.4;
const ACCELERATION_BLEND: f64 = 0.6;
// Applied after integration so forces cannot pile up at walls or in clusters
const ACCELERATION_DECAY: f64 = 0.25;

const BOID_BOUNCE_DAMPING: f64 = 0.7;
const HAWK_BOUNCE_DAMPING: f64 = 0.65;

// Fleeing boids aim faster and may steer harder than in normal flight
const FLEE_SPEED_FACTOR: f64 = 1.5;
const FLEE_FORCE_FACTOR: f64 = 4.5;

// Per-axis width of the idle hawk's random impulse, in units of max force
const WANDER_SPREAD: DVec3 = DVec3::new(0.8, 0.6, 0.8);
const WANDER_FORCE_FACTOR: f64 = 0.7;

// Below this many boids the parallel pass costs more than it saves
const PARALLEL_THRESHOLD: usize = 256;

/// Individual contributions to one boid's steering, before smoothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringBreakdown {
    pub separation: DVec3,
    pub alignment: DVec3,
    pub cohesion: DVec3,
    pub fear: DVec3,
    pub curvature: DVec3,
    pub boundary: DVec3,
}

impl SteeringBreakdown {
    // The weighted sum fed into the low-pass filter
    #[inline]
    pub fn total(&self) -> DVec3 {
        self.separation + self.alignment + self.cohesion + self.fear + self.curvature + self.boundary
    }
}

/// Steering computed for one boid in the first pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoidSteering {
    force: DVec3,
    candidates: usize,
    frightened: bool,
}

/// Counters gathered while updating the flock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlockOutcome {
    pub neighbor_candidates: usize,
    pub frightened_boids: usize,
    pub boundary_contacts: usize,
}

/// Counters gathered while updating the hawks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HawkOutcome {
    pub chasing_hawks: usize,
    pub boundary_contacts: usize,
}

/// Read-only view of the previous tick used by the steering pass.
pub struct FlockContext<'a, N: NoiseField + ?Sized> {
    pub boids: &'a [Boid],
    pub hawks: &'a [Hawk],
    pub grid: &'a SpatialGrid,
    pub params: &'a SimulationParams,
    pub noise: &'a N,
    pub volume: BoundingVolume,
    pub sim_time: f64,
    separation_sq: f64,
    alignment_sq: f64,
    cohesion_sq: f64,
    fear_sq: f64,
}

impl<'a, N: NoiseField + ?Sized> FlockContext<'a, N> {
    pub fn new(state: &'a SimulationState, grid: &'a SpatialGrid, params: &'a SimulationParams, noise: &'a N) -> Self {
        Self {
            boids: &state.boids,
            hawks: &state.hawks,
            grid,
            params,
            noise,
            volume: state.volume,
            sim_time: state.sim_time,
            // Pre-calculate squared radii
            separation_sq: params.separation_radius * params.separation_radius,
            alignment_sq: params.alignment_radius * params.alignment_radius,
            cohesion_sq: params.cohesion_radius * params.cohesion_radius,
            fear_sq: params.hawk_fear_radius * params.hawk_fear_radius,
        }
    }

    /// Compute the steering contributions for the boid at `index`.
    ///
    /// Returns the breakdown together with the number of grid candidates
    /// examined (excluding the boid itself).
    pub fn steer_boid(&self, index: usize) -> (SteeringBreakdown, usize) {
        let boid = &self.boids[index];
        let params = self.params;
        let position = boid.position;
        let velocity = boid.velocity;

        let mut separation = DVec3::ZERO;
        let mut alignment = DVec3::ZERO;
        let mut cohesion = DVec3::ZERO;
        let mut sep_count = 0usize;
        let mut align_count = 0usize;
        let mut cohesion_count = 0usize;
        let mut candidates = 0usize;

        // Process all neighbors in a single pass
        self.grid.for_each_candidate(position, |other_index| {
            if other_index == index {
                return;
            }
            candidates += 1;

            let other = &self.boids[other_index];
            let offset = position - other.position;
            let d_squared = offset.length_squared();
            if d_squared < DEGENERATE_DISTANCE_SQ {
                return;
            }

            if d_squared < self.separation_sq {
                separation += offset / d_squared.sqrt();
                sep_count += 1;
            }
            if d_squared < self.alignment_sq {
                alignment += other.velocity;
                align_count += 1;
            }
            if d_squared < self.cohesion_sq {
                cohesion += other.position;
                cohesion_count += 1;
            }
        });

        let mut breakdown = SteeringBreakdown::default();

        if sep_count > 0 {
            let average = separation / sep_count as f64;
            if let Some(force) = seek(average, velocity, params.max_speed, params.max_force) {
                breakdown.separation = force * params.separation_weight;
            }
        }
        if align_count > 0 {
            let average = alignment / align_count as f64;
            if let Some(force) = seek(average, velocity, params.max_speed, params.max_force) {
                breakdown.alignment = force * params.alignment_weight;
            }
        }
        if cohesion_count > 0 {
            let to_center = cohesion / cohesion_count as f64 - position;
            if let Some(force) = seek(to_center, velocity, params.max_speed, params.max_force) {
                breakdown.cohesion = force * params.cohesion_weight;
            }
        }

        breakdown.fear = self.fear(position, velocity);
        breakdown.curvature = curvature(boid, params, self.noise, self.sim_time);
        breakdown.boundary = boundary_push(
            position,
            self.volume.half_extent,
            params.boundary_margin,
            params.boundary_turn_factor * params.max_force,
        );

        (breakdown, candidates)
    }

    // Flee from the single nearest hawk, harder the closer it is
    fn fear(&self, position: DVec3, velocity: DVec3) -> DVec3 {
        let nearest = self
            .hawks
            .iter()
            .map(|hawk| position - hawk.position)
            .min_by(|a, b| a.length_squared().total_cmp(&b.length_squared()));

        let Some(away) = nearest else {
            return DVec3::ZERO;
        };
        let d_squared = away.length_squared();
        if d_squared <= DEGENERATE_DISTANCE_SQ || d_squared >= self.fear_sq {
            return DVec3::ZERO;
        }

        let params = self.params;
        let distance = d_squared.sqrt();
        let panic = 1.0 - distance / params.hawk_fear_radius;
        seek(
            away,
            velocity,
            params.max_speed * FLEE_SPEED_FACTOR,
            params.max_force * FLEE_FORCE_FACTOR,
        )
        .map_or(DVec3::ZERO, |force| force * (params.hawk_fear_weight * panic))
    }

    fn steering(&self, index: usize) -> BoidSteering {
        let (breakdown, candidates) = self.steer_boid(index);
        BoidSteering {
            force: breakdown.total(),
            candidates,
            frightened: breakdown.fear != DVec3::ZERO,
        }
    }
}

/// Advance every boid by `dt` seconds.
///
/// `grid` must have been rebuilt from the current boid positions. `scratch`
/// holds the steering forces between the two passes and is reused across
/// ticks.
pub fn update_boids<N: NoiseField + ?Sized>(
    state: &mut SimulationState,
    grid: &SpatialGrid,
    params: &SimulationParams,
    noise: &N,
    scratch: &mut Vec<BoidSteering>,
    dt: f64,
) -> FlockOutcome {
    let count = state.boids.len();
    let mut outcome = FlockOutcome::default();
    if count == 0 {
        return outcome;
    }

    // First pass: steering against the previous tick's snapshot
    scratch.clear();
    scratch.resize(count, BoidSteering::default());
    {
        let context = FlockContext::new(state, grid, params, noise);
        if params.enable_parallel && count >= PARALLEL_THRESHOLD {
            // Chunked to keep the number of rayon tasks close to the thread count
            let chunk_size = std::cmp::max(count / rayon::current_num_threads(), 1);
            scratch.par_chunks_mut(chunk_size).enumerate().for_each(|(chunk_idx, chunk)| {
                for (i_in_chunk, slot) in chunk.iter_mut().enumerate() {
                    *slot = context.steering(chunk_idx * chunk_size + i_in_chunk);
                }
            });
        } else {
            for (index, slot) in scratch.iter_mut().enumerate() {
                *slot = context.steering(index);
            }
        }
    }

    // Second pass: smooth, integrate, bounce
    let volume = state.volume;
    for (boid, steering) in state.boids.iter_mut().zip(scratch.iter()) {
        outcome.neighbor_candidates += steering.candidates;
        outcome.frightened_boids += usize::from(steering.frightened);

        boid.acceleration = boid.acceleration * ACCELERATION_CARRY + steering.force * ACCELERATION_BLEND;
        let contacts = integrate(
            &mut boid.position,
            &mut boid.velocity,
            boid.acceleration,
            dt,
            params.min_speed,
            params.max_speed,
            volume,
            BOID_BOUNCE_DAMPING,
        );
        outcome.boundary_contacts += contacts;
        boid.acceleration *= ACCELERATION_DECAY;
    }

    outcome
}

/// Advance every hawk by `dt` seconds, chasing the boids' current positions.
pub fn update_hawks<R: Rng + ?Sized>(
    state: &mut SimulationState,
    params: &SimulationParams,
    rng: &mut R,
    dt: f64,
) -> HawkOutcome {
    let mut outcome = HawkOutcome::default();
    let chase_sq = params.hawk_chase_radius * params.hawk_chase_radius;
    let turn = params.hawk_boundary_turn_factor * params.hawk_max_force;
    let volume = state.volume;
    let boids = &state.boids;

    for hawk in &mut state.hawks {
        hawk.acceleration = DVec3::ZERO;
        hawk.target = nearest_boid_within(hawk.position, boids, chase_sq);

        match hawk.target {
            Some(target) => {
                outcome.chasing_hawks += 1;
                let force = pursuit_force(hawk, boids[target].position, params);
                hawk.acceleration += force;
            }
            None => {
                // Patrol instead of freezing when nothing is in range
                let impulse = DVec3::new(
                    spread(rng, WANDER_SPREAD.x),
                    spread(rng, WANDER_SPREAD.y),
                    spread(rng, WANDER_SPREAD.z),
                );
                hawk.acceleration += impulse * (params.hawk_max_force * WANDER_FORCE_FACTOR);
            }
        }

        hawk.acceleration += boundary_push(hawk.position, volume.half_extent, params.hawk_boundary_margin, turn);

        outcome.boundary_contacts += integrate(
            &mut hawk.position,
            &mut hawk.velocity,
            hawk.acceleration,
            dt,
            params.hawk_min_speed,
            params.hawk_max_speed,
            volume,
            HAWK_BOUNCE_DAMPING,
        );
    }

    outcome
}

/// Index of the closest boid strictly inside `radius_sq`, if any.
pub fn nearest_boid_within(position: DVec3, boids: &[Boid], radius_sq: f64) -> Option<usize> {
    let mut nearest = None;
    let mut nearest_sq = f64::INFINITY;
    for (index, boid) in boids.iter().enumerate() {
        let d_squared = boid.position.distance_squared(position);
        if d_squared < nearest_sq && d_squared < radius_sq {
            nearest_sq = d_squared;
            nearest = Some(index);
        }
    }
    nearest
}

/// Semi-implicit Euler step with speed limits and inelastic wall bounces.
///
/// Speed is rescaled into `[min_speed, max_speed]` without changing direction;
/// a zero velocity stays zero. After the position is clamped into `volume`,
/// each axis resting exactly on a face has its velocity component reversed and
/// scaled by `damping`. Returns the number of axes that bounced.
#[allow(clippy::too_many_arguments)]
pub fn integrate(
    position: &mut DVec3,
    velocity: &mut DVec3,
    acceleration: DVec3,
    dt: f64,
    min_speed: f64,
    max_speed: f64,
    volume: BoundingVolume,
    damping: f64,
) -> usize {
    *velocity += acceleration * dt;

    let speed = velocity.length();
    if speed > max_speed {
        *velocity *= max_speed / speed;
    } else if speed > 0.0 && speed < min_speed {
        *velocity *= min_speed / speed;
    }

    *position += *velocity * dt;
    *position = volume.clamp(*position);

    let (min, max) = (volume.min(), volume.max());
    let mut contacts = 0;
    for axis in 0..3 {
        if position[axis] == min[axis] || position[axis] == max[axis] {
            velocity[axis] *= -damping;
            contacts += 1;
        }
    }
    contacts
}

/// Seek force steering `hawk` towards `target`; zero if it is already there.
pub fn pursuit_force(hawk: &Hawk, target: DVec3, params: &SimulationParams) -> DVec3 {
    seek(target - hawk.position, hawk.velocity, params.hawk_max_speed, params.hawk_max_force)
        .unwrap_or(DVec3::ZERO)
}
