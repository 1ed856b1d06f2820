/*
 * Application Module
 *
 * This module defines the Simulation controller that owns the world state,
 * the parameters, the spatial grid, the seeded random source and the noise
 * field. Everything outside the crate talks to the simulation through it:
 * population and volume setters, the per-tick step, and snapshots for
 * rendering.
 *
 * Tick order is fixed: rebuild the grid, update boids, update hawks.
 */

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use crate::boid::{AgentKind, Boid, Hawk};
use crate::debug::StepStats;
use crate::error::{Result, SimulationError};
use crate::noise_field::{NoiseField, PerlinField};
use crate::params::SimulationParams;
use crate::physics::{self, BoidSteering};
use crate::snapshot::{AgentSnapshot, AgentView};
use crate::spatial_grid::SpatialGrid;
use crate::state::SimulationState;
use crate::MAX_FRAME_DELTA;

pub struct Simulation<N: NoiseField = PerlinField> {
    state: SimulationState,
    params: SimulationParams,
    grid: SpatialGrid,
    noise: N,
    rng: ChaCha8Rng,
    steering_buffer: Vec<BoidSteering>,
    // Renderer-facing size multiplier, 1.0 = 100 %
    size_multiplier: f64,
    last_stats: StepStats,
}

impl Simulation<PerlinField> {
    /// Build a simulation whose spawning, wandering and noise all derive from `seed`.
    pub fn new(params: SimulationParams, seed: u64) -> Result<Self> {
        let noise = PerlinField::new((seed ^ (seed >> 32)) as u32);
        Self::with_noise(params, seed, noise)
    }
}

impl<N: NoiseField> Simulation<N> {
    /// Build a simulation around a caller-supplied noise field.
    pub fn with_noise(params: SimulationParams, seed: u64, noise: N) -> Result<Self> {
        params.validate()?;

        let mut simulation = Self {
            state: SimulationState::new(params.world_size * 0.5),
            grid: SpatialGrid::new(params.cell_size()),
            noise,
            rng: ChaCha8Rng::seed_from_u64(seed),
            steering_buffer: Vec::new(),
            size_multiplier: 1.0,
            last_stats: StepStats::default(),
            params,
        };

        simulation.set_population_size(AgentKind::Boid, simulation.params.boid_count);
        simulation.set_population_size(AgentKind::Hawk, simulation.params.hawk_count);
        debug!(
            seed,
            boids = simulation.state.boids.len(),
            hawks = simulation.state.hawks.len(),
            half_extent = simulation.state.volume.half_extent,
            "Simulation created"
        );
        Ok(simulation)
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Replace the parameters between ticks.
    ///
    /// Population and world size changes in the new set are applied through
    /// the corresponding setters.
    pub fn set_params(&mut self, params: SimulationParams) -> Result<()> {
        params.validate()?;
        let (boids, hawks, world_size) = (params.boid_count, params.hawk_count, params.world_size);
        self.params = params;

        self.set_world_size(world_size)?;
        self.set_population_size(AgentKind::Boid, boids);
        self.set_population_size(AgentKind::Hawk, hawks);
        Ok(())
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Direct access for tools and tests that place agents by hand.
    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn last_stats(&self) -> &StepStats {
        &self.last_stats
    }

    pub fn len(&self, kind: AgentKind) -> usize {
        match kind {
            AgentKind::Boid => self.state.boids.len(),
            AgentKind::Hawk => self.state.hawks.len(),
        }
    }

    /// Grow or shrink one population, clamping `count` into its supported range.
    ///
    /// New agents are appended with randomised state; shrinking drops agents
    /// from the tail so surviving indices stay valid. Returns the new count.
    pub fn set_population_size(&mut self, kind: AgentKind, count: usize) -> usize {
        let range = match kind {
            AgentKind::Boid => SimulationParams::boid_count_range(),
            AgentKind::Hawk => SimulationParams::hawk_count_range(),
        };
        let desired = count.clamp(*range.start(), *range.end());
        if desired != count {
            warn!(?kind, requested = count, applied = desired, "Population size clamped");
        }

        let world_size = self.state.volume.half_extent * 2.0;
        match kind {
            AgentKind::Boid => {
                let boids = &mut self.state.boids;
                while boids.len() < desired {
                    boids.push(Boid::spawn(&mut self.rng, &self.noise, &self.params, world_size));
                }
                boids.truncate(desired);
                self.params.boid_count = desired;
            }
            AgentKind::Hawk => {
                let hawks = &mut self.state.hawks;
                while hawks.len() < desired {
                    hawks.push(Hawk::spawn(&mut self.rng, &self.params, world_size));
                }
                hawks.truncate(desired);
                self.params.hawk_count = desired;
            }
        }

        debug!(?kind, count = desired, "Population resized");
        desired
    }

    /// Resize the bounding cube and pull every agent back inside it.
    ///
    /// Velocities are left untouched. Returns the half-extent actually applied.
    pub fn set_half_extent(&mut self, half_extent: f64) -> Result<f64> {
        if !half_extent.is_finite() {
            return Err(SimulationError::NonFinite { what: "half extent" });
        }

        let range = SimulationParams::half_extent_range();
        let applied = half_extent.clamp(*range.start(), *range.end());
        if applied != half_extent {
            warn!(requested = half_extent, applied, "Half extent clamped");
        }

        self.state.volume.half_extent = applied;
        self.params.world_size = applied * 2.0;
        self.state.clamp_positions();
        debug!(half_extent = applied, "Bounding volume resized");
        Ok(applied)
    }

    /// Same as [`Self::set_half_extent`], expressed as the cube's edge length.
    pub fn set_world_size(&mut self, world_size: f64) -> Result<f64> {
        self.set_half_extent(world_size * 0.5).map(|half| half * 2.0)
    }

    /// Renderer-facing size multiplier in percent, clamped to 50..=300.
    pub fn set_bird_size_percent(&mut self, percent: u32) -> u32 {
        let range = SimulationParams::bird_size_percent_range();
        let applied = percent.clamp(*range.start(), *range.end());
        self.size_multiplier = f64::from(applied) / 100.0;
        applied
    }

    pub fn bird_size_percent(&self) -> u32 {
        (self.size_multiplier * 100.0).round() as u32
    }

    /// Advance the simulation by exactly one tick of `dt` seconds.
    ///
    /// `dt` is used as given. Negative, NaN or infinite values are undefined
    /// behaviour for the simulation (not memory-unsafe, but the state becomes
    /// meaningless); callers driving this from a frame clock should use
    /// [`Self::advance_frame`], which clamps.
    pub fn step(&mut self, dt: f64) -> StepStats {
        let started = Instant::now();

        self.state.sim_time += dt;
        self.state.tick += 1;

        self.grid
            .rebuild(self.state.boids.iter().map(|boid| boid.position), self.params.cell_size());

        let flock = physics::update_boids(
            &mut self.state,
            &self.grid,
            &self.params,
            &self.noise,
            &mut self.steering_buffer,
            dt,
        );
        let hawks = physics::update_hawks(&mut self.state, &self.params, &mut self.rng, dt);

        let mut stats = StepStats {
            tick: self.state.tick,
            dt,
            boids: self.state.boids.len(),
            hawks: self.state.hawks.len(),
            occupied_cells: self.grid.occupied_cells(),
            ..StepStats::default()
        };
        stats.record(flock, hawks);
        stats.elapsed = started.elapsed();

        trace!(
            tick = stats.tick,
            boids = stats.boids,
            hawks = stats.hawks,
            cells = stats.occupied_cells,
            candidates = stats.neighbor_candidates,
            frightened = stats.frightened_boids,
            chasing = stats.chasing_hawks,
            contacts = stats.boundary_contacts,
            elapsed_us = stats.elapsed.as_micros() as u64,
            "Tick complete"
        );

        self.last_stats = stats;
        stats
    }

    /// Step with a wall-clock frame delta, clamped to [`MAX_FRAME_DELTA`] so a
    /// stalled frame cannot blow the integration up.
    pub fn advance_frame(&mut self, frame_delta: f64) -> StepStats {
        let dt = if frame_delta.is_nan() { 0.0 } else { frame_delta.clamp(0.0, MAX_FRAME_DELTA) };
        self.step(dt)
    }

    /// Copy out everything a renderer needs for one population.
    pub fn snapshot(&self, kind: AgentKind) -> AgentSnapshot {
        let agents = match kind {
            AgentKind::Boid => self
                .state
                .boids
                .iter()
                .map(|boid| AgentView::of_boid(boid, self.params.bird_scale, self.size_multiplier))
                .collect(),
            AgentKind::Hawk => self
                .state
                .hawks
                .iter()
                .map(|hawk| AgentView::of_hawk(hawk, self.params.hawk_scale, self.size_multiplier))
                .collect(),
        };
        AgentSnapshot {
            kind,
            tick: self.state.tick,
            agents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise_field::FlatField;
    use crate::{MAX_BOIDS, MAX_HAWKS, MIN_BOIDS};

    fn simulation() -> Simulation<FlatField> {
        Simulation::with_noise(SimulationParams::default(), 42, FlatField(0.0)).unwrap()
    }

    #[test]
    fn starts_with_configured_populations() {
        let params = SimulationParams {
            boid_count: 64,
            hawk_count: 2,
            ..SimulationParams::default()
        };
        let sim = Simulation::new(params, 5).unwrap();
        assert_eq!(sim.len(AgentKind::Boid), 64);
        assert_eq!(sim.len(AgentKind::Hawk), 2);
        assert_eq!(sim.state().volume.half_extent, 500.0);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = SimulationParams {
            cohesion_radius: -1.0,
            ..SimulationParams::default()
        };
        assert!(Simulation::new(params, 1).is_err());
    }

    #[test]
    fn tiny_interaction_radii_step_or_get_rejected() {
        let tiny = |radius: f64| SimulationParams {
            separation_radius: radius,
            alignment_radius: radius,
            cohesion_radius: radius,
            ..SimulationParams::default()
        };
        assert!(matches!(
            Simulation::with_noise(tiny(1e-7), 3, FlatField(0.0)),
            Err(SimulationError::InvalidConfig(_))
        ));

        let mut sim = Simulation::with_noise(tiny(0.01), 3, FlatField(0.0)).unwrap();
        sim.set_world_size(10_000.0).unwrap();
        let stats = sim.step(0.01);
        assert_eq!(stats.boids, 150);
    }

    #[test]
    fn population_is_clamped_and_truncated_from_the_tail() {
        let mut sim = simulation();
        assert_eq!(sim.set_population_size(AgentKind::Boid, 1), MIN_BOIDS);
        assert_eq!(sim.set_population_size(AgentKind::Boid, 10_000), MAX_BOIDS);
        assert_eq!(sim.set_population_size(AgentKind::Hawk, 500), MAX_HAWKS);

        let head: Vec<_> = sim.state().boids[..20].to_vec();
        sim.set_population_size(AgentKind::Boid, 20);
        assert_eq!(sim.state().boids, head);
        assert_eq!(sim.params().boid_count, 20);
    }

    #[test]
    fn growing_after_shrinking_does_not_reallocate() {
        let mut sim = simulation();
        let capacity = sim.state().boids.capacity();
        sim.set_population_size(AgentKind::Boid, MAX_BOIDS);
        sim.set_population_size(AgentKind::Boid, 10);
        sim.set_population_size(AgentKind::Boid, MAX_BOIDS);
        assert_eq!(sim.state().boids.capacity(), capacity);
    }

    #[test]
    fn shrinking_the_volume_reclamps_agents() {
        let mut sim = simulation();
        sim.set_population_size(AgentKind::Hawk, 5);
        let velocities: Vec<_> = sim.state().boids.iter().map(|b| b.velocity).collect();

        let applied = sim.set_half_extent(60.0).unwrap();
        assert_eq!(applied, 60.0);
        assert_eq!(sim.params().world_size, 120.0);
        assert!(sim.state().boids.iter().all(|b| sim.state().volume.contains(b.position)));
        assert!(sim.state().hawks.iter().all(|h| sim.state().volume.contains(h.position)));
        let after: Vec<_> = sim.state().boids.iter().map(|b| b.velocity).collect();
        assert_eq!(velocities, after);
    }

    #[test]
    fn volume_setter_clamps_and_rejects_nan() {
        let mut sim = simulation();
        assert_eq!(sim.set_half_extent(1.0).unwrap(), 50.0);
        assert_eq!(sim.set_world_size(50_000.0).unwrap(), 10_000.0);
        assert!(matches!(sim.set_half_extent(f64::NAN), Err(SimulationError::NonFinite { .. })));
        assert_eq!(sim.state().volume.half_extent, 5000.0);
    }

    #[test]
    fn bird_size_scales_snapshots() {
        let mut sim = simulation();
        sim.set_population_size(AgentKind::Hawk, 1);
        assert_eq!(sim.set_bird_size_percent(10), 50);
        assert_eq!(sim.set_bird_size_percent(200), 200);
        assert_eq!(sim.bird_size_percent(), 200);

        let hawks = sim.snapshot(AgentKind::Hawk);
        assert!((hawks.agents[0].scale - 0.7 * 2.0).abs() < 1e-12);

        let boids = sim.snapshot(AgentKind::Boid);
        // Flat noise gives every boid a base size factor of exactly one
        assert!(boids.agents.iter().all(|b| (b.scale - 0.4 * 2.0).abs() < 1e-12));
        assert_eq!(boids.len(), sim.len(AgentKind::Boid));
    }

    #[test]
    fn step_advances_clock_and_reports_stats() {
        let mut sim = simulation();
        let stats = sim.step(0.1);
        assert_eq!(stats.tick, 1);
        assert_eq!(stats.boids, 150);
        assert!((sim.state().sim_time - 0.1).abs() < 1e-12);
        assert_eq!(sim.grid().len(), 150);
        assert_eq!(sim.last_stats(), &stats);
    }

    #[test]
    fn advance_frame_clamps_long_gaps() {
        let mut sim = simulation();
        let stats = sim.advance_frame(3.0);
        assert!((stats.dt - MAX_FRAME_DELTA).abs() < 1e-12);
        assert_eq!(sim.advance_frame(f64::NAN).dt, 0.0);
        assert_eq!(sim.advance_frame(-1.0).dt, 0.0);
    }

    #[test]
    fn set_params_applies_population_and_volume() {
        let mut sim = simulation();
        let params = SimulationParams {
            boid_count: 30,
            hawk_count: 4,
            world_size: 400.0,
            ..SimulationParams::default()
        };
        sim.set_params(params).unwrap();
        assert_eq!(sim.len(AgentKind::Boid), 30);
        assert_eq!(sim.len(AgentKind::Hawk), 4);
        assert_eq!(sim.state().volume.half_extent, 200.0);
    }
}
