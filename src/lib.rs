/*
 * Boid Flocking Simulation - Module Definitions
 *
 * This file defines the module structure of the flocking core: a population
 * of boids and a handful of hawks moving inside an axis-aligned cube,
 * advanced one tick at a time. Rendering, input and settings persistence
 * live outside this crate and talk to it through the Simulation controller.
 */

// Re-export key components for easier access
pub use app::Simulation;
pub use boid::{AgentKind, Boid, Hawk};
pub use debug::StepStats;
pub use error::SimulationError;
pub use noise_field::{FlatField, NoiseField, PerlinField};
pub use params::SimulationParams;
pub use snapshot::{AgentSnapshot, AgentView};
pub use spatial_grid::SpatialGrid;
pub use state::{BoundingVolume, SimulationState};

// Define modules
pub mod app;
pub mod boid;
pub mod debug;
pub mod error;
pub mod noise_field;
pub mod params;
pub mod physics;
pub mod snapshot;
pub mod spatial_grid;
pub mod state;
pub mod steering;

// Population bounds
pub const MIN_BOIDS: usize = 10;
pub const MAX_BOIDS: usize = 5000;
pub const MAX_HAWKS: usize = 100;

// Edge length bounds of the bounding cube
pub const MIN_WORLD_SIZE: f64 = 100.0;
pub const MAX_WORLD_SIZE: f64 = 10000.0;

// Longest frame delta fed to a single tick by Simulation::advance_frame
pub const MAX_FRAME_DELTA: f64 = 2.0 / 60.0;
