/*
 * Snapshot Module
 *
 * Read-only views of the agents for whatever draws them. A snapshot copies
 * positions, velocities and visual attributes so the caller can keep it
 * across ticks without borrowing the simulation.
 */

use glam::DVec3;
use serde::Serialize;

use crate::boid::{AgentKind, Boid, Hawk};

// Hawks are drawn in a flat red
const HAWK_COLOR: [f32; 3] = [1.0, 0.176, 0.176];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgentView {
    pub position: DVec3,
    pub velocity: DVec3,
    // Uniform scale for the agent's mesh
    pub scale: f64,
    pub color: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSnapshot {
    pub kind: AgentKind,
    pub tick: u64,
    pub agents: Vec<AgentView>,
}

impl AgentSnapshot {
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.agents.iter().map(|agent| agent.position)
    }
}

impl AgentView {
    pub(crate) fn of_boid(boid: &Boid, bird_scale: f64, size_multiplier: f64) -> Self {
        Self {
            position: boid.position,
            velocity: boid.velocity,
            scale: bird_scale * boid.base_size_factor * size_multiplier,
            color: boid.color,
        }
    }

    pub(crate) fn of_hawk(hawk: &Hawk, hawk_scale: f64, size_multiplier: f64) -> Self {
        Self {
            position: hawk.position,
            velocity: hawk.velocity,
            scale: hawk_scale * size_multiplier,
            color: HAWK_COLOR,
        }
    }
}
