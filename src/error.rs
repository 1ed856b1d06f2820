/*
 * Error Module
 *
 * Errors surfaced by configuration loading and the simulation setters.
 * The per-tick update itself never fails: degenerate geometry is handled by
 * guard clauses that drop the affected steering term.
 */

use thiserror::Error;

/// Errors emitted while configuring a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A parameter value that the update loop cannot work with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// NaN or infinity passed where a finite number is required.
    #[error("{what} must be a finite number")]
    NonFinite { what: &'static str },

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = SimulationError> = std::result::Result<T, E>;
