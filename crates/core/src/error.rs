//! Error taxonomy for the fire-front engine
//!
//! Setup and lookup failures are returned to the caller. Numerical and topological
//! failures that happen inside `advance_to` are isolated per node or per front and
//! only surface through the [`AdvanceReport`](crate::solver::AdvanceReport) counters.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, FireError>;

/// Errors produced by the simulation library
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FireError {
    /// Bad or missing parameter detected before a run (fatal for setup)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A layer name was queried that was never registered
    #[error("unknown layer '{0}'")]
    UnknownLayer(String),

    /// Fuel index absent from the loaded fuel table
    #[error("unknown fuel index {0}")]
    UnknownFuelIndex(i32),

    /// Coefficient column absent from the loaded fuel table
    #[error("unknown coefficient '{0}'")]
    UnknownCoefficient(String),

    /// ROS model returned NaN or infinity
    #[error("invalid rate of spread {rate} at ({x:.2}, {y:.2})")]
    InvalidRate { rate: f64, x: f64, y: f64 },

    /// Malformed chain found while changing front topology
    #[error("topology error on front {front}: {reason}")]
    Topology { front: u32, reason: String },

    /// Raster access beyond the registered extent with a strict clamp policy
    #[error("position ({x:.2}, {y:.2}) is outside layer '{layer}'")]
    OutOfBounds { layer: String, x: f64, y: f64 },

    /// Propagation model name not present in the registry
    #[error("unknown propagation model '{0}'")]
    UnknownModel(String),

    /// Command string could not be parsed or executed
    #[error("command error: {0}")]
    Command(String),
}

impl FireError {
    /// Shorthand for [`FireError::Configuration`]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Shorthand for [`FireError::Command`]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }
}
