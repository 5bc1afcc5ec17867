//! Front propagation solver
//!
//! [`Propagator::advance`] drives every active front to a target time in CFL-bounded
//! sub-steps. The submodules hold the pieces it runs each sub-step:
//!
//! - [`config`]: validated snapshot of the engine parameters
//! - [`rasterize`]: swept-area stamping into the arrival-time map
//! - [`resolution`]: node insertion and removal
//! - [`topology`]: front splitting and merging

pub mod config;
mod propagation;
pub mod rasterize;
pub mod resolution;
pub mod topology;

pub use config::PropagationConfig;
pub use propagation::{AdvanceReport, Propagator};
pub use resolution::{refine_front, ResolutionStats};
pub use topology::{resolve_topology, TopologyEvent, TopologyKind, TopologyOutcome};
