//! Fire-front propagation engine
//!
//! Tracks fire perimeters as chains of markers over a rectangular domain and
//! advances them with pluggable rate-of-spread models, recording the arrival time
//! of the fire in every cell of a burn map.
//!
//! ## Layout
//!
//! - [`params`]: flat key/value parameter store
//! - [`grid`]: domain, raster layers and the arrival-time map
//! - [`physics`]: fuel table and rate-of-spread models
//! - [`front`]: node arena and front topology
//! - [`solver`]: sub-stepping integrator, resolution control, splits and merges
//! - [`simulation`]: the [`Simulation`] context and its command interface
//!
//! ## Example
//!
//! ```rust,ignore
//! use forefire_core::{Simulation, Vec2};
//!
//! let mut sim = Simulation::new();
//! sim.load_fuel_table("Index;vv_coeff\n1;1.0")?;
//! sim.create_domain(Vec2::zeros(), Vec2::new(500.0, 500.0), 0.0)?;
//! sim.ignite_point(Vec2::new(250.0, 250.0), 0.0)?;
//! let report = sim.advance_to(60.0)?;
//! println!("burned {} m² in {} sub-steps", sim.burned_area(), report.substeps);
//! ```

pub mod core_types;
pub mod error;
pub mod front;
pub mod grid;
pub mod params;
pub mod physics;
pub mod simulation;
pub mod solver;

pub use core_types::{ReferenceTime, Vec2, Vec3};
pub use error::{FireError, Result};
pub use front::{Front, FrontArena, FrontId, FrontStatus, Node, NodeId, NodeState};
pub use grid::{ArrivalTimeMap, ClampPolicy, Domain, LayerStore, RasterGeometry};
pub use params::{ParamValue, SimulationParameters};
pub use physics::{FuelTable, ModelRegistry, NodeContext, RosModel};
pub use simulation::{FrontSnapshot, NodeSnapshot, Simulation, BURN_MAP};
pub use solver::{AdvanceReport, PropagationConfig, TopologyEvent, TopologyKind};
