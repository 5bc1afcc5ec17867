//! Fuel description, rate-of-spread physics and heat release

pub mod fuel_table;
pub mod heat_flux;
pub mod ros;

pub use fuel_table::FuelTable;
pub use heat_flux::{FluxCoefficients, HeatFluxBasic, HEAT_FLUX};
pub use ros::{ModelRegistry, NodeContext, ResolvedModel, RosModel};
