//! Rate-of-spread models
//!
//! A model maps the local environment of a front node to a scalar speed along the
//! node's outward normal. Models are selected by name through [`ModelRegistry`] once
//! per `advance_to`; the propagation loop then calls [`ResolvedModel::rate`] from
//! parallel workers, so every model must be a pure function of its [`NodeContext`].
//!
//! Fuel coefficients a model needs are declared by name ([`RosModel::coefficients`])
//! and gathered from the fuel table at resolution time, one record per fuel index.

mod curvature;
mod front_depth;
mod isotropic;
mod learned;
mod rothermel;
mod wind_driven;

pub use curvature::CurvatureDriven;
pub use front_depth::FrontDepthDriven;
pub use isotropic::IsotropicFuel;
pub use learned::{Activation, DenseLayer, LearnedModel, LearnedNetwork};
pub use rothermel::Rothermel;
pub use wind_driven::WindDriven;

use crate::core_types::Vec2;
use crate::error::{FireError, Result};
use crate::params::SimulationParameters;
use crate::physics::fuel_table::FuelTable;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Local environment of a node, assembled by the propagation engine
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    pub position: Vec2,
    /// Unit outward normal
    pub normal: Vec2,
    /// Signed curvature (1/m), positive on convex parts of the front
    pub curvature: f64,
    /// Front depth (m)
    pub depth: f64,
    /// Horizontal wind (m/s)
    pub wind: Vec2,
    /// Wind component along the outward normal (m/s)
    pub normal_wind: f64,
    /// Terrain slope along the outward normal (rise over run)
    pub slope: f64,
    /// Simulation time (s)
    pub time: f64,
    /// Fuel category under the node
    pub fuel_index: i32,
    /// Coefficients in the order of [`RosModel::coefficients`]
    pub fuel: &'a [f64],
}

/// A rate-of-spread function
pub trait RosModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Fuel-table columns the model reads, in the order it expects them
    fn coefficients(&self) -> Vec<String>;

    /// Normal speed (m/s) for the given context
    ///
    /// May return NaN or infinity; the engine treats such values as invalid rates.
    fn compute_rate(&self, ctx: &NodeContext<'_>) -> f64;
}

/// Builds a model instance from the current parameters
pub type ModelFactory =
    Arc<dyn Fn(&SimulationParameters) -> Result<Box<dyn RosModel>> + Send + Sync>;

/// Name → model factory table
#[derive(Clone)]
pub struct ModelRegistry {
    factories: FxHashMap<String, ModelFactory>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("ModelRegistry").field("models", &names).finish()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtin_models()
    }
}

impl ModelRegistry {
    /// Registry without any model
    pub fn empty() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// Registry holding every built-in model
    pub fn with_builtin_models() -> Self {
        let mut registry = Self::empty();
        registry.register("IsotropicFuel", |params| {
            Ok(Box::new(IsotropicFuel::from_params(params)?))
        });
        registry.register("WindDriven", |_| Ok(Box::new(WindDriven)));
        registry.register("CurvatureDriven", |params| {
            Ok(Box::new(CurvatureDriven::from_params(params)?))
        });
        registry.register("FrontDepthDriven", |params| {
            Ok(Box::new(FrontDepthDriven::from_params(params)?))
        });
        registry.register("Rothermel", |_| Ok(Box::new(Rothermel)));
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&SimulationParameters) -> Result<Box<dyn RosModel>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// Register a learned model under `name`
    pub fn register_learned(&mut self, name: &str, network: LearnedNetwork) {
        let network = Arc::new(network);
        let model_name = name.to_string();
        self.register(name, move |_| {
            Ok(Box::new(LearnedModel::new(
                model_name.clone(),
                Arc::clone(&network),
            )))
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate `name` and bind its coefficients against `table`
    ///
    /// A model that reads no coefficient may be resolved without a table.
    pub fn resolve(
        &self,
        name: &str,
        params: &SimulationParameters,
        table: Option<&FuelTable>,
    ) -> Result<ResolvedModel> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| FireError::UnknownModel(name.to_string()))?;
        let model = factory(params)?;
        let wanted = model.coefficients();

        let mut records = FxHashMap::default();
        match table {
            Some(table) => {
                let columns = wanted
                    .iter()
                    .map(|coeff| table.column(coeff))
                    .collect::<Result<Vec<usize>>>()?;
                let mut record = Vec::with_capacity(columns.len());
                for index in table.indices() {
                    table.gather(index, &columns, &mut record)?;
                    records.insert(index, record.clone());
                }
            }
            None if wanted.is_empty() => {}
            None => {
                return Err(FireError::config(format!(
                    "model '{name}' needs fuel coefficients {wanted:?} but no fuel table is loaded"
                )))
            }
        }

        debug!(
            "Resolved propagation model '{}' ({} coefficients, {} fuels)",
            name,
            wanted.len(),
            records.len()
        );
        Ok(ResolvedModel {
            model,
            needs_fuel: !wanted.is_empty(),
            records,
        })
    }
}

/// A model instance with its per-fuel coefficient records
#[derive(Debug)]
pub struct ResolvedModel {
    model: Box<dyn RosModel>,
    needs_fuel: bool,
    records: FxHashMap<i32, Vec<f64>>,
}

impl ResolvedModel {
    pub fn name(&self) -> &str {
        self.model.name()
    }

    /// Coefficient record for `fuel_index`
    pub fn fuel_record(&self, fuel_index: i32) -> Result<&[f64]> {
        if !self.needs_fuel {
            return Ok(&[]);
        }
        self.records
            .get(&fuel_index)
            .map(Vec::as_slice)
            .ok_or(FireError::UnknownFuelIndex(fuel_index))
    }

    #[inline]
    pub fn rate(&self, ctx: &NodeContext<'_>) -> f64 {
        self.model.compute_rate(ctx)
    }
}

#[cfg(test)]
pub(crate) fn test_context(fuel: &[f64]) -> NodeContext<'_> {
    NodeContext {
        position: Vec2::zeros(),
        normal: Vec2::new(1.0, 0.0),
        curvature: 0.0,
        depth: 0.0,
        wind: Vec2::zeros(),
        normal_wind: 0.0,
        slope: 0.0,
        time: 0.0,
        fuel_index: 1,
        fuel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model() {
        let registry = ModelRegistry::default();
        let params = SimulationParameters::new();
        assert!(matches!(
            registry.resolve("NoSuchModel", &params, None),
            Err(FireError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_resolution_binds_fuel_records() {
        let registry = ModelRegistry::default();
        let params = SimulationParameters::new();
        let table = FuelTable::parse("Index;Kdepth;vv_coeff\n1;0.1;2.0\n5;0.0;0.5").unwrap();
        let model = registry
            .resolve("IsotropicFuel", &params, Some(&table))
            .unwrap();
        assert_eq!(model.fuel_record(1).unwrap(), &[2.0]);
        assert_eq!(model.fuel_record(5).unwrap(), &[0.5]);
        assert_eq!(model.fuel_record(3), Err(FireError::UnknownFuelIndex(3)));
    }

    #[test]
    fn test_missing_column_and_missing_table() {
        let registry = ModelRegistry::default();
        let params = SimulationParameters::new();
        let table = FuelTable::parse("Index;vv_coeff\n1;1.0").unwrap();
        assert_eq!(
            registry
                .resolve("CurvatureDriven", &params, Some(&table))
                .map(|_| ()),
            Err(FireError::UnknownCoefficient("Kcurv".into()))
        );
        assert!(matches!(
            registry.resolve("IsotropicFuel", &params, None),
            Err(FireError::Configuration(_))
        ));
    }

    #[test]
    fn test_custom_model_registration() {
        #[derive(Debug)]
        struct Constant;
        impl RosModel for Constant {
            fn name(&self) -> &str {
                "Constant"
            }
            fn coefficients(&self) -> Vec<String> {
                Vec::new()
            }
            fn compute_rate(&self, _ctx: &NodeContext<'_>) -> f64 {
                0.25
            }
        }

        let mut registry = ModelRegistry::empty();
        registry.register("Constant", |_| Ok(Box::new(Constant)));
        let model = registry
            .resolve("Constant", &SimulationParameters::new(), None)
            .unwrap();
        let record = model.fuel_record(42).unwrap();
        assert_eq!(model.rate(&test_context(record)), 0.25);
    }
}
