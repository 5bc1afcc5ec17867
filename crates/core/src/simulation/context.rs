//! Explicit simulation context
//!
//! A [`Simulation`] owns everything one fire run needs: parameters, the domain,
//! registered layers, the fuel table, the model registry, the front arena, the burn
//! map and the clock. Several simulations can coexist in one process.

use crate::core_types::{ReferenceTime, Vec2, Vec3};
use crate::error::{FireError, Result};
use crate::front::{FrontArena, FrontId, FrontStatus, NodeId, NodeState};
pub use crate::grid::BURN_MAP;
use crate::grid::{
    ArrivalTimeMap, ClampPolicy, ComputedLayer, Domain, Layer, LayerStore, RasterGeometry,
};
use crate::params::{ParamValue, SimulationParameters};
use crate::physics::ros::LearnedNetwork;
use crate::physics::{FluxCoefficients, FuelTable, HeatFluxBasic, ModelRegistry, RosModel, HEAT_FLUX};
use crate::solver::{AdvanceReport, PropagationConfig, Propagator, TopologyEvent};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Nodes of a point ignition polygon
const IGNITION_NODES: usize = 6;

/// Point ignition radius as a fraction of `perimeterResolution`
const IGNITION_RADIUS: f64 = 0.6;

/// Copy of one node for callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub loc: Vec3,
    pub vel: Vec3,
    pub state: NodeState,
    pub time: f64,
    pub depth: f64,
    pub frozen: bool,
}

/// Copy of one front and its nodes in chain order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontSnapshot {
    pub id: FrontId,
    pub domain: u32,
    pub time: f64,
    pub closed: bool,
    pub status: FrontStatus,
    pub nodes: Vec<NodeSnapshot>,
}

/// A complete fire simulation
#[derive(Debug)]
pub struct Simulation {
    params: SimulationParameters,
    domain: Option<Domain>,
    layers: LayerStore,
    fuel_table: Option<Arc<FuelTable>>,
    models: ModelRegistry,
    fronts: FrontArena,
    /// Parameter holding the heat type used where no `fuel` layer exists, set once
    /// a flux layer is added
    heat_type_key: Option<String>,
    clock: f64,
    events: Vec<TopologyEvent>,
    interrupt: Arc<AtomicBool>,
    /// Front that receives `FireNode` commands without an explicit `frontId`
    pub(crate) current_front: Option<FrontId>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// Simulation with default parameters and the built-in models
    pub fn new() -> Self {
        Self::with_parameters(SimulationParameters::new())
    }

    pub fn with_parameters(params: SimulationParameters) -> Self {
        let policy = params
            .get_string("outOfBoundsPolicy")
            .ok()
            .and_then(|name| ClampPolicy::from_name(&name).ok())
            .unwrap_or_default();
        Self {
            params,
            domain: None,
            layers: LayerStore::new(policy),
            fuel_table: None,
            models: ModelRegistry::with_builtin_models(),
            fronts: FrontArena::new(),
            heat_type_key: None,
            clock: 0.0,
            events: Vec::new(),
            interrupt: Arc::new(AtomicBool::new(false)),
            current_front: None,
        }
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    pub fn parameters(&self) -> &SimulationParameters {
        &self.params
    }

    /// Store a parameter given as text
    ///
    /// `fuelsTable` loads the fuel table and `outOfBoundsPolicy` switches the layer
    /// clamp policy; both fail without touching the store on bad input.
    pub fn set_parameter(&mut self, key: &str, raw: &str) -> Result<()> {
        self.apply(key, ParamValue::parse(raw))
    }

    pub fn set_f64(&mut self, key: &str, value: f64) -> Result<()> {
        self.apply(key, ParamValue::Number(value))
    }

    pub fn set_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.apply(key, ParamValue::Number(value as f64))
    }

    pub fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, ParamValue::Text(value.to_string()))
    }

    fn apply(&mut self, key: &str, value: ParamValue) -> Result<()> {
        match key {
            "fuelsTable" => self.load_fuel_table(&value.to_string())?,
            "outOfBoundsPolicy" => {
                self.layers
                    .set_policy(ClampPolicy::from_name(&value.to_string())?);
            }
            _ => {}
        }
        debug!("Parameter {} = {}", key, value);
        self.params.set(key, value);
        Ok(())
    }

    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.params.get_f64(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.params.get_int(key)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.params.get_string(key)
    }

    // ------------------------------------------------------------------
    // Domain, layers, fuels, models
    // ------------------------------------------------------------------

    /// Define the fire domain and reset every front, event and the burn map
    ///
    /// The burn map resolution comes from `bmapResolution`, falling back to
    /// `minimalPropagativeFrontDepth` and then to `perimeterResolution` when that
    /// depth is zero.
    pub fn create_domain(&mut self, sw: Vec2, ne: Vec2, start_time: f64) -> Result<()> {
        self.create_domain_at(sw, ne, start_time, ReferenceTime::default())
    }

    /// [`Simulation::create_domain`] anchored to a calendar date
    pub fn create_domain_at(
        &mut self,
        sw: Vec2,
        ne: Vec2,
        start_time: f64,
        reference: ReferenceTime,
    ) -> Result<()> {
        let domain = Domain::with_reference(sw, ne, start_time, reference)?;
        let resolution = match self.params.get_opt_f64("bmapResolution")? {
            Some(res) => res,
            None => match self.params.get_f64("minimalPropagativeFrontDepth")? {
                depth if depth > 0.0 => depth,
                _ => self.params.get_f64("perimeterResolution")?,
            },
        };
        let burn_map = Arc::new(ArrivalTimeMap::new(sw, ne - sw, resolution)?);
        let (nx, ny) = burn_map.dimensions();
        info!(
            "Fire domain ({:.1}, {:.1}) -> ({:.1}, {:.1}) at t={} from {}, burn map {}x{} @ {}m",
            sw.x, sw.y, ne.x, ne.y, start_time, reference, nx, ny, resolution
        );

        for component in ["windU", "windV"] {
            if !self.layers.contains(component) {
                self.layers
                    .register_computed(component, ComputedLayer::Parameter(component.to_string()));
            }
        }
        self.domain = Some(domain);
        self.layers.register_arrival_time(BURN_MAP, burn_map);
        self.fronts = FrontArena::new();
        self.events.clear();
        self.clock = start_time;
        self.current_front = None;
        Ok(())
    }

    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    fn require_domain(&self) -> Result<&Domain> {
        self.domain
            .as_ref()
            .ok_or_else(|| FireError::config("no fire domain defined"))
    }

    /// Register a named layer by type
    ///
    /// - `propagation`: selects the rate-of-spread model `name`, stored under `key`
    ///   (usually `propagationModel`)
    /// - `data`: a uniform layer `name` that reads the parameter `key` when sampled
    /// - `flux`: enables the `heatFlux` output of model `name`; `key` names the
    ///   parameter giving the heat type where no `fuel` layer is registered
    pub fn add_layer(&mut self, kind: &str, name: &str, key: &str) -> Result<()> {
        match kind {
            "propagation" => {
                if !self.models.contains(name) {
                    return Err(FireError::UnknownModel(name.to_string()));
                }
                info!("Propagation model set to '{}'", name);
                self.params.set_string(key, name);
                Ok(())
            }
            "data" => {
                self.layers
                    .register_computed(name, ComputedLayer::Parameter(key.to_string()));
                Ok(())
            }
            "flux" => {
                if name != HeatFluxBasic::NAME {
                    return Err(FireError::UnknownModel(name.to_string()));
                }
                info!("Heat flux model set to '{}' (heat type from '{}')", name, key);
                self.heat_type_key = Some(key.to_string());
                Ok(())
            }
            other => Err(FireError::config(format!("unsupported layer type '{other}'"))),
        }
    }

    pub fn add_constant_layer(&mut self, name: &str, value: f64) {
        self.layers
            .register_computed(name, ComputedLayer::Constant(value));
    }

    /// Bind a continuous grid (altitude, wind components, ...)
    pub fn add_scalar_layer(
        &mut self,
        name: &str,
        geometry: RasterGeometry,
        data: Arc<[f64]>,
    ) -> Result<()> {
        if name == BURN_MAP {
            return Err(FireError::config(format!("'{BURN_MAP}' is reserved")));
        }
        self.layers.register_scalar(name, geometry, data)
    }

    /// Bind a categorical grid (fuel indices)
    pub fn add_index_layer(
        &mut self,
        name: &str,
        geometry: RasterGeometry,
        data: Arc<[i32]>,
    ) -> Result<()> {
        if name == BURN_MAP {
            return Err(FireError::config(format!("'{BURN_MAP}' is reserved")));
        }
        self.layers.register_indexed(name, geometry, data)
    }

    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    /// Parse and install a fuel table, replacing the previous one whole
    pub fn load_fuel_table(&mut self, text: &str) -> Result<()> {
        let table = FuelTable::parse(text)?;
        info!(
            "Loaded fuel table: {} fuels, {} coefficients",
            table.len(),
            table.coefficient_names().len()
        );
        self.fuel_table = Some(Arc::new(table));
        Ok(())
    }

    pub fn fuel_table(&self) -> Option<&FuelTable> {
        self.fuel_table.as_deref()
    }

    pub fn register_model<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&SimulationParameters) -> Result<Box<dyn RosModel>> + Send + Sync + 'static,
    {
        self.models.register(name, factory);
    }

    pub fn register_learned_model(&mut self, name: &str, network: LearnedNetwork) {
        self.models.register_learned(name, network);
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    // ------------------------------------------------------------------
    // Fronts
    // ------------------------------------------------------------------

    /// Create an empty closed front, dormant until `time`
    pub fn create_front(&mut self, id: Option<FrontId>, time: f64) -> Result<FrontId> {
        self.require_domain()?;
        let id = self.fronts.create_front(id, 0, time)?;
        debug!("Created front {} at t={}", id, time);
        self.current_front = Some(id);
        Ok(id)
    }

    pub fn set_front_closed(&mut self, front: FrontId, closed: bool) -> Result<()> {
        self.fronts.set_closed(front, closed)
    }

    /// Append a node to a front; positions are clipped to the domain
    pub fn add_node(
        &mut self,
        front: FrontId,
        loc: Vec3,
        vel: Vec3,
        time: f64,
        state: NodeState,
    ) -> Result<NodeId> {
        let depth = self.params.get_f64("initialFrontDepth")?;
        self.add_node_with_depth(front, loc, vel, time, state, depth)
    }

    /// Append a node carrying an explicit burning-zone depth
    pub fn add_node_with_depth(
        &mut self,
        front: FrontId,
        loc: Vec3,
        vel: Vec3,
        time: f64,
        state: NodeState,
        depth: f64,
    ) -> Result<NodeId> {
        if !(depth.is_finite() && depth >= 0.0) {
            return Err(FireError::config(format!("node depth must be >= 0, got {depth}")));
        }
        let clipped = self.require_domain()?.clamp(&loc.xy());
        self.fronts.append_node(
            front,
            Vec3::new(clipped.x, clipped.y, loc.z),
            vel,
            time,
            state,
            depth,
        )
    }

    /// Start a fire at `center` as a small closed hexagon
    ///
    /// The hexagon's edges (equal to its radius) lie between the fusion and
    /// subdivision thresholds of the default resolution settings.
    pub fn ignite_point(&mut self, center: Vec2, time: f64) -> Result<FrontId> {
        let radius = IGNITION_RADIUS * self.params.get_f64("perimeterResolution")?;
        let front = self.create_front(None, time)?;
        for i in 0..IGNITION_NODES {
            // Clockwise
            let angle = -TAU * i as f64 / IGNITION_NODES as f64;
            let p = center + Vec2::new(angle.cos(), angle.sin()) * radius;
            self.add_node(front, Vec3::new(p.x, p.y, 0.0), Vec3::zeros(), time, NodeState::Init)?;
        }
        info!("Fire started at ({:.1}, {:.1}) t={} as front {}", center.x, center.y, time, front);
        Ok(front)
    }

    pub fn front_arena(&self) -> &FrontArena {
        &self.fronts
    }

    /// Active fronts with their nodes
    pub fn fronts(&self) -> Vec<FrontSnapshot> {
        self.fronts
            .active_fronts()
            .map(|front| FrontSnapshot {
                id: front.id(),
                domain: front.domain(),
                time: front.time(),
                closed: front.is_closed(),
                status: front.status(),
                nodes: self
                    .fronts
                    .front_nodes(front.id())
                    .unwrap_or_default()
                    .into_iter()
                    .map(|id| {
                        let node = self.fronts.node(id);
                        NodeSnapshot {
                            id,
                            loc: node.loc,
                            vel: node.vel,
                            state: node.state,
                            time: node.time,
                            depth: node.depth,
                            frozen: node.frozen,
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Time integration
    // ------------------------------------------------------------------

    pub fn time(&self) -> f64 {
        self.clock
    }

    /// Advance every front to `target`
    ///
    /// The parameters are snapshotted and the model resolved once per call. A target
    /// before the current time is a `ConfigurationError`; the current time itself is
    /// a no-op.
    pub fn advance_to(&mut self, target: f64) -> Result<AdvanceReport> {
        let domain = self
            .domain
            .as_ref()
            .ok_or_else(|| FireError::config("no fire domain defined"))?;
        let burn_map = self
            .layers
            .arrival_time(BURN_MAP)
            .map_err(|_| FireError::config("no burn map allocated"))?;
        let config = PropagationConfig::from_params(&self.params)?;
        let model = self
            .models
            .resolve(&config.model, &self.params, self.fuel_table.as_deref())?;

        let propagator = Propagator {
            config: &config,
            model: &model,
            layers: &self.layers,
            params: &self.params,
            domain,
            burn_map,
        };
        let report = propagator.advance(
            &mut self.fronts,
            self.clock,
            target,
            &self.interrupt,
            &mut self.events,
        )?;
        self.clock = report.achieved_time;
        Ok(report)
    }

    /// Flag polled between sub-steps; set it from any thread to interrupt
    /// `advance_to`
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
    }

    /// Split and merge history
    pub fn events(&self) -> &[TopologyEvent] {
        &self.events
    }

    // ------------------------------------------------------------------
    // Outputs
    // ------------------------------------------------------------------

    /// The arrival-time map, also registered in the layer store as `BMap`
    pub fn burn_map(&self) -> Option<&ArrivalTimeMap> {
        self.layers.arrival_time(BURN_MAP).ok()
    }

    /// Burned area (m²), zero before a domain exists
    pub fn burned_area(&self) -> f64 {
        self.burn_map().map_or(0.0, ArrivalTimeMap::burned_area)
    }

    /// Row-major copy of a registered layer, the burn map (`BMap`) or the heat
    /// flux at the current time (`heatFlux`)
    pub fn get_double_array(&self, name: &str) -> Result<Vec<f64>> {
        if name == HEAT_FLUX {
            return self.heat_flux();
        }
        match self.layers.get(name)? {
            Layer::Scalar(layer) => Ok(layer.data().to_vec()),
            Layer::Indexed(layer) => Ok(layer.data().iter().map(|&v| f64::from(v)).collect()),
            Layer::ArrivalTime(map) => Ok(map.snapshot()),
            Layer::Computed(_) => Err(FireError::config(format!(
                "layer '{name}' has no raster to export"
            ))),
        }
    }

    /// Shape `(nx, ny)` of an exportable array
    pub fn array_shape(&self, name: &str) -> Result<(usize, usize)> {
        if name == HEAT_FLUX {
            self.heat_type()?;
            return self.layers.arrival_time(BURN_MAP).map(ArrivalTimeMap::dimensions);
        }
        match self.layers.get(name)? {
            Layer::Scalar(layer) => Ok((layer.geometry().nx, layer.geometry().ny)),
            Layer::Indexed(layer) => Ok((layer.geometry().nx, layer.geometry().ny)),
            Layer::ArrivalTime(map) => Ok(map.dimensions()),
            Layer::Computed(_) => Ok((1, 1)),
        }
    }

    /// Heat type used where no `fuel` layer exists; fails until a flux layer is added
    fn heat_type(&self) -> Result<i32> {
        let key = self
            .heat_type_key
            .as_deref()
            .ok_or_else(|| FireError::UnknownLayer(HEAT_FLUX.to_string()))?;
        Ok(self.params.get_f64_or(key, 0.0).round() as i32)
    }

    /// Flux released at the current time on the burn map grid
    fn heat_flux(&self) -> Result<Vec<f64>> {
        let heat_type = self.heat_type()?;
        let model = HeatFluxBasic::from_params(&self.params)?;
        let burn_map = self.layers.arrival_time(BURN_MAP)?;
        let (layers, clock) = (&self.layers, self.clock);
        let has_fuel = layers.contains("fuel");
        let table = self.fuel_table.as_deref();
        let coefficients = |p: Vec2| {
            let index = if has_fuel {
                layers.sample_index("fuel", &p, clock).unwrap_or(heat_type)
            } else {
                heat_type
            };
            // Missing rows or columns leave the nominal values unscaled
            let coefficient = |column: &str| {
                table
                    .and_then(|t| t.lookup(index, column).ok())
                    .unwrap_or(1.0)
            };
            FluxCoefficients {
                flux: coefficient("HF_coeff"),
                duration: coefficient("BD_coeff"),
            }
        };
        Ok(model.raster(burn_map, self.clock, coefficients))
    }

    /// Run one command line (see [`super::command`])
    pub fn execute(&mut self, line: &str) -> Result<String> {
        super::command::execute(self, line)
    }
}
