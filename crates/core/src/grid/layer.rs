//! Named, georeferenced raster layers
//!
//! Layers come in four categories:
//! - `Scalar`: continuous values (altitude, wind components), sampled bilinearly
//! - `Indexed`: categorical values (fuel type), sampled at the nearest cell
//! - `Computed`: values produced on demand (parameter-backed constants)
//! - `ArrivalTime`: the engine's burn map, the only layer that accepts writes
//!
//! Grids are stored row-major with x varying fastest, frames stacked along time:
//! `data[(k * ny + j) * nx + i]`. Caller arrays are shared through `Arc`, so the
//! store never copies a registered grid.

use super::ArrivalTimeMap;
use crate::core_types::Vec2;
use crate::error::{FireError, Result};
use crate::params::SimulationParameters;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// Policy applied when a sample point falls outside a layer's extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClampPolicy {
    /// Snap to the nearest edge cell
    #[default]
    Clamp,
    /// Fail with `OutOfBounds`
    Strict,
}

impl ClampPolicy {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "strict" => Ok(Self::Strict),
            other => Err(FireError::config(format!(
                "unknown out-of-bounds policy '{other}' (expected clamp or strict)"
            ))),
        }
    }
}

/// Category tag of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerCategory {
    Scalar,
    Indexed,
    Computed,
    ArrivalTime,
}

/// Placement and resolution of a raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterGeometry {
    /// South-west corner in world meters
    pub origin: Vec2,
    /// Width and height in meters
    pub extent: Vec2,
    /// Cells along x
    pub nx: usize,
    /// Cells along y
    pub ny: usize,
    /// Time frames
    pub nt: usize,
    /// Time of the first frame (seconds)
    pub t0: f64,
    /// Time covered by all frames (seconds)
    pub timespan: f64,
}

impl RasterGeometry {
    /// Single-frame geometry
    pub fn new(origin: Vec2, extent: Vec2, nx: usize, ny: usize) -> Self {
        Self {
            origin,
            extent,
            nx,
            ny,
            nt: 1,
            t0: 0.0,
            timespan: 0.0,
        }
    }

    /// Add a time dimension of `nt` frames over `[t0, t0 + timespan]`
    pub fn with_frames(mut self, nt: usize, t0: f64, timespan: f64) -> Self {
        self.nt = nt;
        self.t0 = t0;
        self.timespan = timespan;
        self
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny * self.nt
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell_size(&self) -> Vec2 {
        Vec2::new(self.extent.x / self.nx as f64, self.extent.y / self.ny as f64)
    }

    fn validate(&self, name: &str, data_len: usize) -> Result<()> {
        if self.nx == 0 || self.ny == 0 || self.nt == 0 {
            return Err(FireError::config(format!(
                "layer '{name}' has an empty shape {}x{}x{}",
                self.nx, self.ny, self.nt
            )));
        }
        if self.extent.x <= 0.0 || self.extent.y <= 0.0 {
            return Err(FireError::config(format!(
                "layer '{name}' extent must be strictly positive"
            )));
        }
        if data_len != self.len() {
            return Err(FireError::config(format!(
                "layer '{name}' expects {}x{}x{} = {} values, got {}",
                self.nx,
                self.ny,
                self.nt,
                self.len(),
                data_len
            )));
        }
        Ok(())
    }

    fn contains(&self, p: &Vec2) -> bool {
        let rel = p - self.origin;
        rel.x >= 0.0 && rel.y >= 0.0 && rel.x <= self.extent.x && rel.y <= self.extent.y
    }

    /// Continuous cell coordinates of `p` (cell centers at integers)
    fn cell_coords(&self, p: &Vec2) -> (f64, f64) {
        let cell = self.cell_size();
        let fx = (p.x - self.origin.x) / cell.x - 0.5;
        let fy = (p.y - self.origin.y) / cell.y - 0.5;
        (
            fx.clamp(0.0, (self.nx - 1) as f64),
            fy.clamp(0.0, (self.ny - 1) as f64),
        )
    }

    /// Frame index covering time `t` (nearest frame, clamped)
    fn frame(&self, t: f64) -> usize {
        if self.nt <= 1 || self.timespan <= 0.0 {
            return 0;
        }
        let rel = ((t - self.t0) / self.timespan).clamp(0.0, 1.0);
        (rel * (self.nt - 1) as f64).round() as usize
    }

    #[inline]
    fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.ny + j) * self.nx + i
    }
}

/// Continuous raster sampled with bilinear interpolation
#[derive(Debug, Clone)]
pub struct ScalarLayer {
    geometry: RasterGeometry,
    data: Arc<[f64]>,
}

impl ScalarLayer {
    pub fn geometry(&self) -> &RasterGeometry {
        &self.geometry
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    fn sample(&self, p: &Vec2, t: f64) -> f64 {
        let g = &self.geometry;
        let (fx, fy) = g.cell_coords(p);
        let k = g.frame(t);
        let i0 = fx.floor() as usize;
        let j0 = fy.floor() as usize;
        let i1 = (i0 + 1).min(g.nx - 1);
        let j1 = (j0 + 1).min(g.ny - 1);
        let tx = fx - i0 as f64;
        let ty = fy - j0 as f64;
        let data = &self.data;
        // Zero-weight corners are skipped so unset (infinite) cells do not poison the blend
        [
            (i0, j0, (1.0 - tx) * (1.0 - ty)),
            (i1, j0, tx * (1.0 - ty)),
            (i0, j1, (1.0 - tx) * ty),
            (i1, j1, tx * ty),
        ]
        .iter()
        .filter(|(_, _, w)| *w > 0.0)
        .map(|&(i, j, w)| w * data[g.index(i, j, k)])
        .sum()
    }
}

/// Categorical raster sampled at the nearest cell
#[derive(Debug, Clone)]
pub struct IndexedLayer {
    geometry: RasterGeometry,
    data: Arc<[i32]>,
}

impl IndexedLayer {
    pub fn geometry(&self) -> &RasterGeometry {
        &self.geometry
    }

    pub fn data(&self) -> &[i32] {
        &self.data
    }

    fn sample(&self, p: &Vec2, t: f64) -> i32 {
        let g = &self.geometry;
        let (fx, fy) = g.cell_coords(p);
        self.data[g.index(fx.round() as usize, fy.round() as usize, g.frame(t))]
    }
}

/// Value source of a computed layer
#[derive(Debug, Clone, PartialEq)]
pub enum ComputedLayer {
    /// Uniform value read from a parameter key at sampling time
    Parameter(String),
    /// Uniform constant
    Constant(f64),
}

/// A registered layer
#[derive(Debug, Clone)]
pub enum Layer {
    Scalar(ScalarLayer),
    Indexed(IndexedLayer),
    Computed(ComputedLayer),
    ArrivalTime(Arc<ArrivalTimeMap>),
}

impl Layer {
    pub fn category(&self) -> LayerCategory {
        match self {
            Self::Scalar(_) => LayerCategory::Scalar,
            Self::Indexed(_) => LayerCategory::Indexed,
            Self::Computed(_) => LayerCategory::Computed,
            Self::ArrivalTime(_) => LayerCategory::ArrivalTime,
        }
    }

    /// Raster placement, `None` for computed layers
    pub fn geometry(&self) -> Option<RasterGeometry> {
        match self {
            Self::Scalar(layer) => Some(layer.geometry),
            Self::Indexed(layer) => Some(layer.geometry),
            Self::Computed(_) => None,
            Self::ArrivalTime(map) => {
                let (nx, ny) = map.dimensions();
                let extent = Vec2::new(nx as f64, ny as f64) * map.cell_size();
                Some(RasterGeometry::new(map.origin(), extent, nx, ny))
            }
        }
    }
}

/// Registry of named layers shared read-only by the propagation engine
#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    layers: FxHashMap<String, Layer>,
    policy: ClampPolicy,
}

impl LayerStore {
    pub fn new(policy: ClampPolicy) -> Self {
        Self {
            layers: FxHashMap::default(),
            policy,
        }
    }

    pub fn policy(&self) -> ClampPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ClampPolicy) {
        self.policy = policy;
    }

    /// Bind a caller-owned continuous grid to `name`
    pub fn register_scalar(
        &mut self,
        name: &str,
        geometry: RasterGeometry,
        data: Arc<[f64]>,
    ) -> Result<()> {
        geometry.validate(name, data.len())?;
        debug!(
            "Registering scalar layer '{}' ({}x{}x{})",
            name, geometry.nx, geometry.ny, geometry.nt
        );
        self.layers.insert(
            name.to_string(),
            Layer::Scalar(ScalarLayer { geometry, data }),
        );
        Ok(())
    }

    /// Bind the engine's arrival-time map, the target of [`LayerStore::write`]
    pub fn register_arrival_time(&mut self, name: &str, map: Arc<ArrivalTimeMap>) {
        let (nx, ny) = map.dimensions();
        debug!("Registering arrival-time layer '{}' ({}x{})", name, nx, ny);
        self.layers
            .insert(name.to_string(), Layer::ArrivalTime(map));
    }

    /// Bind a caller-owned categorical grid to `name`
    pub fn register_indexed(
        &mut self,
        name: &str,
        geometry: RasterGeometry,
        data: Arc<[i32]>,
    ) -> Result<()> {
        geometry.validate(name, data.len())?;
        debug!(
            "Registering indexed layer '{}' ({}x{})",
            name, geometry.nx, geometry.ny
        );
        self.layers.insert(
            name.to_string(),
            Layer::Indexed(IndexedLayer { geometry, data }),
        );
        Ok(())
    }

    pub fn register_computed(&mut self, name: &str, source: ComputedLayer) {
        debug!("Registering computed layer '{}' -> {:?}", name, source);
        self.layers
            .insert(name.to_string(), Layer::Computed(source));
    }

    pub fn get(&self, name: &str) -> Result<&Layer> {
        self.layers
            .get(name)
            .ok_or_else(|| FireError::UnknownLayer(name.to_string()))
    }

    /// Arrival-time map registered under `name`
    pub fn arrival_time(&self, name: &str) -> Result<&ArrivalTimeMap> {
        match self.get(name)? {
            Layer::ArrivalTime(map) => Ok(map),
            _ => Err(FireError::config(format!("layer '{name}' is not an arrival-time map"))),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    fn check_bounds(&self, name: &str, layer: &Layer, p: &Vec2) -> Result<()> {
        match (self.policy, layer.geometry()) {
            (ClampPolicy::Strict, Some(geometry)) if !geometry.contains(p) => {
                Err(FireError::OutOfBounds {
                    layer: name.to_string(),
                    x: p.x,
                    y: p.y,
                })
            }
            _ => Ok(()),
        }
    }

    /// Sample a layer at `p` using its first time frame
    pub fn sample(&self, name: &str, p: &Vec2, params: &SimulationParameters) -> Result<f64> {
        self.sample_at(name, p, f64::NEG_INFINITY, params)
    }

    /// Sample a layer at `p` and time `t`
    ///
    /// Indexed layers return their category as `f64`.
    pub fn sample_at(
        &self,
        name: &str,
        p: &Vec2,
        t: f64,
        params: &SimulationParameters,
    ) -> Result<f64> {
        let layer = self.get(name)?;
        self.check_bounds(name, layer, p)?;
        match layer {
            Layer::Scalar(scalar) => Ok(scalar.sample(p, t)),
            Layer::Indexed(indexed) => Ok(f64::from(indexed.sample(p, t))),
            Layer::Computed(ComputedLayer::Constant(value)) => Ok(*value),
            Layer::Computed(ComputedLayer::Parameter(key)) => params.get_f64(key),
            Layer::ArrivalTime(map) => {
                let (ix, iy) = nearest_cell(map, p);
                Ok(map.query(ix, iy))
            }
        }
    }

    /// Category index of an indexed layer at `p`
    pub fn sample_index(&self, name: &str, p: &Vec2, t: f64) -> Result<i32> {
        let layer = self.get(name)?;
        self.check_bounds(name, layer, p)?;
        match layer {
            Layer::Indexed(indexed) => Ok(indexed.sample(p, t)),
            Layer::Scalar(scalar) => Ok(scalar.sample(p, t).round() as i32),
            Layer::Computed(ComputedLayer::Constant(value)) => Ok(value.round() as i32),
            Layer::Computed(ComputedLayer::Parameter(_)) | Layer::ArrivalTime(_) => Err(
                FireError::config(format!("layer '{name}' is not categorical")),
            ),
        }
    }

    /// Lower the arrival time of the cell under `p` to `min(current, value)`
    ///
    /// Only the arrival-time layer is writable; caller-supplied layers reject
    /// writes. Returns whether the stored time decreased.
    pub fn write(&self, name: &str, p: &Vec2, value: f64) -> Result<bool> {
        let layer = self.get(name)?;
        self.check_bounds(name, layer, p)?;
        match layer {
            Layer::ArrivalTime(map) => {
                let (ix, iy) = nearest_cell(map, p);
                Ok(map.stamp(ix, iy, value))
            }
            _ => Err(FireError::config(format!("layer '{name}' is read-only"))),
        }
    }
}

/// Cell of `map` containing `p`, snapped to the edge when outside
fn nearest_cell(map: &ArrivalTimeMap, p: &Vec2) -> (usize, usize) {
    let (nx, ny) = map.dimensions();
    let rel = (p - map.origin()) / map.cell_size();
    (
        rel.x.floor().clamp(0.0, (nx - 1) as f64) as usize,
        rel.y.floor().clamp(0.0, (ny - 1) as f64) as usize,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_geometry() -> RasterGeometry {
        RasterGeometry::new(Vec2::new(0.0, 0.0), Vec2::new(40.0, 20.0), 4, 2)
    }

    fn ramp() -> Arc<[f64]> {
        // x fastest: value = column index
        vec![0.0, 1.0, 2.0, 3.0, 0.0, 1.0, 2.0, 3.0].into()
    }

    #[test]
    fn test_bilinear_between_centers() {
        let mut store = LayerStore::new(ClampPolicy::Clamp);
        store.register_scalar("altitude", ramp_geometry(), ramp()).unwrap();
        let params = SimulationParameters::new();

        // Cell centers at x = 5, 15, 25, 35
        let v = store.sample("altitude", &Vec2::new(10.0, 10.0), &params).unwrap();
        assert!((v - 0.5).abs() < 1e-12);
        let v = store.sample("altitude", &Vec2::new(35.0, 5.0), &params).unwrap();
        assert!((v - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_and_strict_policies() {
        let mut store = LayerStore::new(ClampPolicy::Clamp);
        store.register_scalar("altitude", ramp_geometry(), ramp()).unwrap();
        let params = SimulationParameters::new();
        let outside = Vec2::new(100.0, 5.0);

        assert_eq!(store.sample("altitude", &outside, &params).unwrap(), 3.0);

        store.set_policy(ClampPolicy::Strict);
        assert!(matches!(
            store.sample("altitude", &outside, &params),
            Err(FireError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_unknown_layer() {
        let store = LayerStore::default();
        let params = SimulationParameters::new();
        assert_eq!(
            store.sample("windU", &Vec2::zeros(), &params),
            Err(FireError::UnknownLayer("windU".into()))
        );
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut store = LayerStore::default();
        let data: Arc<[i32]> = vec![1; 7].into();
        assert!(store.register_indexed("fuel", ramp_geometry(), data).is_err());
    }

    #[test]
    fn test_indexed_nearest_and_time_frames() {
        let mut store = LayerStore::default();
        let geometry = RasterGeometry::new(Vec2::zeros(), Vec2::new(20.0, 10.0), 2, 1)
            .with_frames(2, 0.0, 100.0);
        let data: Arc<[i32]> = vec![1, 2, 3, 4].into();
        store.register_indexed("fuel", geometry, data).unwrap();

        assert_eq!(store.sample_index("fuel", &Vec2::new(4.0, 5.0), 0.0).unwrap(), 1);
        assert_eq!(store.sample_index("fuel", &Vec2::new(16.0, 5.0), 0.0).unwrap(), 2);
        assert_eq!(store.sample_index("fuel", &Vec2::new(16.0, 5.0), 90.0).unwrap(), 4);
    }

    #[test]
    fn test_parameter_backed_layer() {
        let mut store = LayerStore::default();
        store.register_computed("windU", ComputedLayer::Parameter("windU".into()));
        let mut params = SimulationParameters::new();
        params.set_f64("windU", 7.5);
        assert_eq!(store.sample("windU", &Vec2::zeros(), &params).unwrap(), 7.5);
    }

    #[test]
    fn test_writes_only_on_arrival_time() {
        let mut store = LayerStore::default();
        store.register_scalar("altitude", ramp_geometry(), ramp()).unwrap();
        let map = Arc::new(ArrivalTimeMap::new(Vec2::zeros(), Vec2::new(40.0, 20.0), 2.0).unwrap());
        store.register_arrival_time("BMap", Arc::clone(&map));
        let params = SimulationParameters::new();
        let p = Vec2::new(15.0, 5.0);

        assert!(store.write("altitude", &p, 9.0).is_err());
        assert!(store.write("BMap", &p, 12.0).unwrap());
        assert!(!store.write("BMap", &p, 20.0).unwrap());
        assert_eq!(store.sample("BMap", &p, &params).unwrap(), 12.0);
        // Shared with the engine's own handle
        assert_eq!(map.query_at(&p), 12.0);
        assert_eq!(store.get("BMap").unwrap().category(), LayerCategory::ArrivalTime);
        assert!(store.sample_index("BMap", &p, 0.0).is_err());

        store.set_policy(ClampPolicy::Strict);
        assert!(matches!(
            store.write("BMap", &Vec2::new(-1.0, 5.0), 1.0),
            Err(FireError::OutOfBounds { .. })
        ));
    }
}
