//! Spatial containers: the fire domain, raster layers and the arrival-time map

mod arrival_time;
mod domain;
mod layer;

pub use arrival_time::{ArrivalTimeMap, BURN_MAP};
pub use domain::Domain;
pub use layer::{
    ClampPolicy, ComputedLayer, IndexedLayer, Layer, LayerCategory, LayerStore, RasterGeometry,
    ScalarLayer,
};
