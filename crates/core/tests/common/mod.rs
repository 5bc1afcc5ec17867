//! Shared setup for the integration tests

use forefire_core::{Simulation, Vec2};
use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Homogeneous isotropic fire at 1 m/s on a `size` square domain with 1 m burn map cells
#[allow(dead_code)]
pub fn isotropic_simulation(size: f64, resolution: f64) -> Simulation {
    let mut sim = Simulation::new();
    sim.set_parameter("fuelsTable", "Index;vv_coeff\n1;1.0\n2;0.0")
        .unwrap();
    sim.set_f64("speed_module", 1.0).unwrap();
    sim.set_f64("perimeterResolution", resolution).unwrap();
    sim.set_f64("minimalPropagativeFrontDepth", resolution).unwrap();
    sim.set_f64("spatialIncrement", 1.0).unwrap();
    sim.set_f64("bmapResolution", 1.0).unwrap();
    sim.set_f64("relax", 1.0).unwrap();
    sim.create_domain(Vec2::zeros(), Vec2::new(size, size), 0.0)
        .unwrap();
    sim
}
