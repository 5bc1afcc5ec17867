//! Idealized scenarios
//!
//! Each one builds a simulation, runs it for `steps × step_size` seconds and prints
//! a progress table.

use forefire_core::{NodeState, RasterGeometry, Simulation, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::info;

type DemoResult = Result<(), Box<dyn Error>>;

/// Settings shared by every scenario
fn base_simulation(fuels: &str, model: &str, size: Vec2) -> Result<Simulation, Box<dyn Error>> {
    let mut sim = Simulation::new();
    sim.set_string("fuelsTable", fuels)?;
    sim.set_f64("defaultFuelType", 1.0)?;
    sim.set_f64("spatialIncrement", 1.0)?;
    sim.set_f64("perimeterResolution", 5.0)?;
    sim.set_f64("minimalPropagativeFrontDepth", 5.0)?;
    sim.set_f64("bmapResolution", 1.0)?;
    sim.set_f64("relax", 1.0)?;
    sim.create_domain(Vec2::zeros(), size, 0.0)?;
    sim.add_layer("propagation", model, "propagationModel")?;
    Ok(sim)
}

fn add_polygon(sim: &mut Simulation, points: &[Vec2]) -> forefire_core::Result<()> {
    let front = sim.create_front(None, 0.0)?;
    for p in points {
        sim.add_node(front, Vec3::new(p.x, p.y, 0.0), Vec3::zeros(), 0.0, NodeState::Init)?;
    }
    Ok(())
}

/// Fuel-index raster covering the whole domain, one value per `block` square
fn fuel_layer<F>(sim: &mut Simulation, size: Vec2, block: f64, mut fuel: F) -> forefire_core::Result<()>
where
    F: FnMut(Vec2) -> i32,
{
    let nx = (size.x / block).ceil() as usize;
    let ny = (size.y / block).ceil() as usize;
    let mut data = Vec::with_capacity(nx * ny);
    for iy in 0..ny {
        for ix in 0..nx {
            data.push(fuel(Vec2::new((ix as f64 + 0.5) * block, (iy as f64 + 0.5) * block)));
        }
    }
    let geometry = RasterGeometry::new(Vec2::zeros(), Vec2::new(nx as f64 * block, ny as f64 * block), nx, ny);
    sim.add_index_layer("fuel", geometry, Arc::from(data))
}

/// Advance step by step, printing one table row per step
fn run(sim: &mut Simulation, steps: u32, step_size: f64, mut extra: impl FnMut(&mut Simulation, u32) -> DemoResult) -> DemoResult {
    println!("Time(s) | Fronts | Nodes | Burned(m²) | Frozen | Splits | Merges");
    println!("--------|--------|-------|------------|--------|--------|-------");
    for step in 1..=steps {
        extra(sim, step)?;
        let target = sim.time() + step_size;
        let report = sim.advance_to(target)?;
        let fronts = sim.fronts();
        let nodes: usize = fronts.iter().map(|f| f.nodes.len()).sum();
        println!(
            "{:7.1} | {:6} | {:5} | {:10.1} | {:6} | {:6} | {:6}",
            report.achieved_time,
            fronts.len(),
            nodes,
            sim.burned_area(),
            report.frozen_nodes,
            report.splits,
            report.merges
        );
    }
    Ok(())
}

pub fn diffusion(speed: f64, steps: u32, step_size: f64) -> DemoResult {
    let size = 2.0 * speed * f64::from(steps) * step_size + 100.0;
    let mut sim = base_simulation("Index;vv_coeff\n1;1.0\n2;0.5", "IsotropicFuel", Vec2::new(size, size))?;
    sim.set_f64("speed_module", speed)?;
    sim.ignite_point(Vec2::new(size / 2.0, size / 2.0), 0.0)?;
    info!("Diffusion at {} m/s on a {:.0} m domain", speed, size);

    run(&mut sim, steps, step_size, |_, _| Ok(()))?;

    let radius = speed * sim.time();
    let expected = PI * radius * radius;
    println!(
        "\nBurned {:.1} m², πR² = {:.1} m² (relative error {:.2}%)",
        sim.burned_area(),
        expected,
        100.0 * (sim.burned_area() - expected).abs() / expected
    );
    Ok(())
}

pub fn front_merging(steps: u32, step_size: f64) -> DemoResult {
    let mut sim = base_simulation("Index;vv_coeff\n1;1.0", "IsotropicFuel", Vec2::new(400.0, 400.0))?;
    sim.set_f64("perimeterResolution", 10.0)?;
    sim.set_f64("minimalPropagativeFrontDepth", 10.0)?;
    sim.set_f64("spatialIncrement", 2.0)?;
    let c = 200.0;
    let notch: Vec<Vec2> = [
        (-90.0, -90.0),
        (-90.0, 90.0),
        (-30.0, 90.0),
        (-30.0, 55.0),
        (-55.0, 55.0),
        (-55.0, -55.0),
        (55.0, -55.0),
        (55.0, 55.0),
        (30.0, 55.0),
        (30.0, 90.0),
        (90.0, 90.0),
        (90.0, -90.0),
    ]
    .into_iter()
    .map(|(x, y)| Vec2::new(c + x, c + y))
    .collect();
    add_polygon(&mut sim, &notch)?;

    run(&mut sim, steps, step_size, |_, _| Ok(()))?;

    println!("\nTopology events:");
    for event in sim.events() {
        println!(
            "  t={:7.2} {:?}: {:?} -> {:?}",
            event.time, event.kind, event.parents, event.children
        );
    }
    Ok(())
}

/// Concave star with `arms` points around `center`
fn star(center: Vec2, outer: f64, inner: f64, arms: usize) -> Vec<Vec2> {
    (0..2 * arms)
        .map(|i| {
            // Clockwise
            let angle = -PI * i as f64 / arms as f64;
            let r = if i % 2 == 0 { outer } else { inner };
            center + Vec2::new(angle.cos(), angle.sin()) * r
        })
        .collect()
}

pub fn curvature(steps: u32, step_size: f64) -> DemoResult {
    let size = Vec2::new(800.0, 400.0);
    let mut sim = base_simulation(
        "Index;vv_coeff;Kcurv;beta\n1;1.0;14.0;6.0\n2;1.0;0.0;1.0",
        "CurvatureDriven",
        size,
    )?;
    sim.set_f64("minSpeed", 0.0)?;
    // Left half damps curvature, right half does not
    fuel_layer(&mut sim, size, 10.0, |p| if p.x < size.x / 2.0 { 1 } else { 2 })?;
    add_polygon(&mut sim, &star(Vec2::new(200.0, 200.0), 60.0, 25.0, 5))?;
    add_polygon(&mut sim, &star(Vec2::new(600.0, 200.0), 60.0, 25.0, 5))?;

    run(&mut sim, steps, step_size, |_, _| Ok(()))
}

pub fn front_depth(barrier: f64, steps: u32, step_size: f64) -> DemoResult {
    let size = Vec2::new(1000.0, 1000.0);
    let mut sim = base_simulation(
        "Index;vv_coeff;Kdepth\n1;1.0;0.05\n2;1.0;0.0\n3;0.22;0.05",
        "FrontDepthDriven",
        size,
    )?;
    sim.set_f64("initialFrontDepth", 10.0)?;
    sim.set_f64("burningDuration", 50.0)?;
    sim.set_f64("minSpeed", 0.5)?;
    sim.set_f64("windU", 1.0)?;
    sim.set_f64("windV", 0.0)?;
    sim.set_f64("frontDepthComputation", 1.0)?;

    let band_start = size.x / 2.0;
    fuel_layer(&mut sim, size, 5.0, |p| {
        if p.x >= band_start && p.x < band_start + barrier {
            3
        } else {
            1
        }
    })?;
    info!("Slow band from x={} to x={}", band_start, band_start + barrier);

    // Two rectangular lines of fire, the upper one shifted downwind
    for (x0, y0) in [(125.0, 125.0), (275.0, 625.0)] {
        add_polygon(
            &mut sim,
            &[
                Vec2::new(x0 + 50.0, y0),
                Vec2::new(x0, y0),
                Vec2::new(x0, y0 + 250.0),
                Vec2::new(x0 + 50.0, y0 + 250.0),
            ],
        )?;
    }

    run(&mut sim, steps, step_size, |_, _| Ok(()))?;

    let depths: Vec<f64> = sim
        .fronts()
        .iter()
        .flat_map(|f| f.nodes.iter().map(|n| n.depth))
        .collect();
    if !depths.is_empty() {
        let mean = depths.iter().sum::<f64>() / depths.len() as f64;
        println!("\nMean front depth {:.1} m over {} nodes", mean, depths.len());
    }
    Ok(())
}

pub fn wind(speed: f64, turn: f64, steps: u32, step_size: f64) -> DemoResult {
    let size = Vec2::new(1000.0, 1000.0);
    let mut sim = base_simulation("Index;vv_coeff\n1;1.0", "WindDriven", size)?;
    sim.set_f64("minSpeed", 0.2 * speed)?;
    sim.set_f64("initialFrontDepth", 0.1)?;
    sim.ignite_point(Vec2::new(size.x / 2.0, size.y / 5.0), 0.0)?;

    run(&mut sim, steps, step_size, |sim, step| {
        let angle = (f64::from(step - 1) * turn).to_radians();
        sim.set_f64("windU", speed * angle.cos())?;
        sim.set_f64("windV", speed * angle.sin())?;
        Ok(())
    })
}

pub fn percolation(
    probability: f64,
    block: f64,
    seed: Option<u64>,
    steps: u32,
    step_size: f64,
) -> DemoResult {
    if !(0.0..=1.0).contains(&probability) {
        return Err(format!("probability must be within [0, 1], got {probability}").into());
    }
    let size = Vec2::new(500.0, 500.0);
    let mut sim = base_simulation("Index;vv_coeff\n1;1.0\n2;0.0", "IsotropicFuel", size)?;
    sim.set_f64("minSpeed", 0.0)?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let center = size / 2.0;
    fuel_layer(&mut sim, size, block, |p| {
        // The ignition block always burns
        if (p - center).abs().max() < block || rng.random_bool(probability) {
            1
        } else {
            2
        }
    })?;
    sim.ignite_point(center, 0.0)?;

    run(&mut sim, steps, step_size, |_, _| Ok(()))?;

    let fraction = sim.burned_area() / (size.x * size.y);
    println!(
        "\nBurnable fraction {:.2}: {:.1}% of the domain burned",
        probability,
        100.0 * fraction
    );
    Ok(())
}
