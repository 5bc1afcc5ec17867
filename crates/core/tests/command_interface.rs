//! Driving a simulation through command lines, and interrupting it from a model

mod common;

use common::isotropic_simulation;
use forefire_core::simulation::execute_script;
use forefire_core::{FireError, NodeContext, RosModel, Simulation, Vec2};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const SCRIPT: &str = "\
setParameters[perimeterResolution=4;minimalPropagativeFrontDepth=4;bmapResolution=1]
FireDomain[sw=(0,0,0);ne=(100,100,0);t=0]
startFire[loc=(50,50,0);t=0]
goTo[t=10]
print[]
";

#[test]
fn test_script_runs_and_prints() {
    let mut sim = Simulation::new();
    sim.load_fuel_table("Index;vv_coeff\n1;1.0").unwrap();
    let out = execute_script(&mut sim, SCRIPT).unwrap();

    assert_eq!(sim.time(), 10.0);
    assert!(out.starts_with("FireDomain[sw=(0,0,0);ne=(100,100,0);t=10]\n"));
    assert_eq!(out.matches("\tFireFront[").count(), 1);
    assert!(out.matches("\t\tFireNode[").count() >= 6);
    assert!(out.lines().skip(2).all(|l| l.contains("state=moving")));

    // Radius grew from 2.4 m to about 12.4 m
    let area = sim.burned_area();
    assert!(area > 350.0 && area < 650.0, "burned area {area}");
}

#[test]
fn test_commands_fail_cleanly() {
    let mut sim = Simulation::new();
    assert!(matches!(
        sim.execute("goTo[t=5]"),
        Err(FireError::Configuration(_))
    ));
    assert!(matches!(
        sim.execute("startFire[loc=(1,1,0)]"),
        Err(FireError::Configuration(_))
    ));
    assert!(matches!(
        sim.execute("FireDomain[sw=(0,0,0)]"),
        Err(FireError::Command(_))
    ));
    assert!(matches!(sim.execute("goTo[t=soon]"), Err(FireError::Command(_))));
    assert_eq!(sim.execute("# comment").unwrap(), "");
    assert_eq!(sim.execute("print[]").unwrap(), "");
}

#[test]
fn test_parameters_round_trip_through_commands() {
    let mut sim = Simulation::new();
    sim.execute("setParameter[windU=3.5]").unwrap();
    sim.execute("setParameters[windV=-1;propagationModel=WindDriven]")
        .unwrap();
    assert_eq!(sim.get_f64("windU").unwrap(), 3.5);
    assert_eq!(sim.get_f64("windV").unwrap(), -1.0);
    assert_eq!(sim.get_string("propagationModel").unwrap(), "WindDriven");
    assert!(sim.execute("setParameter[]").is_err());
}

/// Unit-speed model that raises the interrupt flag on its first evaluation
#[derive(Debug)]
struct Tripwire {
    interrupt: Arc<AtomicBool>,
    armed: Arc<AtomicBool>,
}

impl RosModel for Tripwire {
    fn name(&self) -> &str {
        "Tripwire"
    }

    fn coefficients(&self) -> Vec<String> {
        Vec::new()
    }

    fn compute_rate(&self, _ctx: &NodeContext<'_>) -> f64 {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.interrupt.store(true, Ordering::SeqCst);
        }
        1.0
    }
}

#[test]
fn test_interrupt_from_inside_a_step() {
    let mut sim = isotropic_simulation(100.0, 4.0);
    let interrupt = sim.interrupt_handle();
    let armed = Arc::new(AtomicBool::new(true));
    let trigger = Arc::clone(&armed);
    sim.register_model("Tripwire", move |_| {
        Ok(Box::new(Tripwire {
            interrupt: Arc::clone(&interrupt),
            armed: Arc::clone(&trigger),
        }))
    });
    sim.set_string("propagationModel", "Tripwire").unwrap();
    sim.ignite_point(Vec2::new(50.0, 50.0), 0.0).unwrap();

    // The flag is polled between sub-steps, so the current one completes
    let report = sim.advance_to(20.0).unwrap();
    assert!(report.interrupted);
    assert_eq!(report.substeps, 1);
    assert_eq!(sim.time(), report.achieved_time);
    assert!(sim.time() > 0.0 && sim.time() < 20.0);
    let burned = sim.burned_area();
    assert!(burned > 0.0);

    // A later call resumes from the interrupted time
    let report = sim.advance_to(20.0).unwrap();
    assert!(!report.interrupted);
    assert_eq!(sim.time(), 20.0);
    assert!(sim.burned_area() > burned);
}
