use clap::{Parser, Subcommand};
use forefire_core::simulation::execute;
use forefire_core::Simulation;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod scenarios;

/// Fire-front propagation demo with the idealized test cases
#[derive(Parser, Debug)]
#[command(name = "forefire-demo")]
#[command(about = "Idealized fire-front propagation scenarios", long_about = None)]
struct Args {
    /// Number of report steps
    #[arg(short = 'n', long, default_value_t = 20, global = true)]
    steps: u32,

    /// Duration of each report step in seconds
    #[arg(short = 's', long, default_value_t = 10.0, global = true)]
    step_size: f64,

    #[command(subcommand)]
    scenario: Scenario,
}

#[derive(Subcommand, Debug)]
enum Scenario {
    /// Point ignition spreading at constant speed; burned area against πR²
    Diffusion {
        /// Spread speed in m/s
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },

    /// Notched square whose notch closes and leaves an unburned island
    FrontMerging,

    /// Two star-shaped fronts, with and without curvature damping
    Curvature,

    /// Depth-driven fronts pushed by wind across a slow-burning band
    FrontDepth {
        /// Width of the slow band in meters
        #[arg(long, default_value_t = 40.0)]
        barrier: f64,
    },

    /// Wind-driven fire under a wind that turns a little every step
    Wind {
        /// Wind speed in m/s
        #[arg(long, default_value_t = 1.0)]
        speed: f64,

        /// Wind rotation per step in degrees
        #[arg(long, default_value_t = 10.0)]
        turn: f64,
    },

    /// Fire on a random fuel/no-fuel mosaic
    Percolation {
        /// Fraction of burnable blocks (0-1)
        #[arg(short, long, default_value_t = 0.6)]
        probability: f64,

        /// Block size of the mosaic in meters
        #[arg(long, default_value_t = 10.0)]
        block: f64,

        /// Random seed (fresh entropy when absent)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Execute a command file line by line
    Script {
        /// File of commands (`FireDomain[...]`, `startFire[...]`, `goTo[...]`, ...)
        path: PathBuf,

        /// Fuel table text file (`Index;vv_coeff;...` header, one row per fuel)
        #[arg(long)]
        fuels: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    println!("=== Fire Front Propagation Demo ===\n");

    let result = match args.scenario {
        Scenario::Diffusion { speed } => scenarios::diffusion(speed, args.steps, args.step_size),
        Scenario::FrontMerging => scenarios::front_merging(args.steps, args.step_size),
        Scenario::Curvature => scenarios::curvature(args.steps, args.step_size),
        Scenario::FrontDepth { barrier } => {
            scenarios::front_depth(barrier, args.steps, args.step_size)
        }
        Scenario::Wind { speed, turn } => scenarios::wind(speed, turn, args.steps, args.step_size),
        Scenario::Percolation {
            probability,
            block,
            seed,
        } => scenarios::percolation(probability, block, seed, args.steps, args.step_size),
        Scenario::Script { path, fuels } => run_script(&path, fuels.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_script(path: &Path, fuels: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let mut sim = Simulation::new();
    if let Some(fuels) = fuels {
        sim.load_fuel_table(&std::fs::read_to_string(fuels)?)?;
    }
    for (number, line) in text.lines().enumerate() {
        let output = execute(&mut sim, line)
            .map_err(|err| format!("{}:{}: {err}", path.display(), number + 1))?;
        print!("{output}");
    }
    println!(
        "\nScript finished at t={:.1}s, burned area {:.1} m²",
        sim.time(),
        sim.burned_area()
    );
    Ok(())
}
