//! Simulation context, command interpreter and state rendering

pub mod command;
mod context;
pub mod render;

pub use command::{execute, execute_script, Command};
pub use context::{FrontSnapshot, NodeSnapshot, Simulation, BURN_MAP};
