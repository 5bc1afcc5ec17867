//! Fire fronts: node arena, chain topology and planar geometry

mod arena;
pub mod geometry;
mod node;

pub use arena::{Front, FrontArena, FrontStatus};
pub use node::{FrontId, Node, NodeId, NodeState};
