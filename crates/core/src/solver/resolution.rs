//! Node density control
//!
//! After every position update, nodes closer than the minimal spacing are fused into
//! their predecessor and edges longer than the perimeter resolution are subdivided.
//! Fusion runs first so a fused edge that became too long is split again in the same
//! pass; at the end every edge of a healthy front lies between the two thresholds.

use super::config::PropagationConfig;
use crate::core_types::Vec3;
use crate::front::{FrontArena, FrontId, Node, NodeState};
use crate::error::Result;

/// Outcome of one resolution pass over a front
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub inserted: usize,
    pub removed: usize,
    /// The front shrank below three nodes and was extinguished
    pub extinguished: bool,
}

/// Minimum node count kept on a closed front
const MIN_CLOSED_NODES: usize = 3;

/// Run fusion then subdivision on one front
pub fn refine_front(
    arena: &mut FrontArena,
    front: FrontId,
    config: &PropagationConfig,
    time: f64,
) -> Result<ResolutionStats> {
    let mut stats = ResolutionStats::default();
    let closed = arena.front(front)?.is_closed();
    let min_nodes = if closed { MIN_CLOSED_NODES } else { 2 };
    let spacing = config.min_spacing();

    // Fusion
    for id in arena.front_nodes(front)? {
        if arena.node(id).state.is_terminal() {
            continue;
        }
        loop {
            if arena.front(front)?.len() <= min_nodes {
                break;
            }
            let Some(next) = arena.node(id).next() else {
                break;
            };
            let too_close = (arena.node(next).position() - arena.node(id).position()).norm() < spacing;
            let too_shallow = config.depth_floor > 0.0 && arena.node(next).depth < config.depth_floor;
            // Keep the last node of an open chain in place
            let is_open_end = !closed && arena.node(next).next().is_none();
            if !(too_close || too_shallow) || is_open_end {
                break;
            }
            arena.remove_node(next, NodeState::Merged);
            stats.removed += 1;
        }
    }

    if closed && arena.front(front)?.len() <= MIN_CLOSED_NODES {
        let perimeter = arena.perimeter(front)?;
        if perimeter < MIN_CLOSED_NODES as f64 * spacing {
            stats.extinguished = true;
            return Ok(stats);
        }
    }

    // Subdivision
    let resolution = config.perimeter_resolution;
    for id in arena.front_nodes(front)? {
        let Some(next) = arena.node(id).next() else {
            continue;
        };
        let (a, b) = (arena.node(id).clone(), arena.node(next).clone());
        let length = (b.position() - a.position()).norm();
        if length <= resolution {
            continue;
        }
        let pieces = (length / resolution).ceil() as usize;
        let mut after = id;
        for k in 1..pieces {
            let s = k as f64 / pieces as f64;
            let lerp = |u: &Vec3, v: &Vec3| u + (v - u) * s;
            let node = Node::new(
                front,
                lerp(&a.loc, &b.loc),
                lerp(&a.vel, &b.vel),
                time,
                NodeState::Moving,
                a.depth + (b.depth - a.depth) * s,
            );
            after = arena.insert_after(after, node);
            stats.inserted += 1;
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SimulationParameters;

    fn config(resolution: f64, depth: f64) -> PropagationConfig {
        let mut params = SimulationParameters::new();
        params.set_f64("perimeterResolution", resolution);
        params.set_f64("minimalPropagativeFrontDepth", depth);
        PropagationConfig::from_params(&params).unwrap()
    }

    fn polygon(arena: &mut FrontArena, points: &[(f64, f64)]) -> FrontId {
        let id = arena.create_front(None, 0, 0.0).unwrap();
        for &(x, y) in points {
            arena
                .append_node(id, Vec3::new(x, y, 0.0), Vec3::zeros(), 0.0, NodeState::Moving, 1.0)
                .unwrap();
        }
        id
    }

    #[test]
    fn test_long_edges_are_subdivided() {
        let mut arena = FrontArena::new();
        let id = polygon(&mut arena, &[(40.0, 0.0), (0.0, 0.0), (0.0, 40.0), (40.0, 40.0)]);
        let stats = refine_front(&mut arena, id, &config(10.0, 10.0), 1.0).unwrap();
        assert_eq!(stats.inserted, 12);
        assert_eq!(arena.front(id).unwrap().len(), 16);
        let positions = arena.front_positions(id).unwrap();
        assert!((positions[1] - positions[0]).norm() <= 10.0 + 1e-9);
    }

    #[test]
    fn test_close_nodes_are_fused() {
        let mut arena = FrontArena::new();
        let id = polygon(
            &mut arena,
            &[(8.0, 0.0), (1.0, 0.0), (0.0, 0.0), (0.0, 8.0), (8.0, 8.0)],
        );
        let stats = refine_front(&mut arena, id, &config(10.0, 10.0), 1.0).unwrap();
        assert_eq!(stats.removed, 1);
        assert_eq!(arena.front(id).unwrap().len(), 4);
    }

    #[test]
    fn test_tiny_front_is_extinguished() {
        let mut arena = FrontArena::new();
        let id = polygon(&mut arena, &[(1.0, 0.0), (0.0, 0.0), (0.0, 1.0)]);
        let stats = refine_front(&mut arena, id, &config(10.0, 10.0), 1.0).unwrap();
        assert!(stats.extinguished);
    }
}
