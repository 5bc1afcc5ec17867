//! Front splitting and merging
//!
//! Runs single-threaded after each sub-step's position update. Crossing edges, and
//! nodes of facing front parts closer than the merge tolerance, are resolved by
//! exchanging successors (see [`FrontArena::relink`]). Fronts touched in the same
//! sub-step are grouped, their cycles retraced into fresh fronts, and loops that only
//! enclose already-burned ground are absorbed.

use super::config::PropagationConfig;
use crate::core_types::Vec2;
use crate::error::FireError;
use crate::front::geometry::{outward_normal, segment_intersection, signed_area};
use crate::front::{FrontArena, FrontId, NodeId, NodeState};
use crate::grid::ArrivalTimeMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Kind of topology change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopologyKind {
    /// One front became several
    Split,
    /// Several fronts became one or more
    Merge,
    /// A front shed a spent loop and continues under a new id
    Trim,
}

/// A recorded topology change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyEvent {
    pub time: f64,
    pub kind: TopologyKind,
    pub parents: Vec<FrontId>,
    pub children: Vec<FrontId>,
}

/// Result of one topology pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopologyOutcome {
    pub events: Vec<TopologyEvent>,
    /// Fronts dropped on a topology error
    pub terminated: usize,
    /// Loops absorbed because they only enclosed burned ground
    pub absorbed: usize,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    a: NodeId,
    b: NodeId,
    front: FrontId,
    index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ContactKind {
    Crossing,
    Proximity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Contact {
    a: NodeId,
    b: NodeId,
    c: NodeId,
    d: NodeId,
    kind: ContactKind,
}

struct UnionFind(FxHashMap<FrontId, FrontId>);

impl UnionFind {
    fn find(&mut self, x: FrontId) -> FrontId {
        let parent = *self.0.entry(x).or_insert(x);
        if parent == x {
            return x;
        }
        let root = self.find(parent);
        self.0.insert(x, root);
        root
    }

    fn union(&mut self, x: FrontId, y: FrontId) {
        let (rx, ry) = (self.find(x), self.find(y));
        if rx != ry {
            self.0.insert(rx.max(ry), rx.min(ry));
        }
    }
}

fn node_normal(arena: &FrontArena, id: NodeId) -> Vec2 {
    let (prev, next) = arena.neighbors(id);
    let here = arena.node(id).position();
    let p = prev.map_or(here, |p| arena.node(p).position());
    let n = next.map_or(here, |n| arena.node(n).position());
    outward_normal(&p, &n)
}

/// Edges of every live closed front, with their chain lengths
fn collect_edges(
    arena: &mut FrontArena,
    time: f64,
    outcome: &mut TopologyOutcome,
) -> (Vec<Edge>, FxHashMap<FrontId, Vec<NodeId>>) {
    let fronts: Vec<FrontId> = arena
        .active_fronts()
        .filter(|f| f.is_closed() && !f.is_dormant(time))
        .map(|f| f.id())
        .collect();
    let mut edges = Vec::new();
    let mut chains = FxHashMap::default();
    for front in fronts {
        match arena.front_nodes(front) {
            Ok(nodes) => {
                for (index, &a) in nodes.iter().enumerate() {
                    if let Some(b) = arena.node(a).next() {
                        edges.push(Edge { a, b, front, index });
                    }
                }
                chains.insert(front, nodes);
            }
            Err(err) => {
                warn!("Terminating front {}: {}", front, err);
                if arena.terminate_front(front).is_ok() {
                    outcome.terminated += 1;
                }
            }
        }
    }
    (edges, chains)
}

/// Candidate contacts found through a uniform spatial hash of edge bounding boxes
fn find_contacts(
    arena: &FrontArena,
    edges: &[Edge],
    chains: &FxHashMap<FrontId, Vec<NodeId>>,
    config: &PropagationConfig,
) -> Vec<Contact> {
    let tolerance = config.merge_tolerance;
    let cell = config.perimeter_resolution.max(2.0 * tolerance);
    let mut grid: FxHashMap<(i64, i64), Vec<usize>> = FxHashMap::default();
    for (e, edge) in edges.iter().enumerate() {
        let pa = arena.node(edge.a).position();
        let pb = arena.node(edge.b).position();
        let lo = pa.inf(&pb).add_scalar(-tolerance) / cell;
        let hi = pa.sup(&pb).add_scalar(tolerance) / cell;
        for ix in (lo.x.floor() as i64)..=(hi.x.floor() as i64) {
            for iy in (lo.y.floor() as i64)..=(hi.y.floor() as i64) {
                grid.entry((ix, iy)).or_default().push(e);
            }
        }
    }

    let mut seen = FxHashSet::default();
    let mut contacts = Vec::new();
    for bucket in grid.values() {
        for (k, &i) in bucket.iter().enumerate() {
            for &j in &bucket[k + 1..] {
                let (e1, e2) = if i < j { (edges[i], edges[j]) } else { (edges[j], edges[i]) };
                if e1.a == e2.a || e1.a == e2.b || e1.b == e2.a || e1.b == e2.b {
                    continue;
                }
                if e1.front == e2.front {
                    let len = chains.get(&e1.front).map_or(0, Vec::len);
                    let gap = e1.index.abs_diff(e2.index);
                    if gap.min(len - gap) < 3 {
                        continue;
                    }
                }
                if !seen.insert((e1.a, e2.a)) {
                    continue;
                }
                let (pa, pb) = (arena.node(e1.a).position(), arena.node(e1.b).position());
                let (pc, pd) = (arena.node(e2.a).position(), arena.node(e2.b).position());
                let kind = if segment_intersection(&pa, &pb, &pc, &pd).is_some() {
                    ContactKind::Crossing
                } else if tolerance > 0.0
                    && (pa - pc).norm() < tolerance
                    && node_normal(arena, e1.a).dot(&node_normal(arena, e2.a)) < -0.5
                {
                    ContactKind::Proximity
                } else {
                    continue;
                };
                contacts.push(Contact {
                    a: e1.a,
                    b: e1.b,
                    c: e2.a,
                    d: e2.b,
                    kind,
                });
            }
        }
    }
    contacts.sort_unstable();
    contacts
}

/// Whether a loop only borders ground that burned at or before `time`
fn is_spent(arena: &FrontArena, nodes: &[NodeId], burn_map: &ArrivalTimeMap, time: f64) -> bool {
    let offset = 1.5 * burn_map.cell_size();
    let stride = (nodes.len() / 32).max(1);
    let mut burned = 0;
    let mut total = 0;
    for &id in nodes.iter().step_by(stride) {
        let normal = node_normal(arena, id);
        if normal == Vec2::zeros() {
            continue;
        }
        let p = arena.node(id).position() + normal * offset;
        total += 1;
        if burn_map.query_at(&p) <= time {
            burned += 1;
        }
    }
    total > 0 && 2 * burned > total
}

/// Detect and apply every split and merge for the current sub-step
pub fn resolve_topology(
    arena: &mut FrontArena,
    burn_map: &ArrivalTimeMap,
    config: &PropagationConfig,
    time: f64,
) -> TopologyOutcome {
    let mut outcome = TopologyOutcome::default();
    let (edges, chains) = collect_edges(arena, time, &mut outcome);
    let contacts = find_contacts(arena, &edges, &chains, config);
    if contacts.is_empty() {
        return outcome;
    }

    let mut groups = UnionFind(FxHashMap::default());
    let mut touched = FxHashSet::default();
    for contact in contacts {
        let Contact { a, b, c, d, kind } = contact;
        let valid = [a, c].iter().all(|&n| !arena.node(n).state.is_terminal())
            && arena.node(a).next() == Some(b)
            && arena.node(c).next() == Some(d);
        if !valid {
            continue;
        }
        let (fa, fc) = (arena.node(a).front, arena.node(c).front);
        if arena.relink(a, c).is_err() {
            continue;
        }
        if kind == ContactKind::Proximity {
            arena.remove_node(c, NodeState::Merged);
        }
        groups.union(fa, fc);
        touched.insert(fa);
        touched.insert(fc);
    }

    let mut by_root: FxHashMap<FrontId, Vec<FrontId>> = FxHashMap::default();
    for front in touched {
        by_root.entry(groups.find(front)).or_default().push(front);
    }
    let mut roots: Vec<FrontId> = by_root.keys().copied().collect();
    roots.sort_unstable();

    for root in roots {
        let mut parents = by_root.remove(&root).unwrap_or_default();
        parents.sort_unstable();
        let nodes: Vec<NodeId> = parents
            .iter()
            .filter_map(|p| chains.get(p))
            .flatten()
            .copied()
            .collect();

        let children = match arena.retrace(&parents, &nodes, time) {
            Ok(children) => children,
            Err(err) => {
                warn!("Dropping fronts {:?} after failed relink: {}", parents, err);
                for &id in &nodes {
                    if !arena.node(id).state.is_terminal() {
                        arena.remove_node(id, NodeState::Terminated);
                    }
                }
                outcome.terminated += parents.len();
                continue;
            }
        };

        let mut kept = Vec::new();
        for child in children {
            let child_nodes = arena.front_nodes(child).unwrap_or_default();
            if child_nodes.len() < 3 {
                let err = FireError::Topology {
                    front: child,
                    reason: format!("closed front with {} nodes", child_nodes.len()),
                };
                warn!("{}", err);
                if arena.terminate_front(child).is_ok() {
                    outcome.terminated += 1;
                }
                continue;
            }
            let positions: Vec<Vec2> = child_nodes
                .iter()
                .map(|&id| arena.node(id).position())
                .collect();
            let cell_area = burn_map.cell_size() * burn_map.cell_size();
            if signed_area(&positions).abs() < cell_area
                || is_spent(arena, &child_nodes, burn_map, time)
            {
                debug!("Absorbing spent loop {} ({} nodes)", child, child_nodes.len());
                if arena.absorb_front(child).is_ok() {
                    outcome.absorbed += 1;
                }
                continue;
            }
            kept.push(child);
        }

        let kind = match (parents.len(), kept.len()) {
            (1, n) if n >= 2 => TopologyKind::Split,
            (1, _) => TopologyKind::Trim,
            _ => TopologyKind::Merge,
        };
        debug!(
            "{:?} at t={:.3}: {:?} -> {:?}",
            kind, time, parents, kept
        );
        outcome.events.push(TopologyEvent {
            time,
            kind,
            parents,
            children: kept,
        });
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Vec3;
    use crate::params::SimulationParameters;
    use approx::assert_relative_eq;

    fn config() -> PropagationConfig {
        let mut params = SimulationParameters::new();
        params.set_f64("perimeterResolution", 4.0);
        params.set_f64("minimalPropagativeFrontDepth", 2.0);
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

    fn overlapping_squares(arena: &mut FrontArena) -> (FrontId, FrontId) {
        let left = polygon(arena, &[(11.0, 2.0), (2.0, 2.0), (2.0, 12.0), (11.0, 12.0)]);
        let right = polygon(arena, &[(19.0, 5.0), (9.0, 5.0), (9.0, 15.0), (19.0, 15.0)]);
        (left, right)
    }

    #[test]
    fn test_overlapping_fronts_merge() {
        let mut arena = FrontArena::new();
        let map = ArrivalTimeMap::new(Vec2::zeros(), Vec2::new(40.0, 20.0), 1.0).unwrap();
        let (left, right) = overlapping_squares(&mut arena);

        let outcome = resolve_topology(&mut arena, &map, &config(), 1.0);
        assert_eq!(outcome.events.len(), 1);
        let merge = &outcome.events[0];
        assert_eq!(merge.kind, TopologyKind::Merge);
        assert_eq!(merge.parents, vec![left, right]);
        assert_eq!(merge.children.len(), 1);
        // The two-node lens left between the crossings is dropped
        assert_eq!(outcome.terminated, 1);

        let merged = merge.children[0];
        assert_relative_eq!(arena.signed_area(merged).unwrap(), -198.5, epsilon = 1e-9);
        assert_eq!(arena.active_fronts().count(), 1);
        assert!(!arena.front(left).unwrap().is_active());
    }

    #[test]
    fn test_self_crossing_front_splits() {
        let mut arena = FrontArena::new();
        let map = ArrivalTimeMap::new(Vec2::zeros(), Vec2::new(40.0, 40.0), 1.0).unwrap();
        // Figure eight: edges (8,8)->(12,0) and (12,8)->(8,0) cross at (10,4)
        let id = polygon(
            &mut arena,
            &[
                (0.0, 0.0),
                (0.0, 8.0),
                (8.0, 8.0),
                (12.0, 0.0),
                (20.0, 0.0),
                (20.0, 8.0),
                (12.0, 8.0),
                (8.0, 0.0),
            ],
        );
        let outcome = resolve_topology(&mut arena, &map, &config(), 1.0);
        assert_eq!(outcome.events.len(), 1);
        let split = &outcome.events[0];
        assert_eq!(split.kind, TopologyKind::Split);
        assert_eq!(split.parents, vec![id]);
        assert_eq!(split.children.len(), 2);

        let mut areas: Vec<f64> = split
            .children
            .iter()
            .map(|c| arena.signed_area(*c).unwrap())
            .collect();
        areas.sort_by(f64::total_cmp);
        assert_relative_eq!(areas[0], -64.0, epsilon = 1e-9);
        assert_relative_eq!(areas[1], 64.0, epsilon = 1e-9);
    }

    #[test]
    fn test_spent_loop_is_absorbed() {
        let mut arena = FrontArena::new();
        let map = ArrivalTimeMap::new(Vec2::zeros(), Vec2::new(40.0, 40.0), 1.0).unwrap();
        for i in 0..40 {
            for j in 0..40 {
                map.stamp(i, j, 0.0);
            }
        }
        let (left, right) = overlapping_squares(&mut arena);
        let outcome = resolve_topology(&mut arena, &map, &config(), 1.0);
        assert_eq!(outcome.absorbed, 1);
        assert!(outcome.events[0].children.is_empty());
        assert_eq!(arena.active_fronts().count(), 0);
        assert!(!arena.front(left).unwrap().is_active());
        assert!(!arena.front(right).unwrap().is_active());
    }

    #[test]
    fn test_separate_fronts_untouched() {
        let mut arena = FrontArena::new();
        let map = ArrivalTimeMap::new(Vec2::zeros(), Vec2::new(40.0, 20.0), 1.0).unwrap();
        polygon(&mut arena, &[(8.0, 2.0), (2.0, 2.0), (2.0, 8.0), (8.0, 8.0)]);
        polygon(&mut arena, &[(30.0, 2.0), (20.0, 2.0), (20.0, 8.0), (30.0, 8.0)]);
        let outcome = resolve_topology(&mut arena, &map, &config(), 1.0);
        assert!(outcome.events.is_empty());
        assert_eq!(arena.active_fronts().count(), 2);
    }

    #[test]
    fn test_facing_nodes_within_tolerance_merge() {
        let mut arena = FrontArena::new();
        let map = ArrivalTimeMap::new(Vec2::zeros(), Vec2::new(40.0, 20.0), 1.0).unwrap();
        // Right side of the left square faces the left side of the right square 0.2 m away
        let left = polygon(
            &mut arena,
            &[(10.0, 2.0), (2.0, 2.0), (2.0, 10.0), (10.0, 10.0), (10.0, 6.0)],
        );
        let right = polygon(
            &mut arena,
            &[(18.0, 2.0), (10.2, 2.0), (10.2, 6.0), (10.2, 10.0), (18.0, 10.0)],
        );
        let outcome = resolve_topology(&mut arena, &map, &config(), 1.0);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].kind, TopologyKind::Merge);
        assert_eq!(outcome.events[0].parents, vec![left, right]);
        assert_eq!(arena.active_fronts().count(), 1);
    }
}
