//! Node arena and front chains
//!
//! Every node lives in one `Vec` and is addressed by a [`NodeId`]. Fronts own their
//! chain through `prev`/`next` handles: closed fronts form a cycle, open fronts end in
//! `None` on both sides. Splitting and merging only rewrite handles.

use super::geometry;
use super::node::{FrontId, Node, NodeId, NodeState};
use crate::core_types::{Vec2, Vec3};
use crate::error::{FireError, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle of a front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrontStatus {
    /// Integrated by the engine (possibly dormant until its creation time)
    Active,
    /// Replaced by the fronts produced by a split or merge
    Retired,
    /// Dropped after a topology error or extinction
    Terminated,
}

/// An ordered chain of nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Front {
    id: FrontId,
    domain: u32,
    time: f64,
    closed: bool,
    status: FrontStatus,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
    ignited: bool,
}

impl Front {
    pub fn id(&self) -> FrontId {
        self.id
    }

    /// Domain the front belongs to
    pub fn domain(&self) -> u32 {
        self.domain
    }

    /// Creation time; the front stays dormant until the clock reaches it
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn status(&self) -> FrontStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == FrontStatus::Active
    }

    pub fn is_dormant(&self, now: f64) -> bool {
        self.time > now
    }

    /// Whether the area inside the front has been written to the burn map
    pub fn is_ignited(&self) -> bool {
        self.ignited
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Storage for every front and node of a simulation
#[derive(Debug, Clone, Default)]
pub struct FrontArena {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    fronts: BTreeMap<FrontId, Front>,
    next_id: FrontId,
}

impl FrontArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty closed front
    ///
    /// Without an explicit id the next unused id is taken. Ids are never reused, even
    /// after the front is retired or terminated.
    pub fn create_front(&mut self, id: Option<FrontId>, domain: u32, time: f64) -> Result<FrontId> {
        let id = id.unwrap_or(self.next_id);
        if self.fronts.contains_key(&id) {
            return Err(FireError::config(format!("front id {id} is already in use")));
        }
        self.next_id = self.next_id.max(id + 1);
        self.fronts.insert(
            id,
            Front {
                id,
                domain,
                time,
                closed: true,
                status: FrontStatus::Active,
                head: None,
                tail: None,
                len: 0,
                ignited: false,
            },
        );
        Ok(id)
    }

    /// Open or close a front's chain
    pub fn set_closed(&mut self, front: FrontId, closed: bool) -> Result<()> {
        let f = self.front_mut(front)?;
        if f.closed == closed {
            return Ok(());
        }
        f.closed = closed;
        let (head, tail) = (f.head, f.tail);
        if let (Some(head), Some(tail)) = (head, tail) {
            self.nodes[tail.index()].next = closed.then_some(head);
            self.nodes[head.index()].prev = closed.then_some(tail);
        }
        Ok(())
    }

    pub fn front(&self, id: FrontId) -> Result<&Front> {
        self.fronts
            .get(&id)
            .ok_or_else(|| FireError::config(format!("unknown front {id}")))
    }

    fn front_mut(&mut self, id: FrontId) -> Result<&mut Front> {
        self.fronts
            .get_mut(&id)
            .ok_or_else(|| FireError::config(format!("unknown front {id}")))
    }

    /// Every front ever created, by id
    pub fn fronts(&self) -> impl Iterator<Item = &Front> {
        self.fronts.values()
    }

    pub fn active_fronts(&self) -> impl Iterator<Item = &Front> {
        self.fronts.values().filter(|f| f.is_active())
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn neighbors(&self, id: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        let node = self.node(id);
        (node.prev, node.next)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId((self.nodes.len() - 1) as u32)
            }
        }
    }

    /// Append a node at the tail of a front
    pub fn append_node(
        &mut self,
        front: FrontId,
        loc: Vec3,
        vel: Vec3,
        time: f64,
        state: NodeState,
        depth: f64,
    ) -> Result<NodeId> {
        let f = self.front(front)?;
        if !f.is_active() {
            return Err(FireError::config(format!(
                "cannot add nodes to front {front} ({:?})",
                f.status
            )));
        }
        if state.is_terminal() {
            return Err(FireError::config(format!(
                "new nodes cannot start in state '{state}'"
            )));
        }
        let (closed, tail) = (f.closed, f.tail);
        let id = self.alloc(Node::new(front, loc, vel, time, state, depth));
        match tail {
            Some(tail) => self.link_after(tail, id),
            None => {
                if closed {
                    self.nodes[id.index()].prev = Some(id);
                    self.nodes[id.index()].next = Some(id);
                }
                let f = self.front_mut(front)?;
                f.head = Some(id);
                f.tail = Some(id);
                f.len = 1;
            }
        }
        Ok(id)
    }

    /// Insert `node` right after `after` in the same front
    pub fn insert_after(&mut self, after: NodeId, mut node: Node) -> NodeId {
        node.front = self.node(after).front;
        let id = self.alloc(node);
        self.link_after(after, id);
        id
    }

    fn link_after(&mut self, after: NodeId, id: NodeId) {
        let next = self.nodes[after.index()].next;
        self.nodes[id.index()].prev = Some(after);
        self.nodes[id.index()].next = next;
        self.nodes[after.index()].next = Some(id);
        if let Some(next) = next {
            self.nodes[next.index()].prev = Some(id);
        }
        let front = self.nodes[after.index()].front;
        if let Some(f) = self.fronts.get_mut(&front) {
            f.len += 1;
            if f.tail == Some(after) {
                f.tail = Some(id);
            }
        }
    }

    /// Move a node along its state machine
    ///
    /// Terminal states are absorbing; an illegal transition is a logic error.
    pub fn set_state(&mut self, id: NodeId, state: NodeState) {
        let node = &mut self.nodes[id.index()];
        debug_assert!(
            node.state.can_become(state),
            "node {:?}: illegal transition {} -> {}",
            id,
            node.state,
            state
        );
        node.state = state;
    }

    /// Unlink a node from its chain and release its slot
    pub fn remove_node(&mut self, id: NodeId, state: NodeState) {
        let (prev, next, front) = {
            let node = &self.nodes[id.index()];
            (node.prev, node.next, node.front)
        };
        // A lone node in a closed chain points to itself
        let prev = prev.filter(|&p| p != id);
        let next = next.filter(|&n| n != id);
        if let Some(p) = prev {
            self.nodes[p.index()].next = next;
        }
        if let Some(n) = next {
            self.nodes[n.index()].prev = prev;
        }
        if let Some(f) = self.fronts.get_mut(&front) {
            f.len = f.len.saturating_sub(1);
            if f.len == 0 {
                f.head = None;
                f.tail = None;
            } else {
                if f.head == Some(id) {
                    f.head = next.or(prev);
                }
                if f.tail == Some(id) {
                    f.tail = prev.or(next);
                }
            }
        }
        self.set_state(id, state);
        let node = &mut self.nodes[id.index()];
        node.prev = None;
        node.next = None;
        self.free.push(id);
    }

    /// Node handles of a front in chain order
    pub fn front_nodes(&self, front: FrontId) -> Result<Vec<NodeId>> {
        let f = self.front(front)?;
        let mut out = Vec::with_capacity(f.len);
        let Some(head) = f.head else {
            return Ok(out);
        };
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            out.push(id);
            if out.len() > f.len {
                return Err(FireError::Topology {
                    front,
                    reason: format!("chain longer than its {} recorded nodes", f.len),
                });
            }
            cursor = self.nodes[id.index()].next.filter(|&n| n != head);
        }
        if out.len() != f.len {
            return Err(FireError::Topology {
                front,
                reason: format!("chain has {} nodes, expected {}", out.len(), f.len),
            });
        }
        Ok(out)
    }

    /// Planar positions of a front in chain order
    pub fn front_positions(&self, front: FrontId) -> Result<Vec<Vec2>> {
        Ok(self
            .front_nodes(front)?
            .into_iter()
            .map(|id| self.node(id).position())
            .collect())
    }

    pub fn perimeter(&self, front: FrontId) -> Result<f64> {
        let closed = self.front(front)?.closed;
        Ok(geometry::perimeter(&self.front_positions(front)?, closed))
    }

    /// Signed area enclosed by a closed front (negative when clockwise)
    pub fn signed_area(&self, front: FrontId) -> Result<f64> {
        Ok(geometry::signed_area(&self.front_positions(front)?))
    }

    /// Nodes of all active fronts that are not dormant at `now`
    pub fn live_nodes(&self, now: f64) -> Vec<NodeId> {
        let mut out = Vec::new();
        for f in self.active_fronts().filter(|f| !f.is_dormant(now)) {
            if let Ok(nodes) = self.front_nodes(f.id) {
                out.extend(nodes);
            }
        }
        out
    }

    pub fn node_count(&self) -> usize {
        self.active_fronts().map(Front::len).sum()
    }

    /// Terminate a front and every node it holds
    pub fn terminate_front(&mut self, front: FrontId) -> Result<()> {
        let nodes = self.front_nodes(front).unwrap_or_default();
        for id in nodes {
            self.remove_node(id, NodeState::Terminated);
        }
        let f = self.front_mut(front)?;
        f.status = FrontStatus::Terminated;
        f.head = None;
        f.tail = None;
        f.len = 0;
        Ok(())
    }

    pub(crate) fn mark_ignited(&mut self, front: FrontId) -> Result<()> {
        self.front_mut(front)?.ignited = true;
        Ok(())
    }

    /// Retire a front whose nodes were absorbed into burned ground
    pub fn absorb_front(&mut self, front: FrontId) -> Result<()> {
        let nodes = self.front_nodes(front).unwrap_or_default();
        for id in nodes {
            self.remove_node(id, NodeState::Merged);
        }
        let f = self.front_mut(front)?;
        f.status = FrontStatus::Retired;
        f.head = None;
        f.tail = None;
        f.len = 0;
        Ok(())
    }

    /// Exchange the successors of `a` and `c`
    ///
    /// Within one cycle this cuts it in two; across two cycles it joins them.
    pub(crate) fn relink(&mut self, a: NodeId, c: NodeId) -> Result<()> {
        let (Some(b), Some(d)) = (self.node(a).next, self.node(c).next) else {
            return Err(FireError::Topology {
                front: self.node(a).front,
                reason: "cannot relink the end of an open chain".into(),
            });
        };
        self.nodes[a.index()].next = Some(d);
        self.nodes[d.index()].prev = Some(a);
        self.nodes[c.index()].next = Some(b);
        self.nodes[b.index()].prev = Some(c);
        Ok(())
    }

    /// Rebuild fronts from the cycles found among `nodes`
    ///
    /// The `parents` are retired and every cycle becomes a new closed front created at
    /// `time`. Returns the new front ids with their node counts.
    pub(crate) fn retrace(
        &mut self,
        parents: &[FrontId],
        nodes: &[NodeId],
        time: f64,
    ) -> Result<Vec<FrontId>> {
        let domain = parents
            .first()
            .and_then(|id| self.fronts.get(id))
            .map_or(0, |f| f.domain);
        for parent in parents {
            let f = self.front_mut(*parent)?;
            f.status = FrontStatus::Retired;
            f.head = None;
            f.tail = None;
            f.len = 0;
        }

        let mut visited = FxHashSet::default();
        let mut children = Vec::new();
        for &start in nodes {
            if visited.contains(&start) || self.node(start).state.is_terminal() {
                continue;
            }
            let mut cycle = vec![start];
            visited.insert(start);
            let mut cursor = self.node(start).next;
            loop {
                match cursor {
                    Some(id) if id == start => break,
                    Some(id) if cycle.len() <= nodes.len() => {
                        visited.insert(id);
                        cycle.push(id);
                        cursor = self.node(id).next;
                    }
                    _ => {
                        return Err(FireError::Topology {
                            front: parents.first().copied().unwrap_or_default(),
                            reason: "relinked chain is not a cycle".into(),
                        })
                    }
                }
            }

            let id = self.create_front(None, domain, time)?;
            for &n in &cycle {
                self.nodes[n.index()].front = id;
            }
            let f = self.front_mut(id)?;
            f.head = cycle.first().copied();
            f.tail = cycle.last().copied();
            f.len = cycle.len();
            f.ignited = true;
            children.push(id);
        }
        Ok(children)
    }

    /// Split a closed front by exchanging the successors of `a` and `c`
    pub fn split_front(
        &mut self,
        front: FrontId,
        pair: (NodeId, NodeId),
        time: f64,
    ) -> Result<Vec<FrontId>> {
        let (a, c) = pair;
        let f = self.front(front)?;
        if !f.closed {
            return Err(FireError::Topology {
                front,
                reason: "only closed fronts can be split".into(),
            });
        }
        if self.node(a).front != front || self.node(c).front != front {
            return Err(FireError::Topology {
                front,
                reason: "split nodes must belong to the front".into(),
            });
        }
        if a == c || self.node(a).next == Some(c) || self.node(c).next == Some(a) {
            return Err(FireError::Topology {
                front,
                reason: "split nodes must not be adjacent".into(),
            });
        }
        let nodes = self.front_nodes(front)?;
        self.relink(a, c)?;
        self.retrace(&[front], &nodes, time)
    }

    /// Join two closed fronts at `a` (on `first`) and `c` (on `second`)
    pub fn merge_fronts(
        &mut self,
        first: FrontId,
        second: FrontId,
        pair: (NodeId, NodeId),
        time: f64,
    ) -> Result<FrontId> {
        let (a, c) = pair;
        if first == second {
            return Err(FireError::Topology {
                front: first,
                reason: "cannot merge a front with itself".into(),
            });
        }
        for (front, node) in [(first, a), (second, c)] {
            if !self.front(front)?.closed || self.node(node).front != front {
                return Err(FireError::Topology {
                    front,
                    reason: "merge nodes must belong to closed fronts".into(),
                });
            }
        }
        let mut nodes = self.front_nodes(first)?;
        nodes.extend(self.front_nodes(second)?);
        self.relink(a, c)?;
        let children = self.retrace(&[first, second], &nodes, time)?;
        children.first().copied().ok_or_else(|| FireError::Topology {
            front: first,
            reason: "merge produced no front".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(arena: &mut FrontArena, x0: f64, side: f64) -> (FrontId, Vec<NodeId>) {
        let id = arena.create_front(None, 0, 0.0).unwrap();
        // Clockwise
        let corners = [(x0 + side, 0.0), (x0, 0.0), (x0, side), (x0 + side, side)];
        let nodes = corners
            .iter()
            .map(|&(x, y)| {
                arena
                    .append_node(id, Vec3::new(x, y, 0.0), Vec3::zeros(), 0.0, NodeState::Init, 1.0)
                    .unwrap()
            })
            .collect();
        (id, nodes)
    }

    #[test]
    fn test_closed_chain_integrity() {
        let mut arena = FrontArena::new();
        let (id, nodes) = square(&mut arena, 0.0, 10.0);
        assert_eq!(arena.front_nodes(id).unwrap(), nodes);
        assert_eq!(arena.neighbors(nodes[0]), (Some(nodes[3]), Some(nodes[1])));
        assert_relative_eq!(arena.signed_area(id).unwrap(), -100.0);
        assert_relative_eq!(arena.perimeter(id).unwrap(), 40.0);
    }

    #[test]
    fn test_open_chain_ends() {
        let mut arena = FrontArena::new();
        let (id, nodes) = square(&mut arena, 0.0, 10.0);
        arena.set_closed(id, false).unwrap();
        assert_eq!(arena.neighbors(nodes[0]), (None, Some(nodes[1])));
        assert_eq!(arena.neighbors(nodes[3]), (Some(nodes[2]), None));
        assert_relative_eq!(arena.perimeter(id).unwrap(), 30.0);
    }

    #[test]
    fn test_insert_and_remove_keep_links() {
        let mut arena = FrontArena::new();
        let (id, nodes) = square(&mut arena, 0.0, 10.0);
        let extra = Node::new(id, Vec3::new(5.0, 0.0, 0.0), Vec3::zeros(), 0.0, NodeState::Moving, 1.0);
        let mid = arena.insert_after(nodes[0], extra);
        assert_eq!(arena.neighbors(mid), (Some(nodes[0]), Some(nodes[1])));
        assert_eq!(arena.front(id).unwrap().len(), 5);

        arena.remove_node(nodes[0], NodeState::Merged);
        assert_eq!(arena.front(id).unwrap().len(), 4);
        assert_eq!(arena.neighbors(mid), (Some(nodes[3]), Some(nodes[1])));
        assert_eq!(arena.front_nodes(id).unwrap().len(), 4);
    }

    #[test]
    fn test_front_ids_never_reused() {
        let mut arena = FrontArena::new();
        let first = arena.create_front(Some(2), 0, 0.0).unwrap();
        assert!(arena.create_front(Some(2), 0, 0.0).is_err());
        let next = arena.create_front(None, 0, 0.0).unwrap();
        assert_eq!((first, next), (2, 3));
    }

    #[test]
    fn test_split_produces_two_fronts() {
        let mut arena = FrontArena::new();
        let id = arena.create_front(None, 0, 0.0).unwrap();
        for k in 0..8 {
            let angle = -f64::from(k) * std::f64::consts::FRAC_PI_4;
            arena
                .append_node(
                    id,
                    Vec3::new(angle.cos(), angle.sin(), 0.0),
                    Vec3::zeros(),
                    0.0,
                    NodeState::Moving,
                    1.0,
                )
                .unwrap();
        }
        let nodes = arena.front_nodes(id).unwrap();
        let children = arena.split_front(id, (nodes[1], nodes[5]), 3.0).unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(arena.front(id).unwrap().status(), FrontStatus::Retired);
        let sizes: Vec<usize> = children
            .iter()
            .map(|c| arena.front(*c).unwrap().len())
            .collect();
        assert_eq!(sizes.iter().sum::<usize>(), 8);
        assert_eq!(sizes, vec![4, 4]);
        assert!(children.iter().all(|c| *c > id));
    }

    #[test]
    fn test_merge_joins_two_fronts() {
        let mut arena = FrontArena::new();
        let (left, ln) = square(&mut arena, 0.0, 10.0);
        let (right, rn) = square(&mut arena, 11.0, 10.0);
        // Left's right edge runs down (10,10)->(10,0), right's left edge runs up
        let merged = arena.merge_fronts(left, right, (ln[3], rn[1]), 1.0).unwrap();
        assert_eq!(arena.front(merged).unwrap().len(), 8);
        assert_relative_eq!(arena.signed_area(merged).unwrap(), -210.0);
        assert!(!arena.front(left).unwrap().is_active());
        assert!(!arena.front(right).unwrap().is_active());
    }

    #[test]
    fn test_terminate_front() {
        let mut arena = FrontArena::new();
        let (id, nodes) = square(&mut arena, 0.0, 10.0);
        arena.terminate_front(id).unwrap();
        assert_eq!(arena.front(id).unwrap().status(), FrontStatus::Terminated);
        assert_eq!(arena.node(nodes[2]).state, NodeState::Terminated);
        assert!(arena.live_nodes(0.0).is_empty());
    }

    #[test]
    fn test_state_transitions() {
        let mut arena = FrontArena::new();
        let (_, nodes) = square(&mut arena, 0.0, 10.0);
        arena.set_state(nodes[0], NodeState::Moving);
        assert_eq!(arena.node(nodes[0]).state, NodeState::Moving);
        arena.remove_node(nodes[0], NodeState::Merged);
        assert_eq!(arena.node(nodes[0]).state, NodeState::Merged);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "illegal transition")]
    fn test_terminal_state_is_absorbing() {
        let mut arena = FrontArena::new();
        let (_, nodes) = square(&mut arena, 0.0, 10.0);
        arena.remove_node(nodes[1], NodeState::Terminated);
        arena.set_state(nodes[1], NodeState::Moving);
    }
}
