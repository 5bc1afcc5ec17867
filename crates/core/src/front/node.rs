use crate::core_types::{planar, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FireError;

/// Front identifier, never reused within a simulation
pub type FrontId = u32;

/// Stable handle of a node slot in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node lifecycle: `Init → Moving → {Merged | Terminated}`
///
/// `Merged` and `Terminated` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Init,
    Moving,
    Merged,
    Terminated,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Merged | Self::Terminated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Moving => "moving",
            Self::Merged => "merged",
            Self::Terminated => "terminated",
        }
    }

    /// Whether `self → next` is a legal transition
    pub fn can_become(self, next: Self) -> bool {
        match self {
            Self::Init => true,
            Self::Moving => next != Self::Init,
            Self::Merged | Self::Terminated => self == next,
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeState {
    type Err = FireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "init" => Ok(Self::Init),
            "moving" => Ok(Self::Moving),
            "merged" => Ok(Self::Merged),
            "terminated" => Ok(Self::Terminated),
            other => Err(FireError::command(format!("unknown node state '{other}'"))),
        }
    }
}

/// A marker on a front
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub loc: Vec3,
    pub vel: Vec3,
    pub state: NodeState,
    /// Creation time
    pub time: f64,
    /// Depth of the burning zone behind the node (m)
    pub depth: f64,
    pub front: FrontId,
    /// Held in place after repeated invalid rates
    pub frozen: bool,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) invalid_streak: u32,
}

impl Node {
    pub fn new(front: FrontId, loc: Vec3, vel: Vec3, time: f64, state: NodeState, depth: f64) -> Self {
        Self {
            loc,
            vel,
            state,
            time,
            depth,
            front,
            frozen: false,
            prev: None,
            next: None,
            invalid_streak: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        planar(&self.loc)
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    pub fn next(&self) -> Option<NodeId> {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine() {
        assert!(NodeState::Init.can_become(NodeState::Moving));
        assert!(NodeState::Moving.can_become(NodeState::Merged));
        assert!(!NodeState::Moving.can_become(NodeState::Init));
        assert!(!NodeState::Merged.can_become(NodeState::Moving));
        assert!(!NodeState::Terminated.can_become(NodeState::Merged));
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!("init".parse::<NodeState>().unwrap(), NodeState::Init);
        assert_eq!(" Moving".parse::<NodeState>().unwrap(), NodeState::Moving);
        assert!("burning".parse::<NodeState>().is_err());
    }
}
