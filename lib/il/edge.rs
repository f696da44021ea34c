//! An `Edge` is a directed edge between `Block` in a `ControlFlowGraph`.
//!
//! A block leaves through nothing (exit), one `Unconditional` edge, or a
//! `True`/`False` pair decided by its last instruction. `Exceptional` edges
//! model thrown exceptions and abrupt exits, and may be added to any block.

use crate::graph;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum EdgeKind {
    Unconditional,
    True,
    False,
    Exceptional,
}

impl EdgeKind {
    /// Returns true for the `True` and `False` branch edges.
    pub fn is_branch(&self) -> bool {
        matches!(*self, EdgeKind::True | EdgeKind::False)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            EdgeKind::Unconditional => write!(f, ""),
            EdgeKind::True => write!(f, "true"),
            EdgeKind::False => write!(f, "false"),
            EdgeKind::Exceptional => write!(f, "exception"),
        }
    }
}

/// Edge between IL blocks
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Edge {
    head: usize,
    tail: usize,
    kind: EdgeKind,
}

impl Edge {
    pub(crate) fn new(head: usize, tail: usize, kind: EdgeKind) -> Edge {
        Edge { head, tail, kind }
    }

    /// Retrieve the index of the head `Block` for this `Edge`.
    pub fn head(&self) -> usize {
        self.head
    }

    /// Retrieve the index of the tail `Block` for this `Edge`.
    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            EdgeKind::Unconditional => write!(f, "(0x{:X}->0x{:X})", self.head, self.tail),
            kind => write!(f, "(0x{:X}->0x{:X}) ? {}", self.head, self.tail, kind),
        }
    }
}

impl graph::Edge for Edge {
    fn head(&self) -> usize {
        self.head
    }

    fn tail(&self) -> usize {
        self.tail
    }

    fn dot_label(&self) -> String {
        self.kind.to_string()
    }

    fn dot_style(&self) -> String {
        match self.kind {
            EdgeKind::Exceptional => "dashed".to_string(),
            _ => "solid".to_string(),
        }
    }
}
