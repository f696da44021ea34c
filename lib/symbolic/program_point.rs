use crate::symbolic::ProgramState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A location in a `ControlFlowGraph`: an instruction offset in a block.
///
/// `visits` counts how many times the loop header `block` had been entered
/// when this point was reached. It is exploration metadata and takes no part
/// in equality or hashing.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ProgramPoint {
    block: usize,
    offset: usize,
    visits: usize,
}

impl ProgramPoint {
    pub fn new(block: usize, offset: usize, visits: usize) -> ProgramPoint {
        ProgramPoint {
            block,
            offset,
            visits,
        }
    }

    pub fn block(&self) -> usize {
        self.block
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn visits(&self) -> usize {
        self.visits
    }

    /// The point of the instruction at `offset` in the same block.
    pub fn with_offset(&self, offset: usize) -> ProgramPoint {
        ProgramPoint::new(self.block, offset, self.visits)
    }
}

impl PartialEq for ProgramPoint {
    fn eq(&self, other: &Self) -> bool {
        self.block == other.block && self.offset == other.offset
    }
}

impl Eq for ProgramPoint {}

impl Hash for ProgramPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.block.hash(state);
        self.offset.hash(state);
    }
}

impl fmt::Display for ProgramPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:X}:{:02}", self.block, self.offset)
    }
}

/// A node of the exploded graph: a state reached at a point.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ExplodedGraphNode {
    point: ProgramPoint,
    state: ProgramState,
}

impl ExplodedGraphNode {
    pub fn new(point: ProgramPoint, state: ProgramState) -> ExplodedGraphNode {
        ExplodedGraphNode { point, state }
    }

    pub fn point(&self) -> &ProgramPoint {
        &self.point
    }

    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    pub fn into_state(self) -> ProgramState {
        self.state
    }
}
