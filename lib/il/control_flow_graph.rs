//! A `ControlFlowGraph` is a directed `Graph` of `Block` and `Edge`.

use crate::il::*;
use crate::{graph, Error};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// A directed graph of types `Block` and `Edge`, with an entry `Block`.
///
/// # Shape
///
/// Every block leaves through no edge, one `Unconditional` edge, or a `True`
/// and `False` pair. A block with a `True`/`False` pair ends with the
/// instruction computing its condition. `Exceptional` edges come on top of
/// these. `validate` rejects anything else.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "ControlFlowGraphData", into = "ControlFlowGraphData")]
pub struct ControlFlowGraph {
    // The internal graph used to store our blocks.
    graph: graph::Graph<Block, Edge>,
    // The next index to use when creating a basic block.
    next_index: usize,
    entry: Option<usize>,
}

/// The flat form a `ControlFlowGraph` is serialized through.
#[derive(Deserialize, Serialize)]
struct ControlFlowGraphData {
    entry: Option<usize>,
    blocks: Vec<Block>,
    edges: Vec<Edge>,
}

impl TryFrom<ControlFlowGraphData> for ControlFlowGraph {
    type Error = Error;

    fn try_from(data: ControlFlowGraphData) -> Result<ControlFlowGraph, Error> {
        let mut control_flow_graph = ControlFlowGraph::new();
        for block in data.blocks {
            control_flow_graph.next_index = control_flow_graph.next_index.max(block.index() + 1);
            control_flow_graph.graph.insert_vertex(block)?;
        }
        for edge in data.edges {
            control_flow_graph.graph.insert_edge(edge)?;
        }
        if let Some(entry) = data.entry {
            control_flow_graph.set_entry(entry)?;
        }
        Ok(control_flow_graph)
    }
}

impl From<ControlFlowGraph> for ControlFlowGraphData {
    fn from(control_flow_graph: ControlFlowGraph) -> ControlFlowGraphData {
        ControlFlowGraphData {
            entry: control_flow_graph.entry,
            blocks: control_flow_graph.blocks().into_iter().cloned().collect(),
            edges: control_flow_graph.edges().into_iter().cloned().collect(),
        }
    }
}

impl ControlFlowGraph {
    pub fn new() -> ControlFlowGraph {
        ControlFlowGraph {
            graph: graph::Graph::new(),
            next_index: 0,
            entry: None,
        }
    }

    /// Returns the underlying graph
    pub fn graph(&self) -> &graph::Graph<Block, Edge> {
        &self.graph
    }

    /// Sets the entry point for this `ControlFlowGraph` to the given `Block` index.
    pub fn set_entry(&mut self, entry: usize) -> Result<(), Error> {
        if self.graph.has_vertex(entry) {
            self.entry = Some(entry);
            return Ok(());
        }
        Err(Error::GraphVertexNotFound(entry))
    }

    /// Get the entry `Block` index for this `ControlFlowGraph`.
    pub fn entry(&self) -> Option<usize> {
        self.entry
    }

    /// Returns the entry block for this ControlFlowGraph
    pub fn entry_block(&self) -> Result<&Block, Error> {
        self.entry
            .ok_or(Error::ControlFlowGraphEntryNotFound)
            .and_then(|entry| self.block(entry))
    }

    /// Get a `Block` by index.
    pub fn block(&self, index: usize) -> Result<&Block, Error> {
        self.graph.vertex(index)
    }

    /// Get a mutable reference to a `Block` by index.
    pub fn block_mut(&mut self, index: usize) -> Result<&mut Block, Error> {
        self.graph.vertex_mut(index)
    }

    /// Get every `Block` in this `ControlFlowGraph`.
    pub fn blocks(&self) -> Vec<&Block> {
        self.graph.vertices()
    }

    /// Get every `Edge` from one `Block` to another.
    ///
    /// A branch whose targets agree, or a block falling through into its
    /// own handler, joins two blocks by more than one edge.
    pub fn edges_between(&self, head: usize, tail: usize) -> Result<&[Edge], Error> {
        self.graph.edges_between(head, tail)
    }

    /// Get every `Edge` in this `ControlFlowGraph`.
    pub fn edges(&self) -> Vec<&Edge> {
        self.graph.edges()
    }

    /// Get every incoming edge to a block
    pub fn edges_in(&self, index: usize) -> Result<Vec<&Edge>, Error> {
        self.graph.edges_in(index)
    }

    /// Get every outgoing edge from a block
    pub fn edges_out(&self, index: usize) -> Result<Vec<&Edge>, Error> {
        self.graph.edges_out(index)
    }

    /// Get the indices of every predecessor of a `Block` in this `ControlFlowGraph`.
    pub fn predecessor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.graph.predecessor_indices(index)
    }

    /// Get the indices of every successor of a `Block` in this `ControlFlowGraph`.
    pub fn successor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.graph.successor_indices(index)
    }

    /// Creates a new basic block, adds it to the graph, and returns it
    pub fn new_block(&mut self) -> Result<&mut Block, Error> {
        let next_index = self.next_index;
        self.next_index += 1;
        let block = Block::new(next_index);
        self.graph.insert_vertex(block)?;
        self.block_mut(next_index)
    }

    /// Creates an unconditional edge from one block to another block
    pub fn unconditional_edge(&mut self, head: usize, tail: usize) -> Result<(), Error> {
        self.graph
            .insert_edge(Edge::new(head, tail, EdgeKind::Unconditional))
    }

    /// Creates the edge taken when the condition ending `head` holds.
    pub fn true_edge(&mut self, head: usize, tail: usize) -> Result<(), Error> {
        self.graph.insert_edge(Edge::new(head, tail, EdgeKind::True))
    }

    /// Creates the edge taken when the condition ending `head` does not hold.
    pub fn false_edge(&mut self, head: usize, tail: usize) -> Result<(), Error> {
        self.graph.insert_edge(Edge::new(head, tail, EdgeKind::False))
    }

    /// Creates the pair of edges leaving a branch block.
    pub fn branch(&mut self, head: usize, true_tail: usize, false_tail: usize) -> Result<(), Error> {
        self.true_edge(head, true_tail)?;
        self.false_edge(head, false_tail)
    }

    /// Creates an edge taken when `head` exits abruptly.
    pub fn exceptional_edge(&mut self, head: usize, tail: usize) -> Result<(), Error> {
        self.graph
            .insert_edge(Edge::new(head, tail, EdgeKind::Exceptional))
    }

    /// Returns true if the block at `index` leaves through a `True`/`False` pair.
    pub fn is_branch(&self, index: usize) -> Result<bool, Error> {
        Ok(self
            .edges_out(index)?
            .iter()
            .any(|edge| edge.kind().is_branch()))
    }

    /// The instruction deciding the branch at the end of a branch block.
    ///
    /// Returns `None` for blocks which are not branch blocks.
    pub fn branch_condition(&self, index: usize) -> Result<Option<&Instruction>, Error> {
        if !self.is_branch(index)? {
            return Ok(None);
        }
        Ok(self.block(index)?.last_instruction())
    }

    /// Computes the loops reachable from the entry block.
    ///
    /// Irreducible cycles are included, headed by the block a depth first
    /// walk from the entry reaches first.
    pub fn loops(&self) -> Result<Vec<graph::Loop>, Error> {
        let entry = self.entry.ok_or(Error::ControlFlowGraphEntryNotFound)?;
        self.graph.compute_loops(entry)
    }

    /// Ensures this `ControlFlowGraph` has a shape the engine can explore.
    ///
    /// # Errors
    /// `Error::Unsupported` naming the first malformed block.
    pub fn validate(&self) -> Result<(), Error> {
        if self.entry.is_none() {
            return Err(Error::Unsupported("no entry block".to_string()));
        }

        for block in self.blocks() {
            let edges = self.edges_out(block.index())?;
            let count = |kind: EdgeKind| edges.iter().filter(|edge| edge.kind() == kind).count();
            let unconditional = count(EdgeKind::Unconditional);
            let true_edges = count(EdgeKind::True);
            let false_edges = count(EdgeKind::False);

            if unconditional > 1 {
                return Err(Error::Unsupported(format!(
                    "block 0x{:X} has {} unconditional successors",
                    block.index(),
                    unconditional
                )));
            }
            if true_edges + false_edges == 0 {
                continue;
            }
            if unconditional > 0 || true_edges != 1 || false_edges != 1 {
                return Err(Error::Unsupported(format!(
                    "block 0x{:X} must branch through exactly one true and one false edge",
                    block.index()
                )));
            }
            match block.last_instruction() {
                Some(condition) if condition.operation().pushes_value() => {}
                _ => {
                    return Err(Error::Unsupported(format!(
                        "branch block 0x{:X} does not end with a condition",
                        block.index()
                    )))
                }
            }
        }

        Ok(())
    }

    /// Returns a string in the graphviz format
    pub fn dot_graph(&self) -> String {
        self.graph.dot_graph()
    }
}

impl fmt::Display for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for block in self.blocks() {
            writeln!(f, "{}", block)?;
        }
        for edge in self.edges() {
            writeln!(f, "edge {}", edge)?;
        }
        Ok(())
    }
}
