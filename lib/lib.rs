//! Heron: symbolic execution over procedure control flow graphs.
//!
//! Heron explores every feasible path through the control flow graph of a
//! single procedure, tracking an abstract `ProgramState` at each program
//! point. Pluggable checks observe the exploration and report defects such as
//! null dereferences, double disposal or predictable cryptographic salts.
//!
//! # Components
//!
//! * `il` - The program representation handed to the engine: a
//! `ControlFlowGraph` of `Block`s holding `Instruction`s, and the
//! `SemanticModel` answering symbol and type queries for syntax nodes.
//! * `symbolic` - Symbolic values, constraints, `ProgramState` and the
//! `ExplodedGraph` worklist driver.
//! * `checks` - The `Check` plugin contract, the rules shipped with Heron and
//! the diagnostic sink.
//! * `graph` - A directed graph with the dominator and loop computations the
//! engine relies on.
//!
//! # Analyzing a procedure
//!
//! ```
//! use heron::checks::{CheckRegistry, CollectingSink};
//! use heron::il;
//! use heron::symbolic::{analyze_procedure, AnalysisStatus, Config};
//!
//! let mut control_flow_graph = il::ControlFlowGraph::new();
//! let entry = control_flow_graph.new_block().unwrap().index();
//! control_flow_graph.set_entry(entry).unwrap();
//!
//! let procedure = il::Procedure::new("empty", Vec::new(), control_flow_graph);
//! let semantic = il::SemanticTable::new();
//! let sink = CollectingSink::new();
//!
//! let exploration = analyze_procedure(
//!     &procedure,
//!     &semantic,
//!     &CheckRegistry::with_default_checks(),
//!     &Config::default(),
//!     &sink,
//!     None,
//! );
//! assert_eq!(exploration.status(), &AnalysisStatus::Completed);
//! ```

pub mod checks;
mod error;
pub mod graph;
pub mod il;
pub mod symbolic;
#[cfg(test)]
mod tests;

pub use error::Error;

#[cfg(not(feature = "thread_safe"))]
pub use std::rc::Rc as RC;
#[cfg(feature = "thread_safe")]
pub use std::sync::Arc as RC;
