//! Heron Intermediate Language.
//!
//! Heron IL is the uniform shape in which a front end hands a procedure body
//! to the engine. It is not meant to capture full language semantics, only
//! the evaluation order of the syntax nodes that matter to symbolic
//! execution.
//!
//! # Components of the IL
//!
//! ## `Instruction` and `Operation`
//!
//! An `Instruction` is one evaluated syntax node. It carries the `NodeId` of
//! that node, an optional source `Span`, and an `Operation` drawn from a
//! closed set: identifiers, assignments, literals, object and array creation,
//! invocations, member access, binary comparisons, logical not, pop, return
//! and throw. Operations read and write an evaluation stack, operands first.
//!
//! ## `Block`, `Edge` and `ControlFlowGraph`
//!
//! A `Block` is a linear list of instructions. Blocks are connected by
//! `Edge`s of an `EdgeKind`: a block has no successor, one `Unconditional`
//! successor, or a `True`/`False` pair. The last instruction of a branch
//! block computes the condition. `Exceptional` edges may be added to any
//! block for thrown exceptions and abrupt exits.
//!
//! ## `Procedure`
//!
//! A `ControlFlowGraph` with a name and the parameter symbols bound on entry.
//!
//! ## `SemanticModel`
//!
//! Symbols, types, methods and constant values are never computed by the
//! engine. They are queried by `NodeId` from a `SemanticModel`. A
//! `SemanticTable` implements it over plain maps.
//!
//! # Building a procedure
//!
//! ```
//! use heron::il::*;
//!
//! // if (x == null) { } else { }
//! let mut control_flow_graph = ControlFlowGraph::new();
//!
//! let head = {
//!     let block = control_flow_graph.new_block().unwrap();
//!     block.identifier(NodeId::new(1));
//!     block.null(NodeId::new(2));
//!     block.binary(NodeId::new(3), BinaryOperator::Equals);
//!     block.index()
//! };
//! let then_index = control_flow_graph.new_block().unwrap().index();
//! let else_index = control_flow_graph.new_block().unwrap().index();
//!
//! control_flow_graph.set_entry(head).unwrap();
//! control_flow_graph.branch(head, then_index, else_index).unwrap();
//!
//! let procedure = Procedure::new("f", vec![Symbol::parameter("x")], control_flow_graph);
//! assert!(procedure.validate().is_ok());
//! ```

mod block;
mod control_flow_graph;
mod edge;
mod instruction;
mod operation;
mod procedure;
mod semantic;

pub use self::block::*;
pub use self::control_flow_graph::*;
pub use self::edge::*;
pub use self::instruction::*;
pub use self::operation::*;
pub use self::procedure::*;
pub use self::semantic::*;
