//! Symbolic execution of procedures.
//!
//! The engine walks a `ControlFlowGraph` keeping, for each explored path, a
//! `ProgramState`: an evaluation stack and a symbol table of
//! `SymbolicValue`s, and the `Constraint`s known about those values.
//!
//! * `SymbolicValue`s are opaque identities created by a per-run
//! `ValueFactory`.
//! * `Constraint`s belong to a `ConstraintDomain`. A value holds at most one
//! member of each domain, and asserting a second one makes the path
//! infeasible.
//! * The `ExplodedGraph` drives exploration, deduplicates equal states,
//! widens loops and calls the hooks of the enabled checks.
//! * `analyze_procedure` and `analyze_procedures` run explorations and
//! deliver diagnostics to a `DiagnosticSink`.

mod config;
mod constraint;
mod driver;
mod effect;
mod exploded_graph;
mod program_point;
mod program_state;
mod value;

pub use self::config::*;
pub use self::constraint::*;
pub use self::driver::*;
pub use self::effect::*;
pub use self::exploded_graph::*;
pub use self::program_point::*;
pub use self::program_state::*;
pub use self::value::*;
