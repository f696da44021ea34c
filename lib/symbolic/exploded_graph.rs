//! The worklist exploration of one procedure.
//!
//! An `ExplodedGraph` explores a `Procedure` breadth first. Each node pairs a
//! `ProgramPoint` at the start of a block with the `ProgramState` reaching
//! it. Processing a node executes the whole block, calling the hooks of every
//! interested check around each instruction, and enqueues one node per
//! feasible outgoing edge. A `Throw` ends the block early and only follows
//! its `Exceptional` edges.
//!
//! Exploration is bounded three ways:
//!
//! * A node already visited in this run is never enqueued again.
//! * Entering a loop header more than `Config::loop_visit_limit` times widens
//! the state, rebinding the symbols assigned in the loop to one canonical
//! value per loop and symbol. Every cycle has a header, irreducible ones
//! included, so every cycle is eventually widened.
//! * Executing more than `Config::max_steps` instructions abandons the run.

use crate::checks::{Check, CheckContext, Diagnostic, Reporter};
use crate::il::*;
use crate::symbolic::*;
use crate::Error;
use log::{debug, trace, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};

/// Counters describing one run.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Statistics {
    /// Instructions executed.
    pub steps: usize,
    /// Nodes enqueued.
    pub nodes: usize,
    /// Successors dropped because an equal node was already visited.
    pub deduplicated: usize,
    /// Transitions pruned by a constraint conflict or a check.
    pub infeasible: usize,
    /// Times a loop header state was widened.
    pub widenings: usize,
    /// Symbolic values created.
    pub values: usize,
    /// Nodes enqueued per block.
    pub nodes_per_block: BTreeMap<usize, usize>,
}

impl Statistics {
    /// How many nodes were created at the start of `block`.
    pub fn nodes_in_block(&self, block: usize) -> usize {
        self.nodes_per_block.get(&block).cloned().unwrap_or(0)
    }
}

/// How a run ended early.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum IncompleteReason {
    StepBudgetExceeded,
    Cancelled,
}

/// The outcome of exploring a procedure.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum AnalysisStatus {
    /// Every feasible path was explored, modulo widening.
    Completed,
    /// The run was abandoned. Its diagnostics are discarded.
    Incomplete(IncompleteReason),
    /// The procedure could not be explored.
    Skipped(String),
}

#[derive(Clone, Copy)]
enum Hook {
    Pre,
    Post,
}

struct CheckSlot {
    check: Box<dyn Check>,
    enabled: bool,
}

enum Step {
    Continue,
    BudgetExceeded,
}

pub struct ExplodedGraph<'a> {
    procedure: &'a Procedure,
    semantic: &'a dyn SemanticModel,
    effects: &'a EffectRegistry,
    config: &'a Config,
    cancellation: Option<&'a CancellationToken>,
    checks: Vec<CheckSlot>,
    factory: ValueFactory,
    reporter: Reporter,
    worklist: VecDeque<ExplodedGraphNode>,
    visited: FxHashSet<ExplodedGraphNode>,
    // Loop header -> symbols assigned anywhere in the loop.
    loop_assignments: BTreeMap<usize, BTreeSet<Symbol>>,
    header_visits: FxHashMap<usize, usize>,
    statistics: Statistics,
}

impl<'a> ExplodedGraph<'a> {
    /// Prepares the exploration of `procedure`.
    ///
    /// # Errors
    /// `Error::Unsupported` if the procedure's `ControlFlowGraph` is malformed.
    pub fn new(
        procedure: &'a Procedure,
        semantic: &'a dyn SemanticModel,
        effects: &'a EffectRegistry,
        config: &'a Config,
        checks: Vec<Box<dyn Check>>,
    ) -> Result<ExplodedGraph<'a>, Error> {
        procedure.validate()?;

        let control_flow_graph = procedure.control_flow_graph();
        let mut loop_assignments = BTreeMap::new();
        for lp in control_flow_graph.loops()? {
            let mut symbols = BTreeSet::new();
            for index in lp.nodes() {
                for instruction in control_flow_graph.block(*index)?.instructions() {
                    if let Operation::Assign = *instruction.operation() {
                        if let Some(symbol) = semantic.symbol(instruction.node()) {
                            symbols.insert(symbol);
                        }
                    }
                }
            }
            loop_assignments.insert(lp.header(), symbols);
        }

        Ok(ExplodedGraph {
            procedure,
            semantic,
            effects,
            config,
            cancellation: None,
            checks: checks
                .into_iter()
                .map(|check| CheckSlot {
                    check,
                    enabled: true,
                })
                .collect(),
            factory: ValueFactory::new(),
            reporter: Reporter::new(),
            worklist: VecDeque::new(),
            visited: FxHashSet::default(),
            loop_assignments,
            header_visits: FxHashMap::default(),
            statistics: Statistics::default(),
        })
    }

    /// Polls `cancellation` every time a node is taken from the worklist.
    pub fn set_cancellation(&mut self, cancellation: &'a CancellationToken) {
        self.cancellation = Some(cancellation);
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Rules whose checks are still enabled.
    pub fn enabled_rules(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|slot| slot.enabled)
            .map(|slot| slot.check.rule_id())
            .collect()
    }

    /// Consumes the graph, returning its statistics and the diagnostics
    /// reported during the run.
    pub fn finish(self) -> (Statistics, Vec<Diagnostic>) {
        let mut statistics = self.statistics;
        statistics.values = self.factory.created() as usize;
        (statistics, self.reporter.into_diagnostics())
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .map(|cancellation| cancellation.is_cancelled())
            .unwrap_or(false)
    }

    /// Explores every feasible path of the procedure.
    pub fn explore(&mut self) -> Result<AnalysisStatus, Error> {
        debug!("exploring {}", self.procedure.name());

        let entry = self
            .procedure
            .control_flow_graph()
            .entry()
            .ok_or(Error::ControlFlowGraphEntryNotFound)?;
        let mut state = ProgramState::new();
        for parameter in self.procedure.parameters() {
            state = state.set_symbol_value(parameter.clone(), self.factory.fresh());
        }
        self.enqueue(entry, state);

        while let Some(node) = self.worklist.pop_front() {
            if self.is_cancelled() {
                debug!("exploration of {} cancelled", self.procedure.name());
                return Ok(AnalysisStatus::Incomplete(IncompleteReason::Cancelled));
            }
            if let Step::BudgetExceeded = self.process(node)? {
                warn!(
                    "exploration of {} exceeded {} steps",
                    self.procedure.name(),
                    self.config.max_steps
                );
                return Ok(AnalysisStatus::Incomplete(
                    IncompleteReason::StepBudgetExceeded,
                ));
            }
        }

        debug!(
            "explored {}: {} nodes, {} steps, {} values",
            self.procedure.name(),
            self.statistics.nodes,
            self.statistics.steps,
            self.factory.created()
        );
        Ok(AnalysisStatus::Completed)
    }

    fn process(&mut self, node: ExplodedGraphNode) -> Result<Step, Error> {
        let procedure = self.procedure;
        let point = *node.point();
        let block = procedure.control_flow_graph().block(point.block())?;
        let mut state = node.into_state();

        for (offset, instruction) in block.instructions().iter().enumerate().skip(point.offset()) {
            self.statistics.steps += 1;
            if self.statistics.steps > self.config.max_steps {
                return Ok(Step::BudgetExceeded);
            }
            let point = point.with_offset(offset);
            state = match self.step(&point, instruction, state) {
                Some(state) => state,
                None => {
                    trace!("path ends at {}", point);
                    self.statistics.infeasible += 1;
                    return Ok(Step::Continue);
                }
            };
            if let Operation::Throw = *instruction.operation() {
                self.throw(block.index(), state)?;
                return Ok(Step::Continue);
            }
        }

        self.leave_block(block.index(), state)?;
        Ok(Step::Continue)
    }

    fn step(
        &mut self,
        point: &ProgramPoint,
        instruction: &Instruction,
        state: ProgramState,
    ) -> Option<ProgramState> {
        let state = self.run_checks(Hook::Pre, point, instruction, state)?;
        let state = self.execute(instruction, state);
        self.run_checks(Hook::Post, point, instruction, state)
    }

    fn run_checks(
        &mut self,
        hook: Hook,
        point: &ProgramPoint,
        instruction: &Instruction,
        state: ProgramState,
    ) -> Option<ProgramState> {
        let kind = instruction.kind();
        let mut state = state;

        for slot in self.checks.iter_mut() {
            if !slot.enabled || !slot.check.interests().intersects(kind) {
                continue;
            }

            let rule_id = slot.check.rule_id();
            let context = CheckContext::new(point, instruction, self.semantic, &self.reporter, rule_id);
            let check = &slot.check;
            let input = state.clone();
            let result = panic::catch_unwind(AssertUnwindSafe(|| match hook {
                Hook::Pre => check.pre_process_instruction(&context, input),
                Hook::Post => check.post_process_instruction(&context, input),
            }));

            match result {
                Ok(Ok(Some(next))) => state = next,
                Ok(Ok(None)) => return None,
                Ok(Err(e)) => {
                    warn!("{} disabled at {}: {}", rule_id, point, e);
                    slot.enabled = false;
                }
                Err(_) => {
                    warn!("{} disabled at {}: check panicked", rule_id, point);
                    slot.enabled = false;
                }
            }
        }

        Some(state)
    }

    /// The value of the symbol `node` resolves to, binding a fresh value to
    /// symbols read before being assigned.
    fn read_symbol(&mut self, node: NodeId, state: ProgramState) -> ProgramState {
        let symbol = match self.semantic.symbol(node) {
            Some(symbol) => symbol,
            None => return state.push_value(self.factory.fresh()),
        };
        match state.symbol_value(&symbol).cloned() {
            Some(value) => state.push_value(value),
            None => {
                let value = self.factory.fresh();
                state
                    .set_symbol_value(symbol, value.clone())
                    .push_value(value)
            }
        }
    }

    fn push_not_null(&mut self, state: ProgramState) -> ProgramState {
        let value = self.factory.fresh();
        state
            .replace_constraint(&value, Nullability::NotNull.into())
            .push_value(value)
    }

    fn execute(&mut self, instruction: &Instruction, state: ProgramState) -> ProgramState {
        let node = instruction.node();
        match *instruction.operation() {
            Operation::Identifier => self.read_symbol(node, state),
            Operation::Assign => {
                let (value, state) = state.pop_value();
                match self.semantic.symbol(node) {
                    Some(symbol) => state.set_symbol_value(symbol, value),
                    None => state,
                }
            }
            Operation::Literal(ref constant) => match *constant {
                Constant::Null => state.push_value(SymbolicValue::null()),
                Constant::Bool(value) => state.push_value(SymbolicValue::from_bool(value)),
                Constant::Integer(_) => state.push_value(self.factory.fresh()),
                Constant::String(_) => self.push_not_null(state),
            },
            Operation::This => state.push_value(SymbolicValue::this()),
            Operation::ObjectCreation { ref arguments } => {
                let (arguments, state) = state.pop_values(arguments.len());
                let result = self.factory.fresh();
                let state = match self.semantic.method(node) {
                    Some(method) => self.effects.apply(&method, None, &arguments, &result, state),
                    None => state,
                };
                state
                    .replace_constraint(&result, Nullability::NotNull.into())
                    .push_value(result)
            }
            Operation::ArrayCreation { ref dimensions } => {
                let (_, state) = state.pop_values(dimensions.len());
                self.push_not_null(state)
            }
            Operation::Invocation {
                ref arguments,
                has_receiver,
            } => {
                let (arguments, state) = state.pop_values(arguments.len());
                let (receiver, state) = if has_receiver {
                    let (receiver, state) = state.pop_value();
                    (Some(receiver), state)
                } else {
                    (None, state)
                };
                let result = self.factory.fresh();
                let state = match self.semantic.method(node) {
                    Some(method) => self.effects.apply(
                        &method,
                        receiver.as_ref(),
                        &arguments,
                        &result,
                        state,
                    ),
                    None => state,
                };
                state.push_value(result)
            }
            Operation::MemberAccess => {
                let (object, state) = state.pop_value();
                let is_field_of_this = object.is_this()
                    && self
                        .semantic
                        .symbol(node)
                        .map(|symbol| symbol.kind() == SymbolKind::Field)
                        .unwrap_or(false);
                if is_field_of_this {
                    self.read_symbol(node, state)
                } else {
                    state.push_value(self.factory.fresh())
                }
            }
            Operation::Binary(operator) => {
                let (right, state) = state.pop_value();
                let (left, state) = state.pop_value();
                let value = match operator {
                    BinaryOperator::Equals => self.factory.equal(left, right),
                    BinaryOperator::NotEquals => self.factory.not_equal(left, right),
                    BinaryOperator::Relational | BinaryOperator::Arithmetic => {
                        self.factory.fresh()
                    }
                };
                state.push_value(value)
            }
            Operation::LogicalNot => {
                let (operand, state) = state.pop_value();
                state.push_value(self.factory.not(operand))
            }
            Operation::Pop | Operation::Throw => state.pop_value().1,
            Operation::Return { has_value } => {
                if has_value {
                    state.pop_value().1
                } else {
                    state
                }
            }
        }
    }

    /// Follows only the `Exceptional` edges of `index`, with the state at the
    /// throw. A block without one leaves the procedure.
    fn throw(&mut self, index: usize, state: ProgramState) -> Result<(), Error> {
        let procedure = self.procedure;
        let state = state.clear_stack();
        for edge in procedure.control_flow_graph().edges_out(index)? {
            if edge.kind() == EdgeKind::Exceptional {
                self.enqueue(edge.tail(), state.clone());
            }
        }
        Ok(())
    }

    /// Enqueues a successor for every feasible edge out of `index`.
    ///
    /// `Exceptional` edges take the state at the end of the block. Only an
    /// explicit `Throw` hands its handlers the state at the throw itself,
    /// so exceptions raised implicitly midway through a block see the
    /// effects of the instructions after them.
    fn leave_block(&mut self, index: usize, state: ProgramState) -> Result<(), Error> {
        let procedure = self.procedure;
        let control_flow_graph = procedure.control_flow_graph();
        let edges = control_flow_graph.edges_out(index)?;

        let condition = if control_flow_graph.is_branch(index)? {
            Some(state.pop_value())
        } else {
            None
        };

        let branch_tails: Vec<usize> = edges
            .iter()
            .filter(|edge| edge.kind().is_branch())
            .map(|edge| edge.tail())
            .collect();
        // both outcomes reach one block: a plain move once the condition is popped
        let same_target = matches!(branch_tails.as_slice(), [t, f] if t == f);

        for edge in edges {
            match edge.kind() {
                EdgeKind::Unconditional => self.enqueue(edge.tail(), state.clone()),
                EdgeKind::Exceptional => self.enqueue(edge.tail(), state.clear_stack()),
                EdgeKind::True | EdgeKind::False => {
                    let (value, branch_state) = match condition {
                        Some((ref value, ref branch_state)) => (value, branch_state),
                        None => continue,
                    };
                    if same_target {
                        if edge.kind() == EdgeKind::True {
                            self.enqueue(edge.tail(), branch_state.clone());
                        }
                        continue;
                    }
                    let asserted = BoolConstraint::from(edge.kind() == EdgeKind::True);
                    match branch_state.set_constraint(value, asserted.into()) {
                        Some(next) => self.enqueue(edge.tail(), next),
                        None => {
                            trace!("edge {} is infeasible", edge);
                            self.statistics.infeasible += 1;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn widen(&mut self, header: usize, state: ProgramState) -> ProgramState {
        let mut state = state;
        if let Some(symbols) = self.loop_assignments.get(&header) {
            for symbol in symbols {
                let value = self.factory.widened(header, symbol);
                state = state
                    .set_symbol_value(symbol.clone(), value.clone())
                    .remove_constraints(&value);
            }
        }
        state.clean()
    }

    fn enqueue(&mut self, block: usize, state: ProgramState) {
        let mut state = state.clean();
        let mut visits = 0;

        if self.loop_assignments.contains_key(&block) {
            let count = self.header_visits.entry(block).or_insert(0);
            *count += 1;
            visits = *count;
            if visits > self.config.loop_visit_limit {
                trace!("widening loop 0x{:X} after {} visits", block, visits);
                state = self.widen(block, state);
                self.statistics.widenings += 1;
            }
        }

        let node = ExplodedGraphNode::new(ProgramPoint::new(block, 0, visits), state);
        if self.visited.contains(&node) {
            self.statistics.deduplicated += 1;
            return;
        }

        self.visited.insert(node.clone());
        self.statistics.nodes += 1;
        *self.statistics.nodes_per_block.entry(block).or_insert(0) += 1;
        self.worklist.push_back(node);
    }
}
