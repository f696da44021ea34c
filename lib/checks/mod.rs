//! Checks observing an exploration.
//!
//! A `Check` declares the `InstructionKinds` it is interested in and is
//! called before and after each such instruction is executed. Hooks receive
//! the `ProgramState` by value and return the state exploration continues
//! with, or `None` to end the path.
//!
//! Checks are created for one run by a `CheckRegistry` and must keep no
//! memory of their own: everything a check learns about a path lives in the
//! constraints of the `ProgramState`.
//!
//! A hook returning an `Err`, or panicking, disables its check for the rest
//! of the run. Exploration continues with the state the hook was given.

mod diagnostic;
mod dispose_more_than_once;
mod null_pointer_dereference;
mod unpredictable_salt;

pub use self::diagnostic::*;
pub use self::dispose_more_than_once::DisposeMoreThanOnce;
pub use self::null_pointer_dereference::NullPointerDereference;
pub use self::unpredictable_salt::UnpredictableSalt;

use crate::il::{Instruction, InstructionKinds, MethodRef, NodeId, Operation, SemanticModel};
use crate::symbolic::{Config, ProgramPoint, ProgramState, SymbolicValue};
use crate::Error;
use log::debug;
use std::collections::BTreeMap;

pub const NULL_POINTER_DEREFERENCE: &str = "S2259";
pub const DISPOSE_MORE_THAN_ONCE: &str = "S3966";
pub const UNPREDICTABLE_SALT: &str = "S2053";

pub trait Check {
    /// The rule this check reports diagnostics for.
    fn rule_id(&self) -> &'static str;

    /// The instructions this check's hooks are called for.
    fn interests(&self) -> InstructionKinds;

    /// Called before the instruction's own effect, with its operands still on
    /// the stack.
    fn pre_process_instruction(
        &self,
        _context: &CheckContext,
        state: ProgramState,
    ) -> Result<Option<ProgramState>, Error> {
        Ok(Some(state))
    }

    /// Called after the instruction's own effect, with its result on top of
    /// the stack.
    fn post_process_instruction(
        &self,
        _context: &CheckContext,
        state: ProgramState,
    ) -> Result<Option<ProgramState>, Error> {
        Ok(Some(state))
    }
}

/// What a hook may know about the instruction being processed.
pub struct CheckContext<'a> {
    point: &'a ProgramPoint,
    instruction: &'a Instruction,
    semantic: &'a dyn SemanticModel,
    reporter: &'a Reporter,
    rule_id: &'static str,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        point: &'a ProgramPoint,
        instruction: &'a Instruction,
        semantic: &'a dyn SemanticModel,
        reporter: &'a Reporter,
        rule_id: &'static str,
    ) -> CheckContext<'a> {
        CheckContext {
            point,
            instruction,
            semantic,
            reporter,
            rule_id,
        }
    }

    pub fn point(&self) -> &ProgramPoint {
        self.point
    }

    pub fn instruction(&self) -> &Instruction {
        self.instruction
    }

    pub fn node(&self) -> NodeId {
        self.instruction.node()
    }

    pub fn semantic(&self) -> &dyn SemanticModel {
        self.semantic
    }

    /// The method the current invocation or object creation binds to.
    pub fn method(&self) -> Option<MethodRef> {
        self.semantic.method(self.instruction.node())
    }

    fn argument_nodes(&self) -> &[NodeId] {
        match *self.instruction.operation() {
            Operation::ObjectCreation { ref arguments }
            | Operation::Invocation { ref arguments, .. } => arguments.as_slice(),
            Operation::ArrayCreation { ref dimensions } => dimensions.as_slice(),
            _ => &[],
        }
    }

    /// The syntax node of argument `index`.
    pub fn argument_node(&self, index: usize) -> Option<NodeId> {
        self.argument_nodes().get(index).cloned()
    }

    /// The value of argument `index`, read from the stack of a state taken
    /// before the instruction executes.
    pub fn argument(&self, state: &ProgramState, index: usize) -> Option<SymbolicValue> {
        let count = self.argument_nodes().len();
        if index >= count {
            return None;
        }
        Some(state.peek_value(count - 1 - index))
    }

    /// The object dereferenced by the current invocation or member access,
    /// read from the stack of a state taken before the instruction executes.
    pub fn receiver(&self, state: &ProgramState) -> Option<SymbolicValue> {
        match *self.instruction.operation() {
            Operation::Invocation {
                ref arguments,
                has_receiver: true,
            } => Some(state.peek_value(arguments.len())),
            Operation::MemberAccess => Some(state.peek_value(0)),
            _ => None,
        }
    }

    /// Reports a diagnostic at the current instruction, keyed by its node.
    pub fn report<S: Into<String>>(&self, message: S) {
        let key = self.node().id().to_string();
        self.report_with_key(key, message)
    }

    /// Reports a diagnostic at the current instruction.
    ///
    /// Only the first diagnostic of this rule with `key` is kept.
    pub fn report_with_key<K: Into<String>, S: Into<String>>(&self, key: K, message: S) {
        let diagnostic = Diagnostic::new(
            self.rule_id,
            self.node(),
            self.instruction.span(),
            message,
            key,
        );
        if self.reporter.report(diagnostic) {
            debug!("{} reported at {}", self.rule_id, self.point);
        }
    }
}

type CheckConstructor = Box<dyn Fn() -> Box<dyn Check> + Send + Sync>;

/// Creates the checks of each run.
pub struct CheckRegistry {
    constructors: BTreeMap<&'static str, CheckConstructor>,
}

impl Default for CheckRegistry {
    fn default() -> Self {
        CheckRegistry::new()
    }
}

impl CheckRegistry {
    /// A registry without any check.
    pub fn new() -> CheckRegistry {
        CheckRegistry {
            constructors: BTreeMap::new(),
        }
    }

    /// A registry with every check shipped with Heron.
    pub fn with_default_checks() -> CheckRegistry {
        let mut registry = CheckRegistry::new();
        registry.register(NULL_POINTER_DEREFERENCE, || Box::new(NullPointerDereference));
        registry.register(DISPOSE_MORE_THAN_ONCE, || Box::new(DisposeMoreThanOnce));
        registry.register(UNPREDICTABLE_SALT, || Box::new(UnpredictableSalt));
        registry
    }

    /// Registers the constructor of the check reporting `rule_id`,
    /// replacing any previous one.
    pub fn register<F>(&mut self, rule_id: &'static str, constructor: F)
    where
        F: Fn() -> Box<dyn Check> + Send + Sync + 'static,
    {
        self.constructors.insert(rule_id, Box::new(constructor));
    }

    /// Every rule a check is registered for.
    pub fn supported_rules(&self) -> Vec<&'static str> {
        self.constructors.keys().cloned().collect()
    }

    /// Creates the checks enabled by both `config` and `sink`.
    pub fn enabled_checks(&self, config: &Config, sink: &dyn DiagnosticSink) -> Vec<Box<dyn Check>> {
        self.constructors
            .iter()
            .filter(|(rule_id, _)| config.is_check_enabled(rule_id) && sink.is_enabled(rule_id))
            .map(|(_, constructor)| constructor())
            .collect()
    }
}
