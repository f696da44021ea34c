//! The abstract state of one path through a procedure.
//!
//! A `ProgramState` is persistent. Every operation returns a new state and
//! leaves `self` untouched, and the underlying `im` collections share all
//! unaffected structure between the two.

use crate::il::Symbol;
use crate::symbolic::*;
use im::{OrdMap, Vector};
use rustc_hash::FxHashSet;
use std::fmt;

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ProgramState {
    symbols: OrdMap<Symbol, SymbolicValue>,
    stack: Vector<SymbolicValue>,
    constraints: OrdMap<SymbolicValue, ConstraintSet>,
}

impl ProgramState {
    /// An empty state: no bindings, no constraints, an empty stack.
    pub fn new() -> ProgramState {
        ProgramState::default()
    }

    /// Returns a new state with `symbol` bound to `value`.
    pub fn set_symbol_value(&self, symbol: Symbol, value: SymbolicValue) -> ProgramState {
        let mut state = self.clone();
        state.symbols.insert(symbol, value);
        state
    }

    pub fn symbol_value(&self, symbol: &Symbol) -> Option<&SymbolicValue> {
        self.symbols.get(symbol)
    }

    /// Every symbol currently bound, in order.
    pub fn symbols(&self) -> impl Iterator<Item = (&Symbol, &SymbolicValue)> {
        self.symbols.iter()
    }

    /// The symbols bound to `value`.
    pub fn symbols_bound_to(&self, value: &SymbolicValue) -> Vec<&Symbol> {
        self.symbols
            .iter()
            .filter(|(_, bound)| *bound == value)
            .map(|(symbol, _)| symbol)
            .collect()
    }

    pub fn push_value(&self, value: SymbolicValue) -> ProgramState {
        let mut state = self.clone();
        state.stack.push_back(value);
        state
    }

    /// Pops the top of the stack.
    ///
    /// Popping an empty stack yields the unknown value and an unchanged state.
    pub fn pop_value(&self) -> (SymbolicValue, ProgramState) {
        let mut state = self.clone();
        match state.stack.pop_back() {
            Some(value) => (value, state),
            None => (SymbolicValue::unknown(), state),
        }
    }

    /// Pops `count` values, returned in the order they were pushed.
    pub fn pop_values(&self, count: usize) -> (Vec<SymbolicValue>, ProgramState) {
        let mut state = self.clone();
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let (value, next) = state.pop_value();
            values.push(value);
            state = next;
        }
        values.reverse();
        (values, state)
    }

    /// The value `depth` entries below the top of the stack, without popping.
    pub fn peek_value(&self, depth: usize) -> SymbolicValue {
        if depth >= self.stack.len() {
            return SymbolicValue::unknown();
        }
        self.stack[self.stack.len() - 1 - depth].clone()
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn clear_stack(&self) -> ProgramState {
        let mut state = self.clone();
        state.stack = Vector::new();
        state
    }

    /// The member of `domain` held by `value`, if any.
    pub fn constraint(&self, value: &SymbolicValue, domain: ConstraintDomain) -> Option<Constraint> {
        value
            .intrinsic_constraint(domain)
            .or_else(|| self.constraints.get(value).and_then(|set| set.get(domain)))
    }

    pub fn has_constraint(&self, value: &SymbolicValue, constraint: Constraint) -> bool {
        self.constraint(value, constraint.domain()) == Some(constraint)
    }

    /// Every constraint stored for `value`.
    pub fn constraints(&self, value: &SymbolicValue) -> ConstraintSet {
        self.constraints.get(value).copied().unwrap_or_default()
    }

    /// Asserts `constraint` on `value`.
    ///
    /// Returns `None` when `value` already holds a different member of the
    /// same domain: the path is infeasible. Boolean constraints on derived
    /// values are propagated to their operands, which may also conflict.
    /// Constraints on the unknown value are ignored.
    pub fn set_constraint(
        &self,
        value: &SymbolicValue,
        constraint: Constraint,
    ) -> Option<ProgramState> {
        if value.is_unknown() {
            return Some(self.clone());
        }
        match self.constraint(value, constraint.domain()) {
            Some(existing) if existing == constraint => return Some(self.clone()),
            Some(_) => return None,
            None => {}
        }

        let mut state = self.clone();
        let set = state.constraints(value).with(constraint);
        state.constraints.insert(value.clone(), set);

        match constraint {
            Constraint::Bool(b) => state.propagate_bool(value, b),
            _ => Some(state),
        }
    }

    fn propagate_bool(self, value: &SymbolicValue, b: BoolConstraint) -> Option<ProgramState> {
        match *value.kind() {
            ValueKind::Not(ref operand) => self.set_constraint(operand, b.opposite().into()),
            ValueKind::Equal(ref left, ref right) => {
                self.propagate_equality(left, right, b == BoolConstraint::True)
            }
            ValueKind::NotEqual(ref left, ref right) => {
                self.propagate_equality(left, right, b == BoolConstraint::False)
            }
            _ => Some(self),
        }
    }

    fn propagate_equality(
        self,
        left: &SymbolicValue,
        right: &SymbolicValue,
        equal: bool,
    ) -> Option<ProgramState> {
        let mut state = self;
        for (from, to) in [(left, right), (right, left)] {
            if let Some(Constraint::Nullability(n)) =
                state.constraint(from, ConstraintDomain::Nullability)
            {
                if equal {
                    state = state.set_constraint(to, n.into())?;
                } else if n == Nullability::Null {
                    state = state.set_constraint(to, Nullability::NotNull.into())?;
                }
            }
            if let Some(Constraint::Bool(b)) = state.constraint(from, ConstraintDomain::Bool) {
                let implied = if equal { b } else { b.opposite() };
                state = state.set_constraint(to, implied.into())?;
            }
        }
        Some(state)
    }

    /// Records `constraint` on `value`, overwriting any member of its domain.
    pub fn replace_constraint(&self, value: &SymbolicValue, constraint: Constraint) -> ProgramState {
        if value.is_unknown() {
            return self.clone();
        }
        let mut state = self.clone();
        let set = state.constraints(value).with(constraint);
        state.constraints.insert(value.clone(), set);
        state
    }

    pub fn remove_constraint(&self, value: &SymbolicValue, domain: ConstraintDomain) -> ProgramState {
        let set = match self.constraints.get(value) {
            Some(set) => set.without(domain),
            None => return self.clone(),
        };
        let mut state = self.clone();
        if set.is_empty() {
            state.constraints.remove(value);
        } else {
            state.constraints.insert(value.clone(), set);
        }
        state
    }

    /// Drops every constraint stored for `value`.
    pub fn remove_constraints(&self, value: &SymbolicValue) -> ProgramState {
        if !self.constraints.contains_key(value) {
            return self.clone();
        }
        let mut state = self.clone();
        state.constraints.remove(value);
        state
    }

    /// Values reachable from the symbol table or the stack, including the
    /// operands of derived values.
    fn reachable_values(&self) -> FxHashSet<SymbolicValue> {
        let mut reachable: FxHashSet<SymbolicValue> = FxHashSet::default();
        let mut queue: Vec<&SymbolicValue> = self
            .symbols
            .values()
            .chain(self.stack.iter())
            .collect();

        while let Some(value) = queue.pop() {
            if reachable.insert(value.clone()) {
                queue.extend(value.operands());
            }
        }

        reachable
    }

    /// Drops constraints of values no longer reachable from this state.
    ///
    /// Such constraints can never be observed again, and keeping them would
    /// make otherwise equal states differ.
    pub fn clean(&self) -> ProgramState {
        let reachable = self.reachable_values();
        let unreachable: Vec<SymbolicValue> = self
            .constraints
            .keys()
            .filter(|value| !reachable.contains(*value))
            .cloned()
            .collect();
        if unreachable.is_empty() {
            return self.clone();
        }

        let mut state = self.clone();
        for value in unreachable {
            state.constraints.remove(&value);
        }
        state
    }
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbols = self
            .symbols
            .iter()
            .map(|(symbol, value)| format!("{}={}", symbol, value))
            .collect::<Vec<String>>();
        let stack = self
            .stack
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<String>>();
        let constraints = self
            .constraints
            .iter()
            .map(|(value, set)| format!("{}:{}", value, set))
            .collect::<Vec<String>>();
        write!(
            f,
            "symbols [{}] stack [{}] constraints [{}]",
            symbols.join(", "),
            stack.join(", "),
            constraints.join(", ")
        )
    }
}
