//! The closed set of instruction shapes the engine understands.
//!
//! Front ends resolve every syntax node to one `Operation` once, so the
//! driver dispatches with a single `match` instead of inspecting node kinds.
//!
//! Operations work on an evaluation stack. Operands are pushed left to right
//! before the operation consuming them, so the receiver of an invocation is
//! deepest and its last argument is on top.

use crate::il::{Constant, InstructionKinds, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The comparison or arithmetic performed by an `Operation::Binary`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum BinaryOperator {
    Equals,
    NotEquals,
    /// `<`, `<=`, `>` and `>=`
    Relational,
    Arithmetic,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            BinaryOperator::Equals => write!(f, "=="),
            BinaryOperator::NotEquals => write!(f, "!="),
            BinaryOperator::Relational => write!(f, "<=>"),
            BinaryOperator::Arithmetic => write!(f, "+-*/"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Operation {
    /// Push the value of the symbol this node resolves to.
    Identifier,
    /// Pop a value and bind it to the symbol this node resolves to.
    Assign,
    /// Push a literal.
    Literal(Constant),
    /// Push `this`.
    This,
    /// Pop the constructor arguments and push the new object.
    ObjectCreation { arguments: Vec<NodeId> },
    /// Pop the dimension sizes and push the new array.
    ArrayCreation { dimensions: Vec<NodeId> },
    /// Pop the arguments, then the receiver if there is one, and push the result.
    Invocation {
        arguments: Vec<NodeId>,
        has_receiver: bool,
    },
    /// Pop an object and push the member read from it.
    MemberAccess,
    /// Pop the right then the left operand and push the result.
    Binary(BinaryOperator),
    /// Pop a boolean and push its negation.
    LogicalNot,
    /// Discard the top of the stack.
    Pop,
    /// Leave the procedure, popping the returned value if there is one.
    Return { has_value: bool },
    /// Pop the thrown exception.
    Throw,
}

impl Operation {
    /// The single `InstructionKinds` flag for this operation.
    pub fn kind(&self) -> InstructionKinds {
        match *self {
            Operation::Identifier => InstructionKinds::IDENTIFIER,
            Operation::Assign => InstructionKinds::ASSIGN,
            Operation::Literal(_) => InstructionKinds::LITERAL,
            Operation::This => InstructionKinds::THIS,
            Operation::ObjectCreation { .. } => InstructionKinds::OBJECT_CREATION,
            Operation::ArrayCreation { .. } => InstructionKinds::ARRAY_CREATION,
            Operation::Invocation { .. } => InstructionKinds::INVOCATION,
            Operation::MemberAccess => InstructionKinds::MEMBER_ACCESS,
            Operation::Binary(_) => InstructionKinds::BINARY,
            Operation::LogicalNot => InstructionKinds::LOGICAL_NOT,
            Operation::Pop => InstructionKinds::POP,
            Operation::Return { .. } => InstructionKinds::RETURN,
            Operation::Throw => InstructionKinds::THROW,
        }
    }

    /// How many values this operation pops from the stack.
    pub fn operand_count(&self) -> usize {
        match *self {
            Operation::Identifier | Operation::Literal(_) | Operation::This => 0,
            Operation::Assign
            | Operation::MemberAccess
            | Operation::LogicalNot
            | Operation::Pop
            | Operation::Throw => 1,
            Operation::Binary(_) => 2,
            Operation::ObjectCreation { ref arguments } => arguments.len(),
            Operation::ArrayCreation { ref dimensions } => dimensions.len(),
            Operation::Invocation {
                ref arguments,
                has_receiver,
            } => arguments.len() + usize::from(has_receiver),
            Operation::Return { has_value } => usize::from(has_value),
        }
    }

    /// Returns true if this operation yields a value onto the stack.
    pub fn pushes_value(&self) -> bool {
        !matches!(
            *self,
            Operation::Assign | Operation::Pop | Operation::Return { .. } | Operation::Throw
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Operation::Identifier => write!(f, "identifier"),
            Operation::Assign => write!(f, "assign"),
            Operation::Literal(ref constant) => write!(f, "literal {}", constant),
            Operation::This => write!(f, "this"),
            Operation::ObjectCreation { ref arguments } => write!(f, "new({})", arguments.len()),
            Operation::ArrayCreation { ref dimensions } => {
                write!(f, "new[{}]", dimensions.len())
            }
            Operation::Invocation {
                ref arguments,
                has_receiver,
            } => {
                if has_receiver {
                    write!(f, "call instance({})", arguments.len())
                } else {
                    write!(f, "call static({})", arguments.len())
                }
            }
            Operation::MemberAccess => write!(f, "member"),
            Operation::Binary(operator) => write!(f, "binary {}", operator),
            Operation::LogicalNot => write!(f, "not"),
            Operation::Pop => write!(f, "pop"),
            Operation::Return { has_value } => {
                if has_value {
                    write!(f, "return value")
                } else {
                    write!(f, "return")
                }
            }
            Operation::Throw => write!(f, "throw"),
        }
    }
}
