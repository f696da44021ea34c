//! An `Instruction` is one evaluated syntax node inside a `Block`.

use crate::il::*;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the syntax node an instruction was built from.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(id: u32) -> NodeId {
        NodeId(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source position of a node, reported with diagnostics.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Span {
        Span { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

bitflags! {
    /// Instruction shapes a check wants to observe.
    #[derive(Deserialize, Serialize)]
    pub struct InstructionKinds: u32 {
        const NONE            = 0;
        const IDENTIFIER      = 1 << 0;
        const ASSIGN          = 1 << 1;
        const LITERAL         = 1 << 2;
        const THIS            = 1 << 3;
        const OBJECT_CREATION = 1 << 4;
        const ARRAY_CREATION  = 1 << 5;
        const INVOCATION      = 1 << 6;
        const MEMBER_ACCESS   = 1 << 7;
        const BINARY          = 1 << 8;
        const LOGICAL_NOT     = 1 << 9;
        const POP             = 1 << 10;
        const RETURN          = 1 << 11;
        const THROW           = 1 << 12;
        const ALL             = (1 << 13) - 1;
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Instruction {
    node: NodeId,
    operation: Operation,
    #[serde(default)]
    span: Option<Span>,
}

impl Instruction {
    pub fn new(node: NodeId, operation: Operation) -> Instruction {
        Instruction {
            node,
            operation,
            span: None,
        }
    }

    /// The syntax node this instruction evaluates.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn kind(&self) -> InstructionKinds {
        self.operation.kind()
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    pub fn set_span(&mut self, span: Option<Span>) {
        self.span = span;
    }

    pub fn is_invocation(&self) -> bool {
        matches!(self.operation, Operation::Invocation { .. })
    }

    pub fn is_member_access(&self) -> bool {
        matches!(self.operation, Operation::MemberAccess)
    }

    /// Returns true if this instruction ends a path through the procedure.
    pub fn is_exit(&self) -> bool {
        matches!(self.operation, Operation::Return { .. } | Operation::Throw)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.node, self.operation)?;
        if let Some(span) = self.span {
            write!(f, " @ {}", span)?;
        }
        Ok(())
    }
}
