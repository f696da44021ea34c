//! A `Block` is a linear sequence of `Instruction`.
//!
//! Create blocks with `ControlFlowGraph::new_block`, then append instructions
//! with the builder methods below, in evaluation order.

use crate::il::*;
use crate::{graph, Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A basic block in Heron IL.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Block {
    index: usize,
    instructions: Vec<Instruction>,
}

impl Block {
    pub(crate) fn new(index: usize) -> Block {
        Block {
            index,
            instructions: Vec::new(),
        }
    }

    /// The index of this block in its `ControlFlowGraph`.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    /// Get an instruction by its offset in this block.
    pub fn instruction(&self, offset: usize) -> Result<&Instruction, Error> {
        self.instructions
            .get(offset)
            .ok_or(Error::InstructionNotFound(self.index, offset))
    }

    pub fn last_instruction(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Append an instruction and return a mutable reference to it.
    pub fn push(&mut self, node: NodeId, operation: Operation) -> &mut Instruction {
        self.instructions.push(Instruction::new(node, operation));
        let offset = self.instructions.len() - 1;
        &mut self.instructions[offset]
    }

    pub fn identifier(&mut self, node: NodeId) -> &mut Instruction {
        self.push(node, Operation::Identifier)
    }

    pub fn assign(&mut self, node: NodeId) -> &mut Instruction {
        self.push(node, Operation::Assign)
    }

    pub fn literal(&mut self, node: NodeId, constant: Constant) -> &mut Instruction {
        self.push(node, Operation::Literal(constant))
    }

    pub fn null(&mut self, node: NodeId) -> &mut Instruction {
        self.literal(node, Constant::Null)
    }

    pub fn this(&mut self, node: NodeId) -> &mut Instruction {
        self.push(node, Operation::This)
    }

    pub fn object_creation(&mut self, node: NodeId, arguments: Vec<NodeId>) -> &mut Instruction {
        self.push(node, Operation::ObjectCreation { arguments })
    }

    pub fn array_creation(&mut self, node: NodeId, dimensions: Vec<NodeId>) -> &mut Instruction {
        self.push(node, Operation::ArrayCreation { dimensions })
    }

    /// An invocation on a receiver pushed before the arguments.
    pub fn invocation(&mut self, node: NodeId, arguments: Vec<NodeId>) -> &mut Instruction {
        self.push(
            node,
            Operation::Invocation {
                arguments,
                has_receiver: true,
            },
        )
    }

    pub fn static_invocation(&mut self, node: NodeId, arguments: Vec<NodeId>) -> &mut Instruction {
        self.push(
            node,
            Operation::Invocation {
                arguments,
                has_receiver: false,
            },
        )
    }

    pub fn member_access(&mut self, node: NodeId) -> &mut Instruction {
        self.push(node, Operation::MemberAccess)
    }

    pub fn binary(&mut self, node: NodeId, operator: BinaryOperator) -> &mut Instruction {
        self.push(node, Operation::Binary(operator))
    }

    pub fn logical_not(&mut self, node: NodeId) -> &mut Instruction {
        self.push(node, Operation::LogicalNot)
    }

    pub fn pop(&mut self, node: NodeId) -> &mut Instruction {
        self.push(node, Operation::Pop)
    }

    pub fn ret(&mut self, node: NodeId, has_value: bool) -> &mut Instruction {
        self.push(node, Operation::Return { has_value })
    }

    pub fn throw(&mut self, node: NodeId) -> &mut Instruction {
        self.push(node, Operation::Throw)
    }
}

impl graph::Vertex for Block {
    fn index(&self) -> usize {
        self.index
    }

    fn dot_label(&self) -> String {
        format!("{}", self)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[ Block: 0x{:X} ]", self.index)?;
        for instruction in self.instructions() {
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}
