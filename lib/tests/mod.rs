//! End-to-end exploration scenarios.

use crate::checks::{CheckRegistry, CollectingSink, Diagnostic};
use crate::il::*;
use crate::symbolic::{analyze_procedure, Config, Exploration};

mod exploration;

/// Builds procedures instruction by instruction, recording what each node
/// resolves to in a shared `SemanticTable`.
pub(crate) struct Fixture {
    control_flow_graph: ControlFlowGraph,
    semantic: SemanticTable,
    next_node: u32,
}

impl Fixture {
    pub fn new() -> Fixture {
        Fixture {
            control_flow_graph: ControlFlowGraph::new(),
            semantic: SemanticTable::new(),
            next_node: 0,
        }
    }

    pub fn semantic(&self) -> &SemanticTable {
        &self.semantic
    }

    pub fn block(&mut self) -> usize {
        self.control_flow_graph.new_block().unwrap().index()
    }

    fn emit(&mut self, block: usize, operation: Operation) -> NodeId {
        self.next_node += 1;
        let node = NodeId::new(self.next_node);
        self.control_flow_graph
            .block_mut(block)
            .unwrap()
            .push(node, operation)
            .set_span(Some(Span::new(self.next_node, 1)));
        node
    }

    pub fn read(&mut self, block: usize, symbol: &Symbol) -> NodeId {
        let node = self.emit(block, Operation::Identifier);
        self.semantic.insert_symbol(node, symbol.clone());
        node
    }

    pub fn write(&mut self, block: usize, symbol: &Symbol) -> NodeId {
        let node = self.emit(block, Operation::Assign);
        self.semantic.insert_symbol(node, symbol.clone());
        node
    }

    pub fn null(&mut self, block: usize) -> NodeId {
        self.emit(block, Operation::Literal(Constant::Null))
    }

    pub fn integer(&mut self, block: usize, value: i64) -> NodeId {
        let node = self.emit(block, Operation::Literal(Constant::Integer(value)));
        self.semantic.insert_constant(node, Constant::Integer(value));
        node
    }

    pub fn compare(&mut self, block: usize, operator: BinaryOperator) -> NodeId {
        self.emit(block, Operation::Binary(operator))
    }

    pub fn member(&mut self, block: usize) -> NodeId {
        self.emit(block, Operation::MemberAccess)
    }

    pub fn call(&mut self, block: usize, method: MethodRef, arguments: Vec<NodeId>) -> NodeId {
        let node = self.emit(
            block,
            Operation::Invocation {
                arguments,
                has_receiver: true,
            },
        );
        self.semantic.insert_method(node, method);
        node
    }

    pub fn call_static(&mut self, block: usize, method: MethodRef, arguments: Vec<NodeId>) -> NodeId {
        let node = self.emit(
            block,
            Operation::Invocation {
                arguments,
                has_receiver: false,
            },
        );
        self.semantic.insert_method(node, method);
        node
    }

    pub fn create(&mut self, block: usize, type_name: &str, arguments: Vec<NodeId>) -> NodeId {
        let node = self.emit(block, Operation::ObjectCreation { arguments });
        self.semantic
            .insert_method(node, MethodRef::constructor(type_name));
        self.semantic.insert_type(node, type_name);
        node
    }

    /// `new byte[size]`
    pub fn create_array(&mut self, block: usize, size: i64) -> NodeId {
        let size = self.integer(block, size);
        let node = self.emit(
            block,
            Operation::ArrayCreation {
                dimensions: vec![size],
            },
        );
        self.semantic.insert_type(node, "byte[]");
        node
    }

    pub fn pop(&mut self, block: usize) -> NodeId {
        self.emit(block, Operation::Pop)
    }

    pub fn throw(&mut self, block: usize) -> NodeId {
        self.emit(block, Operation::Throw)
    }

    pub fn jump(&mut self, head: usize, tail: usize) {
        self.control_flow_graph
            .unconditional_edge(head, tail)
            .unwrap();
    }

    pub fn branch(&mut self, head: usize, true_tail: usize, false_tail: usize) {
        self.control_flow_graph
            .branch(head, true_tail, false_tail)
            .unwrap();
    }

    pub fn exceptional(&mut self, head: usize, tail: usize) {
        self.control_flow_graph
            .exceptional_edge(head, tail)
            .unwrap();
    }

    /// Takes the blocks built so far as a procedure entered at block 0.
    ///
    /// Node ids keep increasing, so several procedures can share the
    /// fixture's `SemanticTable`.
    pub fn procedure(&mut self, name: &str, parameters: Vec<Symbol>) -> Procedure {
        let mut control_flow_graph = std::mem::take(&mut self.control_flow_graph);
        control_flow_graph.set_entry(0).unwrap();
        Procedure::new(name, parameters, control_flow_graph)
    }
}

/// Analyzes `procedure` with the default checks.
pub(crate) fn run(
    procedure: &Procedure,
    semantic: &SemanticTable,
    config: &Config,
) -> (Exploration, Vec<Diagnostic>) {
    let sink = CollectingSink::new();
    let exploration = analyze_procedure(
        procedure,
        semantic,
        &CheckRegistry::with_default_checks(),
        config,
        &sink,
        None,
    );
    (exploration, sink.diagnostics())
}

/// Evaluates `a < b`, a condition leaving no trace in the state once branched on.
pub(crate) fn opaque_condition(fixture: &mut Fixture, block: usize) {
    let a = Symbol::parameter("a");
    let b = Symbol::parameter("b");
    fixture.read(block, &a);
    fixture.read(block, &b);
    fixture.compare(block, BinaryOperator::Relational);
}

pub(crate) fn opaque_parameters() -> Vec<Symbol> {
    vec![Symbol::parameter("a"), Symbol::parameter("b")]
}
