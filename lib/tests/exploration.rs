use crate::checks::{Check, CheckContext, CheckRegistry, CollectingSink};
use crate::il::*;
use crate::symbolic::*;
use crate::tests::{opaque_condition, opaque_parameters, run, Fixture};
use crate::Error;
use std::sync::{Arc, Mutex};

/// `if (x == null) { if (x == null) { } else { } } else { }`
#[test]
fn decided_condition_prunes_infeasible_branch() {
    let x = Symbol::parameter("x");
    let mut fixture = Fixture::new();

    let outer = fixture.block();
    let inner = fixture.block();
    let outer_else = fixture.block();
    let inner_then = fixture.block();
    let inner_else = fixture.block();
    let exit = fixture.block();

    fixture.read(outer, &x);
    fixture.null(outer);
    fixture.compare(outer, BinaryOperator::Equals);
    fixture.branch(outer, inner, outer_else);

    fixture.read(inner, &x);
    fixture.null(inner);
    fixture.compare(inner, BinaryOperator::Equals);
    fixture.branch(inner, inner_then, inner_else);

    fixture.jump(outer_else, exit);
    fixture.jump(inner_then, exit);
    fixture.jump(inner_else, exit);

    let procedure = fixture.procedure("prune", vec![x]);
    let (exploration, _) = run(&procedure, fixture.semantic(), &Config::default());

    assert!(exploration.is_completed());
    assert_eq!(exploration.statistics().nodes_in_block(inner_then), 1);
    assert_eq!(exploration.statistics().nodes_in_block(inner_else), 0);
    assert_eq!(exploration.statistics().nodes_in_block(outer_else), 1);
    assert_eq!(exploration.statistics().infeasible, 1);
}

fn dereference_in_branches(operator: BinaryOperator) -> (Procedure, SemanticTable, NodeId, NodeId) {
    let x = Symbol::parameter("x");
    let mut fixture = Fixture::new();

    let head = fixture.block();
    let then_block = fixture.block();
    let else_block = fixture.block();

    fixture.read(head, &x);
    fixture.null(head);
    fixture.compare(head, operator);
    fixture.branch(head, then_block, else_block);

    // x.ToString()
    fixture.read(then_block, &x);
    let then_dereference = fixture.call(then_block, MethodRef::new("Object", "ToString"), vec![]);
    fixture.pop(then_block);

    // x.Length
    fixture.read(else_block, &x);
    let else_dereference = fixture.member(else_block);
    fixture.pop(else_block);

    let procedure = fixture.procedure("dereference", vec![x]);
    let semantic = fixture.semantic().clone();
    (procedure, semantic, then_dereference, else_dereference)
}

#[test]
fn equality_with_null_asserts_null_on_true_edge() {
    let (procedure, semantic, then_dereference, _) = dereference_in_branches(BinaryOperator::Equals);

    let (exploration, diagnostics) = run(&procedure, &semantic, &Config::default());

    assert!(exploration.is_completed());
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].node(), then_dereference);
    assert_eq!(
        diagnostics[0].message(),
        "'x' is null on at least one execution path."
    );
}

#[test]
fn inequality_with_null_asserts_null_on_false_edge() {
    let (procedure, semantic, _, else_dereference) = dereference_in_branches(BinaryOperator::NotEquals);

    let (exploration, diagnostics) = run(&procedure, &semantic, &Config::default());

    assert!(exploration.is_completed());
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].node(), else_dereference);
}

/// `if (a < b) { } else { } a;`
#[test]
fn diamond_collapses_at_join() {
    let mut fixture = Fixture::new();

    let head = fixture.block();
    let left = fixture.block();
    let right = fixture.block();
    let join = fixture.block();

    opaque_condition(&mut fixture, head);
    fixture.branch(head, left, right);
    fixture.jump(left, join);
    fixture.jump(right, join);
    fixture.read(join, &Symbol::parameter("a"));
    fixture.pop(join);

    let procedure = fixture.procedure("diamond", opaque_parameters());
    let (exploration, _) = run(&procedure, fixture.semantic(), &Config::default());

    assert!(exploration.is_completed());
    assert_eq!(exploration.statistics().nodes_in_block(left), 1);
    assert_eq!(exploration.statistics().nodes_in_block(right), 1);
    assert_eq!(exploration.statistics().nodes_in_block(join), 1);
    assert_eq!(exploration.statistics().deduplicated, 1);
}

/// `if (a < b) { } a;`, both outcomes falling through to the same block
#[test]
fn branch_with_one_target_moves_unconditionally() {
    let mut fixture = Fixture::new();

    let head = fixture.block();
    let join = fixture.block();

    opaque_condition(&mut fixture, head);
    fixture.branch(head, join, join);
    fixture.read(join, &Symbol::parameter("a"));
    fixture.pop(join);

    let procedure = fixture.procedure("empty_then", opaque_parameters());
    let (exploration, _) = run(&procedure, fixture.semantic(), &Config::default());

    assert!(exploration.is_completed());
    assert_eq!(exploration.statistics().nodes_in_block(join), 1);
    assert_eq!(exploration.statistics().infeasible, 0);
    assert_eq!(exploration.statistics().deduplicated, 0);
}

/// `try { e; } catch { e; }`, the try body falling through into its handler
#[test]
fn handler_reached_by_fall_through_and_exception() {
    let e = Symbol::parameter("e");
    let mut fixture = Fixture::new();

    let body = fixture.block();
    let handler = fixture.block();

    fixture.read(body, &e);
    fixture.pop(body);
    fixture.jump(body, handler);
    fixture.exceptional(body, handler);
    fixture.read(handler, &e);
    fixture.pop(handler);

    let procedure = fixture.procedure("fall_into_handler", vec![e]);
    let (exploration, _) = run(&procedure, fixture.semantic(), &Config::default());

    assert!(exploration.is_completed());
    assert_eq!(exploration.statistics().nodes_in_block(handler), 1);
    assert_eq!(exploration.statistics().deduplicated, 1);
}

/// `i = 0; while (i < n) { i = i + 1; }`
fn counting_loop() -> (Procedure, SemanticTable, usize) {
    let i = Symbol::local("i");
    let n = Symbol::parameter("n");
    let mut fixture = Fixture::new();

    let entry = fixture.block();
    let header = fixture.block();
    let body = fixture.block();
    let exit = fixture.block();

    fixture.integer(entry, 0);
    fixture.write(entry, &i);
    fixture.jump(entry, header);

    fixture.read(header, &i);
    fixture.read(header, &n);
    fixture.compare(header, BinaryOperator::Relational);
    fixture.branch(header, body, exit);

    fixture.read(body, &i);
    fixture.integer(body, 1);
    fixture.compare(body, BinaryOperator::Arithmetic);
    fixture.write(body, &i);
    fixture.jump(body, header);

    let procedure = fixture.procedure("count", vec![n]);
    let semantic = fixture.semantic().clone();
    (procedure, semantic, header)
}

#[test]
fn loop_with_runtime_bound_terminates() {
    let (procedure, semantic, header) = counting_loop();

    let (exploration, _) = run(&procedure, &semantic, &Config::default());

    assert!(exploration.is_completed());
    // two visits below the limit, then one widened state
    assert_eq!(exploration.statistics().nodes_in_block(header), 3);
    assert_eq!(exploration.statistics().widenings, 2);
    assert!(exploration.statistics().values > 0);
}

/// `i = 0; if (a < b) goto c; b: i = i + 1; c: if (i < n) goto b;`
///
/// The cycle between `b` and `c` is entered at both blocks.
#[test]
fn irreducible_loop_is_widened() {
    let i = Symbol::local("i");
    let n = Symbol::parameter("n");
    let mut fixture = Fixture::new();

    let entry = fixture.block();
    let b = fixture.block();
    let c = fixture.block();
    let exit = fixture.block();

    fixture.integer(entry, 0);
    fixture.write(entry, &i);
    opaque_condition(&mut fixture, entry);
    fixture.branch(entry, b, c);

    fixture.read(b, &i);
    fixture.integer(b, 1);
    fixture.compare(b, BinaryOperator::Arithmetic);
    fixture.write(b, &i);
    fixture.jump(b, c);

    fixture.read(c, &i);
    fixture.read(c, &n);
    fixture.compare(c, BinaryOperator::Relational);
    fixture.branch(c, b, exit);

    let mut parameters = opaque_parameters();
    parameters.push(n);
    let procedure = fixture.procedure("irreducible", parameters);
    let (exploration, _) = run(&procedure, fixture.semantic(), &Config::default());

    assert!(exploration.is_completed());
    assert!(exploration.statistics().widenings > 0);
    assert!(exploration.statistics().nodes_in_block(b) <= 4);
    assert!(exploration.statistics().nodes_in_block(c) <= 5);
}

/// What a symbol was bound to when its loop header was entered.
#[derive(Debug)]
struct HeaderBinding {
    widened: bool,
    unconstrained: bool,
    null: bool,
}

/// Records the value of `symbol` at the start of block `header`.
struct HeaderRecorder {
    header: usize,
    symbol: Symbol,
    bindings: Arc<Mutex<Vec<HeaderBinding>>>,
}

impl Check for HeaderRecorder {
    fn rule_id(&self) -> &'static str {
        "T0003"
    }

    fn interests(&self) -> InstructionKinds {
        InstructionKinds::IDENTIFIER
    }

    fn pre_process_instruction(
        &self,
        context: &CheckContext,
        state: ProgramState,
    ) -> Result<Option<ProgramState>, Error> {
        let point = context.point();
        if point.block() != self.header || point.offset() != 0 {
            return Ok(Some(state));
        }
        if let Some(value) = state.symbol_value(&self.symbol) {
            let binding = HeaderBinding {
                widened: matches!(*value.kind(), ValueKind::Widened { .. }),
                unconstrained: state.constraints(value).is_empty(),
                null: value.is_null(),
            };
            self.bindings
                .lock()
                .map_err(|_| Error::CheckFailure("T0003".to_string(), "poisoned".to_string()))?
                .push(binding);
        }
        Ok(Some(state))
    }
}

/// `x = new Foo(); i = 0; while (i < n) { x = null; i = i + 1; } x.Length;`
#[test]
fn widening_forgets_null_assigned_in_loop() {
    let x = Symbol::local("x");
    let i = Symbol::local("i");
    let n = Symbol::parameter("n");
    let mut fixture = Fixture::new();

    let entry = fixture.block();
    let header = fixture.block();
    let body = fixture.block();
    let exit = fixture.block();

    fixture.create(entry, "Foo", vec![]);
    fixture.write(entry, &x);
    fixture.integer(entry, 0);
    fixture.write(entry, &i);
    fixture.jump(entry, header);

    fixture.read(header, &i);
    fixture.read(header, &n);
    fixture.compare(header, BinaryOperator::Relational);
    fixture.branch(header, body, exit);

    fixture.null(body);
    fixture.write(body, &x);
    fixture.read(body, &i);
    fixture.integer(body, 1);
    fixture.compare(body, BinaryOperator::Arithmetic);
    fixture.write(body, &i);
    fixture.jump(body, header);

    fixture.read(exit, &x);
    fixture.member(exit);
    fixture.pop(exit);

    let procedure = fixture.procedure("null_in_loop", vec![n]);
    let bindings = Arc::new(Mutex::new(Vec::new()));
    let mut registry = CheckRegistry::with_default_checks();
    let recorded = bindings.clone();
    registry.register("T0003", move || {
        Box::new(HeaderRecorder {
            header,
            symbol: Symbol::local("x"),
            bindings: recorded.clone(),
        })
    });
    let config = Config {
        loop_visit_limit: 1,
        ..Config::default()
    };
    let sink = CollectingSink::new();

    let exploration = analyze_procedure(
        &procedure,
        fixture.semantic(),
        &registry,
        &config,
        &sink,
        None,
    );

    assert!(exploration.is_completed());
    assert!(exploration.statistics().widenings > 0);
    assert!(sink.is_empty());

    let bindings = bindings.lock().unwrap();
    assert!(bindings
        .iter()
        .any(|binding| binding.widened && binding.unconstrained));
    assert!(bindings.iter().all(|binding| !binding.null));
}

#[test]
fn loop_visit_limit_bounds_header_states() {
    let (procedure, semantic, header) = counting_loop();
    let config = Config {
        loop_visit_limit: 5,
        ..Config::default()
    };

    let (exploration, _) = run(&procedure, &semantic, &config);

    assert!(exploration.is_completed());
    assert_eq!(exploration.statistics().nodes_in_block(header), 6);
}

/// A null dereference on one branch, a long block on the other.
fn dereference_then_long_block() -> (Procedure, SemanticTable) {
    let x = Symbol::local("x");
    let a = Symbol::parameter("a");
    let mut fixture = Fixture::new();

    let head = fixture.block();
    let dereference = fixture.block();
    let long = fixture.block();

    opaque_condition(&mut fixture, head);
    fixture.branch(head, dereference, long);

    fixture.null(dereference);
    fixture.write(dereference, &x);
    fixture.read(dereference, &x);
    fixture.member(dereference);
    fixture.pop(dereference);

    for _ in 0..10 {
        fixture.read(long, &a);
        fixture.pop(long);
    }

    let procedure = fixture.procedure("long", opaque_parameters());
    let semantic = fixture.semantic().clone();
    (procedure, semantic)
}

#[test]
fn completed_run_delivers_diagnostics() {
    let (procedure, semantic) = dereference_then_long_block();

    let (exploration, diagnostics) = run(&procedure, &semantic, &Config::default());

    assert!(exploration.is_completed());
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(exploration.diagnostics(), diagnostics.as_slice());
}

#[test]
fn step_budget_abandons_run_without_diagnostics() {
    let (procedure, semantic) = dereference_then_long_block();
    let config = Config {
        max_steps: 15,
        ..Config::default()
    };

    let (exploration, diagnostics) = run(&procedure, &semantic, &config);

    assert_eq!(
        exploration.status(),
        &AnalysisStatus::Incomplete(IncompleteReason::StepBudgetExceeded)
    );
    assert!(diagnostics.is_empty());
    assert!(exploration.diagnostics().is_empty());
}

#[test]
fn cancelled_run_is_incomplete() {
    let (procedure, semantic) = dereference_then_long_block();
    let sink = CollectingSink::new();
    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let exploration = analyze_procedure(
        &procedure,
        &semantic,
        &CheckRegistry::with_default_checks(),
        &Config::default(),
        &sink,
        Some(&cancellation),
    );

    assert_eq!(
        exploration.status(),
        &AnalysisStatus::Incomplete(IncompleteReason::Cancelled)
    );
    assert_eq!(exploration.statistics().steps, 0);
    assert!(sink.is_empty());
}

#[test]
fn malformed_procedure_is_skipped() {
    let mut control_flow_graph = ControlFlowGraph::new();
    let head = control_flow_graph.new_block().unwrap().index();
    let left = control_flow_graph.new_block().unwrap().index();
    let right = control_flow_graph.new_block().unwrap().index();
    control_flow_graph.set_entry(head).unwrap();
    control_flow_graph.branch(head, left, right).unwrap();
    let procedure = Procedure::new("no_condition", Vec::new(), control_flow_graph);

    let (exploration, diagnostics) = run(&procedure, &SemanticTable::new(), &Config::default());

    match exploration.status() {
        AnalysisStatus::Skipped(reason) => assert!(reason.contains("no_condition")),
        status => panic!("unexpected status {:?}", status),
    }
    assert!(diagnostics.is_empty());
}

/// `try { throw e; } catch { }`
#[test]
fn exceptional_edges_are_explored_with_empty_stack() {
    let e = Symbol::parameter("e");
    let mut fixture = Fixture::new();

    let body = fixture.block();
    let handler = fixture.block();

    fixture.read(body, &e);
    fixture.read(body, &e);
    fixture.throw(body);
    fixture.exceptional(body, handler);

    let procedure = fixture.procedure("throws", vec![e]);
    let (exploration, _) = run(&procedure, fixture.semantic(), &Config::default());

    assert!(exploration.is_completed());
    assert_eq!(exploration.statistics().nodes_in_block(handler), 1);
}

/// `try { x = null; throw e; x = new Foo(); } catch { x.Length; }`
#[test]
fn throw_hands_handler_the_state_at_the_throw() {
    let x = Symbol::local("x");
    let e = Symbol::parameter("e");
    let mut fixture = Fixture::new();

    let body = fixture.block();
    let handler = fixture.block();
    let after = fixture.block();

    fixture.null(body);
    fixture.write(body, &x);
    fixture.read(body, &e);
    fixture.throw(body);
    fixture.create(body, "Foo", vec![]);
    fixture.write(body, &x);
    fixture.exceptional(body, handler);
    fixture.jump(body, after);

    fixture.read(handler, &x);
    let dereference = fixture.member(handler);
    fixture.pop(handler);

    fixture.read(after, &x);
    fixture.pop(after);

    let procedure = fixture.procedure("throw_midway", vec![e]);
    let (exploration, diagnostics) = run(&procedure, fixture.semantic(), &Config::default());

    assert!(exploration.is_completed());
    assert_eq!(exploration.statistics().nodes_in_block(handler), 1);
    assert_eq!(exploration.statistics().nodes_in_block(after), 0);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].node(), dereference);
}

struct FailingCheck;

impl Check for FailingCheck {
    fn rule_id(&self) -> &'static str {
        "T0001"
    }

    fn interests(&self) -> InstructionKinds {
        InstructionKinds::ALL
    }

    fn post_process_instruction(
        &self,
        _context: &CheckContext,
        _state: ProgramState,
    ) -> Result<Option<ProgramState>, Error> {
        Err(Error::CheckFailure("T0001".to_string(), "failed".to_string()))
    }
}

struct PanickingCheck;

impl Check for PanickingCheck {
    fn rule_id(&self) -> &'static str {
        "T0002"
    }

    fn interests(&self) -> InstructionKinds {
        InstructionKinds::MEMBER_ACCESS | InstructionKinds::INVOCATION
    }

    fn pre_process_instruction(
        &self,
        _context: &CheckContext,
        _state: ProgramState,
    ) -> Result<Option<ProgramState>, Error> {
        panic!("check panicked")
    }
}

#[test]
fn failing_checks_are_disabled_without_stopping_others() {
    let (procedure, semantic, then_dereference, _) = dereference_in_branches(BinaryOperator::Equals);
    let mut registry = CheckRegistry::with_default_checks();
    registry.register("T0001", || Box::new(FailingCheck));
    registry.register("T0002", || Box::new(PanickingCheck));
    let sink = CollectingSink::new();
    let config = Config::default();
    let effects = EffectRegistry::with_default_effects();

    let mut exploded_graph = ExplodedGraph::new(
        &procedure,
        &semantic,
        &effects,
        &config,
        registry.enabled_checks(&config, &sink),
    )
    .unwrap();
    let status = exploded_graph.explore().unwrap();
    let enabled_rules = exploded_graph.enabled_rules();
    let (_, diagnostics) = exploded_graph.finish();

    assert_eq!(status, AnalysisStatus::Completed);
    assert!(!enabled_rules.contains(&"T0001"));
    assert!(!enabled_rules.contains(&"T0002"));
    assert!(enabled_rules.contains(&"S2259"));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].node(), then_dereference);
}

#[test]
fn exploration_is_deterministic() {
    let (procedure, semantic) = dereference_then_long_block();

    let (first, first_diagnostics) = run(&procedure, &semantic, &Config::default());
    let (second, second_diagnostics) = run(&procedure, &semantic, &Config::default());

    assert_eq!(first, second);
    assert_eq!(first_diagnostics, second_diagnostics);
}
