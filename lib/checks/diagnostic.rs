//! Diagnostics and the sink receiving them.

use crate::il::{NodeId, Span};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// A defect found by a check.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Diagnostic {
    rule_id: String,
    node: NodeId,
    span: Option<Span>,
    message: String,
    /// Diagnostics of one rule sharing a key are reported once per run.
    key: String,
}

impl Diagnostic {
    pub fn new<S: Into<String>, M: Into<String>, K: Into<String>>(
        rule_id: S,
        node: NodeId,
        span: Option<Span>,
        message: M,
        key: K,
    ) -> Diagnostic {
        Diagnostic {
            rule_id: rule_id.into(),
            node,
            span,
            message: message.into(),
            key: key.into(),
        }
    }

    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{} {}: {}", self.rule_id, span, self.message),
            None => write!(f, "{} {}: {}", self.rule_id, self.node, self.message),
        }
    }
}

/// Receives the diagnostics of completed runs.
///
/// Sinks are shared by runs exploring procedures in parallel.
pub trait DiagnosticSink: Sync {
    /// Checks of disabled rules are never instantiated.
    fn is_enabled(&self, _rule_id: &str) -> bool {
        true
    }

    fn emit(&self, diagnostic: Diagnostic);
}

/// A `DiagnosticSink` keeping every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    disabled_rules: BTreeSet<String>,
}

impl CollectingSink {
    pub fn new() -> CollectingSink {
        CollectingSink::default()
    }

    /// A sink for which the given rules are disabled.
    pub fn with_disabled_rules<I, S>(rules: I) -> CollectingSink
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CollectingSink {
            diagnostics: Mutex::new(Vec::new()),
            disabled_rules: rules.into_iter().map(|rule| rule.into()).collect(),
        }
    }

    fn lock(&self) -> MutexGuard<Vec<Diagnostic>> {
        // A panic while holding the lock leaves a vector that is still valid.
        match self.diagnostics.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Every diagnostic emitted so far, sorted.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.lock().clone();
        diagnostics.sort();
        diagnostics
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn is_enabled(&self, rule_id: &str) -> bool {
        !self.disabled_rules.contains(rule_id)
    }

    fn emit(&self, diagnostic: Diagnostic) {
        self.lock().push(diagnostic);
    }
}

/// Buffers the diagnostics of one run, once per rule and key.
#[derive(Debug, Default)]
pub struct Reporter {
    reported: RefCell<BTreeSet<(String, String)>>,
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Reporter {
    pub fn new() -> Reporter {
        Reporter::default()
    }

    /// Records `diagnostic` unless its rule already reported its key.
    ///
    /// Returns true if the diagnostic was recorded.
    pub fn report(&self, diagnostic: Diagnostic) -> bool {
        let key = (diagnostic.rule_id.clone(), diagnostic.key.clone());
        if !self.reported.borrow_mut().insert(key) {
            return false;
        }
        self.diagnostics.borrow_mut().push(diagnostic);
        true
    }

    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_inner()
    }
}
