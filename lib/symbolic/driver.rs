//! Entry points running explorations and delivering their diagnostics.

use crate::checks::{CheckRegistry, Diagnostic, DiagnosticSink};
use crate::il::{Procedure, SemanticModel};
use crate::symbolic::*;
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Stops the runs it is handed to, the next time they take a node from their
/// worklist.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The result of analyzing one procedure.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Exploration {
    procedure: String,
    status: AnalysisStatus,
    statistics: Statistics,
    diagnostics: Vec<Diagnostic>,
}

impl Exploration {
    fn skipped(procedure: &Procedure, reason: String) -> Exploration {
        Exploration {
            procedure: procedure.name().to_string(),
            status: AnalysisStatus::Skipped(reason),
            statistics: Statistics::default(),
            diagnostics: Vec::new(),
        }
    }

    /// The name of the analyzed procedure.
    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn status(&self) -> &AnalysisStatus {
        &self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == AnalysisStatus::Completed
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// The diagnostics delivered to the sink. Empty unless the run completed.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Explores `procedure` with every check enabled by `config` and `sink`.
///
/// Nothing escapes the run: a malformed procedure is `Skipped`, and a run
/// abandoned for its step budget or `cancellation` is `Incomplete`. Only
/// completed runs deliver their diagnostics to `sink`.
pub fn analyze_procedure(
    procedure: &Procedure,
    semantic: &dyn SemanticModel,
    registry: &CheckRegistry,
    config: &Config,
    sink: &dyn DiagnosticSink,
    cancellation: Option<&CancellationToken>,
) -> Exploration {
    let effects = EffectRegistry::with_default_effects();
    let checks = registry.enabled_checks(config, sink);

    let mut exploded_graph = match ExplodedGraph::new(procedure, semantic, &effects, config, checks)
    {
        Ok(exploded_graph) => exploded_graph,
        Err(e) => {
            warn!("skipping {}: {}", procedure.name(), e);
            return Exploration::skipped(procedure, e.to_string());
        }
    };
    if let Some(cancellation) = cancellation {
        exploded_graph.set_cancellation(cancellation);
    }

    let status = match exploded_graph.explore() {
        Ok(status) => status,
        Err(e) => {
            warn!("exploration of {} failed: {}", procedure.name(), e);
            AnalysisStatus::Skipped(e.to_string())
        }
    };
    let (statistics, mut diagnostics) = exploded_graph.finish();

    if status == AnalysisStatus::Completed {
        diagnostics.sort();
        for diagnostic in &diagnostics {
            sink.emit(diagnostic.clone());
        }
    } else if !diagnostics.is_empty() {
        debug!(
            "discarding {} diagnostics of {}",
            diagnostics.len(),
            procedure.name()
        );
        diagnostics.clear();
    }

    Exploration {
        procedure: procedure.name().to_string(),
        status,
        statistics,
        diagnostics,
    }
}

/// Explores independent procedures in parallel, one run per procedure.
///
/// Explorations are returned in the order of `procedures`.
pub fn analyze_procedures(
    procedures: &[Procedure],
    semantic: &dyn SemanticModel,
    registry: &CheckRegistry,
    config: &Config,
    sink: &dyn DiagnosticSink,
    cancellation: Option<&CancellationToken>,
) -> Vec<Exploration> {
    procedures
        .par_iter()
        .map(|procedure| analyze_procedure(procedure, semantic, registry, config, sink, cancellation))
        .collect()
}
