//! Analysis results: warning diagnostics and the final report.
//!
//! Diagnostics are a write-only stream: transfer functions push records as
//! they evaluate and never read them back. Each (node, kind) pair fires at
//! most once per analysis run, so re-evaluation during fixpoint iteration
//! cannot duplicate a warning.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::ast::NodeId;
use crate::check::AssertionRecord;
use crate::interval::Interval;
use crate::store::Store;

/// Kind of a sound warning. None of these stop the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// Abstract arithmetic saturated: some execution may overflow here.
    PossibleOverflow,
    /// The divisor may be zero.
    PossibleDivisionByZero,
    /// The guard can never hold on this branch entry.
    InfeasibleBranch,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::PossibleOverflow => "possible overflow",
            DiagnosticKind::PossibleDivisionByZero => "possible division by zero",
            DiagnosticKind::InfeasibleBranch => "infeasible branch",
        };
        write!(f, "{s}")
    }
}

/// One emitted warning, tagged with the location and AST node it came from.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Index of the location whose evaluation produced the warning.
    pub location: usize,
    /// The AST node the warning is about.
    pub node: NodeId,
    pub kind: DiagnosticKind,
    /// Evidence interval: the saturated result, the offending divisor, or
    /// the filtered-away guard operand.
    pub evidence: Option<Interval>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at node {} (location {})", self.kind, self.node, self.location)?;
        if let Some(interval) = &self.evidence {
            write!(f, ": {interval}")?;
        }
        Ok(())
    }
}

/// Deduplicating sink for [`Diagnostic`]s.
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
    seen: HashSet<(NodeId, DiagnosticKind)>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning unless the same (node, kind) pair already fired.
    pub fn emit(&mut self, location: usize, node: NodeId, kind: DiagnosticKind, evidence: Option<Interval>) {
        if self.seen.insert((node, kind)) {
            self.records.push(Diagnostic { location, node, kind, evidence });
        }
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Diagnostic> {
        self.records
    }
}

/// Everything an analysis run produces.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// One record per post-condition, in program order.
    pub assertions: Vec<AssertionRecord>,
    /// Deduplicated warnings, in emission order.
    pub diagnostics: Vec<Diagnostic>,
    /// Fixpoint rounds until stabilization.
    pub rounds: usize,
    /// The abstract state at the program's last location.
    pub exit_store: Store,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "exit state: {}", self.exit_store)?;
        for record in &self.assertions {
            writeln!(f, "{record}")?;
        }
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        write!(f, "converged after {} rounds", self.rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_deduplicate_per_node_and_kind() {
        let mut sink = Diagnostics::new();
        let node = NodeId(3);

        sink.emit(1, node, DiagnosticKind::PossibleOverflow, None);
        sink.emit(2, node, DiagnosticKind::PossibleOverflow, Some(Interval::top()));
        sink.emit(1, node, DiagnosticKind::PossibleDivisionByZero, None);
        sink.emit(1, NodeId(4), DiagnosticKind::PossibleOverflow, None);

        let records = sink.into_records();
        assert_eq!(records.len(), 3);
        // The first emission wins; the repeat is dropped entirely.
        assert_eq!(records[0].location, 1);
        assert!(records[0].evidence.is_none());
    }
}
