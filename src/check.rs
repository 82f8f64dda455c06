//! Post-fixpoint checks: assertion discharge and infeasibility reporting.
//!
//! Both run exactly once, after the engine has converged. Assertions are
//! judged by filtering, not by an abstract true/false comparison: a
//! condition holds iff assuming it does not narrow the left-hand side. An
//! infeasible branch entry is a *negative* fact (its state stayed ⊥), so it
//! can only be reported once iteration is over: mid-iteration a branch may
//! be unreachable merely because its inputs have not propagated yet.

use std::fmt;

use serde::Serialize;

use crate::ast::NodeId;
use crate::graph::LocationGraph;
use crate::interval::Interval;
use crate::location::{eval_arith, LocationKind};
use crate::report::{DiagnosticKind, Diagnostics};
use crate::store::Store;

/// Outcome of one assertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Verdict {
    /// Every concretization of the final state satisfies the condition.
    Verified,
    /// Some concretizations may violate it; `actual` is the left-hand
    /// side's interval, `required` the part of it the condition allows.
    PossibleViolation { actual: Interval, required: Interval },
    /// No concretization can satisfy it.
    Violated,
}

impl Verdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified)
    }
}

/// One checked post-condition with the state it was judged against.
#[derive(Debug, Clone, Serialize)]
pub struct AssertionRecord {
    /// The assertion's comparison node.
    pub node: NodeId,
    /// Index of the location whose store was consulted.
    pub location: usize,
    pub verdict: Verdict,
    /// Snapshot of that store.
    pub store: Store,
}

impl fmt::Display for AssertionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            Verdict::Verified => write!(f, "assertion {}: verified", self.node),
            Verdict::PossibleViolation { actual, required } => write!(
                f,
                "assertion {}: possible violation (have {actual}, need {required})",
                self.node
            ),
            Verdict::Violated => write!(f, "assertion {}: violated", self.node),
        }
    }
}

/// Discharge every collected post-condition against the final store.
pub(crate) fn check_assertions(graph: &LocationGraph, diags: &mut Diagnostics) -> Vec<AssertionRecord> {
    let last = graph.last_index();
    let store = &graph.locations()[last].store;

    graph
        .postconditions()
        .iter()
        .map(|guard| {
            let actual = eval_arith(&guard.lhs, store, last, diags);
            let bound = eval_arith(&guard.rhs, store, last, diags);
            let required = actual.filter(guard.op, &bound);

            let verdict = if required == actual {
                Verdict::Verified
            } else if required.is_empty() {
                Verdict::Violated
            } else {
                Verdict::PossibleViolation { actual, required }
            };

            AssertionRecord {
                node: guard.node,
                location: last,
                verdict,
                store: store.clone(),
            }
        })
        .collect()
}

/// Report every branch entry whose state is still unreachable at the
/// fixpoint even though its predecessor is reachable.
pub(crate) fn report_infeasible_branches(graph: &LocationGraph, diags: &mut Diagnostics) {
    for (idx, location) in graph.locations().iter().enumerate() {
        let (pred, guard) = match &location.kind {
            LocationKind::PreIf { pred, guard } | LocationKind::PreElse { pred, guard } => (*pred, guard),
            _ => continue,
        };
        let input = &graph.locations()[pred].store;
        if location.store.is_bottom() && !input.is_bottom() {
            let evidence = eval_arith(&guard.lhs, input, idx, diags);
            diags.emit(idx, guard.node, DiagnosticKind::InfeasibleBranch, Some(evidence));
        }
    }
}
