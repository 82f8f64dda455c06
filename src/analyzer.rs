//! Analysis driver: build the graph, run the engine, judge the results.

use thiserror::Error;

use crate::ast::{Ast, NodeId};
use crate::check::{check_assertions, report_infeasible_branches};
use crate::fixpoint::FixpointEngine;
use crate::graph::LocationGraph;
use crate::report::{Diagnostics, Report};

/// Fatal analysis failures.
///
/// Sound warnings (overflow, division by zero, failing assertions) are
/// *not* errors; they land in the [`Report`]. This enum covers the two
/// conditions that abort instead: a malformed input tree, which is a bug in
/// the upstream parser, and a diverging fixpoint, which is a bug in the
/// analyzer itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("ill-formed AST at node {node}: {reason}")]
    IllFormed { node: NodeId, reason: String },

    #[error("fixpoint did not converge within {limit} rounds (broken widening; this is an analyzer bug, not a program property)")]
    IterationCeiling { limit: usize },
}

/// Configurable analysis entry point.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    pub engine: FixpointEngine,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze a program: compute interval invariants for every program
    /// point and discharge its assertions.
    pub fn analyze(&self, ast: &Ast) -> Result<Report, AnalysisError> {
        let mut graph = LocationGraph::build(ast)?;
        let mut diags = Diagnostics::new();

        let rounds = self.engine.run(&mut graph, &mut diags)?;

        report_infeasible_branches(&graph, &mut diags);
        let assertions = check_assertions(&graph, &mut diags);
        let exit_store = graph.locations()[graph.last_index()].store.clone();

        Ok(Report {
            assertions,
            diagnostics: diags.into_records(),
            rounds,
            exit_store,
        })
    }
}

/// Analyze with the default configuration.
pub fn analyze(ast: &Ast) -> Result<Report, AnalysisError> {
    Analyzer::new().analyze(ast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;
    use crate::interval::Interval;

    #[test]
    fn end_to_end_smoke() {
        let ast = Ast::new(Node::seq(vec![
            Node::decl(["x"]),
            Node::assign("x", Node::int(5)),
            Node::assertion(Node::var("x").eq(Node::int(5))),
        ]));

        let report = analyze(&ast).unwrap();
        assert_eq!(report.assertions.len(), 1);
        assert!(report.assertions[0].verdict.is_verified());
        assert_eq!(report.exit_store.get("x"), Interval::constant(5));
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn ill_formed_input_aborts() {
        let ast = Ast::new(Node::int(3));
        let err = analyze(&ast).unwrap_err();
        assert!(matches!(err, AnalysisError::IllFormed { .. }));
    }

    #[test]
    fn reports_serialize_to_json() {
        let ast = Ast::new(Node::seq(vec![
            Node::decl(["x"]),
            Node::assign("x", Node::int(1)),
        ]));
        let report = analyze(&ast).unwrap();

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("exit_store"));
    }
}
