//! Fixpoint engine: chaotic iteration over the location vector.
//!
//! Locations are re-evaluated in index order, the order they were built
//! in, until a full round changes nothing. The ordering is deterministic,
//! so two runs over the same program produce identical stores and identical
//! diagnostic streams.
//!
//! Termination: all transfer functions are monotone, loop heads widen, and
//! every non-loop location depends only on earlier ones. The iteration
//! ceiling is not part of that argument; it is a tripwire for a broken
//! widening implementation, surfaced as an analyzer bug rather than a
//! statement about the program.

use crate::analyzer::AnalysisError;
use crate::graph::LocationGraph;
use crate::report::Diagnostics;

/// Round-robin fixpoint driver.
#[derive(Debug, Clone)]
pub struct FixpointEngine {
    /// Upper bound on full rounds before the run is declared divergent.
    pub max_iterations: usize,
}

impl Default for FixpointEngine {
    fn default() -> Self {
        Self { max_iterations: 1000 }
    }
}

impl FixpointEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate to a post-fixpoint; returns the number of rounds taken.
    pub fn run(&self, graph: &mut LocationGraph, diags: &mut Diagnostics) -> Result<usize, AnalysisError> {
        let mut rounds = 0;
        loop {
            let mut stable = true;
            for idx in 0..graph.len() {
                if graph.eval_at(idx, diags) {
                    stable = false;
                }
            }
            rounds += 1;

            if stable {
                break;
            }
            if rounds >= self.max_iterations {
                log::warn!("fixpoint did not converge within {} rounds", self.max_iterations);
                return Err(AnalysisError::IterationCeiling { limit: self.max_iterations });
            }
        }

        log::debug!("fixpoint reached after {rounds} rounds");
        Ok(rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, Node};
    use crate::interval::{Bound, Interval};

    use test_log::test;

    fn program() -> Ast {
        // i = 0; while (i < 10) { i = i + 1; }
        Ast::new(Node::seq(vec![
            Node::decl(["i"]),
            Node::assign("i", Node::int(0)),
            Node::while_loop(
                Node::var("i").lt(Node::int(10)),
                Node::assign("i", Node::var("i").add(Node::int(1))),
            ),
        ]))
    }

    #[test]
    fn converges_on_a_loop() {
        let mut graph = LocationGraph::build(&program()).unwrap();
        let mut diags = Diagnostics::new();
        let engine = FixpointEngine::new();

        let rounds = engine.run(&mut graph, &mut diags).unwrap();
        assert!(rounds >= 2, "a loop needs at least one re-evaluation");

        // Inside the loop the guard caps the counter; widening pushed the
        // upper bound to +∞ before the guard clawed it back.
        let head = &graph.locations()[2];
        assert_eq!(head.store.get("i"), Interval::range(0, 9));

        // Loop exit: the negated guard over the widened head state.
        let exit = &graph.locations()[4];
        assert_eq!(exit.store.get("i"), Interval::new(Bound::Finite(10), Bound::PosInf));
    }

    #[test]
    fn post_fixpoint_is_stable() {
        let mut graph = LocationGraph::build(&program()).unwrap();
        let mut diags = Diagnostics::new();
        FixpointEngine::new().run(&mut graph, &mut diags).unwrap();

        // One more pass over every location must change nothing.
        for idx in 0..graph.len() {
            assert!(!graph.eval_at(idx, &mut diags), "location {idx} was not stable");
        }
    }

    #[test]
    fn ceiling_reports_an_analyzer_bug() {
        let mut graph = LocationGraph::build(&program()).unwrap();
        let mut diags = Diagnostics::new();
        let engine = FixpointEngine { max_iterations: 1 };

        let err = engine.run(&mut graph, &mut diags).unwrap_err();
        assert!(matches!(err, AnalysisError::IterationCeiling { limit: 1 }));
    }
}
