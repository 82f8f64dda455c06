//! # interval-analysis: Sound Interval Invariants for Imperative Programs
//!
//! This crate is a static analyzer for a small imperative integer language.
//! It computes, by **abstract interpretation** over the interval domain, a
//! sound over-approximation of the set of values each variable may hold at
//! every program point, then discharges user-supplied assertions against
//! those invariants.
//!
//! ## Core Concept
//!
//! Unlike testing (which checks one execution path) or fuzzing (which checks
//! many), **abstract interpretation checks all possible execution paths
//! simultaneously.** Instead of executing a program with concrete values
//! (`x = 5`), it executes with abstract values (`x ∈ [0, 10]`):
//!
//! | Code | Concrete Execution | Interval Domain |
//! |------|--------------------|-----------------|
//! | `x = 5;` | `x = 5` | `x ∈ [5, 5]` |
//! | `y = x - 10;` | `y = -5` | `y ∈ [-5, -5]` |
//! | `while (i < 10) i = i + 1;` | 10 iterations | `i ∈ [10, +∞]` on exit |
//!
//! ## Architecture
//!
//! Five layers, leaves first:
//!
//! 1. **[`Interval`]**: the interval lattice: join, meet, widening,
//!    saturating abstract arithmetic, and the backward [`Interval::filter`]
//!    that restricts a value by a comparison.
//! 2. **[`Store`]**: a total map from variable names to intervals, lifted
//!    point-wise to a lattice of program states.
//! 3. **[`Location`]**: one node of the analysis graph per program point,
//!    holding the abstract state after that point and index references to
//!    its predecessors.
//! 4. **[`LocationGraph`]**: a single AST walk wiring structured control
//!    flow into the location vector; loop back-edges are the only cycles.
//! 5. **[`FixpointEngine`]**: deterministic round-robin re-evaluation until
//!    no store changes, with widening at loop heads to guarantee
//!    termination.
//!
//! Assertion checking runs once, after the fixpoint, against the state at
//! the program's last location.
//!
//! ## Why filtering instead of abstract booleans?
//!
//! Evaluating `x < 10` to `true`/`false` over intervals is unsound: for
//! `x ∈ [5, 20]` neither answer covers all executions. The analyzer instead
//! *filters*: entering the branch refines `x` to `[5, 9]`, entering the
//! else-branch to `[10, 20]`. Both paths stay sound, and a branch whose
//! filter comes back empty is provably unreachable.
//!
//! ## Why widening?
//!
//! The interval lattice has infinite ascending chains (`[0, 1]`, `[0, 2]`,
//! `[0, 3]`, …), so plain fixpoint iteration over a loop need not terminate.
//! Widening extrapolates a growing bound to ±∞ after one round; the loop
//! guard then claws back the part it contradicts. For
//! `i = 0; while (i < 10) i = i + 1;` the loop head stabilizes at
//! `i ∈ [0, 9]` and the exit at `i ∈ [10, +∞]` in three rounds.
//!
//! ## Example
//!
//! ```rust
//! use interval_analysis::{analyze, Ast, Interval, Node};
//!
//! // int x; assume 0 <= x <= 100; x = x + 1; assert(x <= 101);
//! let ast = Ast::new(Node::seq(vec![
//!     Node::decl(["x"]),
//!     Node::precondition("x", 0, 100),
//!     Node::assign("x", Node::var("x").add(Node::int(1))),
//!     Node::assertion(Node::var("x").le(Node::int(101))),
//! ]));
//!
//! let report = analyze(&ast).expect("well-formed program");
//! assert!(report.assertions[0].verdict.is_verified());
//! assert_eq!(report.exit_store.get("x"), Interval::range(1, 101));
//! ```
//!
//! ## Diagnostics
//!
//! The analyzer never unwinds for program behavior. Possible overflow,
//! possible division by zero, infeasible branches and possibly-failing
//! assertions are all *sound warnings*, emitted at most once per AST node
//! into the [`Report`]. The only hard errors are an ill-formed input tree
//! and a diverging fixpoint, the latter an analyzer bug by definition.

pub mod analyzer;
pub mod ast;
pub mod check;
pub mod domain;
pub mod fixpoint;
pub mod graph;
pub mod interval;
pub mod location;
pub mod report;
pub mod store;

// Re-exports for convenience
pub use analyzer::{analyze, AnalysisError, Analyzer};
pub use ast::{ArithOp, Ast, LogicOp, Node, NodeId, NodeKind};
pub use check::{AssertionRecord, Verdict};
pub use domain::Lattice;
pub use fixpoint::FixpointEngine;
pub use graph::LocationGraph;
pub use interval::{ArithEffects, Bound, Interval};
pub use location::{Guard, Location, LocationKind};
pub use report::{Diagnostic, DiagnosticKind, Diagnostics, Report};
pub use store::Store;
