//! Locations: the nodes of the analysis graph and their transfer functions.
//!
//! One location exists per structural program point. Each carries the
//! abstract [`Store`] describing the state *after* the point executes, and
//! the indices of the predecessor locations its transfer function reads.
//! All locations live in one owning vector; dependencies are indices into
//! it, so loop back-edges are plain data rather than ownership cycles.
//!
//! Dispatch is a single `match` over [`LocationKind`]: exhaustiveness is a
//! compile-time property, and adding a variant forces every transfer to be
//! revisited.

use std::collections::BTreeSet;

use crate::ast::{LogicOp, Node, NodeId, NodeKind};
use crate::interval::Interval;
use crate::report::{DiagnosticKind, Diagnostics};
use crate::store::Store;

/// A comparison guard `lhs op rhs`, extracted from the AST at build time.
///
/// Negated variants (else-entries, loop exits) are produced once by the
/// graph builder via [`Guard::negated`]; nothing re-derives them during
/// iteration.
#[derive(Debug, Clone)]
pub struct Guard {
    pub op: LogicOp,
    pub lhs: Node,
    pub rhs: Node,
    /// The guard's own AST node, for diagnostics.
    pub node: NodeId,
}

impl Guard {
    /// The logically opposite guard over the same operands.
    pub fn negated(&self) -> Guard {
        Guard {
            op: self.op.negated(),
            lhs: self.lhs.clone(),
            rhs: self.rhs.clone(),
            node: self.node,
        }
    }
}

/// Statement-kind tag with per-kind payload and predecessor indices.
#[derive(Debug, Clone)]
pub enum LocationKind {
    /// Program entry: every declared variable bound to ⊤. No predecessors.
    Decl { vars: Vec<String> },
    /// `var = expr`.
    Assign {
        pred: usize,
        var: String,
        expr: Node,
    },
    /// `assume lo <= var <= hi`.
    Precond {
        pred: usize,
        var: String,
        bounds: Interval,
    },
    /// Entry into the then-branch: the guard filtered onto the state.
    PreIf { pred: usize, guard: Guard },
    /// Entry into the else-branch: the negated guard filtered on.
    PreElse { pred: usize, guard: Guard },
    /// Join point after both branches.
    Merge { then_pred: usize, else_pred: usize },
    /// Loop head. `entry` is the location before the loop, `body_tail` the
    /// last location of the body (the back-edge). `widen_vars` is the set of
    /// variables the loop can change; only those are widened. `head` caches
    /// the widened state *before* the guard filter; the loop-exit state is
    /// derived from it, not from the filtered store the body sees.
    PreWhile {
        entry: usize,
        body_tail: usize,
        guard: Guard,
        widen_vars: BTreeSet<String>,
        head: Store,
    },
    /// Loop exit: the negated guard filtered onto the head state.
    PostWhile { pred: usize, guard: Guard },
}

/// One node of the analysis graph.
#[derive(Debug, Clone)]
pub struct Location {
    pub kind: LocationKind,
    /// Abstract state after this point. Starts unreachable (⊥) everywhere
    /// except the Decl entry, and is written only by this location's own
    /// evaluation step.
    pub store: Store,
}

impl Location {
    pub fn new(kind: LocationKind) -> Self {
        let store = match &kind {
            LocationKind::Decl { vars } => Store::with_top_bindings(vars.iter().cloned()),
            _ => Store::bottom(),
        };
        Location { kind, store }
    }

    /// Indices of the predecessor locations this one reads.
    pub fn deps(&self) -> Vec<usize> {
        match &self.kind {
            LocationKind::Decl { .. } => vec![],
            LocationKind::Assign { pred, .. }
            | LocationKind::Precond { pred, .. }
            | LocationKind::PreIf { pred, .. }
            | LocationKind::PreElse { pred, .. }
            | LocationKind::PostWhile { pred, .. } => vec![*pred],
            LocationKind::Merge { then_pred, else_pred } => vec![*then_pred, *else_pred],
            LocationKind::PreWhile { entry, body_tail, .. } => vec![*entry, *body_tail],
        }
    }
}

/// Evaluate the location at `idx` against its predecessors' current stores,
/// write the new store back, and report whether anything changed.
pub(crate) fn eval(locations: &mut [Location], idx: usize, diags: &mut Diagnostics) -> bool {
    let (new_store, new_head) = transfer(locations, idx, diags);

    let location = &mut locations[idx];
    let mut changed = new_store != location.store;
    location.store = new_store;

    if let (LocationKind::PreWhile { head, .. }, Some(new_head)) = (&mut location.kind, new_head) {
        changed |= *head != new_head;
        *head = new_head;
    }
    changed
}

/// Compute the new store for the location at `idx`. For loop heads the
/// widened pre-guard state is returned alongside, to be cached in the
/// location's `head` field.
fn transfer(locations: &[Location], idx: usize, diags: &mut Diagnostics) -> (Store, Option<Store>) {
    match &locations[idx].kind {
        LocationKind::Decl { vars } => (Store::with_top_bindings(vars.iter().cloned()), None),

        LocationKind::Assign { pred, var, expr } => {
            let input = &locations[*pred].store;
            if input.is_bottom() {
                return (Store::bottom(), None);
            }
            let value = eval_arith(expr, input, idx, diags);
            let mut store = input.clone();
            store.set(var.clone(), value);
            (store, None)
        }

        LocationKind::Precond { pred, var, bounds } => {
            let input = &locations[*pred].store;
            if input.is_bottom() {
                return (Store::bottom(), None);
            }
            let mut store = input.clone();
            store.set(var.clone(), input.get(var).meet(bounds));
            (store, None)
        }

        LocationKind::PreIf { pred, guard } | LocationKind::PreElse { pred, guard } => {
            (apply_guard(&locations[*pred].store, guard, idx, diags), None)
        }

        LocationKind::Merge { then_pred, else_pred } => {
            let then_store = &locations[*then_pred].store;
            let else_store = &locations[*else_pred].store;
            (then_store.join(else_store), None)
        }

        LocationKind::PreWhile { entry, body_tail, guard, widen_vars, .. } => {
            let joined = locations[*entry].store.join(&locations[*body_tail].store);
            if joined.is_bottom() {
                return (Store::bottom(), Some(Store::bottom()));
            }
            // Widen against this head's own previous (guard-filtered) value.
            // On the first pass that value is ⊥ and widening degenerates to
            // the join, so the first evaluation behaves like a plain branch
            // entry.
            let head = locations[idx].store.widen_selective(&joined, widen_vars);
            let store = apply_guard(&head, guard, idx, diags);
            (store, Some(head))
        }

        LocationKind::PostWhile { pred, guard } => {
            let head = match &locations[*pred].kind {
                LocationKind::PreWhile { head, .. } => head,
                // The builder always wires a PostWhile to its PreWhile; fall
                // back to the predecessor's store to stay total.
                _ => &locations[*pred].store,
            };
            (apply_guard(head, guard, idx, diags), None)
        }
    }
}

/// Restrict a state by a comparison guard.
///
/// When the left operand is a variable, its interval is replaced by the
/// filtered one (an empty filter collapses the store to ⊥). For a compound
/// left operand the store cannot be narrowed, but an empty filter still
/// proves the guarded path infeasible.
fn apply_guard(input: &Store, guard: &Guard, idx: usize, diags: &mut Diagnostics) -> Store {
    if input.is_bottom() {
        return Store::bottom();
    }
    let lhs = eval_arith(&guard.lhs, input, idx, diags);
    let rhs = eval_arith(&guard.rhs, input, idx, diags);
    let filtered = lhs.filter(guard.op, &rhs);

    let mut store = input.clone();
    match guard.lhs.var_name() {
        Some(name) => store.set(name.to_string(), filtered),
        None if filtered.is_empty() => store = Store::bottom(),
        None => {}
    }
    store
}

/// Evaluate an arithmetic expression to an interval, forwarding saturation
/// and division-by-zero effects to the diagnostics sink.
pub(crate) fn eval_arith(expr: &Node, store: &Store, idx: usize, diags: &mut Diagnostics) -> Interval {
    match &expr.kind {
        NodeKind::Integer(value) => Interval::constant(*value),
        NodeKind::Variable(name) => store.get(name),
        NodeKind::ArithOp(op) => {
            let [lhs_node, rhs_node] = expr.children.as_slice() else {
                // The builder rejects malformed arithmetic; stay sound.
                return Interval::top();
            };
            let lhs = eval_arith(lhs_node, store, idx, diags);
            let rhs = eval_arith(rhs_node, store, idx, diags);
            let (value, effects) = Interval::eval_binop(*op, &lhs, &rhs);
            if effects.saturated {
                diags.emit(idx, expr.id, DiagnosticKind::PossibleOverflow, Some(value));
            }
            if effects.div_by_zero {
                diags.emit(idx, expr.id, DiagnosticKind::PossibleDivisionByZero, Some(rhs));
            }
            value
        }
        // Only expressions reach here; anything else was rejected at build
        // time. ⊤ is the sound fallback.
        _ => Interval::top(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ast;

    fn diags() -> Diagnostics {
        Diagnostics::new()
    }

    fn guard_of(node: &Node) -> Guard {
        let NodeKind::LogicOp(op) = &node.kind else { panic!("not a guard") };
        Guard {
            op: *op,
            lhs: node.children[0].clone(),
            rhs: node.children[1].clone(),
            node: node.id,
        }
    }

    #[test]
    fn assign_transfer() {
        // x ∈ [0, 10] ⊢ x = x + 1 ⟹ x ∈ [1, 11]
        let ast = Ast::new(Node::seq(vec![Node::assign("x", Node::var("x").add(Node::int(1)))]));
        let assign = &ast.root().children[0];

        let mut decl = Location::new(LocationKind::Decl { vars: vec!["x".into()] });
        decl.store.set("x", Interval::range(0, 10));

        let mut locations = vec![
            decl,
            Location::new(LocationKind::Assign {
                pred: 0,
                var: "x".into(),
                expr: assign.children[1].clone(),
            }),
        ];

        assert!(eval(&mut locations, 1, &mut diags()));
        assert_eq!(locations[1].store.get("x"), Interval::range(1, 11));
        // Re-evaluation is stable.
        assert!(!eval(&mut locations, 1, &mut diags()));
    }

    #[test]
    fn assign_on_unreachable_input_stays_bottom() {
        let ast = Ast::new(Node::seq(vec![Node::assign("x", Node::int(1).div(Node::int(0)))]));
        let assign = &ast.root().children[0];

        let mut locations = vec![
            Location {
                kind: LocationKind::Decl { vars: vec!["x".into()] },
                store: Store::bottom(),
            },
            Location::new(LocationKind::Assign {
                pred: 0,
                var: "x".into(),
                expr: assign.children[1].clone(),
            }),
        ];

        let mut sink = diags();
        eval(&mut locations, 1, &mut sink);
        assert!(locations[1].store.is_bottom());
        // Unreachable code is not evaluated: no division warning.
        assert!(sink.records().is_empty());
    }

    #[test]
    fn guard_refines_variable_operand() {
        let ast = Ast::new(Node::seq(vec![Node::var("x").lt(Node::int(5))]));
        let guard = guard_of(&ast.root().children[0]);

        let mut input = Store::new();
        input.set("x", Interval::range(0, 10));

        let refined = apply_guard(&input, &guard, 0, &mut diags());
        assert_eq!(refined.get("x"), Interval::range(0, 4));

        let negated = apply_guard(&input, &guard.negated(), 0, &mut diags());
        assert_eq!(negated.get("x"), Interval::range(5, 10));
    }

    #[test]
    fn contradictory_guard_marks_branch_infeasible() {
        let ast = Ast::new(Node::seq(vec![Node::var("x").eq(Node::int(0))]));
        let guard = guard_of(&ast.root().children[0]);

        let mut input = Store::new();
        input.set("x", Interval::constant(1));

        let refined = apply_guard(&input, &guard, 0, &mut diags());
        assert!(refined.is_bottom());
    }

    #[test]
    fn compound_guard_lhs_cannot_narrow_but_detects_infeasibility() {
        // (x + 1) < 0 with x ∈ [5, 9]: no narrowing target, but infeasible.
        let ast = Ast::new(Node::seq(vec![Node::var("x").add(Node::int(1)).lt(Node::int(0))]));
        let guard = guard_of(&ast.root().children[0]);

        let mut input = Store::new();
        input.set("x", Interval::range(5, 9));
        assert!(apply_guard(&input, &guard, 0, &mut diags()).is_bottom());

        // (x + 1) < 100: feasible, state unchanged.
        let ast = Ast::new(Node::seq(vec![Node::var("x").add(Node::int(1)).lt(Node::int(100))]));
        let guard = guard_of(&ast.root().children[0]);
        assert_eq!(apply_guard(&input, &guard, 0, &mut diags()), input);
    }

    #[test]
    fn transfer_is_monotone() {
        // Smaller input ⟹ smaller output, for assignment and guard entry.
        let ast = Ast::new(Node::seq(vec![
            Node::assign("y", Node::var("x").mul(Node::int(2))),
            Node::var("x").le(Node::int(4)),
        ]));
        let expr = ast.root().children[0].children[1].clone();
        let guard = guard_of(&ast.root().children[1]);

        let mut small = Store::new();
        small.set("x", Interval::range(1, 3));
        let mut large = Store::new();
        large.set("x", Interval::range(0, 8));
        assert!(small.le(&large));

        let small_val = eval_arith(&expr, &small, 0, &mut diags());
        let large_val = eval_arith(&expr, &large, 0, &mut diags());
        assert!(small_val.le(&large_val));

        let small_out = apply_guard(&small, &guard, 0, &mut diags());
        let large_out = apply_guard(&large, &guard, 0, &mut diags());
        assert!(small_out.le(&large_out));
    }

    #[test]
    fn eval_arith_reports_effects() {
        let ast = Ast::new(Node::seq(vec![Node::assign(
            "y",
            Node::var("x").div(Node::var("d")),
        )]));
        let expr = &ast.root().children[0].children[1];

        let mut store = Store::new();
        store.set("x", Interval::constant(5));
        store.set("d", Interval::range(-1, 1));

        let mut sink = diags();
        let value = eval_arith(expr, &store, 7, &mut sink);
        assert!(value.is_top());

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, DiagnosticKind::PossibleDivisionByZero);
        assert_eq!(records[0].location, 7);
        assert_eq!(records[0].node, expr.id);
    }
}
