//! Graph builder: one AST walk producing the location vector.
//!
//! The walk emits locations in program order, threading the index of the
//! last emitted location through each statement. Every dependency points to
//! a lower index, with one exception: the loop back-edge, wired up by a
//! placeholder-and-patch step once the body has been emitted.
//!
//! The builder is also where ill-formed ASTs die: wrong child counts,
//! unexpected kinds and malformed precondition bounds are programmer errors
//! in the upstream parser and abort the analysis before any evaluation.

use std::collections::BTreeSet;

use crate::analyzer::AnalysisError;
use crate::ast::{Ast, LogicOp, Node, NodeKind};
use crate::interval::Interval;
use crate::location::{eval, Guard, Location, LocationKind};
use crate::report::Diagnostics;
use crate::store::Store;

/// The analysis graph: an owning vector of locations plus the collected
/// post-conditions (consumers of the final store, not locations).
#[derive(Debug)]
pub struct LocationGraph {
    locations: Vec<Location>,
    postconditions: Vec<Guard>,
}

impl LocationGraph {
    /// Walk the program and wire up the location network.
    pub fn build(ast: &Ast) -> Result<Self, AnalysisError> {
        let root = ast.root();
        if root.kind != NodeKind::Sequence {
            return Err(ill_formed(root, "program root must be a sequence"));
        }

        let mut declared = Vec::new();
        collect_declarations(root, &mut declared)?;

        let mut builder = Builder {
            locations: vec![Location::new(LocationKind::Decl { vars: declared })],
            postconditions: Vec::new(),
        };

        let mut prev = 0;
        for stmt in &root.children {
            prev = builder.statement(stmt, prev)?;
        }

        Ok(LocationGraph {
            locations: builder.locations,
            postconditions: builder.postconditions,
        })
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn postconditions(&self) -> &[Guard] {
        &self.postconditions
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Index of the program's last location.
    pub fn last_index(&self) -> usize {
        self.locations.len() - 1
    }

    /// Evaluate one location in place; true if its state changed.
    pub(crate) fn eval_at(&mut self, idx: usize, diags: &mut Diagnostics) -> bool {
        eval(&mut self.locations, idx, diags)
    }
}

struct Builder {
    locations: Vec<Location>,
    postconditions: Vec<Guard>,
}

impl Builder {
    fn push(&mut self, kind: LocationKind) -> usize {
        self.locations.push(Location::new(kind));
        self.locations.len() - 1
    }

    /// Emit the locations of one statement; returns the index of its last
    /// location (or `prev` unchanged for statements that emit none).
    fn statement(&mut self, node: &Node, prev: usize) -> Result<usize, AnalysisError> {
        match &node.kind {
            NodeKind::Sequence => {
                let mut last = prev;
                for child in &node.children {
                    last = self.statement(child, last)?;
                }
                Ok(last)
            }

            // Declarations were collected into the entry location up front.
            NodeKind::Declaration => Ok(prev),

            NodeKind::Assignment => {
                let [target, expr] = node.children.as_slice() else {
                    return Err(ill_formed(node, "assignment takes a variable and an expression"));
                };
                let Some(var) = target.var_name() else {
                    return Err(ill_formed(target, "assignment target must be a variable"));
                };
                validate_expr(expr)?;
                Ok(self.push(LocationKind::Assign {
                    pred: prev,
                    var: var.to_string(),
                    expr: expr.clone(),
                }))
            }

            NodeKind::Precondition => {
                let (var, bounds) = parse_precondition(node)?;
                Ok(self.push(LocationKind::Precond { pred: prev, var, bounds }))
            }

            NodeKind::IfElse => {
                let (guard_node, then_block, else_block) = match node.children.as_slice() {
                    [g, t] => (g, t, None),
                    [g, t, e] => (g, t, Some(e)),
                    _ => return Err(ill_formed(node, "conditional takes a guard and one or two blocks")),
                };
                let guard = parse_guard(guard_node)?;

                let pre_then = self.push(LocationKind::PreIf { pred: prev, guard: guard.clone() });
                let last_then = self.statement(then_block, pre_then)?;

                let pre_else = self.push(LocationKind::PreElse { pred: prev, guard: guard.negated() });
                let last_else = match else_block {
                    Some(block) => self.statement(block, pre_else)?,
                    // No else-branch: the negated guard entry is the whole branch.
                    None => pre_else,
                };

                Ok(self.push(LocationKind::Merge {
                    then_pred: last_then,
                    else_pred: last_else,
                }))
            }

            NodeKind::WhileLoop => {
                let [guard_node, body] = node.children.as_slice() else {
                    return Err(ill_formed(node, "loop takes a guard and a body"));
                };
                let guard = parse_guard(guard_node)?;

                let mut widen_vars = BTreeSet::new();
                expr_vars(&guard.lhs, &mut widen_vars);
                expr_vars(&guard.rhs, &mut widen_vars);
                assigned_vars(body, &mut widen_vars);

                // The back-edge target is unknown until the body is emitted:
                // emit with a placeholder and patch below.
                let head = self.push(LocationKind::PreWhile {
                    entry: prev,
                    body_tail: usize::MAX,
                    guard: guard.clone(),
                    widen_vars,
                    head: Store::bottom(),
                });
                let last_body = self.statement(body, head)?;

                if let LocationKind::PreWhile { body_tail, .. } = &mut self.locations[head].kind {
                    *body_tail = last_body;
                }

                Ok(self.push(LocationKind::PostWhile {
                    pred: head,
                    guard: guard.negated(),
                }))
            }

            NodeKind::PostCondition => {
                let [guard_node] = node.children.as_slice() else {
                    return Err(ill_formed(node, "assertion takes a single comparison"));
                };
                let guard = parse_guard(guard_node)?;
                self.postconditions.push(guard);
                Ok(prev)
            }

            _ => Err(ill_formed(node, "expected a statement")),
        }
    }
}

fn ill_formed(node: &Node, reason: &str) -> AnalysisError {
    AnalysisError::IllFormed {
        node: node.id,
        reason: reason.to_string(),
    }
}

/// Pre-scan for `Declaration` nodes anywhere in the tree; their variables
/// seed the entry location with ⊤ bindings.
fn collect_declarations(node: &Node, vars: &mut Vec<String>) -> Result<(), AnalysisError> {
    if node.kind == NodeKind::Declaration {
        for child in &node.children {
            match child.var_name() {
                Some(name) => vars.push(name.to_string()),
                None => return Err(ill_formed(child, "declaration lists variables only")),
            }
        }
        return Ok(());
    }
    for child in &node.children {
        collect_declarations(child, vars)?;
    }
    Ok(())
}

/// An expression is an integer literal, a variable, or binary arithmetic
/// over expressions.
fn validate_expr(node: &Node) -> Result<(), AnalysisError> {
    match &node.kind {
        NodeKind::Integer(_) | NodeKind::Variable(_) => Ok(()),
        NodeKind::ArithOp(_) => {
            let [lhs, rhs] = node.children.as_slice() else {
                return Err(ill_formed(node, "arithmetic takes two operands"));
            };
            validate_expr(lhs)?;
            validate_expr(rhs)
        }
        _ => Err(ill_formed(node, "expected an arithmetic expression")),
    }
}

fn parse_guard(node: &Node) -> Result<Guard, AnalysisError> {
    let NodeKind::LogicOp(op) = &node.kind else {
        return Err(ill_formed(node, "expected a comparison"));
    };
    let [lhs, rhs] = node.children.as_slice() else {
        return Err(ill_formed(node, "comparison takes two operands"));
    };
    validate_expr(lhs)?;
    validate_expr(rhs)?;
    Ok(Guard {
        op: *op,
        lhs: lhs.clone(),
        rhs: rhs.clone(),
        node: node.id,
    })
}

/// `assume lo <= x <= hi` arrives as the two conjuncts
/// `[x >= lo, x <= hi]`, both naming the same variable.
fn parse_precondition(node: &Node) -> Result<(String, Interval), AnalysisError> {
    let [lower, upper] = node.children.as_slice() else {
        return Err(ill_formed(node, "precondition takes two bound comparisons"));
    };
    let lo = parse_bound(lower, LogicOp::Geq)?;
    let hi = parse_bound(upper, LogicOp::Leq)?;
    if lo.0 != hi.0 {
        return Err(ill_formed(node, "precondition bounds must constrain one variable"));
    }
    Ok((lo.0, Interval::range(lo.1, hi.1)))
}

fn parse_bound(node: &Node, expected: LogicOp) -> Result<(String, i64), AnalysisError> {
    if node.kind != NodeKind::LogicOp(expected) {
        return Err(ill_formed(node, "unexpected precondition bound operator"));
    }
    match node.children.as_slice() {
        [var, bound] => match (&var.kind, &bound.kind) {
            (NodeKind::Variable(name), NodeKind::Integer(value)) => Ok((name.clone(), *value)),
            _ => Err(ill_formed(node, "precondition bound must compare a variable to a literal")),
        },
        _ => Err(ill_formed(node, "comparison takes two operands")),
    }
}

/// Variables a statement can rebind: assignment targets and precondition
/// variables, through nested blocks.
fn assigned_vars(node: &Node, vars: &mut BTreeSet<String>) {
    match &node.kind {
        NodeKind::Assignment => {
            if let Some(name) = node.children.first().and_then(Node::var_name) {
                vars.insert(name.to_string());
            }
        }
        NodeKind::Precondition => {
            if let Ok((name, _)) = parse_precondition(node) {
                vars.insert(name);
            }
        }
        NodeKind::Sequence | NodeKind::IfElse | NodeKind::WhileLoop => {
            for child in &node.children {
                assigned_vars(child, vars);
            }
        }
        _ => {}
    }
}

/// Variables read by an expression.
fn expr_vars(node: &Node, vars: &mut BTreeSet<String>) {
    if let Some(name) = node.var_name() {
        vars.insert(name.to_string());
    }
    for child in &node.children {
        expr_vars(child, vars);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(program: Node) -> LocationGraph {
        LocationGraph::build(&Ast::new(program)).expect("well-formed program")
    }

    #[test]
    fn straight_line_layout() {
        let graph = build(Node::seq(vec![
            Node::decl(["x"]),
            Node::assign("x", Node::int(5)),
            Node::assign("x", Node::var("x").add(Node::int(1))),
        ]));

        // Decl, then one location per assignment, each chained to the last.
        assert_eq!(graph.len(), 3);
        assert!(matches!(graph.locations()[0].kind, LocationKind::Decl { .. }));
        assert_eq!(graph.locations()[1].deps(), vec![0]);
        assert_eq!(graph.locations()[2].deps(), vec![1]);
    }

    #[test]
    fn conditional_layout() {
        let graph = build(Node::seq(vec![
            Node::decl(["x"]),
            Node::if_else(
                Node::var("x").lt(Node::int(0)),
                Node::assign("x", Node::int(0)),
                Node::assign("x", Node::int(1)),
            ),
        ]));

        // Decl, PreIf, then-assign, PreElse, else-assign, Merge.
        assert_eq!(graph.len(), 6);
        assert!(matches!(graph.locations()[1].kind, LocationKind::PreIf { pred: 0, .. }));
        assert!(matches!(graph.locations()[3].kind, LocationKind::PreElse { pred: 0, .. }));
        let LocationKind::Merge { then_pred, else_pred } = graph.locations()[5].kind else {
            panic!("expected a merge");
        };
        assert_eq!((then_pred, else_pred), (2, 4));

        // The else-entry carries the negated comparison.
        let LocationKind::PreElse { guard, .. } = &graph.locations()[3].kind else {
            panic!("expected an else entry");
        };
        assert_eq!(guard.op, LogicOp::Geq);
    }

    #[test]
    fn missing_else_branch_merges_with_the_guard_entry() {
        let graph = build(Node::seq(vec![
            Node::decl(["x"]),
            Node::if_then(Node::var("x").eq(Node::int(0)), Node::assign("x", Node::int(99))),
        ]));

        // Decl, PreIf, assign, PreElse, Merge.
        assert_eq!(graph.len(), 5);
        let LocationKind::Merge { then_pred, else_pred } = graph.locations()[4].kind else {
            panic!("expected a merge");
        };
        assert_eq!((then_pred, else_pred), (2, 3));
    }

    #[test]
    fn loop_back_edge_is_patched() {
        let graph = build(Node::seq(vec![
            Node::decl(["i"]),
            Node::assign("i", Node::int(0)),
            Node::while_loop(
                Node::var("i").lt(Node::int(10)),
                Node::assign("i", Node::var("i").add(Node::int(1))),
            ),
        ]));

        // Decl, assign, PreWhile, body assign, PostWhile.
        assert_eq!(graph.len(), 5);
        let LocationKind::PreWhile { entry, body_tail, ref widen_vars, .. } = graph.locations()[2].kind else {
            panic!("expected a loop head");
        };
        assert_eq!((entry, body_tail), (1, 3));
        assert!(widen_vars.contains("i"));
        assert!(matches!(graph.locations()[4].kind, LocationKind::PostWhile { pred: 2, .. }));
    }

    #[test]
    fn empty_loop_body_self_loops() {
        let graph = build(Node::seq(vec![
            Node::decl(["i"]),
            Node::while_loop(Node::var("i").lt(Node::int(10)), Node::seq(vec![])),
        ]));

        let LocationKind::PreWhile { body_tail, .. } = graph.locations()[1].kind else {
            panic!("expected a loop head");
        };
        assert_eq!(body_tail, 1);
    }

    #[test]
    fn postconditions_are_collected_not_emitted() {
        let graph = build(Node::seq(vec![
            Node::decl(["x"]),
            Node::assign("x", Node::int(5)),
            Node::assertion(Node::var("x").eq(Node::int(5))),
        ]));

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.postconditions().len(), 1);
        assert_eq!(graph.postconditions()[0].op, LogicOp::Eq);
    }

    #[test]
    fn ill_formed_programs_are_rejected() {
        // Root must be a sequence.
        let err = LocationGraph::build(&Ast::new(Node::assign("x", Node::int(1)))).unwrap_err();
        assert!(matches!(err, AnalysisError::IllFormed { .. }));

        // A guard in expression position.
        let err = LocationGraph::build(&Ast::new(Node::seq(vec![Node::assign(
            "x",
            Node::var("y").lt(Node::int(3)),
        )])))
        .unwrap_err();
        assert!(matches!(err, AnalysisError::IllFormed { .. }));

        // Precondition bounds naming different variables.
        let bad_pre = Node::seq(vec![Node::seq(vec![{
            let lower = Node::var("x").ge(Node::int(0));
            let upper = Node::var("y").le(Node::int(9));
            let mut node = Node::precondition("x", 0, 9);
            node.children = vec![lower, upper];
            node
        }])]);
        let err = LocationGraph::build(&Ast::new(bad_pre)).unwrap_err();
        assert!(matches!(err, AnalysisError::IllFormed { .. }));
    }
}
