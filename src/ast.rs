//! Typed AST for the analyzed language.
//!
//! The analyzer consumes a tree of [`Node`]s produced by an upstream parser.
//! Each node carries a kind tag, an optional payload (integer literal,
//! variable name, operator code) and an ordered list of children. The
//! construction helpers below build the same shapes programmatically, which
//! is how the tests and demo binaries create programs.
//!
//! Wrapping the root in [`Ast::new`] assigns every node a stable pre-order
//! [`NodeId`]; diagnostics and assertion verdicts refer back to nodes through
//! these ids. The tree is immutable from that point on.

use std::fmt;

use serde::Serialize;

/// Stable identifier of an AST node, assigned pre-order by [`Ast::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        };
        write!(f, "{s}")
    }
}

/// Comparison operator. `Lt`/`Gt` are strict, `Leq`/`Geq` are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LogicOp {
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
}

impl LogicOp {
    /// Logical negation of the comparison: `!(a < b)` is `a >= b`.
    ///
    /// Maps EQ↔NEQ, LT↔GEQ, LEQ↔GT.
    pub fn negated(self) -> Self {
        match self {
            LogicOp::Eq => LogicOp::Neq,
            LogicOp::Neq => LogicOp::Eq,
            LogicOp::Lt => LogicOp::Geq,
            LogicOp::Leq => LogicOp::Gt,
            LogicOp::Gt => LogicOp::Leq,
            LogicOp::Geq => LogicOp::Lt,
        }
    }
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogicOp::Eq => "==",
            LogicOp::Neq => "!=",
            LogicOp::Lt => "<",
            LogicOp::Leq => "<=",
            LogicOp::Gt => ">",
            LogicOp::Geq => ">=",
        };
        write!(f, "{s}")
    }
}

/// Kind tag (with payload) of an AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Integer literal; leaf.
    Integer(i64),
    /// Variable reference; leaf.
    Variable(String),
    /// Binary arithmetic; children = `[lhs, rhs]`.
    ArithOp(ArithOp),
    /// Comparison; children = `[lhs, rhs]`.
    LogicOp(LogicOp),
    /// Variable declarations; children = `[Variable, ...]`.
    Declaration,
    /// Assignment; children = `[Variable, expr]`.
    Assignment,
    /// Assumed bounds on one variable; children =
    /// `[LogicOp(Geq, var, lo), LogicOp(Leq, var, hi)]`.
    Precondition,
    /// Conditional; children = `[guard, then-block, else-block?]`.
    IfElse,
    /// Loop; children = `[guard, body-block]`.
    WhileLoop,
    /// Statement sequence; children = statements.
    Sequence,
    /// Assertion; children = `[LogicOp]`.
    PostCondition,
}

/// One node of the program tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        Node { id: NodeId(0), kind, children }
    }

    /// Integer literal.
    pub fn int(value: i64) -> Self {
        Node::new(NodeKind::Integer(value), Vec::new())
    }

    /// Variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Node::new(NodeKind::Variable(name.into()), Vec::new())
    }

    /// Addition: `self + other`.
    pub fn add(self, other: Self) -> Self {
        Node::new(NodeKind::ArithOp(ArithOp::Add), vec![self, other])
    }

    /// Subtraction: `self - other`.
    pub fn sub(self, other: Self) -> Self {
        Node::new(NodeKind::ArithOp(ArithOp::Sub), vec![self, other])
    }

    /// Multiplication: `self * other`.
    pub fn mul(self, other: Self) -> Self {
        Node::new(NodeKind::ArithOp(ArithOp::Mul), vec![self, other])
    }

    /// Division: `self / other`.
    pub fn div(self, other: Self) -> Self {
        Node::new(NodeKind::ArithOp(ArithOp::Div), vec![self, other])
    }

    /// Equality: `self == other`.
    pub fn eq(self, other: Self) -> Self {
        Node::new(NodeKind::LogicOp(LogicOp::Eq), vec![self, other])
    }

    /// Inequality: `self != other`.
    pub fn neq(self, other: Self) -> Self {
        Node::new(NodeKind::LogicOp(LogicOp::Neq), vec![self, other])
    }

    /// Less than: `self < other`.
    pub fn lt(self, other: Self) -> Self {
        Node::new(NodeKind::LogicOp(LogicOp::Lt), vec![self, other])
    }

    /// Less or equal: `self <= other`.
    pub fn le(self, other: Self) -> Self {
        Node::new(NodeKind::LogicOp(LogicOp::Leq), vec![self, other])
    }

    /// Greater than: `self > other`.
    pub fn gt(self, other: Self) -> Self {
        Node::new(NodeKind::LogicOp(LogicOp::Gt), vec![self, other])
    }

    /// Greater or equal: `self >= other`.
    pub fn ge(self, other: Self) -> Self {
        Node::new(NodeKind::LogicOp(LogicOp::Geq), vec![self, other])
    }

    /// Declaration of one or more variables: `int x, y;`.
    pub fn decl<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let children = names.into_iter().map(Node::var).collect();
        Node::new(NodeKind::Declaration, children)
    }

    /// Assignment: `name = expr;`.
    pub fn assign(name: impl Into<String>, expr: Self) -> Self {
        Node::new(NodeKind::Assignment, vec![Node::var(name), expr])
    }

    /// Assumed bounds: `assume lo <= name <= hi;`.
    pub fn precondition(name: impl Into<String> + Clone, lo: i64, hi: i64) -> Self {
        let lower = Node::var(name.clone()).ge(Node::int(lo));
        let upper = Node::var(name).le(Node::int(hi));
        Node::new(NodeKind::Precondition, vec![lower, upper])
    }

    /// Conditional with both branches.
    pub fn if_else(guard: Self, then_block: Self, else_block: Self) -> Self {
        Node::new(NodeKind::IfElse, vec![guard, then_block, else_block])
    }

    /// Conditional without an else branch.
    pub fn if_then(guard: Self, then_block: Self) -> Self {
        Node::new(NodeKind::IfElse, vec![guard, then_block])
    }

    /// Loop: `while (guard) body`.
    pub fn while_loop(guard: Self, body: Self) -> Self {
        Node::new(NodeKind::WhileLoop, vec![guard, body])
    }

    /// Statement sequence.
    pub fn seq(stmts: Vec<Self>) -> Self {
        Node::new(NodeKind::Sequence, stmts)
    }

    /// Assertion: `assert(guard);`.
    pub fn assertion(guard: Self) -> Self {
        Node::new(NodeKind::PostCondition, vec![guard])
    }

    /// The variable name, if this node is a [`NodeKind::Variable`].
    pub fn var_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Variable(name) => Some(name),
            _ => None,
        }
    }
}

/// A numbered, immutable program tree rooted at a [`NodeKind::Sequence`].
#[derive(Debug, Clone)]
pub struct Ast {
    root: Node,
}

impl Ast {
    /// Wrap a program tree, assigning pre-order ids to every node.
    pub fn new(mut root: Node) -> Self {
        let mut next = 0;
        number(&mut root, &mut next);
        Ast { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

fn number(node: &mut Node, next: &mut u32) {
    node.id = NodeId(*next);
    *next += 1;
    for child in &mut node.children {
        number(child, next);
    }
}
