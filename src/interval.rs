//! Interval abstract domain.
//!
//! Tracks a lower and upper bound per value. Simple and efficient, at the
//! cost of all relational information between variables.
//!
//! # Lattice Structure
//!
//! Elements are intervals `[l, h]` over extended integers:
//!
//! - **Order** (`⊑`): `[l₁, h₁] ⊑ [l₂, h₂]` iff `l₂ ≤ l₁` and `h₁ ≤ h₂` (containment)
//! - **Join** (`⊔`): `[min(l₁, l₂), max(h₁, h₂)]` (convex hull)
//! - **Meet** (`⊓`): `[max(l₁, l₂), min(h₁, h₂)]` (intersection)
//! - **Bottom** (`⊥`): the empty interval, canonically `[+∞, −∞]`
//! - **Top** (`⊤`): `[−∞, +∞]`
//!
//! There is exactly one bottom representation: every constructor normalizes
//! an inverted pair of bounds to [`Interval::BOTTOM`].
//!
//! Abstract arithmetic is saturating: a finite bound that overflows i64
//! escapes to the corresponding infinity, and the operation reports the
//! saturation through [`ArithEffects`] so the caller can emit a
//! possible-overflow diagnostic. Comparisons are handled by [`Interval::filter`],
//! a backward restriction of the left operand, never by an abstract
//! true/false answer, which would be unsound for non-singleton intervals.

use std::cmp::{max, min};
use std::fmt;

use serde::Serialize;

use crate::ast::{ArithOp, LogicOp};
use crate::domain::Lattice;

/// Bound of an interval: `-∞`, finite value, or `+∞`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Bound {
    NegInf,
    Finite(i64),
    PosInf,
}

impl Bound {
    pub fn as_finite(self) -> Option<i64> {
        match self {
            Bound::Finite(n) => Some(n),
            _ => None,
        }
    }

    fn is_negative(self) -> bool {
        match self {
            Bound::NegInf => true,
            Bound::Finite(n) => n < 0,
            Bound::PosInf => false,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-∞"),
            Bound::Finite(n) => write!(f, "{n}"),
            Bound::PosInf => write!(f, "+∞"),
        }
    }
}

fn add_bounds(a: Bound, b: Bound, saturated: &mut bool) -> Bound {
    use Bound::*;
    match (a, b) {
        (Finite(x), Finite(y)) => match x.checked_add(y) {
            Some(v) => Finite(v),
            None => {
                *saturated = true;
                if x < 0 {
                    NegInf
                } else {
                    PosInf
                }
            }
        },
        (NegInf, PosInf) | (PosInf, NegInf) => PosInf,
        (NegInf, _) | (_, NegInf) => NegInf,
        (PosInf, _) | (_, PosInf) => PosInf,
    }
}

fn sub_bounds(a: Bound, b: Bound, saturated: &mut bool) -> Bound {
    use Bound::*;
    match (a, b) {
        (Finite(x), Finite(y)) => match x.checked_sub(y) {
            Some(v) => Finite(v),
            None => {
                *saturated = true;
                if x < 0 {
                    NegInf
                } else {
                    PosInf
                }
            }
        },
        (PosInf, NegInf) => PosInf,
        (NegInf, PosInf) => NegInf,
        (PosInf, _) => PosInf,
        (NegInf, _) => NegInf,
        (_, PosInf) => NegInf,
        (_, NegInf) => PosInf,
    }
}

fn mul_bounds(a: Bound, b: Bound, saturated: &mut bool) -> Bound {
    use Bound::*;
    match (a, b) {
        (Finite(x), Finite(y)) => match x.checked_mul(y) {
            Some(v) => Finite(v),
            None => {
                *saturated = true;
                if (x < 0) != (y < 0) {
                    NegInf
                } else {
                    PosInf
                }
            }
        },
        (Finite(0), _) | (_, Finite(0)) => Finite(0),
        _ => {
            if a.is_negative() != b.is_negative() {
                NegInf
            } else {
                PosInf
            }
        }
    }
}

// Only called with a divisor bound that is not zero (callers exclude
// intervals containing 0 beforehand).
fn div_bounds(a: Bound, b: Bound, saturated: &mut bool) -> Bound {
    use Bound::*;
    match (a, b) {
        (Finite(x), Finite(y)) => match x.checked_div(y) {
            Some(v) => Finite(v),
            // i64::MIN / -1
            None => {
                *saturated = true;
                PosInf
            }
        },
        (Finite(_), NegInf | PosInf) => Finite(0),
        _ => {
            if a.is_negative() != b.is_negative() {
                NegInf
            } else {
                PosInf
            }
        }
    }
}

fn neg_bound(b: Bound) -> Bound {
    match b {
        Bound::NegInf => Bound::PosInf,
        Bound::PosInf => Bound::NegInf,
        Bound::Finite(n) => n.checked_neg().map(Bound::Finite).unwrap_or(Bound::PosInf),
    }
}

/// Successor of a bound; infinities are their own successor.
fn succ(b: Bound) -> Bound {
    match b {
        Bound::Finite(n) => Bound::Finite(n.saturating_add(1)),
        other => other,
    }
}

/// Predecessor of a bound; infinities are their own predecessor.
fn pred(b: Bound) -> Bound {
    match b {
        Bound::Finite(n) => Bound::Finite(n.saturating_sub(1)),
        other => other,
    }
}

/// Side effects of an abstract arithmetic operation, feeding diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArithEffects {
    /// A finite bound overflowed i64 and escaped to an infinity.
    pub saturated: bool,
    /// The divisor interval contained zero.
    pub div_by_zero: bool,
}

/// Interval `[low, high]`, or the empty interval when `low > high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    pub low: Bound,
    pub high: Bound,
}

impl Interval {
    /// The canonical empty interval.
    pub const BOTTOM: Self = Self {
        low: Bound::PosInf,
        high: Bound::NegInf,
    };

    /// Normalizing constructor: any inverted pair collapses to [`Self::BOTTOM`].
    pub fn new(low: Bound, high: Bound) -> Self {
        if low > high {
            Self::BOTTOM
        } else {
            Self { low, high }
        }
    }

    /// The singleton interval `[value, value]`.
    pub fn constant(value: i64) -> Self {
        Self {
            low: Bound::Finite(value),
            high: Bound::Finite(value),
        }
    }

    /// The finite interval `[low, high]` (empty if `low > high`).
    pub fn range(low: i64, high: i64) -> Self {
        Self::new(Bound::Finite(low), Bound::Finite(high))
    }

    pub fn top() -> Self {
        Self {
            low: Bound::NegInf,
            high: Bound::PosInf,
        }
    }

    pub fn bottom() -> Self {
        Self::BOTTOM
    }

    pub fn is_empty(&self) -> bool {
        self.low > self.high
    }

    pub fn is_top(&self) -> bool {
        self.low == Bound::NegInf && self.high == Bound::PosInf
    }

    pub fn contains(&self, value: i64) -> bool {
        self.low <= Bound::Finite(value) && Bound::Finite(value) <= self.high
    }

    /// The single member of the interval, if it is a singleton.
    pub fn as_constant(&self) -> Option<i64> {
        match (self.low, self.high) {
            (Bound::Finite(l), Bound::Finite(h)) if l == h => Some(l),
            _ => None,
        }
    }

    pub fn join(&self, other: &Interval) -> Interval {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval {
            low: min(self.low, other.low),
            high: max(self.high, other.high),
        }
    }

    pub fn meet(&self, other: &Interval) -> Interval {
        Interval::new(max(self.low, other.low), min(self.high, other.high))
    }

    /// `self ⊑ other`: containment, with ⊥ below everything.
    pub fn le(&self, other: &Interval) -> bool {
        if self.is_empty() {
            return true;
        }
        if other.is_empty() {
            return false;
        }
        other.low <= self.low && self.high <= other.high
    }

    /// Widening: `self` is the previous value, `other` the new one. A bound
    /// that grew since the previous iteration escapes to the corresponding
    /// infinity.
    pub fn widen(&self, other: &Interval) -> Interval {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let low = if other.low < self.low { Bound::NegInf } else { self.low };
        let high = if other.high > self.high { Bound::PosInf } else { self.high };
        Interval { low, high }
    }

    /// Negation: `-[a, b] = [-b, -a]`.
    pub fn neg(&self) -> Interval {
        if self.is_empty() {
            return Self::BOTTOM;
        }
        Interval::new(neg_bound(self.high), neg_bound(self.low))
    }

    /// Abstract binary arithmetic, reporting saturation and division-by-zero
    /// through the returned [`ArithEffects`].
    ///
    /// Division: a divisor that is exactly `{0}` yields ⊥; a divisor that
    /// contains 0 among other values yields ⊤. Both report `div_by_zero`.
    pub fn eval_binop(op: ArithOp, lhs: &Interval, rhs: &Interval) -> (Interval, ArithEffects) {
        let mut effects = ArithEffects::default();
        if lhs.is_empty() || rhs.is_empty() {
            return (Self::BOTTOM, effects);
        }
        let sat = &mut effects.saturated;
        let value = match op {
            ArithOp::Add => Interval::new(
                add_bounds(lhs.low, rhs.low, sat),
                add_bounds(lhs.high, rhs.high, sat),
            ),
            ArithOp::Sub => Interval::new(
                sub_bounds(lhs.low, rhs.high, sat),
                sub_bounds(lhs.high, rhs.low, sat),
            ),
            ArithOp::Mul => {
                let corners = [
                    mul_bounds(lhs.low, rhs.low, sat),
                    mul_bounds(lhs.low, rhs.high, sat),
                    mul_bounds(lhs.high, rhs.low, sat),
                    mul_bounds(lhs.high, rhs.high, sat),
                ];
                envelope(corners)
            }
            ArithOp::Div => {
                if rhs.contains(0) {
                    effects.div_by_zero = true;
                    if rhs.as_constant() == Some(0) {
                        Self::BOTTOM
                    } else {
                        Self::top()
                    }
                } else {
                    let corners = [
                        div_bounds(lhs.low, rhs.low, sat),
                        div_bounds(lhs.low, rhs.high, sat),
                        div_bounds(lhs.high, rhs.low, sat),
                        div_bounds(lhs.high, rhs.high, sat),
                    ];
                    envelope(corners)
                }
            }
        };
        (value, effects)
    }

    /// `self + other`, dropping effect tracking.
    pub fn add(&self, other: &Interval) -> Interval {
        Self::eval_binop(ArithOp::Add, self, other).0
    }

    /// `self - other`, dropping effect tracking.
    pub fn sub(&self, other: &Interval) -> Interval {
        Self::eval_binop(ArithOp::Sub, self, other).0
    }

    /// `self * other`, dropping effect tracking.
    pub fn mul(&self, other: &Interval) -> Interval {
        Self::eval_binop(ArithOp::Mul, self, other).0
    }

    /// `self / other`, dropping effect tracking.
    pub fn div(&self, other: &Interval) -> Interval {
        Self::eval_binop(ArithOp::Div, self, other).0
    }

    /// Backward restriction of `self` (the left operand) by the truth of
    /// `self op other`.
    ///
    /// Returns the subset of `self` that can satisfy the comparison against
    /// some member of `other`; ⊥ when no member can. Sound by construction:
    /// for all `a ∈ self`, `b ∈ other` with `a op b` true, `a` is contained
    /// in the result. Inequality against a non-singleton right operand
    /// cannot be narrowed in the interval domain and returns `self`.
    pub fn filter(&self, op: LogicOp, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Self::BOTTOM;
        }
        let (a, b) = (self.low, self.high);
        let (c, d) = (other.low, other.high);
        match op {
            LogicOp::Eq => self.meet(other),
            LogicOp::Neq => match other.as_constant() {
                Some(v) if self.as_constant() == Some(v) => Self::BOTTOM,
                Some(v) if a == Bound::Finite(v) => Interval::new(succ(a), b),
                Some(v) if b == Bound::Finite(v) => Interval::new(a, pred(b)),
                _ => *self,
            },
            LogicOp::Lt => Interval::new(a, min(b, pred(d))),
            LogicOp::Leq => Interval::new(a, min(b, d)),
            LogicOp::Gt => Interval::new(max(a, succ(c)), b),
            LogicOp::Geq => Interval::new(max(a, c), b),
        }
    }
}

fn envelope(corners: [Bound; 4]) -> Interval {
    let low = corners.into_iter().min().unwrap_or(Bound::NegInf);
    let high = corners.into_iter().max().unwrap_or(Bound::PosInf);
    Interval::new(low, high)
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "⊥")
        } else {
            write!(f, "[{}, {}]", self.low, self.high)
        }
    }
}

impl Lattice for Interval {
    fn bottom() -> Self {
        Self::BOTTOM
    }

    fn top() -> Self {
        Interval::top()
    }

    fn is_bottom(&self) -> bool {
        self.is_empty()
    }

    fn le(&self, other: &Self) -> bool {
        Interval::le(self, other)
    }

    fn join(&self, other: &Self) -> Self {
        Interval::join(self, other)
    }

    fn meet(&self, other: &Self) -> Self {
        Interval::meet(self, other)
    }

    fn widen(&self, other: &Self) -> Self {
        Interval::widen(self, other)
    }
}
