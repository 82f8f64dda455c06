//! Core lattice trait and test utilities.

use std::fmt::Debug;

/// Lattice interface shared by the abstract values of this analyzer.
///
/// Both [`Interval`](crate::interval::Interval) and [`Store`](crate::store::Store)
/// implement this trait, so the fixpoint machinery and the lattice-law tests
/// can treat them uniformly.
///
/// # Lattice Properties
///
/// An implementation must satisfy:
/// - Reflexivity: `∀a. a ⊑ a`
/// - Transitivity: `∀a,b,c. a ⊑ b ∧ b ⊑ c ⇒ a ⊑ c`
/// - Antisymmetry: `∀a,b. a ⊑ b ∧ b ⊑ a ⇒ a = b`
/// - Join/Meet properties: see lattice theory
pub trait Lattice: Clone + Debug + PartialEq + Sized {
    /// The bottom element (⊥): represents the empty set of states.
    fn bottom() -> Self;

    /// The top element (⊤): represents all possible states.
    fn top() -> Self;

    /// Check if this element is bottom.
    fn is_bottom(&self) -> bool;

    /// Partial order: `self ⊑ other` (self is at least as precise as other).
    fn le(&self, other: &Self) -> bool;

    /// Join (`⊔`): least upper bound, over-approximation.
    ///
    /// Represents union of state sets; ⊥ is the identity.
    fn join(&self, other: &Self) -> Self;

    /// Meet (`⊓`): greatest lower bound, refinement.
    ///
    /// Represents intersection of state sets; ⊥ is absorbing.
    fn meet(&self, other: &Self) -> Self;

    /// Widening (`∇`): accelerates convergence in fixpoint computation.
    ///
    /// `self` is the previous value, `other` the new one. Must satisfy
    /// `self ⊑ self ∇ other` and `other ⊑ self ∇ other`, and every ascending
    /// chain interleaved with `∇` must stabilize in finitely many steps.
    ///
    /// **Why no default?** Widening must extrapolate (to ±∞ here) to force
    /// termination on ascending chains; join would not guarantee this.
    fn widen(&self, other: &Self) -> Self;
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Test helper: validate the lattice axioms on a set of sample elements.
    pub fn assert_lattice_axioms<T: Lattice>(samples: &[T]) {
        for a in samples {
            // Reflexivity: a ⊑ a
            assert!(a.le(a), "reflexivity failed for {a:?}");

            // Identity: a ⊔ ⊥ = a
            assert_eq!(&a.join(&T::bottom()), a, "join with bottom failed");

            // Absorption: a ⊓ ⊥ = ⊥
            assert!(a.meet(&T::bottom()).is_bottom(), "meet with bottom failed");

            // Identity: a ⊓ ⊤ = a
            assert_eq!(&a.meet(&T::top()), a, "meet with top failed");

            // Absorption: a ⊔ ⊤ = ⊤
            assert_eq!(a.join(&T::top()), T::top(), "join with top failed");

            // Idempotence
            assert_eq!(&a.join(a), a, "join idempotence failed");
            assert_eq!(&a.meet(a), a, "meet idempotence failed");
        }

        for a in samples {
            for b in samples {
                // Commutativity
                assert_eq!(a.join(b), b.join(a), "join commutativity failed");
                assert_eq!(a.meet(b), b.meet(a), "meet commutativity failed");

                // Join is an upper bound, meet a lower bound
                let joined = a.join(b);
                assert!(a.le(&joined), "join is not an upper bound of a");
                assert!(b.le(&joined), "join is not an upper bound of b");
                let met = a.meet(b);
                assert!(met.le(a), "meet is not a lower bound of a");
                assert!(met.le(b), "meet is not a lower bound of b");

                // Widening is extensive in both arguments
                let widened = a.widen(b);
                assert!(a.le(&widened), "widening is not extensive in the previous value");
                assert!(b.le(&widened), "widening is not extensive in the new value");

                for c in samples {
                    // Associativity
                    assert_eq!(a.join(b).join(c), a.join(&b.join(c)), "join associativity failed");
                    assert_eq!(a.meet(b).meet(c), a.meet(&b.meet(c)), "meet associativity failed");
                }
            }
        }
    }

    /// Test helper: the widening sequence `xₙ₊₁ = xₙ ∇ (xₙ ⊔ f(xₙ))` must
    /// reach a fixed element in finitely many steps.
    pub fn assert_widening_stabilizes<T: Lattice>(start: T, step: impl Fn(&T) -> T, limit: usize) {
        let mut x = start;
        for _ in 0..limit {
            let next = x.widen(&x.join(&step(&x)));
            if next == x {
                return;
            }
            x = next;
        }
        panic!("widening chain did not stabilize within {limit} steps");
    }
}
