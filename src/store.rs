//! Abstract store: a total mapping from variable names to intervals.
//!
//! The store is the point-wise lifting of the interval lattice. Any variable
//! without an explicit binding is implicitly ⊤, and all operations honor
//! that normalization: a store binding `x ↦ ⊤` and a store not mentioning
//! `x` are the same element.
//!
//! A distinguished bottom store represents the unreachable state. Binding
//! any variable to ⊥ collapses the whole store to bottom, since no concrete
//! environment can give a variable zero possible values.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::domain::Lattice;
use crate::interval::Interval;

/// Variable environment of the analysis: `name → Interval`.
#[derive(Debug, Clone, Serialize)]
pub struct Store {
    map: BTreeMap<String, Interval>,
    bottom: bool,
}

impl Store {
    /// The top store: every variable unconstrained.
    pub fn new() -> Self {
        Store {
            map: BTreeMap::new(),
            bottom: false,
        }
    }

    /// The unreachable store.
    pub fn bottom() -> Self {
        Store {
            map: BTreeMap::new(),
            bottom: true,
        }
    }

    /// A store binding each named variable to ⊤ explicitly.
    pub fn with_top_bindings<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let map = names.into_iter().map(|n| (n.into(), Interval::top())).collect();
        Store { map, bottom: false }
    }

    pub fn is_bottom(&self) -> bool {
        self.bottom
    }

    /// The interval of a variable; ⊤ if unbound, ⊥ in the bottom store.
    pub fn get(&self, var: &str) -> Interval {
        if self.bottom {
            return Interval::bottom();
        }
        self.map.get(var).copied().unwrap_or_else(Interval::top)
    }

    /// Bind or overwrite a variable. An empty interval collapses the store
    /// to bottom; on a bottom store this is a no-op.
    pub fn set(&mut self, var: impl Into<String>, interval: Interval) {
        if self.bottom {
            return;
        }
        if interval.is_empty() {
            self.map.clear();
            self.bottom = true;
        } else {
            self.map.insert(var.into(), interval);
        }
    }

    /// Forget a binding, returning the variable to ⊤.
    pub fn remove(&mut self, var: &str) {
        self.map.remove(var);
    }

    /// Variables with an explicit binding, in name order.
    pub fn vars(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    fn key_union<'a>(&'a self, other: &'a Store) -> BTreeSet<&'a String> {
        self.map.keys().chain(other.map.keys()).collect()
    }

    /// `self ⊑ other`: every variable at least as precise, over the union of
    /// bound names (unbound counts as ⊤ on either side).
    pub fn le(&self, other: &Store) -> bool {
        if self.bottom {
            return true;
        }
        if other.bottom {
            return false;
        }
        self.key_union(other).into_iter().all(|var| self.get(var).le(&other.get(var)))
    }

    /// Point-wise join over the union of bound names.
    pub fn join(&self, other: &Store) -> Store {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let mut result = Store::new();
        for var in self.key_union(other) {
            result.set(var.clone(), self.get(var).join(&other.get(var)));
        }
        result
    }

    /// Point-wise meet; any variable meeting to ⊥ makes the result bottom.
    pub fn meet(&self, other: &Store) -> Store {
        if self.bottom || other.bottom {
            return Store::bottom();
        }
        let mut result = Store::new();
        for var in self.key_union(other) {
            result.set(var.clone(), self.get(var).meet(&other.get(var)));
            if result.bottom {
                return Store::bottom();
            }
        }
        result
    }

    /// Point-wise widening over the union of bound names; `self` is the
    /// previous value.
    pub fn widen(&self, other: &Store) -> Store {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let mut result = Store::new();
        for var in self.key_union(other) {
            result.set(var.clone(), self.get(var).widen(&other.get(var)));
        }
        result
    }

    /// Widening restricted to `vars`: those widen against the previous value
    /// `self`, every other variable simply takes its value from `other`.
    ///
    /// This is the loop-head discipline: only variables the loop can change
    /// (guard variables and the body's assigned set) need extrapolation.
    pub fn widen_selective(&self, other: &Store, vars: &BTreeSet<String>) -> Store {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let mut result = Store::new();
        for var in self.key_union(other) {
            let value = if vars.contains(var.as_str()) {
                self.get(var).widen(&other.get(var))
            } else {
                other.get(var)
            };
            result.set(var.clone(), value);
        }
        result
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

/// Normalized equality: bottom stores are all equal, and an unbound variable
/// equals an explicit ⊤ binding.
impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        if self.bottom || other.bottom {
            return self.bottom == other.bottom;
        }
        self.key_union(other).into_iter().all(|var| self.get(var) == other.get(var))
    }
}

impl Eq for Store {}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bottom {
            return write!(f, "⊥");
        }
        write!(f, "{{")?;
        for (i, (var, interval)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var} ∈ {interval}")?;
        }
        write!(f, "}}")
    }
}

impl Lattice for Store {
    fn bottom() -> Self {
        Store::bottom()
    }

    fn top() -> Self {
        Store::new()
    }

    fn is_bottom(&self) -> bool {
        self.bottom
    }

    fn le(&self, other: &Self) -> bool {
        Store::le(self, other)
    }

    fn join(&self, other: &Self) -> Self {
        Store::join(self, other)
    }

    fn meet(&self, other: &Self) -> Self {
        Store::meet(self, other)
    }

    fn widen(&self, other: &Self) -> Self {
        Store::widen(self, other)
    }
}
