//! # Algorithms
//!
//! The pipeline a flow problem runs through: presolve substitution in
//! [`simplify`], the exact two-phase simplex in [`tableau`] and the
//! orchestration in [`solver`].
use std::ops::{BitOr, BitOrAssign};

pub mod simplify;
pub mod solver;
pub mod tableau;

/// The outcome of a solve, ordered from best to worst.
///
/// Results combine with `|`, which keeps the worse of the two. A composite
/// solve can thereby fold the outcomes of its parts into a single verdict
/// without losing the most severe one.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SolveRes {
    /// No solve has happened yet.
    Unsolved,
    /// There was nothing to do.
    Noop,
    /// An optimum was found; uniqueness was not established.
    Optimal,
    /// An optimum was found and each prioritized flow has a unique rate.
    Unique,
    /// An optimum was found but some machine rates can vary without changing
    /// any objective.
    Multi,
    /// An optimum was found with at least one prioritized flow below the rate
    /// it reached when optimized alone.
    Ok,
    /// Only part of the problem could be satisfied.
    Partial,
    /// A maximized flow grew without bound.
    Unbounded,
}

impl SolveRes {
    /// Whether the outcome counts as a success.
    #[must_use]
    pub fn ok(&self) -> bool {
        *self < Self::Partial
    }

    /// Whether the solve failed outright.
    #[must_use]
    pub fn failed(&self) -> bool {
        *self >= Self::Unbounded
    }
}

impl BitOr for SolveRes {
    type Output = Self;

    /// The join: the worse of the two outcomes.
    fn bitor(self, rhs: Self) -> Self {
        self.max(rhs)
    }
}

impl BitOrAssign for SolveRes {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = (*self).max(rhs);
    }
}
