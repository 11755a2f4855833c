//! # An exact production-flow solver
//!
//! Computes the throttle each machine group in a conversion network must run
//! at so that every intermediate flow balances, using the two-phase Simplex
//! Method over exact rational numbers with lexicographically ordered
//! objective tiers. Exact arithmetic makes every solve reproducible: the same
//! system yields the same rates, bit for bit.
#![warn(missing_docs)]

pub mod algorithm;
pub mod config;
pub mod data;

#[cfg(test)]
mod tests;

pub use crate::algorithm::solver::{Solution, Solver, ThrottleSink};
pub use crate::algorithm::SolveRes;
pub use crate::config::SolverConfig;
pub use crate::data::equation::{EqSystem, EqTag, LinearEq, RelOp, Term, Terms, Var, VarId};
pub use crate::data::rational::{div, ArithmeticError, FloatPolicy, NumericPolicy, Rational};
