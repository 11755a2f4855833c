//! # Storing of flow problems in memory
//!
//! This module provides the data structures used to represent flow problems in
//! memory: the exact number type and the symbolic equation layer. Algorithms
//! keep their own working structures in `algorithm`.

pub mod equation;
pub mod rational;
