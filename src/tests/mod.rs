//! # End-to-end solves of small conversion networks.
//!
//! Each module builds an [`crate::EqSystem`] the way a network model would,
//! runs a full [`crate::Solver`] pass and checks the verdict together with
//! the exact rates.
pub mod priorities;
pub mod shortfall;
