//! arbor Tree Builder - Tree reconstruction from exported arrays
//!
//! This crate turns the flat parallel arrays produced by
//! `DecisionTree::flatten` back into a `DecisionTree`, by replaying each
//! recorded split onto a fresh tree through the same `split` operation the
//! grower uses.

pub mod rebuild;

pub use rebuild::{rebuild, rebuild_from};
