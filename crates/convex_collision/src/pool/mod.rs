//! Pool-backed link lists
//!
//! Working lists and state lists are both [`Relation`]s: each link lives in
//! a list on either end, and linking or unlinking always updates both.

pub mod relation;

pub use relation::{LaneIter, LinkId, Relation};
