//! Narrow-phase convex collision
//!
//! Shapes are described only by their support mapping. Two placed shapes are
//! compared by a GJK solver that works on their Minkowski difference and
//! keeps its simplex in a persistent [`CollisionState`] between ticks.
//!
//! # Module Organization
//!
//! - [`shape`] - The closed set of convex shape variants and their contract
//! - [`gjk`] - Distance / intersection solver and its per-pair state
//! - [`feature`] - Local surface patches and contact generation
//! - [`poly_list`] - Polygon emission for the swept-movement consumer
//! - [`layers`] - Category masks for candidate filtering

pub mod feature;
pub mod gjk;
pub mod layers;
pub mod poly_list;
pub mod shape;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use feature::{Contact, ContactList, ConvexFeature, MAX_CONTACTS};
pub use gjk::{CollisionState, PlacedShape, SolverStats, Termination};
pub use layers::CollisionMask;
pub use poly_list::{PolyCollector, PolyListSink, Polygon};
pub use shape::{
    BoxConvex, ConvexShape, MeshHullConvex, OrientedBoxConvex, PointCloudConvex, ShapeKind,
    SupportMap, TetrahedronConvex,
};

/// Identifier of the game object a shape represents
///
/// The collision code never dereferences it; it is only handed back to
/// callers in contacts and polygons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);
