//! # Convex Collision
//!
//! Narrow-phase collision between convex shapes for a real-time 3D
//! simulation.
//!
//! ## Features
//!
//! - **GJK solver**: distance and intersection between any two support-mapped shapes
//! - **Persistent pair state**: each pair keeps its simplex between ticks for warm starts
//! - **Working sets**: per-shape candidate lists refreshed from a broad phase only when needed
//! - **Contacts and polygons**: feature extraction for contact points, polygon emission for sweeps
//!
//! ## Quick Start
//!
//! ```rust
//! use convex_collision::prelude::*;
//!
//! let cube = BoxConvex::new(Point3::origin(), Vec3::repeat(0.5));
//! let mut world = CollisionWorld::default();
//! let a = world.insert_shape(ShapeDesc::new(cube, ObjectId(1)));
//! let b = world.insert_shape(
//!     ShapeDesc::new(cube, ObjectId(2))
//!         .with_transform(Transform::from_translation(Vec3::new(3.0, 0.0, 0.0))),
//! );
//!
//! let link = world.link_state(a, b)?;
//! let distance = world.state_distance(link, f32::MAX)?;
//! assert!((distance - 2.0).abs() < 1e-3);
//! # Ok::<(), CollisionError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod collision;
pub mod config;
pub mod error;
pub mod foundation;
pub mod pool;
pub mod spatial;
pub mod world;

pub use error::{CollisionError, CollisionResult};

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        collision::{
            BoxConvex, CollisionMask, CollisionState, Contact, ContactList, ConvexFeature, ConvexShape,
            MeshHullConvex, ObjectId, OrientedBoxConvex, PlacedShape, PointCloudConvex, PolyCollector,
            PolyListSink, Polygon, ShapeKind, SolverStats, SupportMap, Termination, TetrahedronConvex,
        },
        config::{CollisionConfig, Config, ConfigFormat, SolverConfig, WorkingSetConfig},
        foundation::{
            bounds::Aabb,
            math::{Point3, Quat, Transform, Vec3},
        },
        pool::LinkId,
        spatial::{BroadPhase, BroadPhaseQuery, Candidate, GeometryIndex, OctreeConfig},
        world::{CollisionWorld, ShapeDesc, ShapeKey, WorldSnapshot},
        CollisionError, CollisionResult,
    };
}
