//! Broad-phase collaborator
//!
//! The collision world never walks the scene itself. It asks a
//! [`BroadPhase`] which candidate shapes overlap a query box and gets back
//! templates ([`Candidate`]) that it instantiates into its own registry.

pub mod octree;

pub use octree::{GeometryIndex, OctreeConfig};

use crate::collision::layers::CollisionMask;
use crate::collision::ObjectId;
use crate::foundation::bounds::Aabb;
use crate::world::{ShapeDesc, ShapeKey};

/// Region and filter of one broad-phase query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BroadPhaseQuery {
    /// World-space region to search
    pub bounds: Aabb,
    /// Categories the querying shape collides with
    pub mask: CollisionMask,
    /// Game object whose own geometry is skipped
    pub exclude: Option<ObjectId>,
}

/// A shape the broad phase found near a query box
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Shape that registers and later garbage-collects the instantiated candidate
    pub provider: ShapeKey,
    /// Geometry and identity of the candidate
    pub desc: ShapeDesc,
}

/// Source of candidate shapes for working-list refreshes
pub trait BroadPhase {
    /// Append every candidate whose world box overlaps `query.bounds`, whose
    /// category intersects `query.mask` and whose object is not excluded
    fn find_overlapping(&self, query: &BroadPhaseQuery, out: &mut Vec<Candidate>);
}

impl BroadPhase for Vec<Candidate> {
    fn find_overlapping(&self, query: &BroadPhaseQuery, out: &mut Vec<Candidate>) {
        out.extend(
            self.iter()
                .filter(|c| {
                    c.desc.category.intersects(query.mask)
                        && query.exclude != Some(c.desc.object)
                        && c.desc.world_bounds().intersects(&query.bounds)
                })
                .cloned(),
        );
    }
}
