//! Octree spatial partitioning of candidate geometry
//!
//! Divides 3D space into hierarchical regions so that a broad-phase query
//! only visits nodes near the query box. Each node subdivides into 8
//! octants when entry density exceeds a threshold.
//!
//! Entries are bucketed by the centre of their world box. Queries are
//! expanded by the largest half extent ever inserted, so a shape whose box
//! reaches into a neighbouring node is still found.

use super::{BroadPhase, BroadPhaseQuery, Candidate};
use crate::collision::layers::CollisionMask;
use crate::collision::shape::TetrahedronConvex;
use crate::collision::ObjectId;
use crate::foundation::bounds::Aabb;
use crate::foundation::collections::FreeList;
use crate::foundation::math::{Point3, Vec3};
use crate::world::{ShapeDesc, ShapeKey};
use log::debug;
use serde::{Deserialize, Serialize};

/// Configuration for octree behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Maximum entries per node before subdivision
    pub max_entities_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Minimum node size (prevents excessive subdivision)
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_entities_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct NodeEntry {
    id: usize,
    center: Point3,
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
struct OctreeNode {
    bounds: Aabb,
    entries: Vec<NodeEntry>,
    children: Option<Box<[OctreeNode; 8]>>,
    depth: u32,
}

impl OctreeNode {
    fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            entries: Vec::new(),
            children: None,
            depth,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    // Octant layout: bit 0 = +X, bit 1 = +Y, bit 2 = +Z
    fn octant(&self, position: &Point3) -> usize {
        let center = self.bounds.center();
        usize::from(position.x >= center.x)
            | (usize::from(position.y >= center.y) << 1)
            | (usize::from(position.z >= center.z) << 2)
    }

    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }

        let center = self.bounds.center();
        let quarter_extents = self.bounds.extents() * 0.5;
        let depth = self.depth + 1;
        let mut children: Box<[OctreeNode; 8]> = Box::new(std::array::from_fn(|octant| {
            let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
            let offset = Vec3::new(
                quarter_extents.x * sign(1),
                quarter_extents.y * sign(2),
                quarter_extents.z * sign(4),
            );
            OctreeNode::new(Aabb::from_center_extents(center + offset, quarter_extents), depth)
        }));

        for entry in std::mem::take(&mut self.entries) {
            children[self.octant(&entry.center)].entries.push(entry);
        }
        self.children = Some(children);
    }

    fn insert(&mut self, entry: NodeEntry, config: &OctreeConfig) -> bool {
        if !self.bounds.contains_point(&entry.center) {
            return false;
        }

        if self.is_leaf() {
            let should_subdivide = self.entries.len() >= config.max_entities_per_node
                && self.depth < config.max_depth
                && self.bounds.extents().x > config.min_node_size;
            if !should_subdivide {
                self.entries.push(entry);
                return true;
            }
            self.subdivide();
        }

        let octant = self.octant(&entry.center);
        match self.children.as_mut() {
            Some(children) => children[octant].insert(entry, config),
            None => false,
        }
    }

    /// Entries only ever move down their octant path, so the search follows it
    fn remove(&mut self, id: usize, center: &Point3) -> bool {
        if let Some(index) = self.entries.iter().position(|e| e.id == id) {
            self.entries.swap_remove(index);
            return true;
        }
        let octant = self.octant(center);
        self.children
            .as_mut()
            .is_some_and(|children| children[octant].remove(id, center))
    }

    fn visit(&self, region: &Aabb, found: &mut impl FnMut(usize)) {
        if !self.bounds.intersects(region) {
            return;
        }
        for entry in &self.entries {
            if region.contains_point(&entry.center) {
                found(entry.id);
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.visit(region, found);
            }
        }
    }

    fn count_entries(&self) -> usize {
        self.entries.len()
            + self
                .children
                .as_ref()
                .map_or(0, |children| children.iter().map(OctreeNode::count_entries).sum())
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    provider: ShapeKey,
    desc: ShapeDesc,
    bounds: Aabb,
    enabled: bool,
}

/// Octree of candidate shape templates implementing [`BroadPhase`]
///
/// Every entry names the provider shape that will register the candidate
/// in the collision world. Entries whose centre lies outside the root
/// bounds are kept in a flat overflow list that every query scans.
#[derive(Debug, Clone)]
pub struct GeometryIndex {
    root: OctreeNode,
    config: OctreeConfig,
    entries: FreeList<IndexEntry>,
    outside: Vec<usize>,
    max_half_extent: f32,
}

impl GeometryIndex {
    /// Create an empty index covering `world_bounds`
    pub fn new(world_bounds: Aabb, config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(world_bounds, 0),
            config,
            entries: FreeList::new(),
            outside: Vec::new(),
            max_half_extent: 0.0,
        }
    }

    /// Add a candidate template; returns its entry id
    pub fn insert(&mut self, provider: ShapeKey, desc: ShapeDesc) -> usize {
        let bounds = desc.world_bounds();
        let center = bounds.center();
        self.max_half_extent = self.max_half_extent.max(bounds.max_extent());
        let id = self.entries.insert(IndexEntry {
            provider,
            desc,
            bounds,
            enabled: true,
        });
        if !self.root.insert(NodeEntry { id, center }, &self.config) {
            debug!("Geometry entry {id} centred at {center:?} lies outside the octree root");
            self.outside.push(id);
        }
        id
    }

    /// Remove an entry and hand back its template
    ///
    /// The query expansion keeps the largest half extent ever inserted.
    pub fn remove(&mut self, id: usize) -> Option<ShapeDesc> {
        let entry = self.entries.remove(id)?;
        if let Some(index) = self.outside.iter().position(|&o| o == id) {
            self.outside.swap_remove(index);
        } else {
            self.root.remove(id, &entry.bounds.center());
        }
        Some(entry.desc)
    }

    /// Template of a live entry
    pub fn get(&self, id: usize) -> Option<&ShapeDesc> {
        self.entries.get(id).map(|entry| &entry.desc)
    }

    /// Enable or disable every entry of `object`; returns how many changed
    pub fn set_enabled(&mut self, object: ObjectId, enabled: bool) -> usize {
        let ids: Vec<usize> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.desc.object == object && entry.enabled != enabled)
            .map(|(id, _)| id)
            .collect();
        for &id in &ids {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.enabled = enabled;
            }
        }
        ids.len()
    }

    /// Carve a tetrahedron below every terrain triangle
    ///
    /// Each tetrahedron gets the triangle's index as its feature id and the
    /// `TERRAIN` category. Returns the entry ids in triangle order.
    pub fn insert_terrain_triangles(
        &mut self,
        provider: ShapeKey,
        object: ObjectId,
        material: u32,
        triangles: &[[Point3; 3]],
        depth: f32,
    ) -> Vec<usize> {
        let ids: Vec<usize> = triangles
            .iter()
            .zip(0u32..)
            .map(|(&[p0, p1, p2], feature_id)| {
                let desc = ShapeDesc::new(TetrahedronConvex::from_surface_triangle(p0, p1, p2, depth), object)
                    .with_material(material)
                    .with_category(CollisionMask::TERRAIN)
                    .with_feature_id(feature_id);
                self.insert(provider, desc)
            })
            .collect();
        debug!("Indexed {} terrain tetrahedra for {object:?}", ids.len());
        ids
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries stored in the tree itself (the rest are outside the root)
    pub fn tree_len(&self) -> usize {
        self.root.count_entries()
    }

    fn accepts(entry: &IndexEntry, query: &BroadPhaseQuery) -> bool {
        entry.enabled
            && entry.desc.category.intersects(query.mask)
            && query.exclude != Some(entry.desc.object)
            && entry.bounds.intersects(&query.bounds)
    }
}

impl BroadPhase for GeometryIndex {
    fn find_overlapping(&self, query: &BroadPhaseQuery, out: &mut Vec<Candidate>) {
        let mut push = |id: usize| {
            if let Some(entry) = self.entries.get(id).filter(|entry| Self::accepts(entry, query)) {
                out.push(Candidate {
                    provider: entry.provider,
                    desc: entry.desc.clone(),
                });
            }
        };
        let region = query.bounds.padded(self.max_half_extent);
        self.root.visit(&region, &mut push);
        for &id in &self.outside {
            push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::shape::BoxConvex;
    use crate::foundation::math::Transform;

    fn world_bounds() -> Aabb {
        Aabb::new(Point3::new(-100.0, -100.0, -100.0), Point3::new(100.0, 100.0, 100.0))
    }

    fn cube_at(object: u32, position: Vec3) -> ShapeDesc {
        ShapeDesc::new(BoxConvex::new(Point3::origin(), Vec3::repeat(0.5)), ObjectId(object))
            .with_transform(Transform::from_translation(position))
    }

    fn query(bounds: Aabb) -> BroadPhaseQuery {
        BroadPhaseQuery {
            bounds,
            mask: CollisionMask::all(),
            exclude: None,
        }
    }

    #[test]
    fn test_octree_subdivision() {
        let config = OctreeConfig {
            max_entities_per_node: 4,
            max_depth: 3,
            min_node_size: 1.0,
        };
        let mut index = GeometryIndex::new(world_bounds(), config);
        let provider = ShapeKey::default();
        for i in 0..10 {
            index.insert(provider, cube_at(i, Vec3::new(i as f32, 0.0, 0.0)));
        }

        assert_eq!(index.len(), 10);
        assert_eq!(index.tree_len(), 10);
        assert!(index.root.children.is_some());
    }

    #[test]
    fn test_box_query_finds_neighbours_across_nodes() {
        let config = OctreeConfig {
            max_entities_per_node: 1,
            ..OctreeConfig::default()
        };
        let mut index = GeometryIndex::new(world_bounds(), config);
        let provider = ShapeKey::default();
        index.insert(provider, cube_at(1, Vec3::new(-0.4, 0.0, 0.0)));
        index.insert(provider, cube_at(2, Vec3::new(0.4, 0.0, 0.0)));
        index.insert(provider, cube_at(3, Vec3::new(50.0, 0.0, 0.0)));

        // Touches the cube at -0.4 only through its extent, not its centre.
        let mut out = Vec::new();
        index.find_overlapping(
            &query(Aabb::new(Point3::new(-1.0, -0.1, -0.1), Point3::new(-0.5, 0.1, 0.1))),
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].desc.object, ObjectId(1));
    }

    #[test]
    fn test_filters_and_removal() {
        let mut index = GeometryIndex::new(world_bounds(), OctreeConfig::default());
        let provider = ShapeKey::default();
        let a = index.insert(provider, cube_at(1, Vec3::zeros()));
        index.insert(provider, cube_at(2, Vec3::zeros()).with_category(CollisionMask::ITEM));
        let outside = index.insert(provider, cube_at(3, Vec3::new(150.0, 0.0, 0.0)));
        assert_eq!(index.tree_len(), 2);

        let everywhere = Aabb::new(Point3::new(-200.0, -10.0, -10.0), Point3::new(200.0, 10.0, 10.0));
        let mut out = Vec::new();
        index.find_overlapping(&query(everywhere), &mut out);
        assert_eq!(out.len(), 3);

        out.clear();
        index.find_overlapping(
            &BroadPhaseQuery {
                bounds: everywhere,
                mask: CollisionMask::STATIC,
                exclude: Some(ObjectId(3)),
            },
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].desc.object, ObjectId(1));

        assert_eq!(index.set_enabled(ObjectId(1), false), 1);
        out.clear();
        index.find_overlapping(&query(everywhere), &mut out);
        assert_eq!(out.len(), 2);

        assert!(index.remove(a).is_some());
        assert!(index.remove(outside).is_some());
        assert!(index.remove(a).is_none());
        assert_eq!(index.len(), 1);
        assert_eq!(index.tree_len(), 1);
    }

    #[test]
    fn test_terrain_triangles_become_tetrahedra() {
        let mut index = GeometryIndex::new(world_bounds(), OctreeConfig::default());
        let ground = [
            [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            [Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
        ];
        let ids = index.insert_terrain_triangles(ShapeKey::default(), ObjectId(9), 4, &ground, 1.0);
        assert_eq!(ids.len(), 2);

        let desc = index.get(ids[1]).unwrap();
        assert_eq!(desc.feature_id, 1);
        assert_eq!(desc.material, 4);
        assert_eq!(desc.category, CollisionMask::TERRAIN);
        assert!(desc.world_bounds().min.z < -0.5);
    }
}
