//! Collision world: shape registry, working lists and state lists
//!
//! The world owns every shape record plus two [`Relation`]s:
//!
//! - the **working** relation links a querying shape to each nearby
//!   candidate; the candidate's mirror list is its *reference list*
//! - the **state** relation links shape A to shape B for every pair with a
//!   persistent [`CollisionState`]
//!
//! Each shape also has a *registered set*: shapes it created on behalf of
//! others (typically broad-phase candidates) and that it destroys once no
//! working list references them any more.
//!
//! All bookkeeping is single-threaded and runs to completion inside one
//! simulation tick.

mod snapshot;
mod states;
mod working_set;

pub use snapshot::{ShapeSnapshot, StateSnapshot, WorldSnapshot};

use crate::collision::gjk::{CollisionState, SolverStats};
use crate::collision::layers::CollisionMask;
use crate::collision::shape::ConvexShape;
use crate::collision::ObjectId;
use crate::config::CollisionConfig;
use crate::error::{CollisionError, CollisionResult};
use crate::foundation::bounds::Aabb;
use crate::foundation::collections::SlotMap;
use crate::foundation::math::Transform;
use crate::pool::{LinkId, Relation};
use crate::spatial::Candidate;
use log::{debug, warn};

slotmap::new_key_type! {
    /// Handle to a shape in a [`CollisionWorld`]
    pub struct ShapeKey;
}

/// Everything needed to create a shape record
#[derive(Debug, Clone)]
pub struct ShapeDesc {
    /// Geometry in object space
    pub shape: ConvexShape,
    /// Game object the shape represents
    pub object: ObjectId,
    /// Material reported in contacts and polygons
    pub material: u32,
    /// Category used by candidate filtering
    pub category: CollisionMask,
    /// Provider-specific id (hull index, terrain square, ...) used to
    /// recognise a candidate that is already in a working list
    pub feature_id: u32,
    /// Object-to-world placement
    pub transform: Transform,
}

impl ShapeDesc {
    /// Describe `shape` representing `object`, at the origin
    pub fn new(shape: impl Into<ConvexShape>, object: ObjectId) -> Self {
        Self {
            shape: shape.into(),
            object,
            material: 0,
            category: CollisionMask::default(),
            feature_id: 0,
            transform: Transform::identity(),
        }
    }

    /// Set the placement
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the material
    #[must_use]
    pub fn with_material(mut self, material: u32) -> Self {
        self.material = material;
        self
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: CollisionMask) -> Self {
        self.category = category;
        self
    }

    /// Set the provider-specific feature id
    #[must_use]
    pub fn with_feature_id(mut self, feature_id: u32) -> Self {
        self.feature_id = feature_id;
        self
    }

    /// World bounding box of the described shape
    pub fn world_bounds(&self) -> Aabb {
        self.shape.bounding_box(&self.transform)
    }
}

/// A shape registered in the world
#[derive(Debug, Clone)]
pub struct ShapeRecord {
    desc: ShapeDesc,
    owner: Option<ShapeKey>,
    registered: Vec<ShapeKey>,
    tag: u32,
    collision_enabled: bool,
    query_box: Option<Aabb>,
}

impl ShapeRecord {
    fn new(desc: ShapeDesc, owner: Option<ShapeKey>) -> Self {
        Self {
            desc,
            owner,
            registered: Vec::new(),
            tag: 0,
            collision_enabled: true,
            query_box: None,
        }
    }

    /// Geometry
    pub fn shape(&self) -> &ConvexShape {
        &self.desc.shape
    }

    /// Represented game object
    pub fn object(&self) -> ObjectId {
        self.desc.object
    }

    /// Material
    pub fn material(&self) -> u32 {
        self.desc.material
    }

    /// Category
    pub fn category(&self) -> CollisionMask {
        self.desc.category
    }

    /// Provider-specific feature id
    pub fn feature_id(&self) -> u32 {
        self.desc.feature_id
    }

    /// Current placement
    pub fn transform(&self) -> &Transform {
        &self.desc.transform
    }

    /// Shape whose registered set holds this one
    pub fn owner(&self) -> Option<ShapeKey> {
        self.owner
    }

    /// Shapes this one manages
    pub fn registered(&self) -> &[ShapeKey] {
        &self.registered
    }

    /// Whether other shapes may collide with this one
    pub fn collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    /// Padded box of the last broad-phase query made for this shape
    pub fn query_box(&self) -> Option<&Aabb> {
        self.query_box.as_ref()
    }

    /// World bounding box under the current placement
    pub fn world_bounds(&self) -> Aabb {
        self.desc.world_bounds()
    }

    fn matches(&self, candidate: &Candidate) -> bool {
        self.owner == Some(candidate.provider)
            && self.desc.object == candidate.desc.object
            && self.desc.feature_id == candidate.desc.feature_id
    }
}

/// Registry of shapes with their working lists and collision states
#[derive(Debug)]
pub struct CollisionWorld {
    config: CollisionConfig,
    shapes: SlotMap<ShapeKey, ShapeRecord>,
    working: Relation<ShapeKey, ()>,
    states: Relation<ShapeKey, CollisionState>,
    tag: u32,
    retired_stats: SolverStats,
    candidates: Vec<Candidate>,
    scratch_links: Vec<LinkId>,
    scratch_keys: Vec<ShapeKey>,
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::with_valid_config(CollisionConfig::default())
    }
}

impl CollisionWorld {
    /// Create a world after validating `config`
    pub fn new(config: CollisionConfig) -> CollisionResult<Self> {
        if let Err(err) = config.validate() {
            warn!("Rejected collision config: {err}");
            return Err(CollisionError::InvalidConfig(err.to_string()));
        }
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: CollisionConfig) -> Self {
        let pool = &config.pool;
        let shapes = SlotMap::with_capacity_and_key(pool.shapes);
        let working = Relation::with_capacity(pool.working_links);
        let states = Relation::with_capacity(pool.states);
        Self {
            config,
            shapes,
            working,
            states,
            tag: 0,
            retired_stats: SolverStats::default(),
            candidates: Vec::new(),
            scratch_links: Vec::new(),
            scratch_keys: Vec::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Number of live shapes
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Number of live working-list links
    pub fn working_link_count(&self) -> usize {
        self.working.len()
    }

    /// Number of live collision states
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// True while `key` refers to a live shape
    pub fn contains(&self, key: ShapeKey) -> bool {
        self.shapes.contains_key(key)
    }

    /// Record of a live shape
    pub fn record(&self, key: ShapeKey) -> CollisionResult<&ShapeRecord> {
        self.shapes.get(key).ok_or(CollisionError::UnknownShape(key))
    }

    fn record_mut(&mut self, key: ShapeKey) -> CollisionResult<&mut ShapeRecord> {
        self.shapes.get_mut(key).ok_or(CollisionError::UnknownShape(key))
    }

    /// Add a top-level shape (one per game object)
    pub fn insert_shape(&mut self, desc: ShapeDesc) -> ShapeKey {
        let kind = desc.shape.kind();
        let object = desc.object;
        let key = self.shapes.insert(ShapeRecord::new(desc, None));
        debug!("Created {kind:?} shape {key:?} for object {object:?}");
        key
    }

    /// Create a shape managed by `owner`
    ///
    /// The new shape lives in `owner`'s registered set and is destroyed by
    /// [`collect_garbage`](Self::collect_garbage) once nothing references
    /// it, or by [`nuke_list`](Self::nuke_list).
    pub fn register_object(&mut self, owner: ShapeKey, desc: ShapeDesc) -> CollisionResult<ShapeKey> {
        self.record(owner)?;
        let key = self.shapes.insert(ShapeRecord::new(desc, Some(owner)));
        self.record_mut(owner)?.registered.push(key);
        Ok(key)
    }

    /// Registered set of `key`
    pub fn registered(&self, key: ShapeKey) -> CollisionResult<&[ShapeKey]> {
        Ok(self.record(key)?.registered())
    }

    /// Move a shape
    pub fn set_transform(&mut self, key: ShapeKey, transform: Transform) -> CollisionResult<()> {
        self.record_mut(key)?.desc.transform = transform;
        Ok(())
    }

    /// Enable or disable collisions against a shape
    ///
    /// Disabled shapes are dropped from working lists on the next refresh.
    pub fn set_collision_enabled(&mut self, key: ShapeKey, enabled: bool) -> CollisionResult<()> {
        self.record_mut(key)?.collision_enabled = enabled;
        Ok(())
    }

    /// Destroy every shape in `key`'s registered set
    ///
    /// Every working link and collision state touching a destroyed shape is
    /// removed from both of its lists.
    pub fn nuke_list(&mut self, key: ShapeKey) -> CollisionResult<usize> {
        let registered = std::mem::take(&mut self.record_mut(key)?.registered);
        let count = registered.len();
        for child in registered {
            self.release(child);
        }
        if count > 0 {
            debug!("Nuked {count} registered shapes of {key:?}");
        }
        Ok(count)
    }

    /// Destroy a shape together with everything it manages
    pub fn destroy_shape(&mut self, key: ShapeKey) -> CollisionResult<()> {
        let owner = self.record(key)?.owner;
        if let Some(owner) = owner.and_then(|owner| self.shapes.get_mut(owner)) {
            owner.registered.retain(|&k| k != key);
        }
        self.release(key);
        Ok(())
    }

    /// Remove `key` and its registered shapes without touching the owner's set
    fn release(&mut self, key: ShapeKey) {
        let mut stack = std::mem::take(&mut self.scratch_keys);
        stack.clear();
        stack.push(key);
        while let Some(key) = stack.pop() {
            let Some(record) = self.shapes.remove(key) else {
                continue;
            };
            stack.extend_from_slice(&record.registered);
            self.working.remove_key(key, |_, _, ()| {});
            let retired = &mut self.retired_stats;
            self.states.remove_key(key, |_, _, state| retired.merge(state.stats()));
            debug!("Destroyed shape {key:?} (object {:?})", record.desc.object);
        }
        self.scratch_keys = stack;
    }

    /// Advance the world tag used to mark shapes during a list walk
    fn next_tag(&mut self) -> u32 {
        self.tag = self.tag.wrapping_add(1).max(1);
        self.tag
    }

    /// Solver counters over every state, live or destroyed
    pub fn solver_stats(&self) -> SolverStats {
        let mut stats = self.retired_stats;
        for (_, _, _, state) in self.states.iter() {
            stats.merge(state.stats());
        }
        stats
    }

    /// Check every list invariant
    ///
    /// Both relations must be two-sided consistent, every link must join
    /// live shapes, and every registered shape must name its owner.
    pub fn is_consistent(&self) -> bool {
        if !self.working.is_consistent() || !self.states.is_consistent() {
            return false;
        }
        let ends_live = |from: ShapeKey, to: ShapeKey| self.shapes.contains_key(from) && self.shapes.contains_key(to);
        if !self.working.iter().all(|(_, from, to, _)| ends_live(from, to)) {
            return false;
        }
        if !self.states.iter().all(|(_, from, to, _)| ends_live(from, to)) {
            return false;
        }
        self.shapes.iter().all(|(key, record)| {
            record
                .registered
                .iter()
                .all(|&child| self.shapes.get(child).is_some_and(|c| c.owner == Some(key)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::shape::BoxConvex;
    use crate::foundation::math::{Point3, Vec3};

    fn cube_desc(object: u32, x: f32) -> ShapeDesc {
        ShapeDesc::new(BoxConvex::new(Point3::origin(), Vec3::repeat(0.5)), ObjectId(object))
            .with_transform(Transform::from_translation(Vec3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = CollisionConfig::default();
        config.solver.relative_error = -1.0;
        assert!(matches!(CollisionWorld::new(config), Err(CollisionError::InvalidConfig(_))));
    }

    #[test]
    fn test_stale_key_is_reported() {
        let mut world = CollisionWorld::default();
        let key = world.insert_shape(cube_desc(1, 0.0));
        world.destroy_shape(key).unwrap();

        assert_eq!(world.destroy_shape(key), Err(CollisionError::UnknownShape(key)));
        assert_eq!(
            world.set_transform(key, Transform::identity()),
            Err(CollisionError::UnknownShape(key))
        );
    }

    #[test]
    fn test_destroy_takes_registered_shapes_along() {
        let mut world = CollisionWorld::default();
        let provider = world.insert_shape(cube_desc(1, 0.0));
        let child = world.register_object(provider, cube_desc(1, 1.0)).unwrap();
        let grandchild = world.register_object(child, cube_desc(1, 2.0)).unwrap();
        let other = world.insert_shape(cube_desc(2, 5.0));
        world.add_to_working_list(other, grandchild).unwrap();

        world.destroy_shape(child).unwrap();

        assert!(!world.contains(child));
        assert!(!world.contains(grandchild));
        assert!(world.registered(provider).unwrap().is_empty());
        assert_eq!(world.working_list(other).unwrap().count(), 0);
        assert!(world.is_consistent());
    }
}
