//! Working lists, garbage collection and state lists on a small scene
//!
//! The scene is a terrain provider with a grid of ground triangles indexed
//! in a `GeometryIndex`, plus one or two player cubes walking over it.

use approx::assert_relative_eq;
use convex_collision::collision::MAX_CONTACTS;
use convex_collision::foundation::logging;
use convex_collision::prelude::*;

const TERRAIN: ObjectId = ObjectId(100);

// =============================================================================
// Scene helpers
// =============================================================================

/// Two triangles per unit square over `[-size, size)^2` at z = 0
fn ground_grid(size: i32) -> Vec<[Point3; 3]> {
    let mut triangles = Vec::new();
    for x in -size..size {
        for y in -size..size {
            let (x0, y0) = (x as f32, y as f32);
            let (x1, y1) = (x0 + 1.0, y0 + 1.0);
            triangles.push([Point3::new(x0, y0, 0.0), Point3::new(x1, y0, 0.0), Point3::new(x1, y1, 0.0)]);
            triangles.push([Point3::new(x0, y0, 0.0), Point3::new(x1, y1, 0.0), Point3::new(x0, y1, 0.0)]);
        }
    }
    triangles
}

struct Scene {
    world: CollisionWorld,
    index: GeometryIndex,
    terrain: ShapeKey,
}

impl Scene {
    fn new() -> Self {
        logging::init_for_tests();
        let mut world = CollisionWorld::default();
        let slab = BoxConvex::new(Point3::new(0.0, 0.0, -1.0), Vec3::new(8.0, 8.0, 1.0));
        let terrain = world.insert_shape(ShapeDesc::new(slab, TERRAIN).with_category(CollisionMask::TERRAIN));
        let bounds = Aabb::new(Point3::new(-16.0, -16.0, -16.0), Point3::new(16.0, 16.0, 16.0));
        let mut index = GeometryIndex::new(bounds, OctreeConfig::default());
        index.insert_terrain_triangles(terrain, TERRAIN, 3, &ground_grid(6), 1.0);
        Self { world, index, terrain }
    }

    fn player(&mut self, object: u32, position: Vec3) -> ShapeKey {
        let cube = BoxConvex::new(Point3::origin(), Vec3::repeat(0.5));
        self.world.insert_shape(
            ShapeDesc::new(cube, ObjectId(object))
                .with_category(CollisionMask::PLAYER)
                .with_transform(Transform::from_translation(position)),
        )
    }

    fn refresh(&mut self, key: ShapeKey) {
        let query_box = self.world.record(key).unwrap().world_bounds().padded(0.25);
        self.world
            .update_working_list(key, &query_box, CollisionMask::TERRAIN, &self.index)
            .unwrap();
    }
}

// =============================================================================
// Working lists
// =============================================================================

#[test]
fn test_add_to_working_list_is_idempotent() {
    let mut scene = Scene::new();
    let a = scene.player(1, Vec3::new(0.5, 0.5, 0.5));
    let b = scene.player(2, Vec3::new(3.0, 0.5, 0.5));

    let first = scene.world.add_to_working_list(a, b).unwrap();
    let second = scene.world.add_to_working_list(a, b).unwrap();
    assert_eq!(first, second);
    assert_eq!(scene.world.working_list(a).unwrap().collect::<Vec<_>>(), vec![b]);
    assert_eq!(scene.world.references(b).unwrap().collect::<Vec<_>>(), vec![a]);

    assert!(scene.world.remove_from_working_list(a, b).unwrap());
    assert!(!scene.world.remove_from_working_list(a, b).unwrap());
    assert_eq!(scene.world.references(b).unwrap().count(), 0);
    assert!(scene.world.is_consistent());
}

#[test]
fn test_refresh_registers_candidates_once() {
    let mut scene = Scene::new();
    let player = scene.player(1, Vec3::new(0.5, 0.5, 0.6));

    scene.refresh(player);
    let first: Vec<ShapeKey> = scene.world.working_list(player).unwrap().collect();
    assert!(!first.is_empty());
    for &shape in &first {
        let record = scene.world.record(shape).unwrap();
        assert_eq!(record.owner(), Some(scene.terrain));
        assert_eq!(record.object(), TERRAIN);
        assert_eq!(record.shape().kind(), ShapeKind::Tetrahedron);
    }
    let registered = scene.world.registered(scene.terrain).unwrap().len();
    assert_eq!(registered, first.len());

    scene.refresh(player);
    assert_eq!(scene.world.working_list(player).unwrap().count(), first.len());
    assert_eq!(scene.world.registered(scene.terrain).unwrap().len(), registered);
    assert!(scene.world.is_consistent());
}

#[test]
fn test_own_object_and_masked_categories_are_skipped() {
    let mut scene = Scene::new();
    let player = scene.player(1, Vec3::new(0.5, 0.5, 0.6));
    let query_box = scene.world.record(player).unwrap().world_bounds().padded(0.25);

    scene
        .world
        .update_working_list(player, &query_box, CollisionMask::VEHICLE, &scene.index)
        .unwrap();
    assert_eq!(scene.world.working_list(player).unwrap().count(), 0);

    // The terrain provider asking for its own object's geometry finds nothing.
    let terrain = scene.terrain;
    let everything = Aabb::new(Point3::new(-8.0, -8.0, -2.0), Point3::new(8.0, 8.0, 2.0));
    scene
        .world
        .update_working_list(terrain, &everything, CollisionMask::all(), &scene.index)
        .unwrap();
    assert_eq!(scene.world.working_list(terrain).unwrap().count(), 0);
}

#[test]
fn test_disabled_entries_are_dropped_on_refresh() {
    let mut scene = Scene::new();
    let player = scene.player(1, Vec3::new(0.5, 0.5, 0.6));
    scene.refresh(player);
    let before = scene.world.working_list(player).unwrap().count();
    let victim = scene.world.working_list(player).unwrap().next().unwrap();

    // Disable it in both places so the broad phase does not hand it back.
    scene.world.set_collision_enabled(victim, false).unwrap();
    scene.index.set_enabled(TERRAIN, false);
    scene.refresh(player);

    let after: Vec<ShapeKey> = scene.world.working_list(player).unwrap().collect();
    assert_eq!(after.len(), before - 1);
    assert!(!after.contains(&victim));
}

// =============================================================================
// Garbage collection
// =============================================================================

#[test]
fn test_gc_keeps_shapes_someone_still_references() {
    let mut scene = Scene::new();
    let walker = scene.player(1, Vec3::new(0.5, 0.5, 0.6));
    let sitter = scene.player(2, Vec3::new(0.6, 0.4, 0.6));
    scene.refresh(walker);
    scene.refresh(sitter);
    let left_behind: Vec<ShapeKey> = scene.world.working_list(walker).unwrap().collect();
    let held: Vec<ShapeKey> = scene.world.working_list(sitter).unwrap().collect();

    // Walking away drops the old ground from the walker's list, and the
    // refresh collects the terrain provider before adding the new ground.
    scene
        .world
        .set_transform(walker, Transform::from_translation(Vec3::new(-4.5, -4.5, 0.6)))
        .unwrap();
    scene.refresh(walker);

    for shape in &left_behind {
        assert!(!scene.world.contains(*shape));
    }
    for shape in &held {
        assert!(scene.world.contains(*shape), "shape still referenced by the sitter was collected");
    }
    assert_eq!(scene.world.collect_garbage(scene.terrain).unwrap(), 0);
    assert!(scene.world.is_consistent());

    // Once the sitter lets go too, a collection pass removes what it held.
    for &shape in &held {
        assert!(scene.world.remove_from_working_list(sitter, shape).unwrap());
    }
    assert_eq!(scene.world.collect_garbage(scene.terrain).unwrap(), held.len());
    let walker_list = scene.world.working_list(walker).unwrap().count();
    assert_eq!(scene.world.registered(scene.terrain).unwrap().len(), walker_list);
    assert!(scene.world.is_consistent());
}

#[test]
fn test_nuke_list_leaves_no_dangling_links() {
    let mut scene = Scene::new();
    let a = scene.player(1, Vec3::new(0.5, 0.5, 0.6));
    let b = scene.player(2, Vec3::new(1.5, 0.5, 0.6));
    scene.refresh(a);
    scene.refresh(b);
    scene.world.update_state_list(a, &Vec3::zeros()).unwrap();
    scene.world.update_state_list(b, &Vec3::zeros()).unwrap();
    assert!(scene.world.state_count() > 0);

    let destroyed = scene.world.nuke_list(scene.terrain).unwrap();
    assert!(destroyed > 0);
    assert_eq!(scene.world.working_list(a).unwrap().count(), 0);
    assert_eq!(scene.world.working_list(b).unwrap().count(), 0);
    assert_eq!(scene.world.state_count(), 0);
    assert_eq!(scene.world.working_link_count(), 0);
    assert_eq!(scene.world.shape_count(), 3);
    assert!(scene.world.is_consistent());
}

// =============================================================================
// Padded working-set cache
// =============================================================================

#[test]
fn test_working_set_skips_query_while_cached_box_covers_motion() {
    let mut scene = Scene::new();
    let player = scene.player(1, Vec3::new(0.5, 0.5, 0.6));
    let velocity = Vec3::new(1.0, 0.0, 0.0);
    let dt = 1.0 / 60.0;

    assert!(scene
        .world
        .update_working_set(player, &velocity, dt, CollisionMask::TERRAIN, &scene.index)
        .unwrap());
    let cached = *scene.world.record(player).unwrap().query_box().unwrap();
    assert!(!scene
        .world
        .update_working_set(player, &velocity, dt, CollisionMask::TERRAIN, &scene.index)
        .unwrap());

    // A small step stays inside the cached box.
    scene
        .world
        .set_transform(player, Transform::from_translation(Vec3::new(0.51, 0.5, 0.6)))
        .unwrap();
    assert!(!scene
        .world
        .update_working_set(player, &velocity, dt, CollisionMask::TERRAIN, &scene.index)
        .unwrap());
    assert_eq!(scene.world.record(player).unwrap().query_box(), Some(&cached));

    // A jump leaves it.
    scene
        .world
        .set_transform(player, Transform::from_translation(Vec3::new(3.5, 0.5, 0.6)))
        .unwrap();
    assert!(scene
        .world
        .update_working_set(player, &velocity, dt, CollisionMask::TERRAIN, &scene.index)
        .unwrap());

    scene.world.invalidate_working_set(player).unwrap();
    assert!(scene
        .world
        .update_working_set(player, &velocity, dt, CollisionMask::TERRAIN, &scene.index)
        .unwrap());
    assert!(scene.world.working_list(player).unwrap().count() > 0);
}

// =============================================================================
// State lists and contacts
// =============================================================================

#[test]
fn test_state_list_follows_overlap() {
    let mut scene = Scene::new();
    let a = scene.player(1, Vec3::new(0.0, 0.0, 0.5));
    let b = scene.player(2, Vec3::new(1.5, 0.0, 0.5));
    scene.world.add_to_working_list(a, b).unwrap();

    scene.world.update_state_list(a, &Vec3::zeros()).unwrap();
    let links: Vec<LinkId> = scene.world.state_list(a).unwrap().collect();
    assert_eq!(links.len(), 1);
    assert_eq!(scene.world.state_pair(links[0]).unwrap(), (a, b));

    // Refreshing again keeps the same state.
    scene.world.update_state_list(a, &Vec3::zeros()).unwrap();
    assert_eq!(scene.world.state_list(a).unwrap().collect::<Vec<_>>(), links);

    scene
        .world
        .set_transform(b, Transform::from_translation(Vec3::new(6.0, 0.0, 0.5)))
        .unwrap();
    scene.world.update_state_list(a, &Vec3::zeros()).unwrap();
    assert_eq!(scene.world.state_count(), 0);

    // A sweep towards it brings the state back.
    scene.world.update_state_list(a, &Vec3::new(5.0, 0.0, 0.0)).unwrap();
    assert_eq!(scene.world.state_count(), 1);
    assert!(scene.world.is_consistent());
}

#[test]
fn test_find_closest_state_orients_pairs() {
    let mut scene = Scene::new();
    let me = scene.player(1, Vec3::new(0.0, 0.0, 4.0));
    let near = scene.player(2, Vec3::new(1.75, 0.0, 4.0));
    let far = scene.player(3, Vec3::new(0.0, 1.9, 4.0));
    scene.world.add_to_working_list(me, near).unwrap();
    scene.world.add_to_working_list(me, far).unwrap();

    // Created the other way round; the search must turn it.
    let reversed = scene.world.link_state(near, me).unwrap();
    assert_eq!(scene.world.link_state(me, near).unwrap(), reversed);

    let (link, distance) = scene.world.find_closest_state(me, f32::MAX).unwrap().unwrap();
    assert_eq!(link, reversed);
    assert_relative_eq!(distance, 0.75, epsilon = 1e-3);
    assert_eq!(scene.world.state_pair(link).unwrap(), (me, near));
    assert_eq!(scene.world.state_count(), 2);

    let removed = scene.world.unlink_state(link).unwrap();
    assert_relative_eq!(removed.distance_estimate(), 0.75, epsilon = 1e-3);
    assert_eq!(scene.world.unlink_state(link).unwrap_err(), CollisionError::UnknownState(link));
    assert!(scene.world.solver_stats().queries >= 2);
}

#[test]
fn test_resting_cube_produces_contacts() {
    let mut scene = Scene::new();
    let cube = scene.player(1, Vec3::new(0.1, 0.2, 0.502));
    scene.world.add_to_working_list(cube, scene.terrain).unwrap();

    let (_, distance) = scene.world.find_closest_state(cube, 1.0).unwrap().unwrap();
    assert_relative_eq!(distance, 0.002, epsilon = 1e-4);

    let mut contacts = ContactList::new();
    let added = scene.world.collect_contacts(cube, 0.01, &mut contacts).unwrap();
    assert!(added > 0);
    assert!(contacts.len() <= MAX_CONTACTS);
    assert!(contacts
        .as_slice()
        .iter()
        .any(|c| c.object == TERRAIN && (c.normal - Vec3::z()).norm() < 1e-3));
    for contact in contacts.as_slice() {
        assert!(contact.distance.abs() <= 0.01);
    }

    // Lifted out of tolerance, nothing more is generated.
    scene
        .world
        .set_transform(cube, Transform::from_translation(Vec3::new(0.1, 0.2, 0.8)))
        .unwrap();
    scene.world.find_closest_state(cube, 1.0).unwrap();
    contacts.clear();
    assert_eq!(scene.world.collect_contacts(cube, 0.01, &mut contacts).unwrap(), 0);
}

#[test]
fn test_state_intersect_follows_transforms() {
    let mut scene = Scene::new();
    let a = scene.player(1, Vec3::new(0.0, 0.0, 3.0));
    let b = scene.player(2, Vec3::new(0.5, 0.0, 3.0));
    let link = scene.world.link_state(a, b).unwrap();
    assert!(scene.world.state_intersect(link).unwrap());

    scene
        .world
        .set_transform(b, Transform::from_translation(Vec3::new(3.0, 0.0, 3.0)))
        .unwrap();
    assert!(!scene.world.state_intersect(link).unwrap());
    assert_eq!(scene.world.state(link).unwrap().termination(), Some(Termination::Separated));

    scene.world.destroy_shape(b).unwrap();
    assert_eq!(scene.world.state_intersect(link).unwrap_err(), CollisionError::UnknownState(link));
}

#[test]
fn test_snapshot_serializes_scene() {
    let mut scene = Scene::new();
    let player = scene.player(1, Vec3::new(0.5, 0.5, 0.6));
    scene.refresh(player);
    scene.world.update_state_list(player, &Vec3::zeros()).unwrap();

    let snapshot = scene.world.snapshot();
    assert_eq!(snapshot.shapes.len(), scene.world.shape_count());
    assert_eq!(snapshot.states.len(), scene.world.state_count());
    let text = snapshot.to_ron().unwrap();
    assert!(text.contains("Tetrahedron"));
}
