//! Collision world demo
//!
//! Drops a handful of boxes and hulls onto a patch of terrain and ticks the
//! collision world the way a game loop would:
//! - refresh each body's working set from the terrain index
//! - refresh its state list with the tick's displacement
//! - find the closest pair and generate contacts when resting
//!
//! Pass a `.toml` or `.ron` collision config as the first argument to
//! override the built-in tuning. Set `RUST_LOG=debug` to watch the lists.

use convex_collision::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TERRAIN: ObjectId = ObjectId(0);
const GRID_HALF_SIZE: i32 = 8;
const NUM_BODIES: u32 = 12;
const TICKS: u32 = 240;
const DT: f32 = 1.0 / 60.0;
const GRAVITY: f32 = -9.8;
const CONTACT_TOLERANCE: f32 = 0.02;

struct Body {
    key: ShapeKey,
    position: Vec3,
    velocity: Vec3,
    rotation: Quat,
    resting: bool,
}

/// Rolling hills sampled on a unit grid
fn terrain_height(x: f32, y: f32) -> f32 {
    0.4 * (x * 0.5).sin() + 0.3 * (y * 0.35).cos()
}

fn terrain_triangles() -> Vec<[Point3; 3]> {
    let mut triangles = Vec::new();
    for x in -GRID_HALF_SIZE..GRID_HALF_SIZE {
        for y in -GRID_HALF_SIZE..GRID_HALF_SIZE {
            let (x0, y0) = (x as f32, y as f32);
            let (x1, y1) = (x0 + 1.0, y0 + 1.0);
            let corner = |x: f32, y: f32| Point3::new(x, y, terrain_height(x, y));
            triangles.push([corner(x0, y0), corner(x1, y0), corner(x1, y1)]);
            triangles.push([corner(x0, y0), corner(x1, y1), corner(x0, y1)]);
        }
    }
    triangles
}

fn random_shape(rng: &mut StdRng) -> ConvexShape {
    let half = Vec3::new(rng.gen_range(0.2..0.6), rng.gen_range(0.2..0.6), rng.gen_range(0.2..0.6));
    match rng.gen_range(0..3) {
        0 => BoxConvex::new(Point3::origin(), half).into(),
        1 => OrientedBoxConvex::new(
            Point3::origin(),
            half,
            Quat::from_euler_angles(0.0, 0.0, rng.gen_range(0.0..std::f32::consts::PI)),
        )
        .into(),
        _ => MeshHullConvex::cube(half).into(),
    }
}

fn load_config() -> Result<CollisionConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading collision config from {path}");
            Ok(CollisionConfig::load_from_file(&path)?)
        }
        None => Ok(CollisionConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut world = CollisionWorld::new(load_config()?)?;
    let extent = GRID_HALF_SIZE as f32;
    let ground = BoxConvex::new(Point3::new(0.0, 0.0, -2.0), Vec3::new(extent, extent, 1.0));
    let terrain = world.insert_shape(ShapeDesc::new(ground, TERRAIN).with_category(CollisionMask::TERRAIN));

    let bounds = Aabb::new(
        Point3::new(-2.0 * extent, -2.0 * extent, -2.0 * extent),
        Point3::new(2.0 * extent, 2.0 * extent, 2.0 * extent),
    );
    let mut index = GeometryIndex::new(bounds, OctreeConfig::default());
    let ids = index.insert_terrain_triangles(terrain, TERRAIN, 1, &terrain_triangles(), 1.5);
    log::info!("Indexed {} terrain tetrahedra", ids.len());

    let mut rng = StdRng::seed_from_u64(7);
    let mut bodies: Vec<Body> = (1..=NUM_BODIES)
        .map(|id| {
            let position = Vec3::new(
                rng.gen_range(-extent + 1.0..extent - 1.0),
                rng.gen_range(-extent + 1.0..extent - 1.0),
                rng.gen_range(2.0..5.0),
            );
            let rotation = Quat::from_euler_angles(0.0, 0.0, rng.gen_range(0.0..1.0));
            let desc = ShapeDesc::new(random_shape(&mut rng), ObjectId(id))
                .with_category(CollisionMask::SHAPE)
                .with_transform(Transform::from_position_rotation(position, rotation));
            Body {
                key: world.insert_shape(desc),
                position,
                velocity: Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 0.0),
                rotation,
                resting: false,
            }
        })
        .collect();

    let mut contacts = ContactList::new();
    let mut queries = 0u32;
    for tick in 0..TICKS {
        for body in &mut bodies {
            if body.resting {
                continue;
            }
            body.velocity.z += GRAVITY * DT;
            let displacement = body.velocity * DT;
            body.position += displacement;
            world.set_transform(body.key, Transform::from_position_rotation(body.position, body.rotation))?;

            if world.update_working_set(body.key, &body.velocity, DT, CollisionMask::TERRAIN, &index)? {
                queries += 1;
            }
            world.update_state_list(body.key, &displacement)?;

            let Some((_, distance)) = world.find_closest_state(body.key, 1.0)? else {
                continue;
            };
            if distance > CONTACT_TOLERANCE {
                continue;
            }

            contacts.clear();
            let added = world.collect_contacts(body.key, CONTACT_TOLERANCE, &mut contacts)?;
            log::debug!("Body {:?} touched down with {added} contacts", body.key);
            body.velocity = Vec3::zeros();
            body.resting = true;
        }

        if tick % 60 == 59 {
            let resting = bodies.iter().filter(|b| b.resting).count();
            log::info!(
                "t={:.1}s: {resting}/{} resting, {} shapes, {} working links, {} states",
                (tick + 1) as f32 * DT,
                bodies.len(),
                world.shape_count(),
                world.working_link_count(),
                world.state_count()
            );
        }
    }

    let stats = world.solver_stats();
    log::info!(
        "{} broad-phase queries, {} GJK queries, {} iterations, {} warm hits, {} irregular",
        queries,
        stats.queries,
        stats.iterations,
        stats.warm_hits,
        stats.irregularities
    );

    let removed = world.nuke_list(terrain)?;
    log::info!("Released {removed} terrain shapes; lists consistent: {}", world.is_consistent());
    if log::log_enabled!(log::Level::Debug) {
        log::debug!("Final world:\n{}", world.snapshot().to_ron()?);
    }
    Ok(())
}
