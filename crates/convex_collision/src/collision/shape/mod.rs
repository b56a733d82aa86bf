//! Convex shape variants
//!
//! Every variant keeps its geometry in object space. A query places it
//! with a [`Transform`] and asks for one of four things: the extreme point
//! along a direction, a bounding box, a local feature patch, or its boundary
//! polygons. None of these can fail; empty geometry answers with the origin.

mod box_shape;
mod hull;
mod tetrahedron;

pub use box_shape::{BoxConvex, OrientedBoxConvex};
pub use hull::{MeshHullConvex, PointCloudConvex};
pub use tetrahedron::TetrahedronConvex;

use super::feature::ConvexFeature;
use super::poly_list::PolyListSink;
use super::ObjectId;
use crate::foundation::bounds::Aabb;
use crate::foundation::math::{Point3, Transform, Vec3};
use serde::{Deserialize, Serialize};

/// Support mapping in object space
pub trait SupportMap {
    /// Point of the shape with the largest projection on `direction`
    ///
    /// Must return a finite point for every input, including the zero
    /// vector.
    fn support(&self, direction: &Vec3) -> Point3;

    /// Support point of the shape placed by `transform`, in world space
    fn world_support(&self, transform: &Transform, direction: &Vec3) -> Point3 {
        let local = self.support(&transform.local_support_direction(direction));
        transform.transform_point(&local)
    }
}

/// Discriminant of [`ConvexShape`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Bare point set
    PointCloud,
    /// Axis-aligned box in object space
    Box,
    /// Box with its own orientation inside object space
    OrientedBox,
    /// Tetrahedron carved below a terrain triangle
    Tetrahedron,
    /// Hull of a mesh fragment with per-vertex feature patches
    MeshHull,
}

/// Convex shape (stored in MODEL SPACE)
#[derive(Debug, Clone)]
pub enum ConvexShape {
    /// Generic point set
    PointCloud(PointCloudConvex),
    /// Object-space box
    Box(BoxConvex),
    /// Rotated box
    OrientedBox(OrientedBoxConvex),
    /// Terrain tetrahedron
    Tetrahedron(TetrahedronConvex),
    /// Mesh hull
    MeshHull(MeshHullConvex),
}

impl ConvexShape {
    /// Variant tag
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::PointCloud(_) => ShapeKind::PointCloud,
            Self::Box(_) => ShapeKind::Box,
            Self::OrientedBox(_) => ShapeKind::OrientedBox,
            Self::Tetrahedron(_) => ShapeKind::Tetrahedron,
            Self::MeshHull(_) => ShapeKind::MeshHull,
        }
    }

    /// Object-space bounding box
    pub fn local_bounds(&self) -> Aabb {
        match self {
            Self::PointCloud(shape) => shape.local_bounds(),
            Self::Box(shape) => shape.local_bounds(),
            Self::OrientedBox(shape) => shape.local_bounds(),
            Self::Tetrahedron(shape) => shape.local_bounds(),
            Self::MeshHull(shape) => shape.local_bounds(),
        }
    }

    /// Bounding box of the shape placed by `transform`
    ///
    /// Only used for broad-phase pruning; it may be looser than the shape.
    pub fn bounding_box(&self, transform: &Transform) -> Aabb {
        self.local_bounds().transformed(transform)
    }

    /// Fill `feature` with the local patch around the support point along
    /// the world-space `direction`
    ///
    /// The feature is reset first; its object and material are left to the
    /// caller.
    pub fn get_features(&self, transform: &Transform, direction: &Vec3, feature: &mut ConvexFeature) {
        feature.reset();
        match self {
            Self::PointCloud(shape) => shape.get_features(transform, direction, feature),
            Self::Box(shape) => shape.get_features(transform, direction, feature),
            Self::OrientedBox(shape) => shape.get_features(transform, direction, feature),
            Self::Tetrahedron(shape) => shape.get_features(transform, direction, feature),
            Self::MeshHull(shape) => shape.get_features(transform, direction, feature),
        }
    }

    /// Emit the boundary polygons into `sink`
    pub fn get_poly_list(
        &self,
        transform: &Transform,
        object: ObjectId,
        material: u32,
        sink: &mut dyn PolyListSink,
    ) {
        sink.set_transform(transform);
        sink.set_object(object);
        match self {
            Self::PointCloud(_) => {}
            Self::Box(shape) => shape.get_poly_list(material, sink),
            Self::OrientedBox(shape) => shape.get_poly_list(material, sink),
            Self::Tetrahedron(shape) => shape.get_poly_list(material, sink),
            Self::MeshHull(shape) => shape.get_poly_list(material, sink),
        }
    }
}

impl SupportMap for ConvexShape {
    fn support(&self, direction: &Vec3) -> Point3 {
        match self {
            Self::PointCloud(shape) => shape.support(direction),
            Self::Box(shape) => shape.support(direction),
            Self::OrientedBox(shape) => shape.support(direction),
            Self::Tetrahedron(shape) => shape.support(direction),
            Self::MeshHull(shape) => shape.support(direction),
        }
    }
}

impl From<PointCloudConvex> for ConvexShape {
    fn from(shape: PointCloudConvex) -> Self {
        Self::PointCloud(shape)
    }
}

impl From<BoxConvex> for ConvexShape {
    fn from(shape: BoxConvex) -> Self {
        Self::Box(shape)
    }
}

impl From<OrientedBoxConvex> for ConvexShape {
    fn from(shape: OrientedBoxConvex) -> Self {
        Self::OrientedBox(shape)
    }
}

impl From<TetrahedronConvex> for ConvexShape {
    fn from(shape: TetrahedronConvex) -> Self {
        Self::Tetrahedron(shape)
    }
}

impl From<MeshHullConvex> for ConvexShape {
    fn from(shape: MeshHullConvex) -> Self {
        Self::MeshHull(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::poly_list::PolyCollector;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    fn all_variants() -> Vec<ConvexShape> {
        vec![
            PointCloudConvex::new(vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-1.0, 0.0, 0.0)]).into(),
            BoxConvex::new(Point3::origin(), Vec3::new(1.0, 2.0, 0.5)).into(),
            OrientedBoxConvex::new(
                Point3::new(0.0, 1.0, 0.0),
                Vec3::repeat(0.5),
                Quat::from_axis_angle(&Vec3::z_axis(), 0.3),
            )
            .into(),
            TetrahedronConvex::from_surface_triangle(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                1.0,
            )
            .into(),
            MeshHullConvex::cube(Vec3::repeat(1.0)).into(),
        ]
    }

    #[test]
    fn test_zero_direction_is_finite_for_every_variant() {
        for shape in all_variants() {
            let p = shape.support(&Vec3::zeros());
            assert!(p.iter().all(|c| c.is_finite()), "{:?} gave {p:?}", shape.kind());
        }
    }

    #[test]
    fn test_empty_geometry_answers_origin() {
        let empty: ConvexShape = PointCloudConvex::new(Vec::new()).into();
        assert_eq!(empty.support(&Vec3::x()), Point3::origin());
        assert_eq!(empty.local_bounds().center(), Point3::origin());

        let hull: ConvexShape = MeshHullConvex::new(Vec::new(), Vec::new()).into();
        let mut feature = ConvexFeature::default();
        hull.get_features(&Transform::identity(), &Vec3::y(), &mut feature);
        assert!(feature.faces.is_empty());
        assert_eq!(hull.support(&Vec3::y()), Point3::origin());
    }

    #[test]
    fn test_world_support_lies_inside_world_bounds() {
        let transform = Transform::from_position_rotation(
            Vec3::new(5.0, -1.0, 2.0),
            Quat::from_axis_angle(&Vec3::x_axis(), 0.9),
        )
        .with_scale(Vec3::new(2.0, 1.0, 0.5));
        let directions = [Vec3::x(), -Vec3::y(), Vec3::new(0.3, 0.4, -0.8)];

        for shape in all_variants() {
            let bounds = shape.bounding_box(&transform).padded(1e-4);
            for d in &directions {
                let p = shape.world_support(&transform, d);
                assert!(bounds.contains_point(&p), "{:?} support {p:?} outside {bounds:?}", shape.kind());
            }
        }
    }

    #[test]
    fn test_world_support_is_extremal_for_scaled_box() {
        let shape: ConvexShape = BoxConvex::new(Point3::origin(), Vec3::repeat(1.0)).into();
        let transform = Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)).with_scale(Vec3::new(3.0, 1.0, 1.0));

        let p = shape.world_support(&transform, &Vec3::new(1.0, 0.01, 0.01));
        assert_relative_eq!(p, Point3::new(13.0, 1.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_every_variant_emits_polygons_except_point_cloud() {
        for shape in all_variants() {
            let mut sink = PolyCollector::new();
            shape.get_poly_list(&Transform::identity(), ObjectId(4), 2, &mut sink);
            match shape.kind() {
                ShapeKind::PointCloud => assert!(sink.is_empty()),
                _ => {
                    assert!(!sink.is_empty(), "{:?} emitted nothing", shape.kind());
                    assert!(sink.polygons().iter().all(|p| p.object == ObjectId(4) && p.material == 2));
                }
            }
        }
    }
}
