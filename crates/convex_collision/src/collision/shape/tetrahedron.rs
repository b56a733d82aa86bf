//! Tetrahedra carved out of terrain surfaces
//!
//! The first three points are the surface triangle, the fourth is an apex
//! pushed below it. Only the surface triangle is a real polygon; the sides
//! exist so that the solver sees a solid.

use super::SupportMap;
use crate::collision::feature::ConvexFeature;
use crate::collision::poly_list::PolyListSink;
use crate::foundation::bounds::Aabb;
use crate::foundation::math::{utils, Point3, Transform, Vec3};

const EDGES: [[u32; 2]; 6] = [[0, 1], [1, 2], [2, 0], [0, 3], [1, 3], [2, 3]];
const FACES: [[u32; 3]; 4] = [[0, 1, 2], [0, 3, 1], [1, 3, 2], [2, 3, 0]];

/// Tetrahedron under a terrain triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TetrahedronConvex {
    /// Surface triangle followed by the apex, in object space
    pub points: [Point3; 4],
    /// Unit normal of the surface triangle
    pub normal: Vec3,
}

impl TetrahedronConvex {
    /// Build from four points; the normal is taken from the first three
    pub fn new(points: [Point3; 4]) -> Self {
        let normal = utils::triangle_normal(&points[0], &points[1], &points[2]);
        Self { points, normal }
    }

    /// Carve the tetrahedron below the counter-clockwise triangle `(p0, p1, p2)`
    ///
    /// The apex sits `depth` below the triangle's centroid. A degenerate
    /// triangle has no normal, so its apex collapses onto the centroid.
    pub fn from_surface_triangle(p0: Point3, p1: Point3, p2: Point3, depth: f32) -> Self {
        let normal = utils::triangle_normal(&p0, &p1, &p2);
        let apex = utils::centroid(&[p0, p1, p2]) - normal * depth.abs();
        Self {
            points: [p0, p1, p2, apex],
            normal,
        }
    }

    pub(super) fn local_bounds(&self) -> Aabb {
        Aabb::from_points(self.points.iter())
    }

    pub(super) fn get_features(&self, transform: &Transform, direction: &Vec3, feature: &mut ConvexFeature) {
        let center = transform.transform_point(&utils::centroid(&self.points));
        for point in &self.points {
            feature.push_vertex(transform.transform_point(point));
        }
        for [v0, v1] in EDGES {
            feature.push_edge(v0, v1);
        }
        for [v0, v1, v2] in FACES {
            let face_center = utils::centroid(&[
                feature.vertices[v0 as usize],
                feature.vertices[v1 as usize],
                feature.vertices[v2 as usize],
            ]);
            let outward = face_center - center;
            // A flat tetrahedron has no inside; orient the faces towards the query.
            let outward = if outward.norm_squared() <= f32::EPSILON { *direction } else { outward };
            feature.push_face_facing(v0, v1, v2, &outward);
        }
    }

    pub(super) fn get_poly_list(&self, material: u32, sink: &mut dyn PolyListSink) {
        let base = sink.add_point(&self.points[0]);
        sink.add_point(&self.points[1]);
        sink.add_point(&self.points[2]);

        sink.begin(material, 0);
        sink.vertex(base);
        sink.vertex(base + 1);
        sink.vertex(base + 2);
        sink.plane(base, base + 1, base + 2);
        sink.end();
    }
}

impl SupportMap for TetrahedronConvex {
    fn support(&self, direction: &Vec3) -> Point3 {
        let index = utils::support_index(&self.points, direction).unwrap_or(0);
        self.points[index]
    }
}
