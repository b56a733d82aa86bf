//! Point-set and mesh-hull shapes

use super::SupportMap;
use crate::collision::feature::ConvexFeature;
use crate::collision::poly_list::PolyListSink;
use crate::foundation::bounds::Aabb;
use crate::foundation::math::{utils, Point3, Transform, Vec3};
use log::warn;

/// Convex hull of a bare set of points
///
/// Has no faces, so it exposes only its support vertex as a feature and
/// emits no polygons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloudConvex {
    /// Points in object space
    pub points: Vec<Point3>,
}

impl PointCloudConvex {
    /// Create from a point list
    pub fn new(points: Vec<Point3>) -> Self {
        Self { points }
    }

    pub(super) fn local_bounds(&self) -> Aabb {
        Aabb::from_points(self.points.iter())
    }

    pub(super) fn get_features(&self, transform: &Transform, direction: &Vec3, feature: &mut ConvexFeature) {
        if self.points.is_empty() {
            return;
        }
        let local = self.support(&transform.local_support_direction(direction));
        feature.push_vertex(transform.transform_point(&local));
    }
}

impl SupportMap for PointCloudConvex {
    fn support(&self, direction: &Vec3) -> Point3 {
        utils::support_index(&self.points, direction).map_or_else(Point3::origin, |i| self.points[i])
    }
}

/// Precomputed patch around one hull vertex
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EmitRecord {
    /// Hull vertices of the patch; the first is the centre vertex
    vertices: Vec<u32>,
    /// Edges as pairs of hull vertex indices
    edges: Vec<[u32; 2]>,
    /// Incident triangles as hull vertex indices
    faces: Vec<[u32; 3]>,
}

impl EmitRecord {
    fn add_vertex(&mut self, v: u32) {
        if !self.vertices.contains(&v) {
            self.vertices.push(v);
        }
    }

    fn add_edge(&mut self, a: u32, b: u32) {
        let edge = if a < b { [a, b] } else { [b, a] };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Position of hull vertex `v` inside this record
    fn local_index(&self, v: u32) -> u32 {
        self.vertices.iter().position(|&x| x == v).unwrap_or(0) as u32
    }
}

/// Convex hull of a mesh fragment (for example the collision hull of a
/// skinned mesh part)
///
/// Triangles must be wound counter-clockwise seen from outside. For each
/// vertex the triangles touching it are gathered once at construction so
/// a feature query only has to find the support vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshHullConvex {
    vertices: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
    emit: Vec<EmitRecord>,
}

impl MeshHullConvex {
    /// Build a hull; triangles that reference missing vertices are dropped
    pub fn new(vertices: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Self {
        let count = vertices.len();
        let (triangles, dropped): (Vec<_>, Vec<_>) = triangles
            .into_iter()
            .partition(|tri| tri.iter().all(|&v| (v as usize) < count));
        if !dropped.is_empty() {
            warn!("Mesh hull: dropped {} triangles with out-of-range indices", dropped.len());
        }

        let mut emit: Vec<EmitRecord> = (0..count)
            .map(|v| EmitRecord {
                vertices: vec![v as u32],
                ..Default::default()
            })
            .collect();
        for tri in &triangles {
            for &corner in tri {
                let record = &mut emit[corner as usize];
                for &v in tri {
                    record.add_vertex(v);
                }
                record.add_edge(tri[0], tri[1]);
                record.add_edge(tri[1], tri[2]);
                record.add_edge(tri[2], tri[0]);
                record.faces.push(*tri);
            }
        }

        Self {
            vertices,
            triangles,
            emit,
        }
    }

    /// Axis-aligned box hull with the given half extents, centred on the origin
    pub fn cube(half_size: Vec3) -> Self {
        let corners = Aabb::from_center_extents(Point3::origin(), half_size).corners();
        // Two counter-clockwise triangles per face, corners indexed as in `Aabb::corners`.
        let triangles = vec![
            [0, 4, 6], [0, 6, 2], // -x
            [1, 3, 7], [1, 7, 5], // +x
            [0, 1, 5], [0, 5, 4], // -y
            [2, 6, 7], [2, 7, 3], // +y
            [0, 2, 3], [0, 3, 1], // -z
            [4, 5, 7], [4, 7, 6], // +z
        ];
        Self::new(corners.to_vec(), triangles)
    }

    /// Hull vertices in object space
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// Hull triangles
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    fn support_index(&self, direction: &Vec3) -> Option<usize> {
        utils::support_index(&self.vertices, direction)
    }

    pub(super) fn local_bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter())
    }

    pub(super) fn get_features(&self, transform: &Transform, direction: &Vec3, feature: &mut ConvexFeature) {
        let Some(index) = self.support_index(&transform.local_support_direction(direction)) else {
            return;
        };
        let record = &self.emit[index];

        for &v in &record.vertices {
            feature.push_vertex(transform.transform_point(&self.vertices[v as usize]));
        }
        for &[a, b] in &record.edges {
            feature.push_edge(record.local_index(a), record.local_index(b));
        }
        for &[a, b, c] in &record.faces {
            feature.push_face(record.local_index(a), record.local_index(b), record.local_index(c));
        }
    }

    pub(super) fn get_poly_list(&self, material: u32, sink: &mut dyn PolyListSink) {
        let Some((first, rest)) = self.vertices.split_first() else {
            return;
        };
        let base = sink.add_point(first);
        for vertex in rest {
            sink.add_point(vertex);
        }

        for (surface, tri) in self.triangles.iter().enumerate() {
            let [a, b, c] = tri.map(|v| base + v);
            sink.begin(material, surface as u32);
            sink.vertex(a);
            sink.vertex(b);
            sink.vertex(c);
            sink.plane(a, b, c);
            sink.end();
        }
    }
}

impl SupportMap for MeshHullConvex {
    fn support(&self, direction: &Vec3) -> Point3 {
        self.support_index(direction)
            .map_or_else(Point3::origin, |i| self.vertices[i])
    }
}
