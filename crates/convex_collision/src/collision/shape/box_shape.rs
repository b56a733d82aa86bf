//! Box shapes
//!
//! Corners are indexed by three bits: bit 0, 1 and 2 select the maximum
//! side on x, y and z. The same numbering is used by [`Aabb::corners`].

use super::SupportMap;
use crate::collision::feature::ConvexFeature;
use crate::collision::poly_list::PolyListSink;
use crate::foundation::bounds::Aabb;
use crate::foundation::math::{Point3, Quat, Transform, Vec3};

/// Corner index picked by the signs of `direction`, `>= 0` counting as positive
fn corner_index(direction: &Vec3) -> usize {
    usize::from(direction.x >= 0.0) | usize::from(direction.y >= 0.0) << 1 | usize::from(direction.z >= 0.0) << 2
}

/// The four corners of the face on `axis` holding `corner`, wound
/// counter-clockwise when seen from outside
fn face_corners(corner: usize, axis: usize) -> [usize; 4] {
    let a = 1 << ((axis + 1) % 3);
    let b = 1 << ((axis + 2) % 3);
    let base = corner & !(a | b);
    if corner & (1 << axis) != 0 {
        [base, base | a, base | a | b, base | b]
    } else {
        [base, base | b, base | a | b, base | a]
    }
}

/// Emit the three faces meeting at `corner` of a box whose world-space
/// corners are `corners`
fn emit_corner_features(corners: &[Point3; 8], corner: usize, feature: &mut ConvexFeature) {
    let center = nalgebra::center(&corners[0], &corners[7]);
    let mut emitted: [Option<u32>; 8] = [None; 8];

    for axis in 0..3 {
        let quad = face_corners(corner, axis);
        let mut index = [0u32; 4];
        for (slot, &c) in index.iter_mut().zip(quad.iter()) {
            *slot = *emitted[c].get_or_insert_with(|| feature.push_vertex(corners[c]));
        }

        let face_center = nalgebra::center(&corners[quad[0]], &corners[quad[2]]);
        let outward = face_center - center;
        feature.push_face_facing(index[0], index[1], index[2], &outward);
        feature.push_face_facing(index[0], index[2], index[3], &outward);
        for i in 0..4 {
            feature.push_unique_edge(index[i], index[(i + 1) % 4]);
        }
    }
}

/// Emit all six faces of the box with object-space `corners`
fn emit_box_polys(corners: &[Point3; 8], material: u32, sink: &mut dyn PolyListSink) {
    let base = sink.add_point(&corners[0]);
    for corner in &corners[1..] {
        sink.add_point(corner);
    }

    for axis in 0..3 {
        for side in [0, 1 << axis] {
            let quad = face_corners(side, axis).map(|c| base + c as u32);
            sink.begin(material, (axis * 2) as u32 + u32::from(side != 0));
            for &v in &quad {
                sink.vertex(v);
            }
            sink.plane(quad[0], quad[1], quad[2]);
            sink.end();
        }
    }
}

/// Box aligned with the axes of its owner's object space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxConvex {
    /// Center in object space
    pub center: Point3,
    /// Half extents along each axis
    pub half_size: Vec3,
}

impl BoxConvex {
    /// Create a box; negative half extents are folded to their absolute value
    pub fn new(center: Point3, half_size: Vec3) -> Self {
        Self {
            center,
            half_size: half_size.abs(),
        }
    }

    /// Box spanning `bounds`
    pub fn from_aabb(bounds: &Aabb) -> Self {
        Self::new(bounds.center(), bounds.extents())
    }

    fn corners(&self) -> [Point3; 8] {
        self.local_bounds().corners()
    }

    pub(super) fn local_bounds(&self) -> Aabb {
        Aabb::from_center_extents(self.center, self.half_size)
    }

    pub(super) fn get_features(&self, transform: &Transform, direction: &Vec3, feature: &mut ConvexFeature) {
        let corner = corner_index(&transform.local_support_direction(direction));
        let corners = self.corners().map(|c| transform.transform_point(&c));
        emit_corner_features(&corners, corner, feature);
    }

    pub(super) fn get_poly_list(&self, material: u32, sink: &mut dyn PolyListSink) {
        emit_box_polys(&self.corners(), material, sink);
    }
}

impl SupportMap for BoxConvex {
    fn support(&self, direction: &Vec3) -> Point3 {
        let h = &self.half_size;
        self.center
            + Vec3::new(
                if direction.x >= 0.0 { h.x } else { -h.x },
                if direction.y >= 0.0 { h.y } else { -h.y },
                if direction.z >= 0.0 { h.z } else { -h.z },
            )
    }
}

/// Box with its own rotation inside the owner's object space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBoxConvex {
    /// Center in object space
    pub center: Point3,
    /// Half extents along the box's own axes
    pub half_size: Vec3,
    /// Orientation of the box axes in object space
    pub orientation: Quat,
}

impl OrientedBoxConvex {
    /// Create an oriented box
    pub fn new(center: Point3, half_size: Vec3, orientation: Quat) -> Self {
        Self {
            center,
            half_size: half_size.abs(),
            orientation,
        }
    }

    /// Map a point from box space into object space
    fn to_object(&self, point: &Point3) -> Point3 {
        self.center + self.orientation * point.coords
    }

    /// Corners in object space
    fn corners(&self) -> [Point3; 8] {
        Aabb::from_center_extents(Point3::origin(), self.half_size)
            .corners()
            .map(|c| self.to_object(&c))
    }

    pub(super) fn local_bounds(&self) -> Aabb {
        Aabb::from_points(self.corners().iter())
    }

    pub(super) fn get_features(&self, transform: &Transform, direction: &Vec3, feature: &mut ConvexFeature) {
        let box_dir = self.orientation.inverse() * transform.local_support_direction(direction);
        let corners = self.corners().map(|c| transform.transform_point(&c));
        emit_corner_features(&corners, corner_index(&box_dir), feature);
    }

    pub(super) fn get_poly_list(&self, material: u32, sink: &mut dyn PolyListSink) {
        emit_box_polys(&self.corners(), material, sink);
    }
}

impl SupportMap for OrientedBoxConvex {
    fn support(&self, direction: &Vec3) -> Point3 {
        let box_dir = self.orientation.inverse() * direction;
        let h = &self.half_size;
        let local = Point3::new(
            if box_dir.x >= 0.0 { h.x } else { -h.x },
            if box_dir.y >= 0.0 { h.y } else { -h.y },
            if box_dir.z >= 0.0 { h.z } else { -h.z },
        );
        self.to_object(&local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::poly_list::PolyCollector;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_support_picks_signed_corner() {
        let b = BoxConvex::new(Point3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(b.support(&Vec3::new(1.0, -1.0, 1.0)), Point3::new(2.0, -2.0, 3.0));
        // Zero counts as positive.
        assert_relative_eq!(b.support(&Vec3::zeros()), Point3::new(2.0, 2.0, 3.0));

        let rebuilt = BoxConvex::from_aabb(&b.local_bounds());
        assert_relative_eq!(rebuilt.support(&Vec3::new(-1.0, 1.0, -1.0)), Point3::new(0.0, 2.0, -3.0));
    }

    #[test]
    fn test_oriented_box_support_follows_orientation() {
        let quarter = Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2);
        let b = OrientedBoxConvex::new(Point3::origin(), Vec3::new(2.0, 1.0, 1.0), quarter);
        // The long axis now runs along y.
        let p = b.support(&Vec3::new(0.01, 1.0, 0.01));
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(p.x.abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_corner_features_have_three_outward_faces() {
        let b = BoxConvex::new(Point3::origin(), Vec3::repeat(1.0));
        let mut feature = ConvexFeature::default();
        b.get_features(&Transform::identity(), &Vec3::new(1.0, 1.0, 1.0), &mut feature);

        assert_eq!(feature.vertices.len(), 7);
        assert_eq!(feature.faces.len(), 6);
        assert_eq!(feature.edges.len(), 9);
        for face in &feature.faces {
            assert!(face.normal.x >= 0.0 && face.normal.y >= 0.0 && face.normal.z >= 0.0);
            assert_relative_eq!(face.normal.norm(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_box_polys_face_outward() {
        let b = BoxConvex::new(Point3::new(0.0, 0.0, 4.0), Vec3::new(1.0, 2.0, 3.0));
        let mut sink = PolyCollector::new();
        sink.set_transform(&Transform::identity());
        b.get_poly_list(0, &mut sink);

        assert_eq!(sink.polygons().len(), 6);
        let center = Point3::new(0.0, 0.0, 4.0);
        for polygon in sink.polygons() {
            let first = sink.polygon_points(polygon).next().copied().unwrap_or(center);
            assert!(polygon.normal.dot(&(first - center)) > 0.0, "inward face {polygon:?}");
        }
    }
}
