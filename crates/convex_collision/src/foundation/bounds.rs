//! Axis-aligned bounding boxes
//!
//! Bounding volumes are only used for broad-phase pruning and working-set
//! bookkeeping; the exact answer always comes from the support functions.

use super::math::{Point3, Transform, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Point3,
    /// Maximum corner of the bounding box
    pub max: Point3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Point3, max: Point3) -> Self {
        debug_assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "inverted bounding box {min:?} .. {max:?}"
        );
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half extents
    pub fn from_center_extents(center: Point3, extents: Vec3) -> Self {
        Self::new(center - extents, center + extents)
    }

    /// Smallest box containing every point, or a zero-size box at the origin when empty
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::new(Point3::origin(), Point3::origin());
        };
        iter.fold(Self::new(*first, *first), |mut acc, p| {
            acc.min = acc.min.inf(p);
            acc.max = acc.max.sup(p);
            acc
        })
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Largest half extent
    pub fn max_extent(&self) -> f32 {
        self.extents().max()
    }

    /// True when min <= max on every axis and no component is NaN
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: &Point3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if `other` lies entirely inside this box
    pub fn contains(&self, other: &Aabb) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Grow every face outward by `amount`
    #[must_use]
    pub fn padded(&self, amount: f32) -> Self {
        let pad = Vec3::repeat(amount);
        Self::new(self.min - pad, self.max + pad)
    }

    /// Union of this box and the same box moved by `displacement`
    #[must_use]
    pub fn swept(&self, displacement: &Vec3) -> Self {
        self.merged(&Self::new(self.min + *displacement, self.max + *displacement))
    }

    /// Smallest box containing both boxes
    #[must_use]
    pub fn merged(&self, other: &Aabb) -> Self {
        Self::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// The eight corners, bit 0/1/2 of the index selecting max on x/y/z
    pub fn corners(&self) -> [Point3; 8] {
        std::array::from_fn(|i| {
            Point3::new(
                if i & 1 != 0 { self.max.x } else { self.min.x },
                if i & 2 != 0 { self.max.y } else { self.min.y },
                if i & 4 != 0 { self.max.z } else { self.min.z },
            )
        })
    }

    /// Bounding box of this object-space box after placing it with `transform`
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        let corners = self.corners().map(|c| transform.transform_point(&c));
        Self::from_points(corners.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    #[test]
    fn test_containment_and_overlap() {
        let outer = Aabb::new(Point3::new(-2.0, -2.0, -2.0), Point3::new(2.0, 2.0, 2.0));
        let inner = Aabb::from_center_extents(Point3::new(1.0, 0.0, 0.0), Vec3::repeat(0.5));
        let far = Aabb::from_center_extents(Point3::new(5.0, 0.0, 0.0), Vec3::repeat(0.5));

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.intersects(&inner));
        assert!(!outer.intersects(&far));
        assert!(outer.padded(2.5).intersects(&far));
    }

    #[test]
    fn test_rotated_box_bounds_grow() {
        let unit = Aabb::from_center_extents(Point3::origin(), Vec3::repeat(1.0));
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_4);
        let world = unit.transformed(&Transform::from_position_rotation(Vec3::new(3.0, 0.0, 0.0), rotation));

        assert_relative_eq!(world.center(), Point3::new(3.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(world.extents().x, std::f32::consts::SQRT_2, epsilon = 1e-5);
        assert_relative_eq!(world.extents().z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sweep_covers_both_ends() {
        let b = Aabb::from_center_extents(Point3::origin(), Vec3::repeat(1.0));
        let swept = b.swept(&Vec3::new(0.0, -4.0, 0.0));
        assert_relative_eq!(swept.min.y, -5.0);
        assert_relative_eq!(swept.max.y, 1.0);
        assert!(swept.is_valid());
    }
}
