//! Math utilities and types
//!
//! Provides the vector and transform types shared by shapes, the solver
//! and the working-set bookkeeping.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Object-to-world placement: position, rotation and non-uniform scale
///
/// Points are mapped as `position + rotation * (scale ⊙ p)`. Shapes keep
/// their geometry in object space and are only moved through a transform
/// while a query is running.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from a translation vector
    pub fn from_translation(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Replace the scale, keeping position and rotation
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Map an object-space point into world space
    pub fn transform_point(&self, point: &Point3) -> Point3 {
        Point3::from(self.position + self.rotation * self.scale.component_mul(&point.coords))
    }

    /// Map a world point back into object space
    pub fn inverse_transform_point(&self, point: &Point3) -> Point3 {
        let local = self.rotation.inverse() * (point.coords - self.position);
        Point3::from(local.component_div(&self.scale))
    }

    /// Convert a world-space search direction into the object-space direction
    /// whose support point is the world support point of the placed shape.
    ///
    /// For `x' = R(S x) + t`, `x'·d = x·(S Rᵀ d) + t·d`, so the local
    /// maximiser along `S Rᵀ d` is the world maximiser along `d`.
    pub fn local_support_direction(&self, direction: &Vec3) -> Vec3 {
        self.scale.component_mul(&(self.rotation.inverse() * direction))
    }
}

/// Math utility functions
pub mod utils {
    use super::{Point3, Vec3};

    /// Index of the point with the largest projection on `direction`
    ///
    /// Ties keep the earliest index so the answer is stable for the zero
    /// direction. Returns `None` for an empty slice.
    pub fn support_index(points: &[Point3], direction: &Vec3) -> Option<usize> {
        let (first, rest) = points.split_first()?;
        let mut best = first.coords.dot(direction);
        let mut index = 0;
        for (i, point) in rest.iter().enumerate() {
            let dp = point.coords.dot(direction);
            if dp > best {
                best = dp;
                index = i + 1;
            }
        }
        Some(index)
    }

    /// Average of a set of points, or the origin when empty
    pub fn centroid(points: &[Point3]) -> Point3 {
        if points.is_empty() {
            return Point3::origin();
        }
        let sum = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / points.len() as f32)
    }

    /// Unit normal of the triangle `(p0, p1, p2)` using the right-hand rule
    ///
    /// Degenerate triangles yield the zero vector.
    pub fn triangle_normal(p0: &Point3, p1: &Point3, p2: &Point3) -> Vec3 {
        let n = (p1 - p0).cross(&(p2 - p0));
        n.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros)
    }

    /// Squared distance between segments `(p1, q1)` and `(p2, q2)`
    ///
    /// Returns the squared distance together with the closest point on
    /// each segment. Follows the clamped parametric solution from
    /// Ericson, "Real-Time Collision Detection", 5.1.9.
    pub fn segment_segment_closest(
        p1: &Point3,
        q1: &Point3,
        p2: &Point3,
        q2: &Point3,
    ) -> (f32, Point3, Point3) {
        const EPSILON: f32 = 1e-8;

        let d1 = q1 - p1;
        let d2 = q2 - p2;
        let r = p1 - p2;
        let a = d1.dot(&d1);
        let e = d2.dot(&d2);
        let f = d2.dot(&r);

        let (s, t) = if a <= EPSILON && e <= EPSILON {
            (0.0, 0.0)
        } else if a <= EPSILON {
            (0.0, (f / e).clamp(0.0, 1.0))
        } else {
            let c = d1.dot(&r);
            if e <= EPSILON {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else {
                let b = d1.dot(&d2);
                let denom = a * e - b * b;
                let mut s = if denom > EPSILON {
                    ((b * f - c * e) / denom).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let mut t = (b * s + f) / e;
                if t < 0.0 {
                    t = 0.0;
                    s = (-c / a).clamp(0.0, 1.0);
                } else if t > 1.0 {
                    t = 1.0;
                    s = ((b - c) / a).clamp(0.0, 1.0);
                }
                (s, t)
            }
        };

        let c1 = p1 + d1 * s;
        let c2 = p2 + d2 * t;
        ((c1 - c2).norm_squared(), c1, c2)
    }
}
