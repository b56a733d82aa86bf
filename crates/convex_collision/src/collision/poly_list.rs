//! Polygon emission
//!
//! Shapes can describe their boundary as polygons. The consumer is whatever
//! needs real surfaces rather than support points (swept movement, debug
//! drawing); shapes only talk to the [`PolyListSink`] contract.

use super::ObjectId;
use crate::foundation::bounds::Aabb;
use crate::foundation::math::{utils, Point3, Transform, Vec3};
use std::ops::Range;

/// Receiver for polygons emitted by a shape
///
/// Points are added in the shape's object space; the sink applies the
/// transform set by the most recent [`set_transform`](Self::set_transform).
pub trait PolyListSink {
    /// Set the object-to-world transform for subsequent points
    fn set_transform(&mut self, transform: &Transform);

    /// Set the object that owns subsequent polygons
    fn set_object(&mut self, object: ObjectId);

    /// Add a point and return its index for [`vertex`](Self::vertex) / [`plane`](Self::plane)
    fn add_point(&mut self, point: &Point3) -> u32;

    /// Start a polygon
    fn begin(&mut self, material: u32, surface: u32);

    /// Append a previously added point to the open polygon
    fn vertex(&mut self, index: u32);

    /// Set the open polygon's plane from three of its points
    fn plane(&mut self, v0: u32, v1: u32, v2: u32);

    /// Close the open polygon
    fn end(&mut self);
}

/// A polygon gathered by [`PolyCollector`]
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Owning object
    pub object: ObjectId,
    /// Material index given at `begin`
    pub material: u32,
    /// Surface key given at `begin`
    pub surface: u32,
    /// World-space plane normal
    pub normal: Vec3,
    vertices: Range<usize>,
}

/// Sink that keeps every emitted polygon in world space
#[derive(Debug, Clone, Default)]
pub struct PolyCollector {
    transform: Transform,
    object: ObjectId,
    points: Vec<Point3>,
    indices: Vec<u32>,
    polygons: Vec<Polygon>,
    open: Option<Polygon>,
}

impl PolyCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Emitted polygons, in emission order
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// World-space corners of `polygon`
    pub fn polygon_points<'a>(&'a self, polygon: &'a Polygon) -> impl Iterator<Item = &'a Point3> + 'a {
        self.indices[polygon.vertices.clone()]
            .iter()
            .map(|&i| &self.points[i as usize])
    }

    /// True when nothing has been emitted
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Bounding box of every point added so far
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.points.iter())
    }

    /// Drop everything, keeping allocations
    pub fn clear(&mut self) {
        self.points.clear();
        self.indices.clear();
        self.polygons.clear();
        self.open = None;
    }
}

impl PolyListSink for PolyCollector {
    fn set_transform(&mut self, transform: &Transform) {
        self.transform = *transform;
    }

    fn set_object(&mut self, object: ObjectId) {
        self.object = object;
    }

    fn add_point(&mut self, point: &Point3) -> u32 {
        self.points.push(self.transform.transform_point(point));
        u32::try_from(self.points.len() - 1).unwrap_or(u32::MAX)
    }

    fn begin(&mut self, material: u32, surface: u32) {
        debug_assert!(self.open.is_none(), "begin() while a polygon is open");
        let start = self.indices.len();
        self.open = Some(Polygon {
            object: self.object,
            material,
            surface,
            normal: Vec3::zeros(),
            vertices: start..start,
        });
    }

    fn vertex(&mut self, index: u32) {
        debug_assert!((index as usize) < self.points.len(), "vertex {index} was never added");
        if let Some(open) = self.open.as_mut() {
            self.indices.push(index);
            open.vertices.end = self.indices.len();
        }
    }

    fn plane(&mut self, v0: u32, v1: u32, v2: u32) {
        let normal = utils::triangle_normal(
            &self.points[v0 as usize],
            &self.points[v1 as usize],
            &self.points[v2 as usize],
        );
        if let Some(open) = self.open.as_mut() {
            open.normal = normal;
        }
    }

    fn end(&mut self) {
        if let Some(polygon) = self.open.take() {
            self.polygons.push(polygon);
        }
    }
}
