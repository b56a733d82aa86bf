//! Local surface patches and contact generation
//!
//! A [`ConvexFeature`] is the handful of vertices, edges and faces a shape
//! exposes around its support point in some direction. Colliding two
//! features yields the contact points a rigid-body response needs, which a
//! single pair of witness points cannot provide.

use super::ObjectId;
use crate::foundation::math::{utils, Point3, Vec3};

/// Most contacts a single [`ContactList`] will hold
pub const MAX_CONTACTS: usize = 64;

/// Edge between two vertices of a feature (indices into its vertex list)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureEdge {
    /// Endpoint indices
    pub vertex: [u32; 2],
}

/// Triangle of a feature with its outward world-space normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureFace {
    /// Outward unit normal
    pub normal: Vec3,
    /// Corner indices, counter-clockwise seen from outside
    pub vertex: [u32; 3],
}

/// World-space surface patch emitted by a shape
#[derive(Debug, Clone, Default)]
pub struct ConvexFeature {
    /// Vertices in world space
    pub vertices: Vec<Point3>,
    /// Edges between vertices
    pub edges: Vec<FeatureEdge>,
    /// Triangles between vertices
    pub faces: Vec<FeatureFace>,
    /// Material of the emitting shape
    pub material: u32,
    /// Object of the emitting shape
    pub object: ObjectId,
}

/// A single contact point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Contact point in world space
    pub point: Vec3,
    /// Contact normal, pointing away from the surface that was hit
    pub normal: Vec3,
    /// Signed separation along the normal (negative when penetrating)
    pub distance: f32,
    /// Object that was hit
    pub object: ObjectId,
    /// Material that was hit
    pub material: u32,
}

/// Bounded list of contacts
#[derive(Debug, Clone, Default)]
pub struct ContactList {
    contacts: Vec<Contact>,
}

impl ContactList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a contact; returns false when the list is full
    pub fn push(&mut self, contact: Contact) -> bool {
        if self.is_full() {
            return false;
        }
        self.contacts.push(contact);
        true
    }

    /// True once [`MAX_CONTACTS`] contacts are stored
    pub fn is_full(&self) -> bool {
        self.contacts.len() >= MAX_CONTACTS
    }

    /// Number of contacts
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Stored contacts
    pub fn as_slice(&self) -> &[Contact] {
        &self.contacts
    }

    /// Remove every contact, keeping the allocation
    pub fn clear(&mut self) {
        self.contacts.clear();
    }

    fn last_mut(&mut self) -> Option<&mut Contact> {
        self.contacts.last_mut()
    }
}

impl ConvexFeature {
    /// Create an empty feature for `object`
    pub fn new(object: ObjectId, material: u32) -> Self {
        Self {
            object,
            material,
            ..Default::default()
        }
    }

    /// Clear geometry so the feature can be refilled
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.faces.clear();
    }

    /// Append a vertex and return its index
    pub fn push_vertex(&mut self, vertex: Point3) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }

    /// Append an edge between two existing vertices
    pub fn push_edge(&mut self, v0: u32, v1: u32) {
        self.edges.push(FeatureEdge { vertex: [v0, v1] });
    }

    /// Append a triangle; the normal is taken from the winding
    pub fn push_face(&mut self, v0: u32, v1: u32, v2: u32) {
        let normal = utils::triangle_normal(
            &self.vertices[v0 as usize],
            &self.vertices[v1 as usize],
            &self.vertices[v2 as usize],
        );
        self.faces.push(FeatureFace { normal, vertex: [v0, v1, v2] });
    }

    /// Append a triangle wound so that its normal points along `outward`
    pub fn push_face_facing(&mut self, v0: u32, v1: u32, v2: u32, outward: &Vec3) {
        let normal = utils::triangle_normal(
            &self.vertices[v0 as usize],
            &self.vertices[v1 as usize],
            &self.vertices[v2 as usize],
        );
        if normal.dot(outward) < 0.0 {
            self.faces.push(FeatureFace { normal: -normal, vertex: [v0, v2, v1] });
        } else {
            self.faces.push(FeatureFace { normal, vertex: [v0, v1, v2] });
        }
    }

    /// Append an edge unless the same pair is already present
    pub fn push_unique_edge(&mut self, v0: u32, v1: u32) {
        let exists = self
            .edges
            .iter()
            .any(|e| (e.vertex[0] == v0 && e.vertex[1] == v1) || (e.vertex[0] == v1 && e.vertex[1] == v0));
        if !exists {
            self.push_edge(v0, v1);
        }
    }

    /// Generate contacts between this feature and `other`
    ///
    /// Our vertices against their faces, their vertices against our faces
    /// (normal flipped), then every edge pair.
    pub fn collide(&self, other: &ConvexFeature, contacts: &mut ContactList, tolerance: f32) {
        for vertex in &self.vertices {
            other.test_vertex(vertex, contacts, false, tolerance);
        }

        for vertex in &other.vertices {
            let before = contacts.len();
            self.test_vertex(vertex, contacts, true, tolerance);
            if contacts.len() != before {
                // The contact lies on our face but belongs to the other object.
                if let Some(last) = contacts.last_mut() {
                    last.material = other.material;
                    last.object = other.object;
                }
            }
        }

        for edge in &self.edges {
            let start = &self.vertices[edge.vertex[0] as usize];
            let end = &self.vertices[edge.vertex[1] as usize];
            other.test_edge(self, start, end, contacts, tolerance);
        }
    }

    /// Test a vertex against every face of this feature
    fn test_vertex(&self, v: &Point3, contacts: &mut ContactList, flip: bool, tolerance: f32) {
        for face in &self.faces {
            if contacts.is_full() {
                return;
            }
            let p0 = &self.vertices[face.vertex[0] as usize];
            let p1 = &self.vertices[face.vertex[1] as usize];
            let p2 = &self.vertices[face.vertex[2] as usize];

            // Point near the plane?
            let distance = face.normal.dot(&(v - p0));
            if distance.abs() > tolerance {
                continue;
            }

            // Inside all three bounding edges?
            if face.normal.dot(&(p1 - p0).cross(&(v - p0))) < 0.0
                || face.normal.dot(&(p2 - p1).cross(&(v - p1))) < 0.0
                || face.normal.dot(&(p0 - p2).cross(&(v - p2))) < 0.0
            {
                continue;
            }

            contacts.push(Contact {
                point: v.coords,
                normal: if flip { -face.normal } else { face.normal },
                distance,
                object: self.object,
                material: self.material,
            });
        }
    }

    /// Test the segment `(start, end)` of `owner` against every edge of this feature
    fn test_edge(
        &self,
        owner: &ConvexFeature,
        start: &Point3,
        end: &Point3,
        contacts: &mut ContactList,
        tolerance: f32,
    ) {
        let tolerance_sq = tolerance * tolerance;
        for edge in &self.edges {
            if contacts.is_full() {
                return;
            }
            let s2 = &self.vertices[edge.vertex[0] as usize];
            let e2 = &self.vertices[edge.vertex[1] as usize];

            let (dist_sq, i1, i2) = utils::segment_segment_closest(start, end, s2, e2);
            if dist_sq > tolerance_sq {
                continue;
            }
            let mut distance = dist_sq.sqrt();

            // Orientation: a witness inside the other volume means penetration.
            if owner.in_volume(&i1) || self.in_volume(&i2) {
                distance = -distance;
            }

            let normal = if distance.abs() <= f32::EPSILON {
                Vec3::zeros()
            } else {
                (i1 - i2) / distance
            };

            contacts.push(Contact {
                point: i1.coords,
                normal,
                distance,
                object: self.object,
                material: self.material,
            });
        }
    }

    /// True when `v` is behind every face
    fn in_volume(&self, v: &Point3) -> bool {
        self.faces
            .iter()
            .all(|face| face.normal.dot(&(v - self.vertices[face.vertex[0] as usize])) <= 0.0)
    }
}
