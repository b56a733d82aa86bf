//! GJK distance and intersection
//!
//! The solver walks the Minkowski difference `A - B` of two placed shapes
//! with a simplex of at most four points and uses Johnson's sub-algorithm
//! to find the sub-simplex closest to the origin. Sub-determinants are
//! cached per vertex subset (indexed by bit mask), so adding a vertex only
//! computes the entries that involve it.
//!
//! A [`CollisionState`] is kept per shape pair across ticks. Its cached
//! object-space support points let the next query rebuild the last simplex
//! under the new transforms and restart from there.
//!
//! # Termination
//!
//! Every query ends with a [`Termination`]. Degenerate support points, an
//! exhausted iteration cap and a failed subset search return the best
//! estimate so far and count as irregularities in [`SolverStats`]; they are
//! never errors.

use super::shape::{ConvexShape, SupportMap};
use crate::config::SolverConfig;
use crate::foundation::math::{Point3, Transform, Vec3};
use log::trace;
use serde::{Deserialize, Serialize};

/// Every vertex slot in use
const FULL: u8 = 15;

/// Smallest accepted determinant sum of a sub-simplex, relative to its
/// longest vertex raised to the subset's dimension
const FLAT_SIMPLEX_EPSILON: f32 = 1e-5;

/// Slot indices set in `bits`
fn slots(bits: u8) -> impl Iterator<Item = usize> {
    (0..4).filter(move |&i| bits & (1 << i) != 0)
}

/// A shape together with its current object-to-world transform
pub struct PlacedShape<'a, S: SupportMap + ?Sized = ConvexShape> {
    /// Shape geometry in object space
    pub shape: &'a S,
    /// Placement for this query
    pub transform: &'a Transform,
}

impl<S: SupportMap + ?Sized> Clone for PlacedShape<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: SupportMap + ?Sized> Copy for PlacedShape<'_, S> {}

impl<'a, S: SupportMap + ?Sized> PlacedShape<'a, S> {
    /// Place `shape` with `transform`
    pub fn new(shape: &'a S, transform: &'a Transform) -> Self {
        Self { shape, transform }
    }

    /// Object-space support point along the world-space `direction`
    fn local_support(&self, direction: &Vec3) -> Point3 {
        self.shape.support(&self.transform.local_support_direction(direction))
    }

    fn to_world(&self, local: &Point3) -> Point3 {
        self.transform.transform_point(local)
    }
}

/// How the last query on a [`CollisionState`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Termination {
    /// Distance estimate within the relative error of its lower bound
    Converged,
    /// Lower bound exceeded the caller's don't-care distance
    Beyond,
    /// A separating direction was found, either by the intersection test
    /// or by a positive lower bound on a flattened simplex
    Separated,
    /// Simplex enclosed the origin or the search vector vanished
    Intersecting,
    /// Distance fell below the touching tolerance
    Touching,
    /// A support point repeated a simplex vertex
    Degenerate,
    /// The iteration cap was reached
    IterationCap,
    /// No sub-simplex passed the validity test
    NoValidSubset,
}

impl Termination {
    /// True for the outcomes that signal numerical trouble
    pub fn is_irregular(self) -> bool {
        matches!(self, Self::Degenerate | Self::IterationCap | Self::NoValidSubset)
    }
}

/// Counters accumulated over solver queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStats {
    /// Queries run
    pub queries: u64,
    /// Simplex vertices added over all queries
    pub iterations: u64,
    /// Queries ending in any irregular termination
    pub irregularities: u64,
    /// Queries stopped by a repeated support point
    pub degenerate: u64,
    /// Queries stopped by the iteration cap
    pub cap_hits: u64,
    /// Queries where the subset search failed
    pub no_valid_subset: u64,
    /// Queries that bailed out early (beyond don't-care distance or separated)
    pub early_outs: u64,
    /// Queries answered from the rebuilt warm-start simplex alone
    pub warm_hits: u64,
}

impl SolverStats {
    fn record(&mut self, termination: Termination, iterations: u32) {
        self.queries += 1;
        self.iterations += u64::from(iterations);
        match termination {
            Termination::Degenerate => self.degenerate += 1,
            Termination::IterationCap => self.cap_hits += 1,
            Termination::NoValidSubset => self.no_valid_subset += 1,
            Termination::Beyond | Termination::Separated => self.early_outs += 1,
            _ => {}
        }
        if termination.is_irregular() {
            self.irregularities += 1;
        }
    }

    /// Add another set of counters to this one
    pub fn merge(&mut self, other: &SolverStats) {
        self.queries += other.queries;
        self.iterations += other.iterations;
        self.irregularities += other.irregularities;
        self.degenerate += other.degenerate;
        self.cap_hits += other.cap_hits;
        self.no_valid_subset += other.no_valid_subset;
        self.early_outs += other.early_outs;
        self.warm_hits += other.warm_hits;
    }
}

/// Persistent solver state for one shape pair
///
/// Slot `i` of the simplex holds `y[i] = A(p[i]) - B(q[i])`, with `p` and
/// `q` kept in each shape's object space. `bits` marks the slots of the
/// current closest sub-simplex and is always a subset of `all_bits`.
#[derive(Debug, Clone)]
pub struct CollisionState {
    config: SolverConfig,

    v: Vec3,
    dist: f32,
    result: f32,

    bits: u8,
    all_bits: u8,
    last: usize,
    last_bit: u8,

    y: [Vec3; 4],
    p: [Point3; 4],
    q: [Point3; 4],
    dp: [[f32; 4]; 4],
    det: [[f32; 4]; 16],

    iterations: u32,
    termination: Option<Termination>,
    stats: SolverStats,
}

impl CollisionState {
    /// Create an empty state; the first query starts cold
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            config: *config,
            v: Vec3::zeros(),
            dist: 0.0,
            result: f32::MAX,
            bits: 0,
            all_bits: 0,
            last: 0,
            last_bit: 0,
            y: [Vec3::zeros(); 4],
            p: [Point3::origin(); 4],
            q: [Point3::origin(); 4],
            dp: [[0.0; 4]; 4],
            det: [[0.0; 4]; 16],
            iterations: 0,
            termination: None,
            stats: SolverStats::default(),
        }
    }

    /// Forget the cached simplex so the next query starts cold
    pub fn reset(&mut self) {
        self.bits = 0;
        self.all_bits = 0;
        self.v = Vec3::zeros();
        self.termination = None;
    }

    /// Exchange the roles of A and B
    ///
    /// The Minkowski points flip sign, which leaves every dot product and
    /// sub-determinant unchanged, so the warm-start data stays valid.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.p, &mut self.q);
        for y in &mut self.y {
            *y = -*y;
        }
        self.v = -self.v;
    }

    /// Separation estimate from the last distance query (or `f32::MAX` before any)
    ///
    /// For an early-out this is the lower bound that exceeded the don't-care
    /// distance.
    pub fn distance_estimate(&self) -> f32 {
        self.result
    }

    /// Current search vector, pointing from B towards A
    pub fn separating_vector(&self) -> Vec3 {
        self.v
    }

    /// Simplex vertices added by the last query
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// How the last query ended, `None` before the first
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Number of vertices in the current closest sub-simplex
    pub fn simplex_len(&self) -> u32 {
        self.bits.count_ones()
    }

    /// Counters over every query run on this state
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Solver settings this state was created with
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Closest points in each shape's object space
    ///
    /// Weighted by the sub-determinants of the current sub-simplex. `None`
    /// before the first query.
    pub fn closest_points(&self) -> Option<(Point3, Point3)> {
        if self.bits == 0 {
            return None;
        }
        let row = &self.det[usize::from(self.bits)];
        let mut sum = 0.0;
        let mut pa = Vec3::zeros();
        let mut pb = Vec3::zeros();
        for i in slots(self.bits) {
            sum += row[i];
            pa += self.p[i].coords * row[i];
            pb += self.q[i].coords * row[i];
        }
        if sum.abs() <= f32::EPSILON {
            return None;
        }
        Some((Point3::from(pa / sum), Point3::from(pb / sum)))
    }

    /// Closest points in world space under the given transforms
    pub fn witness_points(&self, a: &Transform, b: &Transform) -> Option<(Point3, Point3)> {
        self.closest_points()
            .map(|(pa, pb)| (a.transform_point(&pa), b.transform_point(&pb)))
    }

    /// Boolean intersection test
    ///
    /// Starts from the separating direction of the previous query when
    /// that query found one; otherwise from the difference of the shapes'
    /// support points along the zero vector.
    pub fn intersect<A, B>(&mut self, a: PlacedShape<'_, A>, b: PlacedShape<'_, B>) -> bool
    where
        A: SupportMap + ?Sized,
        B: SupportMap + ?Sized,
    {
        self.iterations = 0;
        let warm = self.config.warm_start
            && self.termination == Some(Termination::Separated)
            && self.v.norm_squared() > self.config.zero_length_squared;
        if !warm {
            self.cold_start(a, b);
        }
        self.bits = 0;
        self.all_bits = 0;

        let termination = loop {
            self.next_bit();
            let w = self.add_support(a, b);

            if self.v.dot(&w) > 0.0 {
                break Termination::Separated;
            }
            if self.degenerate(&w) {
                break Termination::Degenerate;
            }
            if self.iterations >= self.config.max_iterations {
                break Termination::IterationCap;
            }

            self.iterations += 1;
            self.y[self.last] = w;
            self.all_bits = self.bits | self.last_bit;
            if !self.closest() {
                break Termination::NoValidSubset;
            }
            if self.bits == FULL {
                if self.well_conditioned(FULL) {
                    break Termination::Intersecting;
                }
                break Termination::Degenerate;
            }
            if self.v.norm_squared() <= self.config.zero_length_squared {
                break Termination::Intersecting;
            }
        };

        self.dist = self.v.norm();
        self.finish(termination);
        termination == Termination::Intersecting
    }

    /// Separating distance between the placed shapes
    ///
    /// Returns early with the running lower bound once it exceeds
    /// `dont_care`. Intersecting or touching shapes report a distance of (or
    /// within tolerance of) zero.
    pub fn distance<A, B>(&mut self, a: PlacedShape<'_, A>, b: PlacedShape<'_, B>, dont_care: f32) -> f32
    where
        A: SupportMap + ?Sized,
        B: SupportMap + ?Sized,
    {
        self.iterations = 0;

        let warm = self.config.warm_start && self.bits != 0 && self.rebuild(a, b);
        if warm {
            debug_assert_ne!(self.bits, FULL, "rebuilt a full simplex");
            if self.dist <= self.config.distance_tolerance {
                return self.finish_warm(self.dist, Termination::Touching);
            }
        } else {
            self.cold_start(a, b);
            self.bits = 0;
            self.all_bits = 0;
            if self.v.norm_squared() <= self.config.zero_length_squared {
                self.dist = 0.0;
                return self.finish_distance(0.0, Termination::Touching);
            }
        }

        let mut mu: f32 = 0.0;
        let termination = loop {
            self.next_bit();
            let w = self.add_support(a, b);

            mu = mu.max(self.v.dot(&w) / self.dist);
            if mu > dont_care {
                return self.finish_distance(mu, Termination::Beyond);
            }
            if (self.dist - mu).abs() <= self.dist * self.config.relative_error {
                break Termination::Converged;
            }
            if self.degenerate(&w) {
                break Termination::Degenerate;
            }
            if self.iterations >= self.config.max_iterations {
                break Termination::IterationCap;
            }

            let kept = self.bits;
            self.iterations += 1;
            self.y[self.last] = w;
            self.all_bits = self.bits | self.last_bit;
            if !self.closest() {
                break Termination::NoValidSubset;
            }
            if self.bits == FULL {
                if mu <= 0.0 {
                    break Termination::Intersecting;
                }
                // A positive lower bound means the tetrahedron is flat, not
                // enclosing. Keep the previous face and its search vector.
                self.bits = kept;
                self.all_bits = kept;
                if self.dist <= self.config.distance_tolerance {
                    break Termination::Touching;
                }
                break Termination::Separated;
            }

            self.dist = self.v.norm();
            if self.dist <= self.config.distance_tolerance {
                break Termination::Touching;
            }
        };

        if termination == Termination::Intersecting {
            self.dist = 0.0;
        }
        self.finish_distance(self.dist, termination)
    }

    fn finish(&mut self, termination: Termination) {
        self.termination = Some(termination);
        self.stats.record(termination, self.iterations);
        if termination.is_irregular() {
            trace!(
                "GJK irregularity: {termination:?} after {} iterations (distance {})",
                self.iterations,
                self.dist
            );
        }
    }

    fn finish_distance(&mut self, result: f32, termination: Termination) -> f32 {
        self.result = result;
        self.finish(termination);
        result
    }

    fn finish_warm(&mut self, result: f32, termination: Termination) -> f32 {
        self.stats.warm_hits += 1;
        self.finish_distance(result, termination)
    }

    /// Search vector from the support points along the zero direction
    fn cold_start<A, B>(&mut self, a: PlacedShape<'_, A>, b: PlacedShape<'_, B>)
    where
        A: SupportMap + ?Sized,
        B: SupportMap + ?Sized,
    {
        let zero = Vec3::zeros();
        let sa = a.to_world(&a.shape.support(&zero));
        let sb = b.to_world(&b.shape.support(&zero));
        self.v = sa - sb;
        self.dist = self.v.norm();
    }

    /// Re-derive the previous closest sub-simplex under the current transforms
    ///
    /// Returns false when the cached vertices no longer form a usable
    /// simplex; the caller then starts cold. A full simplex is never
    /// restored: whether it still encloses the origin is for the iteration
    /// loop to decide.
    fn rebuild<A, B>(&mut self, a: PlacedShape<'_, A>, b: PlacedShape<'_, B>) -> bool
    where
        A: SupportMap + ?Sized,
        B: SupportMap + ?Sized,
    {
        let previous = self.bits;
        self.bits = 0;
        self.all_bits = 0;

        for i in 0..4 {
            let bit = 1 << i;
            if previous & bit == 0 {
                continue;
            }
            let w = a.to_world(&self.p[i]) - b.to_world(&self.q[i]);
            if self.degenerate(&w) {
                return false;
            }
            self.last = i;
            self.last_bit = bit;
            self.y[i] = w;
            self.all_bits = self.bits | bit;
            self.compute_det();
            self.bits |= bit;
        }

        for s in (1..=previous).rev() {
            if s != FULL && s & previous == s && self.valid(s) && self.well_conditioned(s) {
                self.bits = s;
                self.v = self.compute_vector(s);
                self.dist = self.v.norm();
                return true;
            }
        }
        self.bits = 0;
        self.all_bits = 0;
        false
    }

    /// Fetch support points along `-v` on A and `v` on B into the free slot
    fn add_support<A, B>(&mut self, a: PlacedShape<'_, A>, b: PlacedShape<'_, B>) -> Vec3
    where
        A: SupportMap + ?Sized,
        B: SupportMap + ?Sized,
    {
        let p = a.local_support(&-self.v);
        let q = b.local_support(&self.v);
        self.p[self.last] = p;
        self.q[self.last] = q;
        a.to_world(&p) - b.to_world(&q)
    }

    /// Pick the first free slot for the next vertex
    fn next_bit(&mut self) {
        self.last = 0;
        self.last_bit = 1;
        while self.bits & self.last_bit != 0 {
            self.last += 1;
            self.last_bit <<= 1;
        }
    }

    /// True when `w` repeats a vertex already in the simplex
    fn degenerate(&self, w: &Vec3) -> bool {
        slots(self.all_bits).any(|i| self.y[i] == *w)
    }

    /// Extend the dot products and sub-determinants with slot `last`
    fn compute_det(&mut self) {
        let last = self.last;
        let last_bit = usize::from(self.last_bit);
        let bits = usize::from(self.bits);
        let dp = &mut self.dp;
        let det = &mut self.det;
        let y = &self.y;

        for i in 0..4 {
            if bits & (1 << i) != 0 {
                let d = y[i].dot(&y[last]);
                dp[i][last] = d;
                dp[last][i] = d;
            }
        }
        dp[last][last] = y[last].dot(&y[last]);

        det[last_bit][last] = 1.0;
        for j in 0..4 {
            let sj = 1 << j;
            if bits & sj == 0 {
                continue;
            }
            let s2 = sj | last_bit;
            det[s2][j] = dp[last][last] - dp[last][j];
            det[s2][last] = dp[j][j] - dp[j][last];
            for k in 0..j {
                let sk = 1 << k;
                if bits & sk == 0 {
                    continue;
                }
                let s3 = sk | s2;
                det[s3][k] = det[s2][j] * (dp[j][j] - dp[j][k]) + det[s2][last] * (dp[last][j] - dp[last][k]);
                det[s3][j] = det[sk | last_bit][k] * (dp[k][k] - dp[k][j])
                    + det[sk | last_bit][last] * (dp[last][k] - dp[last][j]);
                det[s3][last] =
                    det[sk | sj][k] * (dp[k][k] - dp[k][last]) + det[sk | sj][j] * (dp[j][k] - dp[j][last]);
            }
        }

        if self.all_bits == FULL {
            det[15][0] = det[14][1] * (dp[1][1] - dp[1][0])
                + det[14][2] * (dp[2][1] - dp[2][0])
                + det[14][3] * (dp[3][1] - dp[3][0]);
            det[15][1] = det[13][0] * (dp[0][0] - dp[0][1])
                + det[13][2] * (dp[2][0] - dp[2][1])
                + det[13][3] * (dp[3][0] - dp[3][1]);
            det[15][2] = det[11][0] * (dp[0][0] - dp[0][2])
                + det[11][1] * (dp[1][0] - dp[1][2])
                + det[11][3] * (dp[3][0] - dp[3][2]);
            det[15][3] = det[7][0] * (dp[0][0] - dp[0][3])
                + det[7][1] * (dp[1][0] - dp[1][3])
                + det[7][2] * (dp[2][0] - dp[2][3]);
        }
    }

    /// Point of the sub-simplex `bits` closest to the origin
    fn compute_vector(&self, bits: u8) -> Vec3 {
        let row = &self.det[usize::from(bits)];
        let mut sum = 0.0;
        let mut v = Vec3::zeros();
        for i in slots(bits) {
            sum += row[i];
            v += self.y[i] * row[i];
        }
        if sum.abs() <= f32::MIN_POSITIVE {
            return v;
        }
        v / sum
    }

    /// Johnson's validity test for the sub-simplex `s`
    ///
    /// Members need a positive sub-determinant; every other vertex of the
    /// full simplex must have a non-positive one when added to `s`.
    fn valid(&self, s: u8) -> bool {
        for i in slots(self.all_bits) {
            let bit = 1 << i;
            if s & bit != 0 {
                if self.det[usize::from(s)][i] <= 0.0 {
                    return false;
                }
            } else if self.det[usize::from(s | bit)][i] > 0.0 {
                return false;
            }
        }
        true
    }

    /// True when the sub-simplex `s` has a determinant sum clearly above
    /// rounding noise for its size
    fn well_conditioned(&self, s: u8) -> bool {
        let row = &self.det[usize::from(s)];
        let sum: f32 = slots(s).map(|i| row[i]).sum();
        let max_sq = slots(s).map(|i| self.dp[i][i]).fold(0.0, f32::max);
        let scale = slots(s).skip(1).fold(1.0, |acc, _| acc * max_sq);
        sum > FLAT_SIMPLEX_EPSILON * scale
    }

    /// Update `bits` and `v` to the closest sub-simplex containing the new vertex
    fn closest(&mut self) -> bool {
        self.compute_det();
        for s in (1..=self.bits).rev() {
            if s & self.bits == s && self.valid(s | self.last_bit) {
                self.bits = s | self.last_bit;
                if self.bits != FULL {
                    self.v = self.compute_vector(self.bits);
                }
                return true;
            }
        }
        if self.valid(self.last_bit) {
            self.bits = self.last_bit;
            self.v = self.y[self.last];
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::shape::BoxConvex;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    fn unit_cube() -> BoxConvex {
        BoxConvex::new(Point3::origin(), Vec3::repeat(0.5))
    }

    fn solver() -> SolverConfig {
        SolverConfig::default()
    }

    #[test]
    fn test_separated_cubes_distance() {
        let cube = unit_cube();
        let ta = Transform::identity();
        let tb = Transform::from_translation(Vec3::new(3.0, 0.0, 0.0));
        let mut state = CollisionState::new(&solver());

        let d = state.distance(PlacedShape::new(&cube, &ta), PlacedShape::new(&cube, &tb), f32::MAX);
        assert_relative_eq!(d, 2.0, epsilon = 1e-3);
        assert!(!state.termination().is_some_and(Termination::is_irregular));
        assert!((1..=3).contains(&state.simplex_len()));

        let (pa, pb) = state.witness_points(&ta, &tb).unwrap();
        assert_relative_eq!(pa.x, 0.5, epsilon = 1e-3);
        assert_relative_eq!(pb.x, 2.5, epsilon = 1e-3);
        assert_relative_eq!((pb - pa).norm(), d, epsilon = 1e-3);
    }

    #[test]
    fn test_overlapping_cubes_intersect() {
        let cube = unit_cube();
        let ta = Transform::identity();
        let tb = Transform::from_translation(Vec3::new(0.5, 0.0, 0.0));
        let mut state = CollisionState::new(&solver());

        assert!(state.intersect(PlacedShape::new(&cube, &ta), PlacedShape::new(&cube, &tb)));
        assert_eq!(state.termination(), Some(Termination::Intersecting));
        let d = state.distance(PlacedShape::new(&cube, &ta), PlacedShape::new(&cube, &tb), f32::MAX);
        assert!(d <= solver().distance_tolerance, "overlapping cubes reported {d}");
    }

    #[test]
    fn test_far_pair_bails_out_beyond_dont_care() {
        let cube = unit_cube();
        let ta = Transform::identity();
        let tb = Transform::from_translation(Vec3::new(50.0, 0.0, 0.0));
        let mut state = CollisionState::new(&solver());

        let d = state.distance(PlacedShape::new(&cube, &ta), PlacedShape::new(&cube, &tb), 1.0);
        assert!(d > 1.0);
        assert!(d <= 49.0 + 1e-3);
        assert_eq!(state.termination(), Some(Termination::Beyond));
        assert_eq!(state.stats().early_outs, 1);
    }

    #[test]
    fn test_warm_start_repeats_without_iterations() {
        let cube = unit_cube();
        let ta = Transform::from_position_rotation(Vec3::zeros(), Quat::from_axis_angle(&Vec3::z_axis(), 0.4));
        let tb = Transform::from_translation(Vec3::new(2.5, 0.7, -0.3));
        let mut state = CollisionState::new(&solver());

        let first = state.distance(PlacedShape::new(&cube, &ta), PlacedShape::new(&cube, &tb), f32::MAX);
        let second = state.distance(PlacedShape::new(&cube, &ta), PlacedShape::new(&cube, &tb), f32::MAX);
        assert!(state.iterations() <= 1);
        assert_relative_eq!(first, second, epsilon = 1e-4);
    }

    #[test]
    fn test_swap_mirrors_the_query() {
        let small = BoxConvex::new(Point3::origin(), Vec3::new(0.5, 0.25, 1.0));
        let big = BoxConvex::new(Point3::origin(), Vec3::repeat(1.0));
        let ta = Transform::identity();
        let tb = Transform::from_translation(Vec3::new(0.0, 4.0, 0.0));
        let mut state = CollisionState::new(&solver());

        let forward = state.distance(PlacedShape::new(&small, &ta), PlacedShape::new(&big, &tb), f32::MAX);
        let (pa, pb) = state.witness_points(&ta, &tb).unwrap();

        state.swap();
        let backward = state.distance(PlacedShape::new(&big, &tb), PlacedShape::new(&small, &ta), f32::MAX);
        let (qa, qb) = state.witness_points(&tb, &ta).unwrap();

        assert_relative_eq!(forward, backward, epsilon = 1e-4);
        assert_relative_eq!(forward, 2.75, epsilon = 1e-3);
        assert_relative_eq!(pa.y, qb.y, epsilon = 1e-3);
        assert_relative_eq!(pb.y, qa.y, epsilon = 1e-3);
    }

    #[test]
    fn test_coincident_support_points_touch() {
        let cube = unit_cube();
        let t = Transform::identity();
        let mut state = CollisionState::new(&solver());

        let d = state.distance(PlacedShape::new(&cube, &t), PlacedShape::new(&cube, &t), f32::MAX);
        assert_eq!(d, 0.0);
        assert_eq!(state.termination(), Some(Termination::Touching));
    }

    #[test]
    fn test_zero_cap_never_adds_vertices() {
        let cube = unit_cube();
        let ta = Transform::identity();
        let tb = Transform::from_translation(Vec3::new(3.0, 1.0, 0.0));
        let config = SolverConfig {
            max_iterations: 0,
            ..SolverConfig::default()
        };
        let mut state = CollisionState::new(&config);

        state.distance(PlacedShape::new(&cube, &ta), PlacedShape::new(&cube, &tb), f32::MAX);
        assert_eq!(state.iterations(), 0);
        assert_eq!(state.termination(), Some(Termination::IterationCap));
        assert_eq!(state.stats().cap_hits, 1);
        assert_eq!(state.stats().irregularities, 1);
    }
}
