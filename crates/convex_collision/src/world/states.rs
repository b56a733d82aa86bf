//! Collision state lists
//!
//! A shape's state list is every state link where it is either end: the
//! forward list holds the pairs where it is participant A, the mirror list
//! the pairs where it is B.

use super::{CollisionWorld, ShapeKey};
use crate::collision::feature::{ContactList, ConvexFeature};
use crate::collision::gjk::{CollisionState, PlacedShape};
use crate::error::{CollisionError, CollisionResult};
use crate::foundation::math::Vec3;
use crate::pool::LinkId;
use log::trace;

impl CollisionWorld {
    /// Collision state between `a` and `b`, created on first use
    ///
    /// An existing state is returned whichever way round it was linked.
    pub fn link_state(&mut self, a: ShapeKey, b: ShapeKey) -> CollisionResult<LinkId> {
        self.record(a)?;
        self.record(b)?;
        if let Some(link) = self.states.find(a, b).or_else(|| self.states.find(b, a)) {
            return Ok(link);
        }
        Ok(self.states.link(a, b, CollisionState::new(&self.config.solver)))
    }

    /// Remove a state from both participants' lists
    pub fn unlink_state(&mut self, link: LinkId) -> CollisionResult<CollisionState> {
        let state = self.states.unlink(link).ok_or(CollisionError::UnknownState(link))?;
        self.retired_stats.merge(state.stats());
        Ok(state)
    }

    /// Exchange the participants of a state, keeping its warm-start data
    pub fn swap_state(&mut self, link: LinkId) -> CollisionResult<()> {
        if !self.states.reverse(link) {
            return Err(CollisionError::UnknownState(link));
        }
        if let Some(state) = self.states.get_mut(link) {
            state.swap();
        }
        Ok(())
    }

    /// A live collision state
    pub fn state(&self, link: LinkId) -> CollisionResult<&CollisionState> {
        self.states.get(link).ok_or(CollisionError::UnknownState(link))
    }

    /// `(A, B)` participants of a state
    pub fn state_pair(&self, link: LinkId) -> CollisionResult<(ShapeKey, ShapeKey)> {
        self.states.endpoints(link).ok_or(CollisionError::UnknownState(link))
    }

    /// Every state `key` takes part in, as A first and then as B
    pub fn state_list(&self, key: ShapeKey) -> CollisionResult<impl Iterator<Item = LinkId> + '_> {
        self.record(key)?;
        Ok(self
            .states
            .forward(key)
            .chain(self.states.mirror(key))
            .map(|(link, _, _)| link))
    }

    /// Run the distance query of a state with the participants' current transforms
    pub fn state_distance(&mut self, link: LinkId, dont_care: f32) -> CollisionResult<f32> {
        let (a, b) = self.state_pair(link)?;
        let ra = self.shapes.get(a).ok_or(CollisionError::UnknownShape(a))?;
        let rb = self.shapes.get(b).ok_or(CollisionError::UnknownShape(b))?;
        let state = self.states.get_mut(link).ok_or(CollisionError::UnknownState(link))?;
        Ok(state.distance(
            PlacedShape::new(&ra.desc.shape, &ra.desc.transform),
            PlacedShape::new(&rb.desc.shape, &rb.desc.transform),
            dont_care,
        ))
    }

    /// Run the intersection test of a state with the participants' current transforms
    pub fn state_intersect(&mut self, link: LinkId) -> CollisionResult<bool> {
        let (a, b) = self.state_pair(link)?;
        let ra = self.shapes.get(a).ok_or(CollisionError::UnknownShape(a))?;
        let rb = self.shapes.get(b).ok_or(CollisionError::UnknownShape(b))?;
        let state = self.states.get_mut(link).ok_or(CollisionError::UnknownState(link))?;
        Ok(state.intersect(
            PlacedShape::new(&ra.desc.shape, &ra.desc.transform),
            PlacedShape::new(&rb.desc.shape, &rb.desc.transform),
        ))
    }

    /// Bring `key`'s state list in line with its working list
    ///
    /// The shape's world box is padded by the configured state margin and
    /// swept by `displacement`. States whose partner no longer overlaps the
    /// box are destroyed; working-list entries that overlap it and have no
    /// state yet get one, with `key` as participant A.
    pub fn update_state_list(&mut self, key: ShapeKey, displacement: &Vec3) -> CollisionResult<()> {
        let margin = self.config.working_set.state_box_margin;
        let mut bounds = self.record(key)?.world_bounds().padded(margin);
        if *displacement != Vec3::zeros() {
            bounds = bounds.swept(displacement);
        }
        let tag = self.next_tag();

        let mut links = std::mem::take(&mut self.scratch_links);
        links.clear();
        links.extend(
            self.states
                .forward(key)
                .chain(self.states.mirror(key))
                .map(|(link, _, _)| link),
        );
        let mut destroyed = 0usize;
        for &link in &links {
            let Some((a, b)) = self.states.endpoints(link) else {
                continue;
            };
            let other = if a == key { b } else { a };
            match self.shapes.get_mut(other) {
                Some(record) if record.world_bounds().intersects(&bounds) => record.tag = tag,
                _ => {
                    if let Some(state) = self.states.unlink(link) {
                        self.retired_stats.merge(state.stats());
                        destroyed += 1;
                    }
                }
            }
        }

        links.clear();
        let mut created = 0usize;
        let mut others = std::mem::take(&mut self.scratch_keys);
        others.clear();
        others.extend(self.working.forward(key).map(|(_, other, ())| other));
        for &other in &others {
            let Some(record) = self.shapes.get_mut(other) else {
                continue;
            };
            if record.tag != tag && record.world_bounds().intersects(&bounds) {
                record.tag = tag;
                self.states.link(key, other, CollisionState::new(&self.config.solver));
                created += 1;
            }
        }
        others.clear();
        self.scratch_keys = others;
        self.scratch_links = links;

        if destroyed + created > 0 {
            trace!("State list of {key:?}: {created} created, {destroyed} destroyed");
        }
        Ok(())
    }

    /// Closest shape to `key` among its state list
    ///
    /// Refreshes the state list, turns every state so that `key` is
    /// participant A, runs the distance query on each and returns the state
    /// with the smallest result. Pairs further apart than `dont_care` stop
    /// early and report a lower bound above it.
    pub fn find_closest_state(&mut self, key: ShapeKey, dont_care: f32) -> CollisionResult<Option<(LinkId, f32)>> {
        self.update_state_list(key, &Vec3::zeros())?;

        let mut links = std::mem::take(&mut self.scratch_links);
        links.clear();
        links.extend(
            self.states
                .forward(key)
                .chain(self.states.mirror(key))
                .map(|(link, _, _)| link),
        );

        let mut best: Option<(LinkId, f32)> = None;
        for &link in &links {
            if self.state_pair(link)?.0 != key {
                self.swap_state(link)?;
            }
            let distance = self.state_distance(link, dont_care)?;
            if best.map_or(true, |(_, closest)| distance < closest) {
                best = Some((link, distance));
            }
        }
        self.scratch_links = links;
        Ok(best)
    }

    /// Generate contacts for every state of `key` closer than `tolerance`
    ///
    /// Uses the distance estimate of each state's last query. Features are
    /// taken along `-v` on `key` and `+v` on the partner, where `v` is the
    /// state's separating vector. Returns the number of contacts added.
    pub fn collect_contacts(
        &mut self,
        key: ShapeKey,
        tolerance: f32,
        contacts: &mut ContactList,
    ) -> CollisionResult<usize> {
        let start = contacts.len();
        let mut links = std::mem::take(&mut self.scratch_links);
        links.clear();
        links.extend(
            self.states
                .forward(key)
                .chain(self.states.mirror(key))
                .map(|(link, _, _)| link),
        );

        let mut fa = ConvexFeature::default();
        let mut fb = ConvexFeature::default();
        for &link in &links {
            if contacts.is_full() {
                break;
            }
            if self.state_pair(link)?.0 != key {
                self.swap_state(link)?;
            }
            let state = self.state(link)?;
            if state.distance_estimate() > tolerance {
                continue;
            }
            let v = state.separating_vector();
            let (a, b) = self.state_pair(link)?;
            let ra = self.record(a)?;
            let rb = self.record(b)?;

            ra.shape().get_features(ra.transform(), &-v, &mut fa);
            fa.object = ra.object();
            fa.material = ra.material();
            rb.shape().get_features(rb.transform(), &v, &mut fb);
            fb.object = rb.object();
            fb.material = rb.material();

            fa.collide(&fb, contacts, tolerance);
        }
        self.scratch_links = links;
        Ok(contacts.len() - start)
    }
}
