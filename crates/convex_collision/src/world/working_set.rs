//! Working lists, reference lists and garbage collection

use super::{CollisionWorld, ShapeKey};
use crate::collision::layers::CollisionMask;
use crate::error::CollisionResult;
use crate::foundation::bounds::Aabb;
use crate::foundation::math::Vec3;
use crate::pool::LinkId;
use crate::spatial::{BroadPhase, BroadPhaseQuery};
use log::{debug, trace};

impl CollisionWorld {
    /// Link `other` into `key`'s working list (and `key` into `other`'s
    /// reference list)
    ///
    /// Adding a pair that is already linked returns the existing link.
    pub fn add_to_working_list(&mut self, key: ShapeKey, other: ShapeKey) -> CollisionResult<LinkId> {
        self.record(key)?;
        self.record(other)?;
        if let Some(existing) = self.working.find(key, other) {
            return Ok(existing);
        }
        Ok(self.working.link(key, other, ()))
    }

    /// Drop `other` from `key`'s working list; returns whether it was there
    pub fn remove_from_working_list(&mut self, key: ShapeKey, other: ShapeKey) -> CollisionResult<bool> {
        self.record(key)?;
        Ok(self
            .working
            .find(key, other)
            .and_then(|link| self.working.unlink(link))
            .is_some())
    }

    /// Shapes in `key`'s working list, most recently added first
    pub fn working_list(&self, key: ShapeKey) -> CollisionResult<impl Iterator<Item = ShapeKey> + '_> {
        self.record(key)?;
        Ok(self.working.forward(key).map(|(_, other, ())| other))
    }

    /// Shapes whose working lists contain `key`
    pub fn references(&self, key: ShapeKey) -> CollisionResult<impl Iterator<Item = ShapeKey> + '_> {
        self.record(key)?;
        Ok(self.working.mirror(key).map(|(_, other, ())| other))
    }

    /// Destroy every shape in `key`'s registered set that no working list
    /// references; returns how many were destroyed
    pub fn collect_garbage(&mut self, key: ShapeKey) -> CollisionResult<usize> {
        let registered = std::mem::take(&mut self.record_mut(key)?.registered);
        let (dead, alive): (Vec<_>, Vec<_>) = registered
            .into_iter()
            .partition(|&child| self.working.mirror_len(child) == 0);
        self.record_mut(key)?.registered = alive;

        for &child in &dead {
            self.release(child);
        }
        if !dead.is_empty() {
            debug!("Collected {} unreferenced shapes from {key:?}", dead.len());
        }
        Ok(dead.len())
    }

    /// Refresh `key`'s working list against the broad phase
    ///
    /// Entries whose bounds left `query_box`, whose category is outside
    /// `mask` or whose collision is disabled are dropped first. Then each
    /// provider reported by the broad phase is garbage collected once, and
    /// candidates that are not in the working list yet are registered with
    /// their provider and linked in. The owner's own object is never a
    /// candidate.
    pub fn update_working_list(
        &mut self,
        key: ShapeKey,
        query_box: &Aabb,
        mask: CollisionMask,
        broad_phase: &dyn BroadPhase,
    ) -> CollisionResult<()> {
        let object = self.record(key)?.object();

        // Drop stale entries.
        let mut links = std::mem::take(&mut self.scratch_links);
        links.clear();
        links.extend(self.working.forward(key).map(|(link, _, ())| link));
        for &link in &links {
            let Some((_, other)) = self.working.endpoints(link) else {
                continue;
            };
            let keep = self.shapes.get(other).is_some_and(|record| {
                record.collision_enabled
                    && record.category().intersects(mask)
                    && record.world_bounds().intersects(query_box)
            });
            if !keep {
                self.working.unlink(link);
            }
        }
        self.scratch_links = links;

        let mut candidates = std::mem::take(&mut self.candidates);
        candidates.clear();
        broad_phase.find_overlapping(
            &BroadPhaseQuery {
                bounds: *query_box,
                mask,
                exclude: Some(object),
            },
            &mut candidates,
        );

        // Collect each provider once before adding new shapes to it.
        let mut providers = std::mem::take(&mut self.scratch_keys);
        providers.clear();
        for candidate in &candidates {
            if !providers.contains(&candidate.provider) {
                providers.push(candidate.provider);
            }
        }
        for &provider in &providers {
            if self.contains(provider) {
                self.collect_garbage(provider)?;
            }
        }
        providers.clear();
        self.scratch_keys = providers;

        let mut added = 0usize;
        for candidate in candidates.drain(..) {
            if !self.contains(candidate.provider) {
                trace!("Skipping candidate from destroyed provider {:?}", candidate.provider);
                continue;
            }
            let present = self
                .working
                .forward(key)
                .any(|(_, other, ())| self.shapes.get(other).is_some_and(|r| r.matches(&candidate)));
            if present {
                continue;
            }
            let shape = self.register_object(candidate.provider, candidate.desc)?;
            self.working.link(key, shape, ());
            added += 1;
        }
        self.candidates = candidates;

        trace!(
            "Working list of {key:?}: {} entries ({added} new)",
            self.working.forward_len(key)
        );
        Ok(())
    }

    /// Refresh `key`'s working list only when its possible movement this
    /// tick leaves the cached query box
    ///
    /// The shape's world box is padded by
    /// `l = (|velocity * dt| + max_acceleration * dt) * growth + bias`. If the
    /// cached query box still contains it nothing happens and `false` is
    /// returned; otherwise the box is padded by a further
    /// `query_margin_factor * l`, cached, and used for
    /// [`update_working_list`](Self::update_working_list).
    pub fn update_working_set(
        &mut self,
        key: ShapeKey,
        velocity: &Vec3,
        dt: f32,
        mask: CollisionMask,
        broad_phase: &dyn BroadPhase,
    ) -> CollisionResult<bool> {
        let ws = &self.config.working_set;
        let record = self.record(key)?;
        let travel = (velocity * dt).norm() + ws.max_acceleration * dt;
        let l = travel * ws.growth + ws.bias;
        let padded = record.world_bounds().padded(l);

        if record.query_box.is_some_and(|cached| cached.contains(&padded)) {
            trace!("Working set of {key:?} still covered by cached query box");
            return Ok(false);
        }

        let query_box = padded.padded(ws.query_margin_factor * l);
        self.record_mut(key)?.query_box = Some(query_box);
        self.update_working_list(key, &query_box, mask, broad_phase)?;
        Ok(true)
    }

    /// Forget the cached query box so the next refresh queries the broad phase
    pub fn invalidate_working_set(&mut self, key: ShapeKey) -> CollisionResult<()> {
        self.record_mut(key)?.query_box = None;
        Ok(())
    }
}
