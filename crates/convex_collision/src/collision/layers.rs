//! Collision mask used to filter broad-phase candidates
//!
//! Each candidate object carries the set of categories it belongs to; a
//! working-set refresh passes the set of categories it wants to hear about.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Object categories for candidate filtering
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CollisionMask: u32 {
        /// Static environment geometry
        const STATIC = 1 << 0;
        /// Terrain chunks
        const TERRAIN = 1 << 1;
        /// Interior / building geometry
        const INTERIOR = 1 << 2;
        /// Skinned and animated shapes
        const SHAPE = 1 << 3;
        /// Player characters
        const PLAYER = 1 << 4;
        /// Vehicles
        const VEHICLE = 1 << 5;
        /// Pickups and collectibles
        const ITEM = 1 << 6;
        /// Trigger volumes (no physical response)
        const TRIGGER = 1 << 7;
        /// Volumes that apply forces instead of blocking
        const PHYSICAL_ZONE = 1 << 8;

        /// Everything a moving object normally collides with
        const MOVE_BLOCKERS = Self::STATIC.bits()
            | Self::TERRAIN.bits()
            | Self::INTERIOR.bits()
            | Self::SHAPE.bits()
            | Self::PLAYER.bits()
            | Self::VEHICLE.bits();
    }
}

impl CollisionMask {
    /// Check if two objects should collide based on their categories and masks
    ///
    /// A's category must be in B's mask AND B's category must be in A's mask.
    pub fn should_collide(
        category_a: CollisionMask,
        mask_a: CollisionMask,
        category_b: CollisionMask,
        mask_b: CollisionMask,
    ) -> bool {
        category_a.intersects(mask_b) && category_b.intersects(mask_a)
    }
}

impl Default for CollisionMask {
    fn default() -> Self {
        Self::STATIC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_collide_mutual() {
        assert!(CollisionMask::should_collide(
            CollisionMask::PLAYER,
            CollisionMask::VEHICLE,
            CollisionMask::VEHICLE,
            CollisionMask::PLAYER,
        ));
    }

    #[test]
    fn test_should_not_collide_one_way() {
        assert!(!CollisionMask::should_collide(
            CollisionMask::PLAYER,
            CollisionMask::ITEM,
            CollisionMask::ITEM,
            CollisionMask::TRIGGER,
        ));
    }

    #[test]
    fn test_move_blockers_exclude_triggers() {
        assert!(CollisionMask::MOVE_BLOCKERS.contains(CollisionMask::TERRAIN));
        assert!(!CollisionMask::MOVE_BLOCKERS.intersects(CollisionMask::TRIGGER | CollisionMask::ITEM));
    }
}
