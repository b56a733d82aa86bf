//! Two-sided intrusive lists over a free-list arena
//!
//! A [`Relation`] records directed links `from -> to`. Every link sits in
//! two lists at once: the *forward* list of `from` and the *mirror* list of
//! `to`. Both lists are threaded through the link node itself, so adding or
//! removing a link is O(1) and touches both sides in the same call.

use crate::foundation::collections::{FreeList, SecondaryMap};
use serde::{Deserialize, Serialize};
use slotmap::Key;

const FORWARD: usize = 0;
const MIRROR: usize = 1;

/// Handle to a link
///
/// Carries a serial number, so a handle kept past `unlink` never resolves
/// to a link that later reused the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId {
    index: u32,
    serial: u32,
}

impl LinkId {
    /// Arena slot of the link
    pub fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Lane {
    prev: Option<LinkId>,
    next: Option<LinkId>,
}

#[derive(Debug, Clone)]
struct LinkNode<K, T> {
    serial: u32,
    ends: [K; 2],
    lanes: [Lane; 2],
    payload: T,
}

#[derive(Debug, Clone, Copy, Default)]
struct ListHead {
    first: Option<LinkId>,
    len: u32,
}

/// Directed links between keys, listed from both ends
#[derive(Debug, Clone)]
pub struct Relation<K: Key, T> {
    nodes: FreeList<LinkNode<K, T>>,
    heads: SecondaryMap<K, [ListHead; 2]>,
    next_serial: u32,
}

impl<K: Key, T> Default for Relation<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, T> Relation<K, T> {
    /// Create an empty relation
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a relation with room for `capacity` links before growing
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: FreeList::with_capacity(capacity),
            heads: SecondaryMap::new(),
            next_serial: 0,
        }
    }

    /// Number of live links
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when there are no links
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Slots waiting in the free list
    pub fn free_slots(&self) -> usize {
        self.nodes.free_count()
    }

    /// Add the link `from -> to` and return its handle
    pub fn link(&mut self, from: K, to: K, payload: T) -> LinkId {
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);
        let index = self.nodes.insert(LinkNode {
            serial,
            ends: [from, to],
            lanes: [Lane::default(); 2],
            payload,
        });
        let id = LinkId {
            index: index as u32,
            serial,
        };
        self.attach(id, FORWARD);
        self.attach(id, MIRROR);
        id
    }

    /// Remove a link from both of its lists and return its payload
    ///
    /// Returns `None` for a stale handle.
    pub fn unlink(&mut self, id: LinkId) -> Option<T> {
        self.node(id)?;
        self.detach(id, FORWARD);
        self.detach(id, MIRROR);
        self.nodes.remove(id.index()).map(|node| node.payload)
    }

    /// Turn `from -> to` into `to -> from`, keeping handle and payload
    pub fn reverse(&mut self, id: LinkId) -> bool {
        if self.node(id).is_none() {
            return false;
        }
        self.detach(id, FORWARD);
        self.detach(id, MIRROR);
        if let Some(node) = self.node_mut(id) {
            node.ends.swap(0, 1);
        }
        self.attach(id, FORWARD);
        self.attach(id, MIRROR);
        true
    }

    /// Payload of a link
    pub fn get(&self, id: LinkId) -> Option<&T> {
        self.node(id).map(|node| &node.payload)
    }

    /// Mutable payload of a link
    pub fn get_mut(&mut self, id: LinkId) -> Option<&mut T> {
        self.node_mut(id).map(|node| &mut node.payload)
    }

    /// `(from, to)` of a link
    pub fn endpoints(&self, id: LinkId) -> Option<(K, K)> {
        self.node(id).map(|node| (node.ends[FORWARD], node.ends[MIRROR]))
    }

    /// True while the handle refers to a live link
    pub fn contains(&self, id: LinkId) -> bool {
        self.node(id).is_some()
    }

    /// Links leaving `key`, newest first
    pub fn forward(&self, key: K) -> LaneIter<'_, K, T> {
        self.lane_iter(key, FORWARD)
    }

    /// Links arriving at `key`, newest first
    pub fn mirror(&self, key: K) -> LaneIter<'_, K, T> {
        self.lane_iter(key, MIRROR)
    }

    /// Number of links leaving `key`
    pub fn forward_len(&self, key: K) -> usize {
        self.heads.get(key).map_or(0, |h| h[FORWARD].len as usize)
    }

    /// Number of links arriving at `key`
    pub fn mirror_len(&self, key: K) -> usize {
        self.heads.get(key).map_or(0, |h| h[MIRROR].len as usize)
    }

    /// The link `from -> to`, if present
    pub fn find(&self, from: K, to: K) -> Option<LinkId> {
        self.forward(from).find(|&(_, other, _)| other == to).map(|(id, _, _)| id)
    }

    /// Every live link with its ends
    pub fn iter(&self) -> impl Iterator<Item = (LinkId, K, K, &T)> {
        self.nodes.iter().map(|(index, node)| {
            let id = LinkId {
                index: index as u32,
                serial: node.serial,
            };
            (id, node.ends[FORWARD], node.ends[MIRROR], &node.payload)
        })
    }

    /// Remove every link touching `key`, in either direction
    ///
    /// `removed` sees each link as `(from, to, payload)` after it has left
    /// both lists. The key's list heads are dropped as well.
    pub fn remove_key(&mut self, key: K, mut removed: impl FnMut(K, K, T)) {
        for lane in [FORWARD, MIRROR] {
            while let Some(id) = self.heads.get(key).and_then(|h| h[lane].first) {
                let Some((from, to)) = self.endpoints(id) else {
                    break;
                };
                if let Some(payload) = self.unlink(id) {
                    removed(from, to, payload);
                }
            }
        }
        self.heads.remove(key);
    }

    /// Walk every list and check the two-sided invariant
    ///
    /// Each link must appear exactly once in the forward list of its
    /// `from` and once in the mirror list of its `to`, with matching back
    /// pointers and lengths.
    pub fn is_consistent(&self) -> bool {
        let mut seen = [0usize; 2];
        for (key, heads) in &self.heads {
            for lane in [FORWARD, MIRROR] {
                let mut prev = None;
                let mut cursor = heads[lane].first;
                let mut count = 0u32;
                while let Some(id) = cursor {
                    let Some(node) = self.node(id) else {
                        return false;
                    };
                    if node.ends[lane] != key || node.lanes[lane].prev != prev {
                        return false;
                    }
                    count += 1;
                    if count as usize > self.nodes.len() {
                        return false;
                    }
                    prev = Some(id);
                    cursor = node.lanes[lane].next;
                }
                if count != heads[lane].len {
                    return false;
                }
                seen[lane] += count as usize;
            }
        }
        seen[FORWARD] == self.nodes.len() && seen[MIRROR] == self.nodes.len()
    }

    fn lane_iter(&self, key: K, lane: usize) -> LaneIter<'_, K, T> {
        LaneIter {
            relation: self,
            lane,
            cursor: self.heads.get(key).and_then(|h| h[lane].first),
        }
    }

    fn node(&self, id: LinkId) -> Option<&LinkNode<K, T>> {
        self.nodes.get(id.index()).filter(|node| node.serial == id.serial)
    }

    fn node_mut(&mut self, id: LinkId) -> Option<&mut LinkNode<K, T>> {
        self.nodes.get_mut(id.index()).filter(|node| node.serial == id.serial)
    }

    /// Push `id` onto the front of the list it belongs to in `lane`
    fn attach(&mut self, id: LinkId, lane: usize) {
        let Some(key) = self.node(id).map(|node| node.ends[lane]) else {
            return;
        };
        if !self.heads.contains_key(key) {
            self.heads.insert(key, [ListHead::default(); 2]);
        }
        let Some(head) = self.heads.get_mut(key) else {
            return;
        };
        let old_first = head[lane].first.replace(id);
        head[lane].len += 1;

        if let Some(node) = self.node_mut(id) {
            node.lanes[lane] = Lane {
                prev: None,
                next: old_first,
            };
        }
        if let Some(next) = old_first.and_then(|next| self.node_mut(next)) {
            next.lanes[lane].prev = Some(id);
        }
    }

    /// Unthread `id` from the list it belongs to in `lane`
    fn detach(&mut self, id: LinkId, lane: usize) {
        let Some((key, Lane { prev, next })) = self.node(id).map(|node| (node.ends[lane], node.lanes[lane])) else {
            return;
        };

        if let Some(prev) = prev {
            if let Some(prev_node) = self.node_mut(prev) {
                prev_node.lanes[lane].next = next;
            }
        } else if let Some(head) = self.heads.get_mut(key) {
            debug_assert_eq!(head[lane].first, Some(id), "unlinked node is not the list head");
            head[lane].first = next;
        }
        if let Some(next_node) = next.and_then(|next| self.node_mut(next)) {
            next_node.lanes[lane].prev = prev;
        }
        if let Some(head) = self.heads.get_mut(key) {
            debug_assert!(head[lane].len > 0, "list length underflow");
            head[lane].len = head[lane].len.saturating_sub(1);
        }
        if let Some(node) = self.node_mut(id) {
            node.lanes[lane] = Lane::default();
        }
    }
}

/// Iterator over one list of a [`Relation`], yielding `(link, other end, payload)`
pub struct LaneIter<'a, K: Key, T> {
    relation: &'a Relation<K, T>,
    lane: usize,
    cursor: Option<LinkId>,
}

impl<'a, K: Key, T> Iterator for LaneIter<'a, K, T> {
    type Item = (LinkId, K, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.relation.node(id)?;
        self.cursor = node.lanes[self.lane].next;
        Some((id, node.ends[1 - self.lane], &node.payload))
    }
}
