/*!

An unordered set of `EntityId`s that supports uniform random selection.

Members live in a dense `Vec` so that "pick the i-th member" is an index; a position map makes
membership tests and removal O(1) (removal swaps the last member into the vacated slot, so member
order is not stable).

*/

use crate::{entity::EntityId, hashing::HashMap};

#[derive(Clone, Debug, Default)]
pub struct EntityPool {
    members: Vec<EntityId>,
    // Maps a member to its slot in `members`.
    positions: HashMap<EntityId, usize>,
}

impl EntityPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        EntityPool {
            members: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.positions.contains_key(&entity_id)
    }

    /// Adds `entity_id`. Returns `false` if it was already a member.
    pub fn insert(&mut self, entity_id: EntityId) -> bool {
        if self.positions.contains_key(&entity_id) {
            return false;
        }
        self.positions.insert(entity_id, self.members.len());
        self.members.push(entity_id);
        true
    }

    /// Removes `entity_id`. Returns `false` if it was not a member.
    pub fn remove(&mut self, entity_id: EntityId) -> bool {
        let Some(position) = self.positions.remove(&entity_id) else {
            return false;
        };

        self.members.swap_remove(position);
        // Whoever was last now sits in the vacated slot.
        if let Some(&moved) = self.members.get(position) {
            self.positions.insert(moved, position);
        }
        true
    }

    /// The member in slot `position`, for uniform selection with an index drawn from
    /// `0..self.len()`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<EntityId> {
        self.members.get(position).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(ids: &[usize]) -> EntityPool {
        let mut pool = EntityPool::new();
        for &id in ids {
            assert!(pool.insert(EntityId(id)));
        }
        pool
    }

    #[test]
    fn insert_is_idempotent() {
        let mut pool = pool_of(&[3]);
        assert!(!pool.insert(EntityId(3)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn remove_middle_keeps_positions_consistent() {
        let mut pool = pool_of(&[0, 1, 2, 3]);
        assert!(pool.remove(EntityId(1)));
        assert!(!pool.contains(EntityId(1)));
        assert_eq!(pool.len(), 3);

        // Every remaining member is reachable by position and can still be removed.
        let mut seen: Vec<usize> = (0..pool.len())
            .map(|position| pool.get(position).unwrap().index())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 2, 3]);

        for id in [3, 0, 2] {
            assert!(pool.remove(EntityId(id)));
        }
        assert!(pool.is_empty());
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut pool = pool_of(&[5]);
        assert!(!pool.remove(EntityId(6)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn get_out_of_range() {
        let pool = pool_of(&[1, 2]);
        assert_eq!(pool.get(2), None);
    }
}
