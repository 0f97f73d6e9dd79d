// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scratch vector arena for tessellation-heavy builders.
//!
//! Builders that do a lot of small vector math (arc circumcenters, polygon
//! basis extraction) draw scratch vectors from a [`VectorPool`] instead of
//! allocating. Storage is recycled: after [`VectorPool::clear`] every slot
//! is free again and the next `alloc` reuses it.
//!
//! Keys are generational. A key obtained before a `clear()` no longer
//! resolves afterwards, so a scratch vector can never leak across top-level
//! build calls.

use crate::{GeometryError, Result, Vector3};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Key for a scratch vector in a [`VectorPool`].
    pub struct PoolKey;
}

/// Bump-allocate-then-bulk-reset arena of 3D vectors
#[derive(Debug, Default)]
pub struct VectorPool {
    slots: SlotMap<PoolKey, Vector3<f64>>,
    /// Number of `clear()` calls so far
    epoch: u64,
}

impl VectorPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            epoch: 0,
        }
    }

    /// Allocate a zeroed scratch vector
    #[inline]
    pub fn alloc(&mut self) -> PoolKey {
        self.slots.insert(Vector3::zeros())
    }

    /// Allocate a scratch vector holding `value`
    #[inline]
    pub fn alloc_with(&mut self, value: Vector3<f64>) -> PoolKey {
        self.slots.insert(value)
    }

    /// Read a scratch vector; fails for keys from an earlier epoch
    #[inline]
    pub fn get(&self, key: PoolKey) -> Result<Vector3<f64>> {
        self.slots
            .get(key)
            .copied()
            .ok_or_else(|| GeometryError::Degenerate("scratch vector used after pool reset".into()))
    }

    #[inline]
    pub fn set(&mut self, key: PoolKey, value: Vector3<f64>) -> Result<()> {
        let slot = self
            .slots
            .get_mut(key)
            .ok_or_else(|| GeometryError::Degenerate("scratch vector used after pool reset".into()))?;
        *slot = value;
        Ok(())
    }

    /// Free every slot and invalidate all outstanding keys
    pub fn clear(&mut self) {
        self.slots.clear();
        self.epoch += 1;
    }

    /// Live allocations since the last `clear()`
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots available without growing
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_read() {
        let mut pool = VectorPool::new();
        let a = pool.alloc_with(Vector3::new(1.0, 2.0, 3.0));
        let b = pool.alloc();
        assert_eq!(pool.get(a).unwrap(), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(pool.get(b).unwrap(), Vector3::zeros());
        pool.set(b, Vector3::x()).unwrap();
        assert_eq!(pool.get(b).unwrap(), Vector3::x());
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_clear_invalidates_keys() {
        let mut pool = VectorPool::new();
        let key = pool.alloc_with(Vector3::y());
        pool.clear();
        assert!(pool.get(key).is_err());
        assert!(pool.set(key, Vector3::z()).is_err());
        assert_eq!(pool.epoch(), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_storage_is_recycled() {
        let mut pool = VectorPool::new();
        for _ in 0..64 {
            pool.alloc();
        }
        let capacity = pool.capacity();
        pool.clear();
        for _ in 0..64 {
            pool.alloc();
        }
        assert_eq!(pool.capacity(), capacity);
    }
}
