use std::collections::{HashMap, VecDeque};

// Bounded ordered set with strict least-recently-used eviction.
//
// Recency is a monotonically increasing stamp per key; the queue holds
// (stamp, key) pairs in stamp order and stale pairs are skipped lazily on
// eviction.  The queue is compacted once it grows past twice the live set,
// which keeps every operation O(1) amortised regardless of capacity.
#[derive(Debug)]
pub struct LruSet {
    capacity: usize,
    stamps: HashMap<u64, u64>,
    order: VecDeque<(u64, u64)>,
    clock: u64,
}

impl LruSet {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            capacity,
            stamps: HashMap::with_capacity(capacity.min(1 << 16)),
            order: VecDeque::new(),
            clock: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: u64) -> bool {
        self.stamps.contains_key(&key)
    }

    /// Moves a resident key to the most-recently-used position.
    pub fn touch(&mut self, key: u64) {
        debug_assert!(self.contains(key), "touch of non-resident key");
        self.stamp(key);
    }

    /// Inserts a key that is not resident, at the MRU position.  Returns
    /// the evicted LRU key when the set was full.
    pub fn insert(&mut self, key: u64) -> Option<u64> {
        debug_assert!(!self.contains(key), "insert of resident key");
        let evicted = if self.stamps.len() >= self.capacity {
            self.evict_lru_denying(|_| false).ok()
        } else {
            None
        };
        self.stamp(key);
        evicted
    }

    /// Like `insert`, but the victim search skips keys the caller denies.
    /// Err(()) means the set is full and every resident key is denied.
    pub fn insert_denying<F>(&mut self, key: u64, deny: F) -> Result<Option<u64>, ()>
    where
        F: Fn(u64) -> bool,
    {
        debug_assert!(!self.contains(key), "insert of resident key");
        let evicted = if self.stamps.len() >= self.capacity {
            Some(self.evict_lru_denying(deny)?)
        } else {
            None
        };
        self.stamp(key);
        Ok(evicted)
    }

    fn evict_lru_denying<F>(&mut self, deny: F) -> Result<u64, ()>
    where
        F: Fn(u64) -> bool,
    {
        let mut skipped = Vec::new();
        let mut victim = None;
        while let Some((stamp, key)) = self.order.pop_front() {
            if self.stamps.get(&key) != Some(&stamp) {
                continue; // stale pair
            }
            if deny(key) {
                skipped.push((stamp, key));
                continue;
            }
            victim = Some(key);
            break;
        }
        // Skipped keys go back to the front in their original order.
        for entry in skipped.into_iter().rev() {
            self.order.push_front(entry);
        }
        match victim {
            Some(key) => {
                self.stamps.remove(&key);
                Ok(key)
            }
            None => Err(()),
        }
    }

    fn stamp(&mut self, key: u64) {
        self.clock += 1;
        self.stamps.insert(key, self.clock);
        self.order.push_back((self.clock, key));
        if self.order.len() >= self.stamps.len().saturating_mul(2).max(64) {
            let stamps = &self.stamps;
            self.order.retain(|(stamp, key)| stamps.get(key) == Some(stamp));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LruSet;

    #[test]
    fn evicts_in_strict_lru_order() {
        let mut set = LruSet::new(3);
        assert_eq!(set.insert(1), None);
        assert_eq!(set.insert(2), None);
        assert_eq!(set.insert(3), None);
        assert_eq!(set.insert(4), Some(1));
        assert_eq!(set.insert(5), Some(2));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn touch_moves_key_to_mru() {
        let mut set = LruSet::new(3);
        set.insert(1);
        set.insert(2);
        set.insert(3);
        set.touch(1);
        assert_eq!(set.insert(4), Some(2));
        assert!(set.contains(1));
    }

    #[test]
    fn contains_tracks_membership() {
        let mut set = LruSet::new(2);
        assert!(!set.contains(7));
        set.insert(7);
        assert!(set.contains(7));
        set.insert(8);
        set.insert(9);
        assert!(!set.contains(7));
    }

    #[test]
    fn deny_skips_protected_victim() {
        let mut set = LruSet::new(2);
        set.insert(1);
        set.insert(2);
        let evicted = set.insert_denying(3, |key| key == 1).unwrap();
        assert_eq!(evicted, Some(2));
        assert!(set.contains(1));
        assert!(set.contains(3));
    }

    #[test]
    fn deny_preserves_order_of_skipped_keys() {
        let mut set = LruSet::new(3);
        set.insert(1);
        set.insert(2);
        set.insert(3);
        let evicted = set.insert_denying(4, |key| key == 1).unwrap();
        assert_eq!(evicted, Some(2));
        // 1 is still the oldest once the denial is lifted.
        assert_eq!(set.insert(5), Some(1));
    }

    #[test]
    fn all_denied_is_an_error() {
        let mut set = LruSet::new(2);
        set.insert(1);
        set.insert(2);
        assert!(set.insert_denying(3, |_| true).is_err());
        assert!(!set.contains(3));
    }

    #[test]
    fn heavy_touching_keeps_order_correct() {
        let mut set = LruSet::new(4);
        for key in 0..4 {
            set.insert(key);
        }
        // Touch 0..3 a few thousand times in rotating order; recency at the
        // end is 1, 2, 3, 0 from oldest to newest.
        for round in 0..4000u64 {
            set.touch(round % 4);
        }
        set.touch(0);
        assert_eq!(set.insert(10), Some(1));
        assert_eq!(set.insert(11), Some(2));
        assert_eq!(set.insert(12), Some(3));
        assert_eq!(set.insert(13), Some(0));
    }

    #[test]
    fn capacity_one_always_replaces() {
        let mut set = LruSet::new(1);
        assert_eq!(set.insert(1), None);
        assert_eq!(set.insert(2), Some(1));
        assert_eq!(set.insert(3), Some(2));
    }
}
