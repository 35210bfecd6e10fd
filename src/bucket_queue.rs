//! Frequency-bucketed max priority queue.
//!
//! Pair and merge counts follow a skewed distribution: almost everything sits
//! at small counts and very few keys are frequent. Keys with a count below a
//! cap live in one bucket per count, so inserting, removing and repositioning
//! is a set operation on a directly indexed bucket. The few keys at or above
//! the cap share one ordered overflow set.
//!
//! Only counts of at least 2 are stored; a key seen once can never be merged.

use std::cmp::Reverse;
use std::collections::BTreeSet;

/// Smallest count the queue accepts.
pub(crate) const MIN_COUNT: usize = 2;

#[derive(Debug)]
pub(crate) struct BucketQueue<K> {
    /// `buckets[i]` holds the keys with count `i + MIN_COUNT`.
    buckets: Vec<BTreeSet<K>>,
    /// Keys with count `>= cap`, highest count first, then smallest key.
    overflow: BTreeSet<(Reverse<usize>, K)>,
    /// Upper bound on the highest non-empty bucket index.
    top: usize,
    cap: usize,
    len: usize,
}

impl<K: Ord + Copy> BucketQueue<K> {
    /// Creates a queue that indexes counts below `cap` directly.
    pub(crate) fn new(cap: usize) -> Self {
        let cap = cap.max(MIN_COUNT + 1);
        Self {
            buckets: (MIN_COUNT..cap).map(|_| BTreeSet::new()).collect(),
            overflow: BTreeSet::new(),
            top: 0,
            cap,
            len: 0,
        }
    }

    /// Picks a bucket cap for `n` items: about `sqrt(n)`, since at most
    /// `sqrt(n)` keys can have a count of `sqrt(n)` or more.
    pub(crate) fn cap_for(n: usize) -> usize {
        let mut cap = 1usize;
        while cap.saturating_mul(cap) < n {
            cap += 1;
        }
        cap.max(MIN_COUNT + 1)
    }

    /// Inserts `key` under `count`. Counts below [`MIN_COUNT`] are ignored
    /// and reported as `false`.
    pub(crate) fn insert(&mut self, key: K, count: usize) -> bool {
        if count < MIN_COUNT {
            return false;
        }
        let inserted = if count >= self.cap {
            self.overflow.insert((Reverse(count), key))
        } else {
            let index = count - MIN_COUNT;
            self.top = self.top.max(index);
            self.buckets[index].insert(key)
        };
        debug_assert!(inserted, "key queued twice");
        self.len += 1;
        true
    }

    /// Removes `key`, which must have been inserted under `count`.
    pub(crate) fn remove(&mut self, key: K, count: usize) -> bool {
        if count < MIN_COUNT {
            return false;
        }
        let removed = if count >= self.cap {
            self.overflow.remove(&(Reverse(count), key))
        } else {
            self.buckets[count - MIN_COUNT].remove(&key)
        };
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Moves `key` from `old` to `new` count.
    pub(crate) fn reposition(&mut self, key: K, old: usize, new: usize) {
        if old == new {
            return;
        }
        self.remove(key, old);
        self.insert(key, new);
    }

    /// Removes and returns the key with the highest count. Among equal
    /// counts the smallest key wins.
    pub(crate) fn pop_max(&mut self) -> Option<(K, usize)> {
        if let Some((Reverse(count), key)) = self.overflow.pop_first() {
            self.len -= 1;
            return Some((key, count));
        }
        loop {
            let bucket = self.buckets.get_mut(self.top)?;
            if let Some(key) = bucket.pop_first() {
                self.len -= 1;
                return Some((key, self.top + MIN_COUNT));
            }
            if self.top == 0 {
                return None;
            }
            self.top -= 1;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_order() {
        let mut queue = BucketQueue::new(10);
        queue.insert('c', 3);
        queue.insert('a', 2);
        queue.insert('b', 3);
        queue.insert('z', 5);

        assert_eq!(queue.len(), 4);
        assert_eq!(queue.pop_max(), Some(('z', 5)));
        assert_eq!(queue.pop_max(), Some(('b', 3)));
        assert_eq!(queue.pop_max(), Some(('c', 3)));
        assert_eq!(queue.pop_max(), Some(('a', 2)));
        assert_eq!(queue.pop_max(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_above_cap() {
        let mut queue = BucketQueue::new(4);
        queue.insert(1u32, 100);
        queue.insert(2u32, 100);
        queue.insert(3u32, 3);
        queue.insert(4u32, 4000);

        assert_eq!(queue.pop_max(), Some((4, 4000)));
        assert_eq!(queue.pop_max(), Some((1, 100)));
        assert_eq!(queue.pop_max(), Some((2, 100)));
        assert_eq!(queue.pop_max(), Some((3, 3)));
    }

    #[test]
    fn test_ignores_singletons() {
        let mut queue = BucketQueue::new(8);
        assert!(!queue.insert(1u8, 1));
        assert!(!queue.insert(2u8, 0));
        assert!(queue.is_empty());
        assert_eq!(queue.pop_max(), None);
    }

    #[test]
    fn test_reposition() {
        let mut queue = BucketQueue::new(8);
        queue.insert(1u8, 6);
        queue.insert(2u8, 4);
        queue.reposition(1, 6, 3);
        assert_eq!(queue.pop_max(), Some((2, 4)));

        // Dropping below the minimum count removes the key.
        queue.reposition(1, 3, 1);
        assert_eq!(queue.pop_max(), None);
    }

    #[test]
    fn test_top_recovers_after_higher_insert() {
        let mut queue = BucketQueue::new(16);
        queue.insert(1u8, 2);
        assert_eq!(queue.pop_max(), Some((1, 2)));
        queue.insert(2u8, 9);
        queue.insert(3u8, 5);
        assert_eq!(queue.pop_max(), Some((2, 9)));
        assert_eq!(queue.pop_max(), Some((3, 5)));
    }

    #[test]
    fn test_cap_for() {
        assert_eq!(BucketQueue::<u8>::cap_for(0), 3);
        assert_eq!(BucketQueue::<u8>::cap_for(100), 10);
        assert_eq!(BucketQueue::<u8>::cap_for(101), 11);
    }
}
