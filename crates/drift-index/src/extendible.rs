//! Extendible hash table.
//!
//! An extendible hash table indexes buckets through a directory of
//! `2^global_depth` slots. Each bucket covers the keys whose low
//! `local_depth` hash bits match its slot pattern, so several directory
//! slots may reference the same bucket. When a bucket overflows it is
//! split in two; the directory doubles only when the overflowing bucket
//! already uses every directory bit. Growth is therefore incremental: one
//! bucket at a time, never a full rehash.
//!
//! # Concurrency
//!
//! The directory sits behind a reader-writer lock and every bucket has its
//! own. Lookups and in-place inserts hold the directory lock shared while
//! they resolve and lock the target bucket, which keeps a concurrent split
//! from rewiring the slot under them. Splits and directory doubling take
//! the directory lock exclusively. Lock order is always directory before
//! bucket, and a full-bucket retry releases everything before starting
//! over.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;

/// A concurrent hash table with an extendible directory.
///
/// Keys and values are stored by value; `get` hands back a clone. The
/// hasher type parameter `S` follows [`std::collections::HashMap`] and
/// exists so callers (and tests) can control bucket placement.
///
/// # Example
///
/// ```rust
/// use drift_index::ExtendibleHashTable;
///
/// let table = ExtendibleHashTable::new(2);
/// for i in 0..16u64 {
///     table.insert(i, i * 10);
/// }
/// assert_eq!(table.get(&7), Some(70));
/// ```
pub struct ExtendibleHashTable<K, V, S = RandomState> {
    /// Maximum number of entries a bucket holds before it must split.
    bucket_size: usize,
    /// Hash builder shared by all operations.
    hasher: S,
    /// Directory of bucket references.
    dir: RwLock<Directory<K, V>>,
}

/// The directory: `2^global_depth` slots, each referencing a bucket.
struct Directory<K, V> {
    slots: Vec<Arc<Bucket<K, V>>>,
    global_depth: usize,
    num_buckets: usize,
}

impl<K, V> Directory<K, V> {
    /// Maps a hash to its directory slot using the low `global_depth` bits.
    #[inline]
    fn slot_of(&self, hash: usize) -> usize {
        hash & ((1usize << self.global_depth) - 1)
    }
}

/// A bucket: a capacity-bounded list of entries plus its local depth.
struct Bucket<K, V> {
    state: RwLock<BucketState<K, V>>,
}

struct BucketState<K, V> {
    entries: Vec<(K, V)>,
    local_depth: usize,
}

impl<K, V> Bucket<K, V> {
    fn new(local_depth: usize) -> Self {
        Self {
            state: RwLock::new(BucketState {
                entries: Vec::new(),
                local_depth,
            }),
        }
    }

    fn with_entries(local_depth: usize, entries: Vec<(K, V)>) -> Self {
        Self {
            state: RwLock::new(BucketState {
                entries,
                local_depth,
            }),
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> ExtendibleHashTable<K, V> {
    /// Creates a table with the given bucket capacity and the default
    /// hasher.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_size` is zero.
    pub fn new(bucket_size: usize) -> Self {
        Self::with_hasher(bucket_size, RandomState::new())
    }
}

impl<K: Hash + Eq + Clone, V: Clone, S: BuildHasher> ExtendibleHashTable<K, V, S> {
    /// Creates a table with the given bucket capacity and hash builder.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_size` is zero.
    pub fn with_hasher(bucket_size: usize, hasher: S) -> Self {
        assert!(bucket_size > 0, "bucket_size must be > 0");
        Self {
            bucket_size,
            hasher,
            dir: RwLock::new(Directory {
                slots: vec![Arc::new(Bucket::new(0))],
                global_depth: 0,
                num_buckets: 1,
            }),
        }
    }

    /// Returns the number of hash bits the directory currently uses.
    pub fn global_depth(&self) -> usize {
        self.dir.read().global_depth
    }

    /// Returns the local depth of the bucket referenced by directory slot
    /// `dir_index`.
    ///
    /// # Panics
    ///
    /// Panics if `dir_index` is out of range for the current directory.
    pub fn local_depth(&self, dir_index: usize) -> usize {
        let dir = self.dir.read();
        let local_depth = dir.slots[dir_index].state.read().local_depth;
        local_depth
    }

    /// Returns the number of distinct buckets.
    pub fn num_buckets(&self) -> usize {
        self.dir.read().num_buckets
    }

    /// Returns the bucket capacity the table was created with.
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Looks up `key`, returning a clone of its value.
    pub fn get(&self, key: &K) -> Option<V> {
        let hash = self.hash_of(key);
        let dir = self.dir.read();
        let bucket = Arc::clone(&dir.slots[dir.slot_of(hash)]);
        let state = bucket.state.read();
        state
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        let hash = self.hash_of(key);
        let dir = self.dir.read();
        let bucket = Arc::clone(&dir.slots[dir.slot_of(hash)]);
        let mut state = bucket.state.write();
        match state.entries.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                state.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Inserts `key` → `value`, replacing any existing value for the key.
    ///
    /// Splits the target bucket (doubling the directory when necessary)
    /// until room exists. Each split strictly increases either the global
    /// depth or the offending bucket's local depth, so the retry loop
    /// terminates.
    pub fn insert(&self, key: K, value: V) {
        let mut pair = (key, value);
        loop {
            match self.try_insert(pair) {
                Ok(()) => return,
                Err(rejected) => {
                    self.split_for(&rejected.0);
                    pair = rejected;
                }
            }
        }
    }

    /// Attempts an insert without restructuring; hands the pair back if
    /// the target bucket is full.
    fn try_insert(&self, pair: (K, V)) -> Result<(), (K, V)> {
        let hash = self.hash_of(&pair.0);
        let dir = self.dir.read();
        let bucket = Arc::clone(&dir.slots[dir.slot_of(hash)]);
        let mut state = bucket.state.write();
        if let Some(slot) = state.entries.iter_mut().find(|(k, _)| *k == pair.0) {
            slot.1 = pair.1;
            return Ok(());
        }
        if state.entries.len() < self.bucket_size {
            state.entries.push(pair);
            return Ok(());
        }
        Err(pair)
    }

    /// Splits the bucket that `key` routes to, doubling the directory
    /// first when the bucket already uses every directory bit.
    fn split_for(&self, key: &K) {
        let hash = self.hash_of(key);
        let mut dir = self.dir.write();
        let idx = dir.slot_of(hash);
        let bucket = Arc::clone(&dir.slots[idx]);
        let mut state = bucket.state.write();

        if state.entries.len() < self.bucket_size {
            // Another thread split this bucket between our release of the
            // shared lock and acquisition of the exclusive one.
            return;
        }

        if state.local_depth == dir.global_depth {
            // Double the directory: the upper half mirrors the lower half.
            dir.slots.extend_from_within(..);
            dir.global_depth += 1;
        }

        // The bucket now distinguishes one more hash bit. Entries with the
        // new bit set move to a fresh sibling.
        state.local_depth += 1;
        let bit = 1usize << (state.local_depth - 1);
        let (keep, moved): (Vec<_>, Vec<_>) = std::mem::take(&mut state.entries)
            .into_iter()
            .partition(|(k, _)| self.hash_of(k) & bit == 0);
        state.entries = keep;

        let sibling = Arc::new(Bucket::with_entries(state.local_depth, moved));
        dir.num_buckets += 1;
        for (i, slot) in dir.slots.iter_mut().enumerate() {
            if i & bit != 0 && Arc::ptr_eq(slot, &bucket) {
                *slot = Arc::clone(&sibling);
            }
        }
    }

    #[inline]
    fn hash_of(&self, key: &K) -> usize {
        let mut state = self.hasher.build_hasher();
        key.hash(&mut state);
        state.finish() as usize
    }
}

impl<K, V, S> std::fmt::Debug for ExtendibleHashTable<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dir = self.dir.read();
        f.debug_struct("ExtendibleHashTable")
            .field("bucket_size", &self.bucket_size)
            .field("global_depth", &dir.global_depth)
            .field("num_buckets", &dir.num_buckets)
            .finish()
    }
}
