//! LRU-K replacement policy for the buffer pool.
//!
//! LRU-K keeps the last K access timestamps per frame and evicts the
//! frame with the largest backward K-distance: the span between now and
//! the K-th most recent access. Frames with fewer than K recorded
//! accesses have infinite distance and are always preferred as victims,
//! ordered among themselves by their first access (plain LRU). Compared
//! to LRU this keeps one-touch scan pages from flushing out pages with a
//! real re-reference history.

use std::collections::{HashMap, VecDeque};

use super::frame::FrameId;

/// Eviction strategy consumed by the buffer pool.
///
/// The pool drives the replacer under its own latch, so implementations
/// need no internal locking. LRU-K is the default policy; anything with
/// the same surface (CLOCK, 2Q) can stand in behind it.
pub trait Replacer {
    /// Records an access to `frame_id` at the current logical time,
    /// creating a non-evictable slot for unseen frames.
    fn record_access(&mut self, frame_id: FrameId);

    /// Marks `frame_id` as evictable or pinned-down.
    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool);

    /// Selects and removes the eviction victim, if any frame is evictable.
    fn evict(&mut self) -> Option<FrameId>;

    /// Forcibly removes an evictable frame (page deletion path).
    fn remove(&mut self, frame_id: FrameId);

    /// Returns the number of currently evictable frames.
    fn size(&self) -> usize;
}

/// Per-frame replacement bookkeeping.
struct Slot {
    /// Last K access timestamps, most recent first.
    history: VecDeque<u64>,
    /// Whether the frame may be chosen as a victim.
    evictable: bool,
}

/// LRU-K implementation of [`Replacer`].
///
/// Timestamps are a logical counter incremented on every
/// [`record_access`](Replacer::record_access). All operations are O(k) or
/// O(tracked frames), which is fine at buffer pool scale.
pub struct LruKReplacer {
    /// Maximum number of frames this replacer may track.
    capacity: usize,
    /// The K in LRU-K.
    k: usize,
    /// Logical clock.
    current_ts: u64,
    /// Tracked frames.
    slots: HashMap<FrameId, Slot>,
    /// Count of slots with `evictable == true`.
    evictable_count: usize,
}

impl LruKReplacer {
    /// Creates a replacer for up to `num_frames` frames with the given K.
    ///
    /// # Panics
    ///
    /// Panics if `k` is zero.
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k >= 1, "k must be >= 1");
        Self {
            capacity: num_frames,
            k,
            current_ts: 0,
            slots: HashMap::with_capacity(num_frames),
            evictable_count: 0,
        }
    }

    /// Returns the configured K.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the maximum number of tracked frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of tracked frames, evictable or not.
    pub fn num_tracked(&self) -> usize {
        self.slots.len()
    }
}

impl Replacer for LruKReplacer {
    fn record_access(&mut self, frame_id: FrameId) {
        assert!(
            frame_id.index() < self.capacity,
            "frame {} out of range for replacer of {} frames",
            frame_id.index(),
            self.capacity
        );

        let slot = self.slots.entry(frame_id).or_insert_with(|| Slot {
            history: VecDeque::with_capacity(self.k),
            evictable: false,
        });
        slot.history.push_front(self.current_ts);
        if slot.history.len() > self.k {
            slot.history.pop_back();
        }
        self.current_ts += 1;
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let slot = self
            .slots
            .get_mut(&frame_id)
            .unwrap_or_else(|| panic!("set_evictable on untracked frame {}", frame_id.index()));
        if slot.evictable != evictable {
            slot.evictable = evictable;
            if evictable {
                self.evictable_count += 1;
            } else {
                self.evictable_count -= 1;
            }
        }
    }

    fn evict(&mut self) -> Option<FrameId> {
        // The K-th most recent access is the oldest retained timestamp, so
        // in both distance classes the victim is the evictable frame with
        // the smallest back-of-history timestamp. Frames with fewer than K
        // accesses form the infinite-distance class and always win; for
        // them the oldest retained timestamp is the first access ever, so
        // ordering inside the class is plain LRU. Frame id breaks exact
        // timestamp ties deterministically.
        let victim = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.evictable)
            .map(|(&id, slot)| {
                let full = slot.history.len() >= self.k;
                let oldest = *slot.history.back().expect("tracked slot has a history");
                (full, oldest, id.index())
            })
            .min()?;

        let frame_id = FrameId::new(victim.2);
        self.slots.remove(&frame_id);
        self.evictable_count -= 1;
        Some(frame_id)
    }

    fn remove(&mut self, frame_id: FrameId) {
        let Some(slot) = self.slots.get(&frame_id) else {
            return;
        };
        assert!(
            slot.evictable,
            "remove of non-evictable frame {}",
            frame_id.index()
        );
        self.slots.remove(&frame_id);
        self.evictable_count -= 1;
    }

    fn size(&self) -> usize {
        self.evictable_count
    }
}

impl std::fmt::Debug for LruKReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruKReplacer")
            .field("capacity", &self.capacity)
            .field("k", &self.k)
            .field("tracked", &self.slots.len())
            .field("evictable", &self.evictable_count)
            .finish()
    }
}
