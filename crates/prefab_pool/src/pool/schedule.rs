//! Delayed-destroy schedule
//!
//! Maps an instance to the absolute time it is due. A binary heap ordered by
//! due time serves [`DelayedDestroySchedule::pop_due`]; overwritten and removed
//! entries stay in the heap and are discarded lazily when they surface.

use crate::foundation::collections::ObjectId;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy)]
struct DueEntry {
    due: f32,
    seq: u64,
    id: ObjectId,
}

impl PartialEq for DueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DueEntry {}

impl PartialOrd for DueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .total_cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Instances waiting to be recycled at a future time
#[derive(Debug, Default)]
pub struct DelayedDestroySchedule {
    live: HashMap<ObjectId, (f32, u64)>,
    heap: BinaryHeap<Reverse<DueEntry>>,
    next_seq: u64,
}

impl DelayedDestroySchedule {
    /// Create an empty schedule
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `id` at `due`, replacing any earlier entry for it
    ///
    /// Returns the previous due time if one was overwritten.
    pub fn insert(&mut self, id: ObjectId, due: f32) -> Option<f32> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let previous = self.live.insert(id, (due, seq)).map(|(due, _)| due);
        self.heap.push(Reverse(DueEntry { due, seq, id }));
        self.compact_if_bloated();
        previous
    }

    /// Cancel the entry for `id`
    pub fn remove(&mut self, id: ObjectId) -> Option<f32> {
        let removed = self.live.remove(&id).map(|(due, _)| due);
        self.compact_if_bloated();
        removed
    }

    /// Due time of `id`, if scheduled
    pub fn due_time(&self, id: ObjectId) -> Option<f32> {
        self.live.get(&id).map(|&(due, _)| due)
    }

    /// Whether `id` is scheduled
    pub fn contains(&self, id: ObjectId) -> bool {
        self.live.contains_key(&id)
    }

    /// Remove and return every entry due at or before `now`, earliest first
    pub fn pop_due(&mut self, now: f32) -> Vec<ObjectId> {
        let mut due = Vec::new();
        while let Some(Reverse(head)) = self.heap.peek().copied() {
            if head.due > now {
                break;
            }
            self.heap.pop();
            if self.live.get(&head.id) == Some(&(head.due, head.seq)) {
                self.live.remove(&head.id);
                due.push(head.id);
            }
        }
        due
    }

    /// Earliest live due time
    pub fn next_due(&mut self) -> Option<f32> {
        while let Some(Reverse(head)) = self.heap.peek().copied() {
            if self.live.get(&head.id) == Some(&(head.due, head.seq)) {
                return Some(head.due);
            }
            self.heap.pop();
        }
        None
    }

    /// Scheduled instances
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.live.keys().copied()
    }

    /// Number of scheduled instances
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Nothing scheduled
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.live.clear();
        self.heap.clear();
    }

    /// Reserve room for `additional` more entries
    pub fn reserve(&mut self, additional: usize) {
        self.live.reserve(additional);
        self.heap.reserve(additional);
    }

    fn compact_if_bloated(&mut self) {
        if self.heap.len() <= self.live.len() * 2 + 32 {
            return;
        }
        self.heap = self
            .live
            .iter()
            .map(|(&id, &(due, seq))| Reverse(DueEntry { due, seq, id }))
            .collect();
    }
}
