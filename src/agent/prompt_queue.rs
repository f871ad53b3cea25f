//! `PromptQueue` — the priority FIFO operators inject prompts through while
//! an `AgentCore` is running. Drained only at turn boundaries.
//!
//! Ordered by `(priority desc, sequence asc)`: within a priority level,
//! earlier-enqueued prompts come first. Backed by a `BinaryHeap` behind a
//! `parking_lot::Mutex`, never a `tokio::Mutex`, since `Enqueue`/`Drain`/
//! `Remove` never hold the lock across an `.await`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptQueueItem {
    pub id: String,
    pub text: String,
    pub priority: Priority,
    sequence: u64,
}

impl PartialOrd for PromptQueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PromptQueueItem {
    /// `BinaryHeap` is a max-heap: higher priority and lower sequence number
    /// must compare greater so `High` drains before `Normal`, and within a
    /// priority level the earliest enqueue drains first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        use Priority::*;
        match (self, other) {
            (Normal, Normal) | (High, High) => Ordering::Equal,
            (Normal, High) => Ordering::Less,
            (High, Normal) => Ordering::Greater,
        }
    }
}

#[derive(Default)]
pub struct PromptQueue {
    heap: Mutex<BinaryHeap<PromptQueueItem>>,
    next_sequence: AtomicU64,
}

impl PromptQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a prompt, returning its assigned id.
    pub fn enqueue(&self, text: impl Into<String>, priority: Priority) -> String {
        let id = Uuid::new_v4().to_string();
        let sequence = self.next_sequence.fetch_add(1, AtomicOrdering::SeqCst);
        self.heap.lock().push(PromptQueueItem {
            id: id.clone(),
            text: text.into(),
            priority,
            sequence,
        });
        id
    }

    /// Drain the entire queue in `(priority desc, sequence asc)` order.
    pub fn drain(&self) -> Vec<PromptQueueItem> {
        let mut heap = self.heap.lock();
        let mut items: Vec<PromptQueueItem> = std::mem::take(&mut *heap).into_sorted_vec();
        items.reverse();
        items
    }

    /// Remove a specific queued prompt by id, returning whether it was found.
    pub fn remove(&self, id: &str) -> bool {
        let mut heap = self.heap.lock();
        let items: Vec<PromptQueueItem> = std::mem::take(&mut *heap).into_vec();
        let original_len = items.len();
        let retained: Vec<PromptQueueItem> = items.into_iter().filter(|item| item.id != id).collect();
        let found = retained.len() != original_len;
        *heap = retained.into();
        found
    }

    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the queue without draining it, in drain order — used when
    /// building an `AgentStatus` that must report `queued_prompts` without
    /// disturbing the queue.
    pub fn snapshot(&self) -> Vec<PromptQueueItem> {
        let heap = self.heap.lock();
        let mut items: Vec<PromptQueueItem> = heap.clone().into_sorted_vec();
        items.reverse();
        items
    }
}

impl Clone for PromptQueueItem {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            text: self.text.clone(),
            priority: self.priority,
            sequence: self.sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_queue() {
        let q = PromptQueue::new();
        q.enqueue("a", Priority::Normal);
        assert_eq!(q.len(), 1);
        let drained = q.drain();
        assert_eq!(drained.len(), 1);
        assert!(q.is_empty());
    }

    #[test]
    fn high_priority_drains_before_normal_regardless_of_enqueue_order() {
        let q = PromptQueue::new();
        for _ in 0..5 {
            q.enqueue("normal", Priority::Normal);
        }
        let high_id = q.enqueue("STOP NOW DRAIN", Priority::High);

        let drained = q.drain();
        assert_eq!(drained[0].id, high_id);
        assert_eq!(drained[0].priority, Priority::High);
    }

    #[test]
    fn same_priority_preserves_enqueue_order() {
        let q = PromptQueue::new();
        let a = q.enqueue("first", Priority::Normal);
        let b = q.enqueue("second", Priority::Normal);
        let c = q.enqueue("third", Priority::Normal);

        let drained = q.drain();
        assert_eq!(drained.iter().map(|i| i.id.clone()).collect::<Vec<_>>(), vec![a, b, c]);
    }

    #[test]
    fn remove_by_id() {
        let q = PromptQueue::new();
        let a = q.enqueue("a", Priority::Normal);
        let b = q.enqueue("b", Priority::Normal);

        assert!(q.remove(&a));
        assert!(!q.remove(&a));

        let drained = q.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].id, b);
    }

    #[test]
    fn snapshot_does_not_drain() {
        let q = PromptQueue::new();
        q.enqueue("a", Priority::Normal);
        let snap = q.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(q.len(), 1);
    }
}
