use std::collections::{HashSet, VecDeque};

use uuid::Uuid;

/// Single-flight queue for per-student level recalculation requests. A
/// student id can be pending at most once; later requests for an id already
/// in the queue coalesce into the pending one. Ids drain in arrival order.
#[derive(Debug, Default)]
pub struct RecalcQueue {
    order: VecDeque<Uuid>,
    pending: HashSet<Uuid>,
}

impl RecalcQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the id was newly queued, false when it coalesced
    /// with a request already pending.
    pub fn enqueue(&mut self, student_id: Uuid) -> bool {
        if self.pending.insert(student_id) {
            self.order.push_back(student_id);
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<Uuid> {
        let id = self.order.pop_front()?;
        self.pending.remove(&id);
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_requests_coalesce() {
        let mut queue = RecalcQueue::new();
        let id = Uuid::new_v4();
        assert!(queue.enqueue(id));
        assert!(!queue.enqueue(id));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drains_in_arrival_order() {
        let mut queue = RecalcQueue::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        queue.enqueue(first);
        queue.enqueue(second);
        queue.enqueue(first);
        assert_eq!(queue.pop(), Some(first));
        assert_eq!(queue.pop(), Some(second));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn id_can_be_requeued_after_draining() {
        let mut queue = RecalcQueue::new();
        let id = Uuid::new_v4();
        queue.enqueue(id);
        assert_eq!(queue.pop(), Some(id));
        assert!(queue.enqueue(id));
    }
}
