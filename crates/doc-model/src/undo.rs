//! Bounded creation log backing "undo last".
//!
//! The log is append-only from the store's point of view: every successful
//! create pushes the new id, undo pops the newest matching entry, and a
//! delete forgets the id so a later undo never resurrects or skips over a
//! record the user already removed.

use crate::annotation::AnnotationId;
use std::collections::VecDeque;

pub const DEFAULT_UNDO_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct UndoLog {
    entries: VecDeque<AnnotationId>,
    capacity: usize,
}

impl UndoLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity.min(DEFAULT_UNDO_CAPACITY)), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a creation, evicting the oldest entry when full.
    pub fn push(&mut self, id: AnnotationId) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(id);
    }

    /// Drop every entry for `id`.
    pub fn forget(&mut self, id: AnnotationId) {
        self.entries.retain(|entry| *entry != id);
    }

    /// Remove and return the newest entry accepted by `matches`.
    pub fn pop_last_matching(
        &mut self,
        mut matches: impl FnMut(AnnotationId) -> bool,
    ) -> Option<AnnotationId> {
        let index = self.entries.iter().rposition(|id| matches(*id))?;
        self.entries.remove(index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut log = UndoLog::new(2);
        let ids: Vec<_> = (0..3).map(|_| AnnotationId::new_v4()).collect();
        for id in &ids {
            log.push(*id);
        }

        assert_eq!(log.len(), 2);
        assert_eq!(log.pop_last_matching(|_| true), Some(ids[2]));
        assert_eq!(log.pop_last_matching(|_| true), Some(ids[1]));
        assert_eq!(log.pop_last_matching(|_| true), None);
    }

    #[test]
    fn pop_skips_non_matching_entries_without_removing_them() {
        let mut log = UndoLog::default();
        let keep = AnnotationId::new_v4();
        let target = AnnotationId::new_v4();
        log.push(target);
        log.push(keep);

        assert_eq!(log.pop_last_matching(|id| id == target), Some(target));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn forget_removes_deleted_ids() {
        let mut log = UndoLog::default();
        let id = AnnotationId::new_v4();
        log.push(id);
        log.forget(id);
        assert!(log.is_empty());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        assert_eq!(UndoLog::new(0).capacity(), 1);
    }
}
