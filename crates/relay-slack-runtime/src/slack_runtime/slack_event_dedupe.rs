use std::collections::{HashSet, VecDeque};

/// Bounded record of envelope keys already handled in this process.
///
/// Slack redelivers envelopes it believes were not acknowledged; the oldest
/// keys are evicted once `cap` is reached.
pub(super) struct ProcessedEventStore {
    cap: usize,
    order: VecDeque<String>,
    index: HashSet<String>,
}

impl ProcessedEventStore {
    pub(super) fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            order: VecDeque::new(),
            index: HashSet::new(),
        }
    }

    /// Records `key`; returns false when it was already present.
    pub(super) fn mark_processed(&mut self, key: &str) -> bool {
        if self.index.contains(key) {
            return false;
        }
        self.order.push_back(key.to_string());
        self.index.insert(key.to_string());
        while self.order.len() > self.cap {
            if let Some(removed) = self.order.pop_front() {
                self.index.remove(&removed);
            }
        }
        true
    }

    pub(super) fn len(&self) -> usize {
        self.order.len()
    }
}
