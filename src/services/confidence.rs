use std::collections::VecDeque;

use crate::models::ActivityLabel;

/// Accepts a label only after `threshold` consecutive identical raw labels.
///
/// A single differing reading anywhere in the window resets confidence, so
/// with threshold 3 and a 500 ms throttle a change takes at least 1.5 s.
#[derive(Debug, Clone)]
pub struct ConfidenceDebouncer {
    history: VecDeque<ActivityLabel>,
    threshold: usize,
}

impl ConfidenceDebouncer {
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            history: VecDeque::with_capacity(threshold),
            threshold,
        }
    }

    /// Records one raw label and returns it if it is now confident.
    pub fn observe(&mut self, raw: ActivityLabel) -> Option<ActivityLabel> {
        self.history.push_back(raw);
        if self.history.len() > self.threshold {
            self.history.pop_front();
        }

        if self.history.len() == self.threshold && self.history.iter().all(|l| *l == raw) {
            Some(raw)
        } else {
            None
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &ActivityLabel> {
        self.history.iter()
    }
}
