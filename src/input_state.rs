//! Submitted-input history for up/down recall.

use std::collections::VecDeque;

/// Entries kept before the oldest is dropped.
pub const HISTORY_LIMIT: usize = 50;

/// Bounded history of submitted lines with a navigation cursor.
#[derive(Debug, Clone)]
pub struct InputHistory {
    entries: VecDeque<String>,
    capacity: usize,
    /// Current position in history (None = not navigating)
    pos: Option<usize>,
    /// Input being composed when navigation started
    saved_input: Option<String>,
}

impl Default for InputHistory {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl InputHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            pos: None,
            saved_input: None,
        }
    }

    /// Record a submitted line and leave navigation mode.
    pub fn push(&mut self, text: &str) {
        self.pos = None;
        self.saved_input = None;

        let text = text.trim();
        if text.is_empty() || self.capacity == 0 {
            return;
        }
        self.entries.push_back(text.to_string());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Step to an older entry. `current` is restored when navigating back down.
    pub fn up(&mut self, current: &str) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let pos = match self.pos {
            None => {
                self.saved_input = Some(current.to_string());
                self.entries.len() - 1
            }
            Some(pos) => pos.saturating_sub(1),
        };
        self.pos = Some(pos);
        self.entries.get(pos).cloned()
    }

    /// Step to a newer entry; past the newest, returns the saved input.
    pub fn down(&mut self) -> Option<String> {
        let pos = self.pos?;
        if pos + 1 < self.entries.len() {
            self.pos = Some(pos + 1);
            self.entries.get(pos + 1).cloned()
        } else {
            self.pos = None;
            Some(self.saved_input.take().unwrap_or_default())
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
