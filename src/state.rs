//! Session state owned by the client core.
//!
//! `ClientState` holds everything that describes the IRC session from the
//! user's point of view: our nickname, the known-user roster and the window
//! directory with its unread counters. It has a single owner and is passed
//! by reference into each operation, so no locking is involved.

use std::collections::{HashMap, HashSet};

use crate::buffer::{Message, Window, WindowKind};
use crate::protocol::{DisplayIntent, WindowSummary};

/// Result of a close-window request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Window removed; channels still need a PART on the wire
    Closed(WindowKind),
    /// Primary channel or unknown window: nothing happened
    Rejected,
}

pub struct ClientState {
    /// Current nickname; changes only on a confirmed NICK for ourselves.
    pub nickname: String,

    /// Real name sent at registration.
    pub real_name: String,

    primary_channel: String,

    /// Global roster (one set, not per channel).
    users: HashSet<String>,

    /// Windows keyed by id.
    windows: HashMap<String, Window>,

    /// Window ids in tab order; the primary channel is always first.
    windows_order: Vec<String>,

    active_window: String,

    /// Whether the hosting UI has focus.
    focused: bool,

    message_limit: usize,

    /// Set on Welcome, consumed by the next EndOfNames.
    pub(crate) announce_on_names_end: bool,
}

impl ClientState {
    pub fn new(
        nickname: impl Into<String>,
        real_name: impl Into<String>,
        primary_channel: impl Into<String>,
        message_limit: usize,
    ) -> Self {
        let primary_channel = primary_channel.into();
        let mut windows = HashMap::new();
        windows.insert(
            primary_channel.clone(),
            Window::new(primary_channel.clone(), WindowKind::Channel, message_limit),
        );

        Self {
            nickname: nickname.into(),
            real_name: real_name.into(),
            windows_order: vec![primary_channel.clone()],
            active_window: primary_channel.clone(),
            primary_channel,
            users: HashSet::new(),
            windows,
            focused: true,
            message_limit,
            announce_on_names_end: false,
        }
    }

    pub fn primary_channel(&self) -> &str {
        &self.primary_channel
    }

    pub fn active_window(&self) -> &str {
        &self.active_window
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn window(&self, id: &str) -> Option<&Window> {
        self.windows.get(id)
    }

    pub fn has_window(&self, id: &str) -> bool {
        self.windows.contains_key(id)
    }

    /// Windows in tab order.
    pub fn windows(&self) -> impl Iterator<Item = &Window> {
        self.windows_order.iter().filter_map(|id| self.windows.get(id))
    }

    pub fn unread_count(&self, id: &str) -> usize {
        self.windows.get(id).map_or(0, Window::unread_count)
    }

    /// Whether `id` may be closed by the user.
    pub fn is_closable(&self, id: &str) -> bool {
        id != self.primary_channel && self.windows.contains_key(id)
    }

    /// Get or create a window. Creation never changes the active window.
    pub fn ensure_window(&mut self, id: &str, kind: WindowKind) -> &mut Window {
        if !self.windows.contains_key(id) {
            self.windows_order.push(id.to_string());
        }
        let limit = self.message_limit;
        self.windows
            .entry(id.to_string())
            .or_insert_with(|| Window::new(id, kind, limit))
    }

    /// Switch to a specific window by id. Returns false if it does not exist.
    pub fn switch_to(&mut self, id: &str) -> bool {
        match self.windows.get_mut(id) {
            Some(window) => {
                window.clear_unread();
                self.active_window = id.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove a window. The primary channel cannot be closed.
    pub fn close_window(&mut self, id: &str) -> CloseOutcome {
        if !self.is_closable(id) {
            return CloseOutcome::Rejected;
        }
        let Some(window) = self.windows.remove(id) else {
            return CloseOutcome::Rejected;
        };
        self.windows_order.retain(|w| w != id);
        if self.active_window == id {
            let primary = self.primary_channel.clone();
            self.switch_to(&primary);
        }
        CloseOutcome::Closed(window.kind)
    }

    /// Append to an existing window. Unread accounting follows the active window.
    pub fn append(&mut self, id: &str, message: Message, is_notifiable: bool) -> Option<DisplayIntent> {
        let is_active = self.active_window == id;
        let window = self.windows.get_mut(id)?;
        window.push(message.clone(), is_active);
        Some(DisplayIntent {
            window: id.to_string(),
            window_kind: window.kind,
            message,
            is_notifiable,
        })
    }

    /// Append a System message to the active window.
    pub fn append_system(&mut self, body: impl Into<String>) -> Option<DisplayIntent> {
        let active = self.active_window.clone();
        self.append(&active, Message::system(body), false)
    }

    pub fn add_user(&mut self, nick: &str) -> bool {
        self.users.insert(nick.to_string())
    }

    pub fn remove_user(&mut self, nick: &str) -> bool {
        self.users.remove(nick)
    }

    /// Replace `from` with `to` in the roster in one step.
    pub fn rename_user(&mut self, from: &str, to: &str) {
        self.users.remove(from);
        self.users.insert(to.to_string());
    }

    pub fn has_user(&self, nick: &str) -> bool {
        self.users.contains(nick)
    }

    pub fn clear_users(&mut self) {
        self.users.clear();
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Roster sorted case-insensitively (ties broken by exact bytes).
    pub fn roster(&self) -> Vec<String> {
        let mut users: Vec<String> = self.users.iter().cloned().collect();
        users.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
        users
    }

    /// Complete the last word of `input` to the single roster nick it
    /// starts (case-insensitive). `None` when the word is empty, unknown
    /// or ambiguous.
    pub fn complete_nick(&self, input: &str) -> Option<String> {
        let (head, word) = match input.rfind(' ') {
            Some(i) => input.split_at(i + 1),
            None => ("", input),
        };
        if word.is_empty() {
            return None;
        }
        let prefix = word.to_lowercase();
        let mut matches = self
            .users
            .iter()
            .filter(|nick| nick.to_lowercase().starts_with(&prefix));
        let nick = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(format!("{}{}", head, nick))
    }

    /// Tab-bar view of the window directory.
    pub fn window_summaries(&self) -> Vec<WindowSummary> {
        self.windows()
            .map(|w| WindowSummary {
                id: w.id.clone(),
                kind: w.kind,
                unread: w.unread_count(),
                badge: w.unread_badge(),
                closable: w.id != self.primary_channel,
            })
            .collect()
    }
}
