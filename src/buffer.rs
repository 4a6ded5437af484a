use std::collections::VecDeque;

use chrono::{DateTime, Local};

/// Sender shown for messages generated by the client itself.
pub const SYSTEM_SENDER: &str = "*";

/// Unread counts above this render as "99+".
const UNREAD_BADGE_CAP: usize = 99;

/// How a message should be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Normal,
    /// Sent by us (local echo)
    Own,
    Action, // /me messages
    System,
    /// Channel message containing our nickname
    Mention,
}

/// A single line of conversation. Immutable once appended to a window.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub timestamp: DateTime<Local>,
    pub sender: String,
    pub body: String,
    pub kind: MessageKind,
}

impl Message {
    pub fn new(sender: impl Into<String>, body: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            timestamp: Local::now(),
            sender: sender.into(),
            body: body.into(),
            kind,
        }
    }

    pub fn system(body: impl Into<String>) -> Self {
        Self::new(SYSTEM_SENDER, body, MessageKind::System)
    }

    /// `HH:MM` label used in front of each rendered line.
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowKind {
    Channel,
    PrivateMessage,
}

/// One conversation: a channel or a private message partner.
#[derive(Clone, Debug)]
pub struct Window {
    pub id: String,
    pub kind: WindowKind,
    messages: VecDeque<Message>,
    capacity: usize,
    unread_count: usize,
}

impl Window {
    pub fn new(id: impl Into<String>, kind: WindowKind, capacity: usize) -> Self {
        Self {
            id: id.into(),
            kind,
            messages: VecDeque::new(),
            capacity: capacity.max(1),
            unread_count: 0,
        }
    }

    /// Append a message, evicting the oldest one past capacity.
    /// Returns true when the unread counter was bumped.
    pub fn push(&mut self, msg: Message, is_active: bool) -> bool {
        self.messages.push_back(msg);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
        if !is_active {
            self.unread_count += 1;
        }
        !is_active
    }

    pub fn clear_unread(&mut self) {
        self.unread_count = 0;
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    /// Badge text for the tab, or `None` when everything has been read.
    pub fn unread_badge(&self) -> Option<String> {
        match self.unread_count {
            0 => None,
            n if n > UNREAD_BADGE_CAP => Some(format!("{}+", UNREAD_BADGE_CAP)),
            n => Some(n.to_string()),
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_unread_and_evict() {
        let mut win = Window::new("#rust", WindowKind::Channel, 5);
        for i in 0..10 {
            win.push(
                Message::new("alice", format!("msg{}", i), MessageKind::Normal),
                false,
            );
        }
        assert_eq!(win.unread_count(), 10);
        assert_eq!(win.len(), 5);

        // Oldest evicted first, newest kept
        let bodies: Vec<&str> = win.messages().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["msg5", "msg6", "msg7", "msg8", "msg9"]);
    }

    #[test]
    fn test_active_push_does_not_count() {
        let mut win = Window::new("#rust", WindowKind::Channel, 10);
        assert!(!win.push(Message::system("hello"), true));
        assert_eq!(win.unread_count(), 0);
        assert!(win.push(Message::system("again"), false));
        assert_eq!(win.unread_count(), 1);
        win.clear_unread();
        assert_eq!(win.unread_count(), 0);
    }

    #[test]
    fn test_unread_badge() {
        let mut win = Window::new("alice", WindowKind::PrivateMessage, 200);
        assert_eq!(win.unread_badge(), None);
        win.push(Message::new("alice", "hi", MessageKind::Normal), false);
        assert_eq!(win.unread_badge().as_deref(), Some("1"));
        for _ in 0..120 {
            win.push(Message::new("alice", "hi", MessageKind::Normal), false);
        }
        assert_eq!(win.unread_badge().as_deref(), Some("99+"));
    }

    #[test]
    fn test_system_message() {
        let msg = Message::system("You joined #rust");
        assert_eq!(msg.sender, SYSTEM_SENDER);
        assert_eq!(msg.kind, MessageKind::System);
        assert_eq!(msg.time_label().len(), 5);
    }
}
