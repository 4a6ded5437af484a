//! Desktop notification decisions.
//!
//! The dispatcher decides *when* an alert fires, remembers when each one
//! must be dismissed, and turns clicks into focus requests. Showing the
//! native widget and asking for permission are left to the UI.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::buffer::{MessageKind, WindowKind};
use crate::protocol::DisplayIntent;

/// Desktop notification permission as reported by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    /// Not asked yet (or the user dismissed the prompt)
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub body: String,
    /// Window to show when the notification is clicked
    pub window: String,
    pub timeout: Duration,
}

pub struct NotificationDispatcher {
    permission: Permission,
    /// The permission answer is consumed once per session.
    permission_resolved: bool,
    timeout: Duration,
    next_id: u64,
    /// Shown notifications with their dismissal deadline.
    active: Vec<(u64, Instant)>,
}

impl NotificationDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            permission: Permission::Default,
            permission_resolved: false,
            timeout,
            next_id: 1,
            active: Vec::new(),
        }
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// True until the UI has answered the permission request.
    pub fn needs_permission(&self) -> bool {
        !self.permission_resolved
    }

    /// Record the permission answer. Only the first answer is kept.
    pub fn set_permission(&mut self, permission: Permission) -> bool {
        if self.permission_resolved {
            debug!(?permission, "Ignoring repeated notification permission result");
            return false;
        }
        self.permission = permission;
        self.permission_resolved = true;
        true
    }

    /// Permission granted, client unfocused, and a mention or private message.
    pub fn should_notify(&self, intent: &DisplayIntent) -> bool {
        self.permission == Permission::Granted
            && intent.is_notifiable
            && (intent.message.kind == MessageKind::Mention
                || intent.window_kind == WindowKind::PrivateMessage)
    }

    /// Produce at most one notification for `intent`.
    pub fn dispatch(&mut self, intent: &DisplayIntent, now: Instant) -> Option<Notification> {
        if !self.should_notify(intent) {
            return None;
        }

        let title = match intent.window_kind {
            WindowKind::PrivateMessage => format!("Private message from {}", intent.message.sender),
            WindowKind::Channel => format!(
                "{} mentioned you in {}",
                intent.message.sender, intent.window
            ),
        };

        let id = self.next_id;
        self.next_id += 1;
        self.active.push((id, now + self.timeout));

        Some(Notification {
            id,
            title,
            body: intent.message.body.clone(),
            window: intent.window.clone(),
            timeout: self.timeout,
        })
    }

    /// Remove and return notifications whose timeout has elapsed.
    pub fn expire(&mut self, now: Instant) -> Vec<u64> {
        let mut expired = Vec::new();
        self.active.retain(|&(id, deadline)| {
            if deadline <= now {
                expired.push(id);
                false
            } else {
                true
            }
        });
        expired
    }

    /// A click dismisses the notification. Returns true when focus should be requested.
    pub fn click(&mut self, id: u64) -> bool {
        let before = self.active.len();
        self.active.retain(|&(active_id, _)| active_id != id);
        self.active.len() != before
    }

    /// Earliest pending dismissal, for timer scheduling.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.iter().map(|&(_, deadline)| deadline).min()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
