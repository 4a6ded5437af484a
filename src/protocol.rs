//! Messages exchanged between the UI, the backend loop and the client core.

use std::time::Duration;

use crate::buffer::{Message, WindowKind};
use crate::notify::{Notification, Permission};

/// Actions sent from the UI to the Backend
#[derive(Debug, Clone)]
pub enum BackendAction {
    /// Open the connection (also leaves the terminal Failed state)
    Connect,
    /// Close the connection without reconnecting
    Disconnect,
    /// Text typed into a window: a plain message or a slash command
    SubmitText { window: String, text: String },
    /// Recall an older submitted line; carries the text being composed
    HistoryUp(String),
    /// Recall a newer submitted line
    HistoryDown,
    /// Complete the last word of the input to a roster nickname
    CompleteNick(String),
    /// Make a window the active one
    SwitchWindow(String),
    /// Close a window (sends PART for channels)
    CloseWindow(String),
    /// Open or focus a private conversation
    StartPrivate(String),
    /// Whether the hosting UI currently has focus
    SetFocus(bool),
    /// One-shot answer to a notification permission request
    NotificationPermission(Permission),
    /// The user clicked a notification
    NotificationClicked(u64),
    /// Stop the backend loop
    Shutdown,
}

/// A message appended to a window, with what the notifier needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayIntent {
    pub window: String,
    pub window_kind: WindowKind,
    pub message: Message,
    pub is_notifiable: bool,
}

/// Tab-bar view of one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSummary {
    pub id: String,
    pub kind: WindowKind,
    pub unread: usize,
    /// Tab badge text (`99+` cap), `None` when nothing is unread
    pub badge: Option<String>,
    pub closable: bool,
}

/// Events sent from the Backend to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum GuiEvent {
    /// Connection status line
    Status(String),
    /// A message was appended to a window
    Display(DisplayIntent),
    /// Window list changed (opened, closed, switched or unread count moved)
    Windows {
        active: String,
        windows: Vec<WindowSummary>,
    },
    /// Primary channel roster, sorted case-insensitively
    Roster(Vec<String>),
    /// Our nickname changed
    Nickname(String),
    /// Replace the input line (history recall or completion)
    InputText(String),
    /// Show a desktop notification
    Notify(Notification),
    /// Close a notification (timeout or click)
    DismissNotification(u64),
    /// Bring the client to the foreground
    RequestFocus,
    /// Ask the user for desktop notification permission
    RequestNotificationPermission,
}

/// Work the client core asks its driver to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open the transport, requesting the given subprotocols
    Open {
        endpoint: String,
        subprotocols: Vec<String>,
    },
    /// Write one protocol line (terminator added by the driver)
    Send(String),
    /// Close the transport with the normal close code
    Close,
    /// Arm the reconnect timer, replacing any pending one
    ScheduleReconnect(Duration),
    /// Disarm the reconnect timer
    CancelReconnect,
    /// Forward an event to the UI
    Gui(GuiEvent),
}

impl Effect {
    pub fn status(text: impl Into<String>) -> Self {
        Effect::Gui(GuiEvent::Status(text.into()))
    }
}
