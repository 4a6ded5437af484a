//! The client core: one owner for session, connection and notification state.
//!
//! `Client` is sans-IO. The driver feeds it UI actions, transport frames and
//! timer expiries; every call returns the [`Effect`]s to perform, in order.

use std::time::Instant;

use rand::Rng;
use tracing::{debug, trace};

use crate::backend::framing::LineBuffer;
use crate::backend::main_loop::state::ConnectionState;
use crate::backend::manager::ConnectionManager;
use crate::buffer::{MessageKind, WindowKind};
use crate::commands::{interpret, SideEffect};
use crate::config::Config;
use crate::error::SendError;
use crate::input_state::InputHistory;
use crate::notify::{NotificationDispatcher, Permission};
use crate::parser::{parse_line, Event};
use crate::protocol::{BackendAction, DisplayIntent, Effect, GuiEvent, WindowSummary};
use crate::state::{ClientState, CloseOutcome};

/// `prefix` followed by four random digits (1000-9999).
pub fn generate_nickname(prefix: &str) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("{}{}", prefix, suffix)
}

fn input_text(text: String) -> Effect {
    Effect::Gui(GuiEvent::InputText(text))
}

pub struct Client {
    state: ClientState,
    connection: ConnectionManager,
    notifier: NotificationDispatcher,
    lines: LineBuffer,
    history: InputHistory,
    auto_connect: bool,
    /// Last views sent to the UI, to emit only changes.
    last_windows: Option<(String, Vec<WindowSummary>)>,
    last_roster: Option<Vec<String>>,
}

impl Client {
    /// Build a client with a generated nickname.
    pub fn new(config: Config) -> Self {
        let nickname = generate_nickname(&config.nickname_prefix);
        Self::with_nickname(config, nickname)
    }

    pub fn with_nickname(config: Config, nickname: impl Into<String>) -> Self {
        Self {
            state: ClientState::new(
                nickname,
                config.real_name.clone(),
                config.channel.clone(),
                config.message_limit,
            ),
            connection: ConnectionManager::new(&config),
            notifier: NotificationDispatcher::new(config.notification_timeout()),
            lines: LineBuffer::new(config.framing),
            history: InputHistory::default(),
            auto_connect: config.auto_connect,
            last_windows: None,
            last_roster: None,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn nickname(&self) -> &str {
        &self.state.nickname
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn users(&self) -> Vec<String> {
        self.state.roster()
    }

    pub fn permission(&self) -> Permission {
        self.notifier.permission()
    }

    /// Earliest notification dismissal the driver should wake up for.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.notifier.next_deadline()
    }

    /// Initial effects: views, permission request and the auto-connect.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::Gui(GuiEvent::Nickname(self.state.nickname.clone()))];
        if self.notifier.needs_permission() {
            effects.push(Effect::Gui(GuiEvent::RequestNotificationPermission));
        }
        if self.auto_connect {
            effects.extend(self.connection.open());
        } else {
            effects.push(Effect::status("Disconnected"));
        }
        self.flush_views(&mut effects);
        effects
    }

    /// Handle one UI action.
    pub fn handle_action(&mut self, action: BackendAction, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        match action {
            BackendAction::Connect => effects.extend(self.connection.open()),
            BackendAction::Disconnect => effects.extend(self.connection.disconnect()),
            BackendAction::SubmitText { window, text } => {
                self.history.push(&text);
                effects.extend(self.submit(&window, &text, now));
            }
            BackendAction::HistoryUp(current) => {
                effects.extend(self.history.up(&current).map(input_text));
            }
            BackendAction::HistoryDown => effects.extend(self.history.down().map(input_text)),
            BackendAction::CompleteNick(input) => {
                effects.extend(self.state.complete_nick(&input).map(input_text));
            }
            BackendAction::SwitchWindow(id) => {
                if !self.state.switch_to(&id) {
                    debug!(window = %id, "Switch to unknown window ignored");
                }
            }
            BackendAction::CloseWindow(id) => effects.extend(self.close_window(&id)),
            BackendAction::StartPrivate(nick) => match self.state.start_private(&nick) {
                Ok(intents) => self.display(intents, now, &mut effects),
                Err(err) => {
                    let intents = self.state.append_system(err.to_string());
                    self.display(intents, now, &mut effects);
                }
            },
            BackendAction::SetFocus(focused) => self.state.set_focused(focused),
            BackendAction::NotificationPermission(permission) => {
                self.notifier.set_permission(permission);
            }
            BackendAction::NotificationClicked(id) => {
                if self.notifier.click(id) {
                    effects.push(Effect::Gui(GuiEvent::DismissNotification(id)));
                    effects.push(Effect::Gui(GuiEvent::RequestFocus));
                }
            }
            BackendAction::Shutdown => effects.extend(self.connection.disconnect()),
        }
        self.flush_views(&mut effects);
        effects
    }

    /// Interpret text typed into `window` and route the result.
    fn submit(&mut self, window: &str, text: &str, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        let interpretation = interpret(text, window);

        let mut sent = Vec::with_capacity(interpretation.outbound.len());
        for line in interpretation.outbound {
            match self.connection.send(line) {
                Ok(effect) => sent.push(effect),
                Err(SendError::NotConnected) => {
                    let intents = self.state.append_system("Cannot send: not connected");
                    self.display(intents, now, &mut effects);
                    return effects;
                }
            }
        }
        effects.extend(sent);

        for side_effect in interpretation.side_effects {
            match side_effect {
                SideEffect::EnsurePrivateWindow { nick } => {
                    if let Ok(intents) = self.state.start_private(&nick) {
                        self.display(intents, now, &mut effects);
                    }
                }
            }
        }

        if let Some(echo) = interpretation.local_echo {
            let intents = self.state.echo(echo);
            self.display(intents, now, &mut effects);
        }
        effects
    }

    /// Close a window; channels are parted first.
    fn close_window(&mut self, id: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        let is_channel_window = self
            .state
            .window(id)
            .is_some_and(|w| w.kind == WindowKind::Channel);

        if !self.state.is_closable(id) {
            debug!(window = %id, "Close rejected");
            return effects;
        }
        if is_channel_window {
            // Parting is best effort when offline; local state goes either way
            if let Ok(effect) = self.connection.send(format!("PART {}", id)) {
                effects.push(effect);
            }
        }
        if let CloseOutcome::Closed(kind) = self.state.close_window(id) {
            debug!(window = %id, ?kind, "Window closed");
        }
        effects
    }

    pub fn transport_opened(&mut self) -> Vec<Effect> {
        self.lines.reset();
        let mut effects = self
            .connection
            .transport_opened(&self.state.nickname, &self.state.real_name);
        self.flush_views(&mut effects);
        effects
    }

    pub fn transport_closed(&mut self, code: Option<u16>) -> Vec<Effect> {
        let mut effects = self.connection.transport_closed(code);
        self.flush_views(&mut effects);
        effects
    }

    pub fn transport_error(&mut self, reason: &str) -> Vec<Effect> {
        let mut effects = self.connection.transport_error(reason);
        self.flush_views(&mut effects);
        effects
    }

    pub fn reconnect_elapsed(&mut self) -> Vec<Effect> {
        self.connection.reconnect_elapsed()
    }

    /// Feed one inbound frame; lines are processed strictly in order.
    pub fn receive_frame(&mut self, frame: &str, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        for line in self.lines.push(frame) {
            effects.extend(self.process_line(&line, now));
        }
        self.flush_views(&mut effects);
        effects
    }

    fn process_line(&mut self, line: &str, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        let event = parse_line(line);

        match &event {
            Event::Ping { token } => effects.extend(self.connection.pong(token)),
            Event::Welcome => {
                effects.extend(self.connection.welcome());
            }
            Event::EndOfNames if self.state.announce_on_names_end => {
                effects.push(Effect::status(format!(
                    "Connected to {}",
                    self.state.primary_channel()
                )));
            }
            Event::NickChange { from, to } if *from == self.state.nickname => {
                effects.push(Effect::Gui(GuiEvent::Nickname(to.clone())));
            }
            Event::Unrecognized { raw } => trace!(line = %raw, "Unrecognized line"),
            _ => {}
        }

        let intents = self.state.apply(event);
        self.display(intents, now, &mut effects);
        effects
    }

    /// Forward intents to the UI and fire notifications for the qualifying ones.
    fn display(
        &mut self,
        intents: impl IntoIterator<Item = DisplayIntent>,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) {
        for intent in intents {
            let notification = match intent.message.kind {
                MessageKind::Own | MessageKind::System => None,
                _ => self.notifier.dispatch(&intent, now),
            };
            effects.push(Effect::Gui(GuiEvent::Display(intent)));
            if let Some(notification) = notification {
                effects.push(Effect::Gui(GuiEvent::Notify(notification)));
            }
        }
    }

    /// Dismiss notifications whose timeout elapsed.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        self.notifier
            .expire(now)
            .into_iter()
            .map(|id| Effect::Gui(GuiEvent::DismissNotification(id)))
            .collect()
    }

    /// Emit window list and roster views when they changed.
    fn flush_views(&mut self, effects: &mut Vec<Effect>) {
        let windows = (
            self.state.active_window().to_string(),
            self.state.window_summaries(),
        );
        if self.last_windows.as_ref() != Some(&windows) {
            effects.push(Effect::Gui(GuiEvent::Windows {
                active: windows.0.clone(),
                windows: windows.1.clone(),
            }));
            self.last_windows = Some(windows);
        }

        let roster = self.state.roster();
        if self.last_roster.as_ref() != Some(&roster) {
            effects.push(Effect::Gui(GuiEvent::Roster(roster.clone())));
            self.last_roster = Some(roster);
        }
    }
}
