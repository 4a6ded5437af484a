//! Session event processing: projects parsed protocol events onto windows.

use crate::buffer::{Message, MessageKind, WindowKind};
use crate::commands::LocalEcho;
use crate::error::InputError;
use crate::parser::Event;
use crate::protocol::DisplayIntent;
use crate::state::ClientState;
use crate::validation::{is_channel, is_valid_nickname};

impl ClientState {
    /// Apply one protocol event and return what should be displayed.
    ///
    /// PING and Welcome side effects on the wire (PONG, auto-join) belong to
    /// the connection manager; here they only touch session state.
    pub fn apply(&mut self, event: Event) -> Vec<DisplayIntent> {
        let mut intents = Vec::new();

        match event {
            Event::Ping { .. } | Event::Unrecognized { .. } => {}

            Event::Welcome => {
                // Fresh registration: forget the previous session's roster
                self.clear_users();
                self.announce_on_names_end = true;
            }

            Event::NamesReply { names } => {
                for name in &names {
                    self.add_user(name);
                }
            }

            Event::EndOfNames => {
                if self.announce_on_names_end {
                    self.announce_on_names_end = false;
                    let primary = self.primary_channel().to_string();
                    let msg = Message::system(format!("Connected to {}", primary));
                    intents.extend(self.append(&primary, msg, false));
                }
            }

            Event::Join { who, window } => {
                if who == self.nickname {
                    self.ensure_window(&window, WindowKind::Channel);
                    self.switch_to(&window);
                    let msg = Message::system(format!("You joined {}", window));
                    intents.extend(self.append(&window, msg, false));
                } else {
                    self.add_user(&who);
                    let msg = Message::system(format!("{} joined", who));
                    intents.extend(self.append(&window, msg, false));
                }
            }

            Event::Part { who, window } => {
                self.remove_user(&who);
                let body = format!("{} left", who);
                // Addressed window when we have it open, otherwise the active one
                let target = window
                    .filter(|w| self.has_window(w))
                    .unwrap_or_else(|| self.active_window().to_string());
                intents.extend(self.append(&target, Message::system(body), false));
            }

            Event::Quit { who } => {
                self.remove_user(&who);
                intents.extend(self.append_system(format!("{} quit", who)));
            }

            Event::NickChange { from, to } => {
                if from == self.nickname {
                    self.nickname = to.clone();
                    if self.has_user(&from) {
                        self.rename_user(&from, &to);
                    }
                    intents.extend(self.append_system(format!("You are now known as {}", to)));
                } else {
                    self.rename_user(&from, &to);
                    intents.extend(
                        self.append_system(format!("{} is now known as {}", from, to)),
                    );
                }
            }

            Event::Privmsg {
                from,
                target,
                body,
                is_action,
            } => {
                intents.extend(self.receive_privmsg(from, target, body, is_action));
            }
        }

        intents
    }

    fn receive_privmsg(
        &mut self,
        from: String,
        target: String,
        body: String,
        is_action: bool,
    ) -> Option<DisplayIntent> {
        let channel = is_channel(&target);
        let (window_id, window_kind) = if channel {
            (target, WindowKind::Channel)
        } else if from == self.nickname {
            // Our own message echoed back belongs to the conversation partner
            (target, WindowKind::PrivateMessage)
        } else {
            (from.clone(), WindowKind::PrivateMessage)
        };

        let kind = if from == self.nickname {
            MessageKind::Own
        } else if is_action {
            MessageKind::Action
        } else if channel && self.mentions_me(&body) {
            MessageKind::Mention
        } else {
            MessageKind::Normal
        };

        if channel && kind != MessageKind::Own {
            self.add_user(&from);
        }

        self.ensure_window(&window_id, window_kind);
        let notifiable = !self.is_focused() && kind != MessageKind::Own;
        self.append(&window_id, Message::new(from, body, kind), notifiable)
    }

    /// Case-insensitive substring match of our nickname.
    ///
    /// Matches inside longer words too ("bobcat" mentions "bob").
    pub fn mentions_me(&self, body: &str) -> bool {
        !self.nickname.is_empty() && body.to_lowercase().contains(&self.nickname.to_lowercase())
    }

    /// Open (or switch to) a private conversation with `nick`.
    pub fn start_private(&mut self, nick: &str) -> Result<Vec<DisplayIntent>, InputError> {
        if !is_valid_nickname(nick) {
            return Err(InputError::InvalidNickname(nick.to_string()));
        }
        if self.has_window(nick) {
            self.switch_to(nick);
            return Ok(Vec::new());
        }
        self.ensure_window(nick, WindowKind::PrivateMessage);
        self.switch_to(nick);
        let msg = Message::system(format!("Private conversation with {}", nick));
        Ok(self.append(nick, msg, false).into_iter().collect())
    }

    /// Append a locally echoed message from the command interpreter.
    ///
    /// Echoes into a window that does not exist (e.g. `/msg` to a channel we
    /// are not in) are dropped.
    pub fn echo(&mut self, echo: LocalEcho) -> Option<DisplayIntent> {
        let sender = match echo.kind {
            MessageKind::System => crate::buffer::SYSTEM_SENDER.to_string(),
            _ => self.nickname.clone(),
        };
        self.append(&echo.window, Message::new(sender, echo.body, echo.kind), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn state() -> ClientState {
        ClientState::new("bob", "Web IRC User", "#lobby", 100)
    }

    fn feed(state: &mut ClientState, raw: &str) -> Vec<DisplayIntent> {
        state.apply(parse_line(raw))
    }

    #[test]
    fn test_names_reply_is_idempotent() {
        let mut once = state();
        feed(&mut once, ":srv 353 bob = #lobby :@alice bob +carol");
        let mut twice = state();
        feed(&mut twice, ":srv 353 bob = #lobby :@alice bob +carol");
        feed(&mut twice, ":srv 353 bob = #lobby :@alice bob +carol");
        assert_eq!(once.roster(), twice.roster());
        assert_eq!(twice.roster(), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_welcome_then_names_announces_once() {
        let mut state = state();
        assert!(feed(&mut state, ":srv 001 bob :Welcome").is_empty());
        feed(&mut state, ":srv 353 bob = #lobby :@alice bob");
        let intents = feed(&mut state, ":srv 366 bob #lobby :End");
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].message.body, "Connected to #lobby");

        // A later 366 (for another channel) does not repeat it
        assert!(feed(&mut state, ":srv 366 bob #rust :End").is_empty());
    }

    #[test]
    fn test_self_join_creates_and_activates() {
        let mut state = state();
        let intents = feed(&mut state, ":bob!b@h JOIN #rust");
        assert_eq!(state.active_window(), "#rust");
        assert_eq!(intents[0].window, "#rust");
        assert_eq!(intents[0].message.body, "You joined #rust");
        assert_eq!(state.unread_count("#rust"), 0);
    }

    #[test]
    fn test_other_join_and_part() {
        let mut state = state();
        let intents = feed(&mut state, ":alice!a@h JOIN #lobby");
        assert!(state.has_user("alice"));
        assert_eq!(intents[0].message.body, "alice joined");

        let intents = feed(&mut state, ":alice!a@h PART #lobby");
        assert!(!state.has_user("alice"));
        assert_eq!(intents[0].window, "#lobby");
        assert_eq!(intents[0].message.body, "alice left");
    }

    #[test]
    fn test_own_part_uses_nick() {
        let mut state = state();
        feed(&mut state, ":bob!b@h JOIN #rust");
        let intents = feed(&mut state, ":bob!b@h PART #rust");
        assert_eq!(intents[0].window, "#rust");
        assert_eq!(intents[0].message.body, "bob left");
    }

    #[test]
    fn test_own_pm_echo_goes_to_partner_window() {
        let mut state = state();
        let intents = feed(&mut state, ":bob!b@h PRIVMSG alice :hi there");
        assert_eq!(intents[0].window, "alice");
        assert_eq!(intents[0].message.kind, MessageKind::Own);
        assert!(state.has_window("alice"));
        assert!(!state.has_window("bob"));
    }

    #[test]
    fn test_quit_goes_to_active_window() {
        let mut state = state();
        feed(&mut state, ":alice!a@h JOIN #lobby");
        feed(&mut state, ":bob!b@h JOIN #rust");
        let intents = feed(&mut state, ":alice!a@h QUIT :bye");
        assert_eq!(intents[0].window, "#rust");
        assert_eq!(intents[0].message.body, "alice quit");
        assert!(!state.has_user("alice"));
    }

    #[test]
    fn test_nick_change_self_and_other() {
        let mut state = state();
        feed(&mut state, ":srv 353 bob = #lobby :bob alice");

        let intents = feed(&mut state, ":bob!b@h NICK :robert");
        assert_eq!(state.nickname, "robert");
        assert!(state.has_user("robert"));
        assert!(!state.has_user("bob"));
        assert_eq!(intents[0].message.body, "You are now known as robert");

        let intents = feed(&mut state, ":alice!a@h NICK alicia");
        assert!(state.has_user("alicia"));
        assert!(!state.has_user("alice"));
        assert_eq!(intents[0].message.body, "alice is now known as alicia");
    }

    #[test]
    fn test_privmsg_classification() {
        let mut state = state();
        let normal = feed(&mut state, ":alice!a@h PRIVMSG #lobby :hello all");
        assert_eq!(normal[0].message.kind, MessageKind::Normal);

        let mention = feed(&mut state, ":alice!a@h PRIVMSG #lobby :hey BOB");
        assert_eq!(mention[0].message.kind, MessageKind::Mention);

        let action = feed(&mut state, ":alice!a@h PRIVMSG #lobby :\x01ACTION pokes bob\x01");
        assert_eq!(action[0].message.kind, MessageKind::Action);
        assert_eq!(action[0].message.body, "pokes bob");

        // Private messages are never classified as mentions
        let pm = feed(&mut state, ":alice!a@h PRIVMSG bob :hi bob");
        assert_eq!(pm[0].message.kind, MessageKind::Normal);
        assert_eq!(pm[0].window, "alice");
        assert_eq!(pm[0].window_kind, WindowKind::PrivateMessage);
    }

    #[test]
    fn test_mention_matches_inside_words() {
        // Substring matching is kept on purpose: "bobcat" counts as a mention
        let mut state = state();
        let intents = feed(&mut state, ":alice!a@h PRIVMSG #lobby :look, a bobcat");
        assert_eq!(intents[0].message.kind, MessageKind::Mention);
    }

    #[test]
    fn test_incoming_pm_creates_window_without_switching() {
        let mut state = state();
        feed(&mut state, ":alice!a@h PRIVMSG bob :psst");
        assert!(state.has_window("alice"));
        assert_eq!(state.active_window(), "#lobby");
        assert_eq!(state.unread_count("alice"), 1);
    }

    #[test]
    fn test_unread_accounting() {
        let mut state = state();
        state.ensure_window("#rust", WindowKind::Channel);
        for _ in 0..3 {
            feed(&mut state, ":alice!a@h PRIVMSG #rust :one");
        }
        // Briefly active: the counter resets and these don't count
        state.switch_to("#rust");
        feed(&mut state, ":alice!a@h PRIVMSG #rust :two");
        state.switch_to("#lobby");
        for _ in 0..2 {
            feed(&mut state, ":alice!a@h PRIVMSG #rust :three");
        }
        assert_eq!(state.unread_count("#rust"), 2);
    }

    #[test]
    fn test_notifiable_only_when_unfocused() {
        let mut state = state();
        let focused = feed(&mut state, ":alice!a@h PRIVMSG #lobby :hey bob");
        assert!(!focused[0].is_notifiable);

        state.set_focused(false);
        let unfocused = feed(&mut state, ":alice!a@h PRIVMSG #lobby :hey bob");
        assert!(unfocused[0].is_notifiable);
    }

    #[test]
    fn test_start_private_is_idempotent() {
        let mut state = state();
        let first = state.start_private("alice").unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].message.body, "Private conversation with alice");
        state.switch_to("#lobby");

        let second = state.start_private("alice").unwrap();
        assert!(second.is_empty());
        assert_eq!(state.active_window(), "alice");
        assert_eq!(state.windows().count(), 2);

        assert!(state.start_private("not valid").is_err());
    }

    #[test]
    fn test_unrecognized_is_ignored() {
        let mut state = state();
        assert!(feed(&mut state, ":srv NOTICE * :hello").is_empty());
        assert!(feed(&mut state, "total garbage").is_empty());
        assert_eq!(state.window("#lobby").map(|w| w.len()), Some(0));
    }
}
