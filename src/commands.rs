//! IRC command handling (/join, /part, /msg, etc.).

use crate::buffer::MessageKind;
use crate::error::InputError;
use crate::parser::encode_action;
use crate::validation::{
    is_channel, is_valid_nickname, normalize_channel, sanitize_message, validate_channel_name,
};

/// Leading character of a slash command.
pub const COMMAND_MARKER: char = '/';

pub const HELP_TEXT: &str = "Available commands: /nick, /join, /part, /msg, /me, /help";

/// A message to append locally without waiting for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEcho {
    pub window: String,
    pub kind: MessageKind,
    pub body: String,
}

/// Session changes requested by a command besides the wire traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Open (or switch to) a private window before echoing into it
    EnsurePrivateWindow { nick: String },
}

/// What one line of user input turns into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpretation {
    pub outbound: Vec<String>,
    pub local_echo: Option<LocalEcho>,
    pub side_effects: Vec<SideEffect>,
}

impl Interpretation {
    fn send(line: String, echo: Option<LocalEcho>) -> Self {
        Self {
            outbound: vec![line],
            local_echo: echo,
            side_effects: Vec::new(),
        }
    }

    /// A local System message in `window` and nothing on the wire.
    fn notice(window: &str, text: impl Into<String>) -> Self {
        Self {
            outbound: Vec::new(),
            local_echo: Some(LocalEcho {
                window: window.to_string(),
                kind: MessageKind::System,
                body: text.into(),
            }),
            side_effects: Vec::new(),
        }
    }

    fn rejected(window: &str, err: InputError) -> Self {
        Self::notice(window, err.to_string())
    }
}

/// Interpret text typed into `active_window`.
pub fn interpret(text: &str, active_window: &str) -> Interpretation {
    let s = text.trim();
    if s.is_empty() {
        return Interpretation::default();
    }

    let Some(cmdline) = s.strip_prefix(COMMAND_MARKER) else {
        let body = sanitize_message(s);
        return Interpretation::send(
            format!("PRIVMSG {} :{}", active_window, body),
            Some(LocalEcho {
                window: active_window.to_string(),
                kind: MessageKind::Own,
                body,
            }),
        );
    };

    let (keyword, rest) = split_word(cmdline);
    let cmd = keyword.to_lowercase();

    match cmd.as_str() {
        "nick" => {
            let (newnick, _) = split_word(rest);
            if is_valid_nickname(newnick) {
                Interpretation::send(format!("NICK {}", newnick), None)
            } else {
                Interpretation::rejected(active_window, InputError::InvalidNickname(newnick.into()))
            }
        }
        "join" => {
            let (chan, _) = split_word(rest);
            if chan.is_empty() {
                return Interpretation::rejected(active_window, InputError::Usage("/join <channel>"));
            }
            let channel = normalize_channel(chan);
            match validate_channel_name(&channel) {
                Ok(()) => Interpretation::send(format!("JOIN {}", channel), None),
                Err(reason) => {
                    Interpretation::rejected(active_window, InputError::InvalidChannel(reason))
                }
            }
        }
        "part" => {
            let (chan, _) = split_word(rest);
            let channel = if !chan.is_empty() {
                normalize_channel(chan)
            } else if is_channel(active_window) {
                active_window.to_string()
            } else {
                return Interpretation::rejected(active_window, InputError::PartWithoutChannel);
            };
            match validate_channel_name(&channel) {
                Ok(()) => Interpretation::send(format!("PART {}", channel), None),
                Err(reason) => {
                    Interpretation::rejected(active_window, InputError::InvalidChannel(reason))
                }
            }
        }
        "msg" | "privmsg" => {
            let (target, text) = split_word(rest);
            let text = sanitize_message(text.trim());
            if target.is_empty() || text.is_empty() {
                return Interpretation::rejected(
                    active_window,
                    InputError::Usage("/msg <target> <message>"),
                );
            }
            let side_effects = if is_channel(target) {
                if let Err(reason) = validate_channel_name(target) {
                    return Interpretation::rejected(
                        active_window,
                        InputError::InvalidChannel(reason),
                    );
                }
                Vec::new()
            } else if is_valid_nickname(target) {
                vec![SideEffect::EnsurePrivateWindow {
                    nick: target.to_string(),
                }]
            } else {
                return Interpretation::rejected(
                    active_window,
                    InputError::InvalidNickname(target.into()),
                );
            };
            Interpretation {
                outbound: vec![format!("PRIVMSG {} :{}", target, text)],
                local_echo: Some(LocalEcho {
                    window: target.to_string(),
                    kind: MessageKind::Own,
                    body: text,
                }),
                side_effects,
            }
        }
        "me" => {
            let action = sanitize_message(rest.trim());
            if action.is_empty() {
                return Interpretation::rejected(active_window, InputError::Usage("/me <action>"));
            }
            Interpretation::send(
                format!("PRIVMSG {} :{}", active_window, encode_action(&action)),
                Some(LocalEcho {
                    window: active_window.to_string(),
                    kind: MessageKind::Action,
                    body: action,
                }),
            )
        }
        "help" => Interpretation::notice(active_window, HELP_TEXT),
        _ => Interpretation::rejected(active_window, InputError::UnknownCommand(cmd)),
    }
}

/// Split off the first space-delimited word; the remainder keeps its spacing.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(' ') {
        Some((word, rest)) => (word, rest),
        None => (s, ""),
    }
}
