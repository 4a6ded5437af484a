//! Protocol line parser.
//!
//! Turns one protocol line (terminator already stripped) into an [`Event`].
//! Parsing never fails: anything outside the supported grammar becomes
//! [`Event::Unrecognized`].

/// CTCP delimiter byte.
pub const CTCP_DELIM: char = '\x01';

const ACTION_PREFIX: &str = "\x01ACTION ";
const PRIVILEGE_GLYPHS: [char; 5] = ['@', '+', '%', '&', '~'];

/// A structured protocol event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Server keepalive; must be answered with `PONG <token>`.
    Ping { token: String },
    /// RPL_WELCOME (001): registration complete.
    Welcome,
    /// RPL_NAMREPLY (353) with privilege glyphs stripped.
    NamesReply { names: Vec<String> },
    /// RPL_ENDOFNAMES (366).
    EndOfNames,
    Join { who: String, window: String },
    /// `window` is absent when the server sent no target.
    Part { who: String, window: Option<String> },
    Quit { who: String },
    NickChange { from: String, to: String },
    Privmsg {
        from: String,
        target: String,
        body: String,
        is_action: bool,
    },
    Unrecognized { raw: String },
}

/// Parse a single protocol line.
pub fn parse_line(raw: &str) -> Event {
    if let Some(token) = raw.strip_prefix("PING ") {
        return Event::Ping {
            token: token.to_string(),
        };
    }

    parse_prefixed(raw).unwrap_or_else(|| Event::Unrecognized {
        raw: raw.to_string(),
    })
}

fn parse_prefixed(raw: &str) -> Option<Event> {
    // Tags are only sent after capability negotiation, but some servers send
    // them anyway.
    let line = match raw.strip_prefix('@') {
        Some(tagged) => tagged.split_once(' ')?.1.trim_start(),
        None => raw,
    };

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let source = *tokens.first()?;
    let command = *tokens.get(1)?;

    let event = match command {
        "001" => Event::Welcome,
        "353" => Event::NamesReply {
            names: trailing(line).map(split_names).unwrap_or_default(),
        },
        "366" => Event::EndOfNames,
        "JOIN" => Event::Join {
            who: source_nick(source)?,
            window: strip_colon(tokens.get(2)?).to_string(),
        },
        "PART" => Event::Part {
            who: source_nick(source)?,
            window: tokens
                .get(2)
                .map(|w| strip_colon(w))
                .filter(|w| !w.is_empty())
                .map(str::to_string),
        },
        "QUIT" => Event::Quit {
            who: source_nick(source)?,
        },
        "NICK" => Event::NickChange {
            from: source_nick(source)?,
            to: strip_colon(tokens.get(2)?).to_string(),
        },
        "PRIVMSG" => {
            let from = source_nick(source)?;
            let target = tokens.get(2)?.to_string();
            let (body, is_action) = decode_action(trailing(line)?);
            Event::Privmsg {
                from,
                target,
                body,
                is_action,
            }
        }
        _ => return None,
    };
    Some(event)
}

/// Text after the first ` :`.
fn trailing(line: &str) -> Option<&str> {
    line.find(" :").map(|idx| &line[idx + 2..])
}

fn strip_colon(token: &str) -> &str {
    token.strip_prefix(':').unwrap_or(token)
}

/// Nickname portion of a `:nick!user@host` prefix.
fn source_nick(source: &str) -> Option<String> {
    let source = strip_colon(source);
    let nick = source.split('!').next().unwrap_or(source);
    if nick.is_empty() {
        None
    } else {
        Some(nick.to_string())
    }
}

fn split_names(text: &str) -> Vec<String> {
    text.split(' ')
        .map(|name| name.strip_prefix(&PRIVILEGE_GLYPHS[..]).unwrap_or(name))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn decode_action(body: &str) -> (String, bool) {
    match body
        .strip_prefix(ACTION_PREFIX)
        .and_then(|action| action.strip_suffix(CTCP_DELIM))
    {
        Some(action) => (action.to_string(), true),
        None => (body.to_string(), false),
    }
}

/// Wrap `text` in the CTCP ACTION envelope.
pub fn encode_action(text: &str) -> String {
    format!("{}{}{}", ACTION_PREFIX, text, CTCP_DELIM)
}
