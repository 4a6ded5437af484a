//! Input validation for IRC protocol compliance

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading character of every channel name.
pub const CHANNEL_MARKER: char = '#';

/// Maximum characters of user text carried by one PRIVMSG.
pub const MAX_MESSAGE_CHARS: usize = 400;

static NICKNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_\-\[\]\\^{}|]{1,30}$").expect("nickname pattern is valid")
});

/// True when `target` names a channel rather than a nickname.
pub fn is_channel(target: &str) -> bool {
    target.starts_with(CHANNEL_MARKER)
}

/// Prefix the channel marker when the user left it off.
pub fn normalize_channel(name: &str) -> String {
    if is_channel(name) {
        name.to_string()
    } else {
        format!("{}{}", CHANNEL_MARKER, name)
    }
}

/// Validates an IRC channel name according to RFC 2812
pub fn validate_channel_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Channel name cannot be empty".to_string());
    }

    if !is_channel(name) {
        return Err(format!("Channel name must start with {}", CHANNEL_MARKER));
    }

    if name.len() == 1 {
        return Err("Channel name cannot be just the marker".to_string());
    }

    // Maximum length per RFC 2812 is 50 characters
    if name.len() > 50 {
        return Err("Channel name too long (max 50 characters)".to_string());
    }

    // Channel names cannot contain spaces, commas, or control characters
    if name.contains(|c: char| c.is_control() || c == ' ' || c == ',') {
        return Err("Channel name contains invalid characters".to_string());
    }

    Ok(())
}

/// Nickname grammar: 1-30 characters of letters, digits and `_ - [ ] \ ^ { } |`.
pub fn is_valid_nickname(nick: &str) -> bool {
    NICKNAME_RE.is_match(nick)
}

/// Validates a WebSocket endpoint address (`ws://` or `wss://`).
pub fn validate_endpoint(endpoint: &str) -> Result<(), String> {
    let rest = endpoint
        .strip_prefix("wss://")
        .or_else(|| endpoint.strip_prefix("ws://"))
        .ok_or_else(|| "Endpoint must start with ws:// or wss://".to_string())?;

    let host = rest.split(|c| c == '/' || c == '?').next().unwrap_or("");
    if host.is_empty() || host.starts_with(':') {
        return Err("Endpoint host cannot be empty".to_string());
    }
    Ok(())
}

/// Strips characters that would break protocol framing and caps the length.
pub fn sanitize_message(msg: &str) -> String {
    msg.chars()
        .filter(|&c| c != '\r' && c != '\n' && c != '\0')
        .take(MAX_MESSAGE_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_channel_name() {
        assert!(validate_channel_name("#test").is_ok());
        assert!(validate_channel_name("#rust-lang").is_ok());

        assert!(validate_channel_name("").is_err());
        assert!(validate_channel_name("#").is_err());
        assert!(validate_channel_name("test").is_err()); // Missing #
        assert!(validate_channel_name("#test channel").is_err()); // Space
        assert!(validate_channel_name("#test,other").is_err()); // Comma
        assert!(validate_channel_name(&"#".repeat(51)).is_err()); // Too long
    }

    #[test]
    fn test_normalize_channel() {
        assert_eq!(normalize_channel("lobby"), "#lobby");
        assert_eq!(normalize_channel("#lobby"), "#lobby");
    }

    #[test]
    fn test_nickname_grammar() {
        assert!(is_valid_nickname("alice"));
        assert!(is_valid_nickname("Bob123"));
        assert!(is_valid_nickname("[guest]"));
        assert!(is_valid_nickname("a\\b^c{d}e|f-g_h"));
        assert!(is_valid_nickname("123user"));
        assert!(is_valid_nickname(&"a".repeat(30)));

        assert!(!is_valid_nickname(""));
        assert!(!is_valid_nickname("user name"));
        assert!(!is_valid_nickname("nick!"));
        assert!(!is_valid_nickname("#chan"));
        assert!(!is_valid_nickname(&"a".repeat(31)));
    }

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("wss://irc.example.com:8000/").is_ok());
        assert!(validate_endpoint("ws://127.0.0.1:8080").is_ok());

        assert!(validate_endpoint("").is_err());
        assert!(validate_endpoint("irc.example.com:6667").is_err());
        assert!(validate_endpoint("wss://").is_err());
        assert!(validate_endpoint("ws://:8080").is_err());
    }

    #[test]
    fn test_sanitize_message() {
        assert_eq!(sanitize_message("Hello, world!"), "Hello, world!");
        assert_eq!(sanitize_message("Line1\r\nPRIVMSG x"), "Line1PRIVMSG x");
        assert_eq!(sanitize_message(&"x".repeat(500)), "x".repeat(400));
    }
}
