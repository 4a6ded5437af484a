use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::validation::{normalize_channel, validate_channel_name, validate_endpoint};

// Defaults matching the hosted client
pub const DEFAULT_NICK_PREFIX: &str = "supportguest";
pub const DEFAULT_REAL_NAME: &str = "Web IRC User";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
pub const DEFAULT_MESSAGE_LIMIT: usize = 500;
pub const DEFAULT_NOTIFICATION_TIMEOUT_MS: u64 = 5000;

/// WebSocket subprotocols requested when opening the transport.
pub const SUBPROTOCOLS: [&str; 2] = ["irc", "binary.ircv3.net"];

/// How inbound frames map onto protocol lines.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Every frame ends a line (IRCv3 WebSocket binding)
    #[default]
    Message,
    /// Frames are a byte stream; partial lines wait for a terminator
    Stream,
}

/// Connection parameters supplied by the hosting environment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "ws_url")]
    pub endpoint: String,
    pub channel: String,
    pub nickname_prefix: String,
    #[serde(alias = "realname")]
    pub real_name: String,
    #[serde(alias = "autoconnect")]
    pub auto_connect: bool,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_attempts: u32,
    pub message_limit: usize,
    pub notification_timeout_ms: u64,
    pub framing: Framing,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            channel: String::new(),
            nickname_prefix: DEFAULT_NICK_PREFIX.to_string(),
            real_name: DEFAULT_REAL_NAME.to_string(),
            auto_connect: true,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            message_limit: DEFAULT_MESSAGE_LIMIT,
            notification_timeout_ms: DEFAULT_NOTIFICATION_TIMEOUT_MS,
            framing: Framing::default(),
        }
    }
}

impl Config {
    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()
    }

    /// Check fatal omissions and normalise the channel name.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.endpoint = self.endpoint.trim().to_string();
        if self.endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        validate_endpoint(&self.endpoint).map_err(|reason| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        })?;

        let channel = self.channel.trim();
        if channel.is_empty() {
            return Err(ConfigError::MissingChannel);
        }
        self.channel = normalize_channel(channel);
        validate_channel_name(&self.channel).map_err(|reason| ConfigError::InvalidChannel {
            name: self.channel.clone(),
            reason,
        })?;

        if self.message_limit == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "message_limit",
            });
        }
        if self.nickname_prefix.trim().is_empty() {
            self.nickname_prefix = DEFAULT_NICK_PREFIX.to_string();
        }
        if self.real_name.trim().is_empty() {
            self.real_name = DEFAULT_REAL_NAME.to_string();
        }
        Ok(self)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }

    pub fn subprotocols(&self) -> Vec<String> {
        SUBPROTOCOLS.iter().map(|p| p.to_string()).collect()
    }
}

/// Default config location in the platform config directory.
pub fn settings_path() -> Result<PathBuf, ConfigError> {
    let proj = ProjectDirs::from("net", "webirc", "web-irc-client").ok_or(ConfigError::NoConfigDir)?;
    Ok(proj.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal() -> Config {
        Config {
            endpoint: "wss://irc.example.net:8000".into(),
            channel: "lobby".into(),
            ..Config::default()
        }
    }

    #[test]
    fn test_validate_prefixes_channel() {
        let config = minimal().validate().unwrap();
        assert_eq!(config.channel, "#lobby");
        assert_eq!(config.nickname_prefix, DEFAULT_NICK_PREFIX);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_missing_endpoint_or_channel_is_fatal() {
        let no_endpoint = Config {
            endpoint: "  ".into(),
            ..minimal()
        };
        assert!(matches!(no_endpoint.validate(), Err(ConfigError::MissingEndpoint)));

        let no_channel = Config {
            channel: String::new(),
            ..minimal()
        };
        assert!(matches!(no_channel.validate(), Err(ConfigError::MissingChannel)));

        let bad_endpoint = Config {
            endpoint: "irc.example.net:6667".into(),
            ..minimal()
        };
        assert!(matches!(
            bad_endpoint.validate(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));

        let zero = Config {
            message_limit: 0,
            ..minimal()
        };
        assert!(matches!(zero.validate(), Err(ConfigError::ZeroLimit { .. })));
    }

    #[test]
    fn test_load_with_hosted_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"ws_url": "wss://irc.example.net/ws", "channel": "support",
                "realname": "Guest", "autoconnect": false, "framing": "stream"}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.endpoint, "wss://irc.example.net/ws");
        assert_eq!(config.channel, "#support");
        assert_eq!(config.real_name, "Guest");
        assert!(!config.auto_connect);
        assert_eq!(config.framing, Framing::Stream);
        assert_eq!(config.message_limit, DEFAULT_MESSAGE_LIMIT);
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/nonexistent/web-irc/config.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_subprotocols() {
        assert_eq!(minimal().subprotocols(), vec!["irc", "binary.ircv3.net"]);
    }
}
