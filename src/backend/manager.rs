//! Connection manager: transport lifecycle, registration and reconnection.
//!
//! The manager never touches the socket. Each transition returns the
//! [`Effect`]s the driver must perform, and every outbound line passes
//! through [`ConnectionManager::send`] or the registration path here, so
//! connection-state checks live in one place.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::main_loop::state::{backoff_delay, ConnectionState};
use crate::config::Config;
use crate::error::SendError;
use crate::protocol::Effect;

/// WebSocket close code for a normal closure.
pub const NORMAL_CLOSE: u16 = 1000;

pub struct ConnectionManager {
    state: ConnectionState,
    reconnect_attempt: u32,
    endpoint: String,
    subprotocols: Vec<String>,
    primary_channel: String,
    base_delay: Duration,
    max_attempts: u32,
}

impl ConnectionManager {
    pub fn new(config: &Config) -> Self {
        Self {
            state: ConnectionState::Idle,
            reconnect_attempt: 0,
            endpoint: config.endpoint.clone(),
            subprotocols: config.subprotocols(),
            primary_channel: config.channel.clone(),
            base_delay: config.reconnect_delay(),
            max_attempts: config.max_reconnect_attempts,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_attempt(&self) -> u32 {
        self.reconnect_attempt
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Manual connect request. Cancels a pending reconnect timer and leaves `Failed`.
    pub fn open(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.state {
            ConnectionState::Connecting
            | ConnectionState::Registering
            | ConnectionState::Connected => {
                debug!(state = %self.state, "Connect ignored: already active");
                return effects;
            }
            ConnectionState::Reconnecting { .. } => effects.push(Effect::CancelReconnect),
            ConnectionState::Failed => self.reconnect_attempt = 0,
            ConnectionState::Idle => {}
        }
        effects.extend(self.begin_connect());
        effects
    }

    fn begin_connect(&mut self) -> Vec<Effect> {
        info!(endpoint = %self.endpoint, attempt = self.reconnect_attempt, "Connecting");
        self.state = ConnectionState::Connecting;
        vec![
            Effect::status("Connecting..."),
            Effect::Open {
                endpoint: self.endpoint.clone(),
                subprotocols: self.subprotocols.clone(),
            },
        ]
    }

    /// Manual disconnect: no reconnection afterwards.
    pub fn disconnect(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.state {
            ConnectionState::Reconnecting { .. } => effects.push(Effect::CancelReconnect),
            state if state.transport_active() => effects.push(Effect::Close),
            _ => {}
        }
        if self.state != ConnectionState::Idle {
            info!(state = %self.state, "Disconnect requested");
            self.state = ConnectionState::Idle;
            effects.push(Effect::status("Disconnected"));
        }
        effects
    }

    /// Transport came up: register with NICK and USER.
    pub fn transport_opened(&mut self, nickname: &str, real_name: &str) -> Vec<Effect> {
        if self.state != ConnectionState::Connecting {
            warn!(state = %self.state, "Transport opened in unexpected state");
            return vec![Effect::Close];
        }
        info!("Transport open, registering");
        self.state = ConnectionState::Registering;
        vec![
            Effect::status("Connected - Logging in..."),
            Effect::Send(format!("NICK {}", nickname)),
            Effect::Send(format!("USER {} 0 * :{}", nickname, real_name)),
        ]
    }

    /// RPL_WELCOME: registration complete, join the primary channel.
    pub fn welcome(&mut self) -> Vec<Effect> {
        if self.state != ConnectionState::Registering {
            debug!(state = %self.state, "Welcome outside registration");
            return Vec::new();
        }
        info!(channel = %self.primary_channel, "Registered");
        self.state = ConnectionState::Connected;
        self.reconnect_attempt = 0;
        vec![
            Effect::status("Connected - Joining channel..."),
            Effect::Send(format!("JOIN {}", self.primary_channel)),
        ]
    }

    /// Answer a server PING verbatim. Allowed during registration.
    pub fn pong(&self, token: &str) -> Option<Effect> {
        if !self.state.transport_open() {
            return None;
        }
        Some(Effect::Send(format!("PONG {}", token)))
    }

    /// Gate for user-issued traffic.
    pub fn send(&self, line: String) -> Result<Effect, SendError> {
        if self.state != ConnectionState::Connected {
            warn!(state = %self.state, "Cannot send message: not connected");
            return Err(SendError::NotConnected);
        }
        Ok(Effect::Send(line))
    }

    /// Transport closed with the given WebSocket close code (None if absent).
    pub fn transport_closed(&mut self, code: Option<u16>) -> Vec<Effect> {
        if !self.state.transport_active() {
            debug!(?code, state = %self.state, "Close after disconnect ignored");
            return Vec::new();
        }
        info!(?code, "Transport closed");
        if code == Some(NORMAL_CLOSE) {
            self.state = ConnectionState::Idle;
            return vec![Effect::status("Disconnected")];
        }
        self.schedule_reconnect()
    }

    /// Open failure or mid-stream transport error.
    pub fn transport_error(&mut self, reason: &str) -> Vec<Effect> {
        if !self.state.transport_active() {
            debug!(reason, state = %self.state, "Transport error while inactive ignored");
            return Vec::new();
        }
        warn!(reason, "Transport error");
        let mut effects = vec![Effect::status("Connection error")];
        effects.extend(self.schedule_reconnect());
        effects
    }

    fn schedule_reconnect(&mut self) -> Vec<Effect> {
        if self.reconnect_attempt >= self.max_attempts {
            warn!(attempts = self.reconnect_attempt, "Max reconnection attempts reached");
            self.state = ConnectionState::Failed;
            return vec![Effect::status("Max reconnection attempts reached")];
        }

        self.reconnect_attempt += 1;
        let delay = backoff_delay(self.base_delay, self.reconnect_attempt);
        self.state = ConnectionState::Reconnecting {
            attempt: self.reconnect_attempt,
        };
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        info!(attempt = self.reconnect_attempt, delay_ms, "Scheduling reconnect");

        let secs = delay_ms.div_ceil(1000);
        vec![
            Effect::status(format!(
                "Reconnecting in {}s... (attempt {})",
                secs, self.reconnect_attempt
            )),
            Effect::ScheduleReconnect(delay),
        ]
    }

    /// The backoff timer fired.
    pub fn reconnect_elapsed(&mut self) -> Vec<Effect> {
        match self.state {
            ConnectionState::Reconnecting { .. } => self.begin_connect(),
            _ => {
                debug!(state = %self.state, "Stale reconnect timer ignored");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::GuiEvent;

    fn config(max_attempts: u32) -> Config {
        Config {
            endpoint: "wss://irc.example.net/".into(),
            channel: "#lobby".into(),
            reconnect_delay_ms: 1000,
            max_reconnect_attempts: max_attempts,
            ..Config::default()
        }
    }

    fn sends(effects: &[Effect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    fn scheduled(effects: &[Effect]) -> Option<Duration> {
        effects.iter().find_map(|e| match e {
            Effect::ScheduleReconnect(d) => Some(*d),
            _ => None,
        })
    }

    fn registered(max_attempts: u32) -> ConnectionManager {
        let mut mgr = ConnectionManager::new(&config(max_attempts));
        mgr.open();
        mgr.transport_opened("guest1234", "Web IRC User");
        mgr.welcome();
        mgr
    }

    #[test]
    fn test_handshake_sequence() {
        let mut mgr = ConnectionManager::new(&config(3));
        let effects = mgr.open();
        assert_eq!(mgr.state(), ConnectionState::Connecting);
        assert!(effects.contains(&Effect::Open {
            endpoint: "wss://irc.example.net/".into(),
            subprotocols: vec!["irc".into(), "binary.ircv3.net".into()],
        }));

        let effects = mgr.transport_opened("guest1234", "Web IRC User");
        assert_eq!(mgr.state(), ConnectionState::Registering);
        assert_eq!(
            sends(&effects),
            vec!["NICK guest1234", "USER guest1234 0 * :Web IRC User"]
        );

        // PING during registration is answered
        assert_eq!(mgr.pong(":abc"), Some(Effect::Send("PONG :abc".into())));
        // but user traffic is not
        assert_eq!(mgr.send("PRIVMSG #lobby :hi".into()), Err(SendError::NotConnected));

        let effects = mgr.welcome();
        assert_eq!(mgr.state(), ConnectionState::Connected);
        assert_eq!(sends(&effects), vec!["JOIN #lobby"]);
        assert!(mgr.send("PRIVMSG #lobby :hi".into()).is_ok());
    }

    #[test]
    fn test_normal_close_goes_idle() {
        let mut mgr = registered(3);
        let effects = mgr.transport_closed(Some(NORMAL_CLOSE));
        assert_eq!(mgr.state(), ConnectionState::Idle);
        assert!(scheduled(&effects).is_none());
    }

    #[test]
    fn test_backoff_until_cap() {
        let mut mgr = registered(3);
        let mut delays = Vec::new();
        let mut effects = mgr.transport_closed(Some(1006));
        while let Some(delay) = scheduled(&effects) {
            delays.push(delay);
            mgr.reconnect_elapsed();
            assert_eq!(mgr.state(), ConnectionState::Connecting);
            effects = mgr.transport_error("connection refused");
        }
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(1500),
                Duration::from_millis(2250)
            ]
        );
        assert_eq!(mgr.state(), ConnectionState::Failed);
        assert!(effects.contains(&Effect::Gui(GuiEvent::Status(
            "Max reconnection attempts reached".into()
        ))));

        // Nothing more happens until a manual connect
        assert!(mgr.reconnect_elapsed().is_empty());
        mgr.open();
        assert_eq!(mgr.state(), ConnectionState::Connecting);
        assert_eq!(mgr.reconnect_attempt(), 0);
    }

    #[test]
    fn test_welcome_resets_attempts() {
        let mut mgr = registered(5);
        mgr.transport_closed(None);
        mgr.reconnect_elapsed();
        mgr.transport_opened("guest1234", "Web IRC User");
        assert_eq!(mgr.reconnect_attempt(), 1);
        mgr.welcome();
        assert_eq!(mgr.reconnect_attempt(), 0);
    }

    #[test]
    fn test_status_text() {
        let mut mgr = registered(5);
        let effects = mgr.transport_closed(Some(1006));
        assert!(effects.contains(&Effect::Gui(GuiEvent::Status(
            "Reconnecting in 1s... (attempt 1)".into()
        ))));
    }

    #[test]
    fn test_manual_disconnect_cancels_timer() {
        let mut mgr = registered(5);
        mgr.transport_closed(Some(1006));
        let effects = mgr.disconnect();
        assert!(effects.contains(&Effect::CancelReconnect));
        assert_eq!(mgr.state(), ConnectionState::Idle);
        // Timer that raced the cancel does nothing
        assert!(mgr.reconnect_elapsed().is_empty());
    }

    #[test]
    fn test_disconnect_closes_transport_and_ignores_late_close() {
        let mut mgr = registered(5);
        assert!(mgr.disconnect().contains(&Effect::Close));
        assert!(mgr.transport_closed(Some(NORMAL_CLOSE)).is_empty());
        assert!(mgr.transport_closed(Some(1006)).is_empty());
        assert_eq!(mgr.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_connect_during_backoff_cancels_timer() {
        let mut mgr = registered(5);
        mgr.transport_closed(Some(1006));
        let effects = mgr.open();
        assert_eq!(effects.first(), Some(&Effect::CancelReconnect));
        assert_eq!(mgr.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_long_outage_saturates_delay() {
        let mut mgr = ConnectionManager::new(&Config {
            reconnect_delay_ms: 0,
            ..config(500)
        });
        mgr.open();
        for _ in 0..300 {
            let effects = mgr.transport_error("refused");
            assert_eq!(scheduled(&effects), Some(Duration::ZERO));
            mgr.reconnect_elapsed();
        }

        let mut slow = registered(500);
        let mut last = Duration::ZERO;
        for _ in 0..150 {
            last = scheduled(&slow.transport_error("refused")).unwrap();
            slow.reconnect_elapsed();
        }
        assert_eq!(last, Duration::MAX);
    }

    #[test]
    fn test_zero_attempt_cap_fails_immediately() {
        let mut mgr = registered(0);
        let effects = mgr.transport_closed(Some(1006));
        assert!(scheduled(&effects).is_none());
        assert_eq!(mgr.state(), ConnectionState::Failed);
    }
}
