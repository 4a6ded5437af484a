//! Connection lifecycle states and the reconnect backoff curve.

use std::fmt;
use std::time::Duration;

/// Growth factor applied to the reconnect delay per attempt.
pub const BACKOFF_FACTOR: f64 = 1.5;

/// Connection lifecycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport, no pending timer
    Idle,
    /// Transport open requested, waiting for it to come up
    Connecting,
    /// Transport open, sent NICK/USER, waiting for 001 RPL_WELCOME
    Registering,
    /// Fully registered
    Connected,
    /// Waiting for the backoff timer before the given attempt
    Reconnecting { attempt: u32 },
    /// Gave up after the attempt cap; only a manual connect leaves this state
    Failed,
}

impl ConnectionState {
    /// Whether the transport is up and can carry protocol traffic.
    pub fn transport_open(self) -> bool {
        matches!(self, Self::Registering | Self::Connected)
    }

    /// Whether a transport exists or is being opened.
    pub fn transport_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Registering | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Registering => write!(f, "registering"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {})", attempt),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Delay before reconnect `attempt` (1-based): `base * 1.5^(attempt - 1)`.
///
/// Saturates at `Duration::MAX` instead of overflowing.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let secs = base.as_secs_f64() * BACKOFF_FACTOR.powi(exponent);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
