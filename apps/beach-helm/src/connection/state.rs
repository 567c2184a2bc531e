use std::fmt;

use thiserror::Error;

/// Transport lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// `start()` was called.
    Start,
    /// The transport handshake completed.
    Opened,
    /// A connect attempt failed or the open link closed or errored.
    Dropped,
    /// The reconnect delay elapsed.
    RetryElapsed,
    /// `stop()` was called.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid connection transition: {event:?} while {state}")]
pub struct InvalidTransition {
    pub state: ConnectionState,
    pub event: ConnectionEvent,
}

impl ConnectionState {
    /// The single transition function. `Stop` is accepted from every state,
    /// including `Closed`, so stopping is idempotent.
    pub fn apply(self, event: ConnectionEvent) -> Result<Self, InvalidTransition> {
        match (self, event) {
            (_, ConnectionEvent::Stop) => Ok(Self::Closed),
            (Self::Idle, ConnectionEvent::Start) => Ok(Self::Connecting),
            (Self::Connecting, ConnectionEvent::Opened) => Ok(Self::Open),
            (Self::Connecting | Self::Open, ConnectionEvent::Dropped) => Ok(Self::Reconnecting),
            (Self::Reconnecting, ConnectionEvent::RetryElapsed) => Ok(Self::Connecting),
            (state, event) => Err(InvalidTransition { state, event }),
        }
    }

    pub fn is_open(self) -> bool {
        self == ConnectionState::Open
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Closed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
