//! Connection status reported to subscribers and the controller state machine.

use std::{fmt, sync::Arc};

use crate::error::EventSourceError;

/// Status transition delivered to [`Subscriber::on_status`](crate::Subscriber::on_status).
///
/// Per connection attempt: exactly one `Connecting` first, any number of
/// `Open` (one per received chunk), then exactly one of `Closed` or `Failed`.
#[derive(Clone, Debug)]
pub enum ConnectionStatus {
    /// The request was issued; no bytes have arrived yet.
    Connecting,
    /// A chunk of the response body arrived.
    Open,
    /// The stream ended gracefully or was disconnected.
    Closed,
    /// The transport reported an error.
    Failed(Arc<EventSourceError>),
}

impl ConnectionStatus {
    /// Returns `true` for `Closed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }

    /// The failure, if this is a `Failed` status.
    pub fn error(&self) -> Option<&EventSourceError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// The state the controller is in after this status.
    pub fn state(&self) -> ConnectionState {
        match self {
            Self::Connecting => ConnectionState::Connecting,
            Self::Open => ConnectionState::Open,
            Self::Closed => ConnectionState::Closed,
            Self::Failed(_) => ConnectionState::Failed,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

/// Controller state machine states.
///
/// `Idle → Connecting → Open → Closed`, or `Connecting/Open → Failed`.
/// Transitions only move forward; a terminal state is never left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been started.
    #[default]
    Idle,
    /// Request issued, waiting for the first chunk.
    Connecting,
    /// Receiving data.
    Open,
    /// Ended gracefully or disconnected.
    Closed,
    /// Ended by a transport error.
    Failed,
}

impl ConnectionState {
    /// Returns `true` if the connection is actively streaming.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the connection is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Whether moving to `next` is allowed.
    pub(crate) fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Open | Closed | Failed)
                | (Open, Open | Closed | Failed)
        )
    }
}
