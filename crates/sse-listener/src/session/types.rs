//! Session state and termination types.

use std::fmt;

use crate::error::ListenerError;

/// Why a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Termination {
    /// Closed on request, or because the consumer went away.
    Closed,
    /// Retriable open failures exceeded the configured budget.
    Exhausted {
        /// Failed attempts counted when the session gave up.
        attempts: u32,
    },
    /// An open attempt failed in a way that is never retried.
    Fatal {
        /// Rendered error.
        message: String,
    },
}

impl Termination {
    /// Returns `true` if the session ended because of an error.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl From<&ListenerError> for Termination {
    fn from(err: &ListenerError) -> Self {
        match err {
            ListenerError::RetriesExhausted { attempts } => Self::Exhausted {
                attempts: *attempts,
            },
            other => Self::Fatal {
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Exhausted { attempts } => write!(f, "exhausted after {attempts} attempts"),
            Self::Fatal { message } => write!(f, "fatal: {message}"),
        }
    }
}

/// Session state machine states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the opener to produce a stream.
    Opening,
    /// Actively receiving events.
    Streaming,
    /// Waiting out the reconnection interval.
    Reconnecting {
        /// Consecutive retriable failures so far.
        attempt: u32,
    },
    /// Finished; the event channel is closed.
    Terminated(Termination),
}

impl SessionState {
    /// Returns `true` if the session is actively streaming.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }

    /// Returns `true` if the session is in its terminal state.
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opening => write!(f, "Opening"),
            Self::Streaming => write!(f, "Streaming"),
            Self::Reconnecting { attempt } => write!(f, "Reconnecting({attempt})"),
            Self::Terminated(reason) => write!(f, "Terminated({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(SessionState::Streaming.is_streaming());
        assert!(!SessionState::Opening.is_streaming());
        assert!(!SessionState::Reconnecting { attempt: 1 }.is_terminated());
        assert!(SessionState::Terminated(Termination::Closed).is_terminated());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Opening.to_string(), "Opening");
        assert_eq!(
            SessionState::Reconnecting { attempt: 2 }.to_string(),
            "Reconnecting(2)"
        );
        assert_eq!(
            SessionState::Terminated(Termination::Exhausted { attempts: 4 }).to_string(),
            "Terminated(exhausted after 4 attempts)"
        );
    }

    #[test]
    fn test_termination_from_error() {
        let exhausted = Termination::from(&ListenerError::retries_exhausted(4));
        assert_eq!(exhausted, Termination::Exhausted { attempts: 4 });
        assert!(exhausted.is_failure());

        let fatal = Termination::from(&ListenerError::invalid_status(StatusCode::NOT_FOUND));
        assert!(matches!(fatal, Termination::Fatal { .. }));
        assert!(!Termination::Closed.is_failure());
    }
}
