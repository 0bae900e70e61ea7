//! Error types used by the SSE parser.

use core::fmt::{Display, Formatter};

/// Raised once a stream instance has produced more malformed lines than
/// allowed. Parsing of that instance stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedLinesExceeded {
    /// Malformed lines seen on the stream instance.
    pub count: usize,
    /// The configured ceiling.
    pub limit: usize,
}

impl Display for MalformedLinesExceeded {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} malformed lines exceed the limit of {}",
            self.count, self.limit
        )
    }
}

impl core::error::Error for MalformedLinesExceeded {}

/// Errors produced by [`EventStream`](super::event_stream::EventStream).
#[derive(Debug, PartialEq)]
pub enum EventStreamError<E> {
    /// Something went wrong with the underlying stream.
    Transport(E),
    /// Too many lines matched no known field.
    Malformed(MalformedLinesExceeded),
}

impl<E> From<MalformedLinesExceeded> for EventStreamError<E> {
    fn from(value: MalformedLinesExceeded) -> Self {
        Self::Malformed(value)
    }
}

impl<E> Display for EventStreamError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport(e) => e.fmt(f),
            Self::Malformed(e) => e.fmt(f),
        }
    }
}

impl<E> core::error::Error for EventStreamError<E> where E: core::error::Error {}
