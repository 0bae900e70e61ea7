//! Events delivered to the consumer, and the continuation carried between
//! them.

use core::fmt;

use bytes_utils::Str;

use super::constants::{EMPTY_STR, MESSAGE_EVENT_NAME};

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// The `event` field; empty when the record had none.
    pub event_type: Str,
    /// The `data` fields, joined by `"\r"`.
    pub data: Str,
    /// The last event ID seen on this session, at dispatch time.
    pub last_event_id: Str,
}

impl Event {
    /// Create an event from its three fields.
    pub fn new(
        event_type: impl Into<Str>,
        data: impl Into<Str>,
        last_event_id: impl Into<Str>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            data: data.into(),
            last_event_id: last_event_id.into(),
        }
    }

    /// The raw event type, possibly empty.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The event name as seen by `EventSource` listeners: the event type, or
    /// `"message"` when it is empty.
    pub fn name(&self) -> &str {
        if self.event_type.is_empty() {
            MESSAGE_EVENT_NAME
        } else {
            &self.event_type
        }
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn last_event_id(&self) -> &str {
        &self.last_event_id
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type={} data={}", self.event_type, self.data)?;
        if !self.last_event_id.is_empty() {
            write!(f, " id={}", self.last_event_id)?;
        }
        Ok(())
    }
}

/// State carried from one record to the next, and from one stream instance
/// to the next on reconnect.
///
/// Only the last event ID survives a dispatch; every other field of a record
/// starts over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    last_event_id: Str,
}

impl Default for Continuation {
    fn default() -> Self {
        Self {
            last_event_id: EMPTY_STR,
        }
    }
}

impl Continuation {
    /// Resume from a known event ID.
    pub fn new(last_event_id: &str) -> Self {
        Self {
            last_event_id: Str::from(last_event_id.to_owned()),
        }
    }

    pub(crate) fn with_last_event_id(last_event_id: Str) -> Self {
        Self { last_event_id }
    }

    /// The last event ID, empty when none has been seen.
    pub fn last_event_id(&self) -> &str {
        &self.last_event_id
    }

    /// Returns `true` when no event ID has been seen.
    pub fn is_empty(&self) -> bool {
        self.last_event_id.is_empty()
    }

    pub(crate) fn last_event_id_str(&self) -> &Str {
        &self.last_event_id
    }
}
