//! The record currently being assembled between two blank lines.

use bytes::BytesMut;
use bytes_utils::{Str, StrMut};

use super::{
    constants::{DATA_SEPARATOR, EMPTY_STR},
    event::{Continuation, Event},
};

/// Optimised data buffer.
///
/// The common case is a single `data` line per record, so we keep the first
/// value as an immutable [`Str`] and only upgrade to a mutable buffer when a
/// second non-empty value has to be appended.
#[derive(Debug, Default, Clone)]
enum DataBuffer {
    #[default]
    Uninit,
    Immutable(Str),
    Mutable(StrMut),
}

impl DataBuffer {
    fn freeze(self) -> Str {
        match self {
            Self::Uninit => EMPTY_STR,
            Self::Immutable(s) => s,
            Self::Mutable(s) => s.freeze(),
        }
    }

    /// Replaces the content while it is still empty, appends otherwise.
    fn push_str(&mut self, s: Str) {
        match self {
            Self::Mutable(mutable_buf) => {
                mutable_buf.push(DATA_SEPARATOR);
                mutable_buf.push_str(&s);
            }
            Self::Immutable(immutable_buf) if !immutable_buf.is_empty() => {
                let len = immutable_buf.len() + DATA_SEPARATOR.len_utf8() + s.len();
                let inner = BytesMut::with_capacity(len);
                // Safety: a fresh buffer holds no bytes, so it is valid UTF-8.
                let mut buf = unsafe { StrMut::from_inner_unchecked(inner) };
                buf.push_str(immutable_buf);
                buf.push(DATA_SEPARATOR);
                buf.push_str(&s);
                *self = Self::Mutable(buf);
            }
            Self::Uninit | Self::Immutable(_) => *self = Self::Immutable(s),
        }
    }
}

/// In-flight record.
///
/// Seeded from a [`Continuation`] and turned back into one on dispatch, so the
/// last event ID flows from record to record explicitly.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordBuilder {
    continuation: Continuation,
    event_type: Option<Str>,
    data: DataBuffer,
    populated: bool,
}

impl RecordBuilder {
    pub(crate) fn new(continuation: Continuation) -> Self {
        Self {
            continuation,
            ..Default::default()
        }
    }

    pub(crate) fn continuation(&self) -> &Continuation {
        &self.continuation
    }

    pub(crate) fn set_last_event_id(&mut self, id: Str) {
        self.continuation = Continuation::with_last_event_id(id);
    }

    pub(crate) fn set_event_type(&mut self, event_type: Str) {
        self.event_type = Some(event_type);
        self.populated = true;
    }

    pub(crate) fn push_data(&mut self, data: Str) {
        self.data.push_str(data);
        self.populated = true;
    }

    pub(crate) fn is_populated(&self) -> bool {
        self.populated
    }

    /// Finish the record.
    ///
    /// Yields the event when at least one `event` or `data` field was seen,
    /// and always hands back the continuation for the next record.
    pub(crate) fn dispatch(self) -> (Option<Event>, Continuation) {
        let Self {
            continuation,
            event_type,
            data,
            populated,
        } = self;

        if !populated {
            return (None, continuation);
        }

        let event = Event {
            event_type: event_type.unwrap_or(EMPTY_STR),
            data: data.freeze(),
            last_event_id: continuation.last_event_id_str().clone(),
        };
        (Some(event), continuation)
    }
}
