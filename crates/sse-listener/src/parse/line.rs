//! Line splitting and per-line classification.

use bytes::{Buf, Bytes, BytesMut};
use bytes_utils::Str;

use super::constants::{COLON, CR, DATA_PREFIX, EVENT_PREFIX, ID_PREFIX, LF, RETRY_PREFIX};

/// One classified line of an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Line {
    /// Starts with `:`.
    Comment,
    /// `id: <value>`
    Id(Str),
    /// `event: <value>`
    Event(Str),
    /// `retry: <value>`, not yet parsed as an integer.
    Retry(Str),
    /// `data: <value>`
    Data(Str),
    /// Record delimiter.
    Empty,
    /// Matches no known prefix, or is not valid UTF-8.
    Malformed,
}

fn validate_bytes(val: Bytes) -> Option<Str> {
    match str::from_utf8(val.as_ref()) {
        // Safety: we just validated the bytes are valid UTF-8.
        Ok(_) => Some(unsafe { Str::from_inner_unchecked(val) }),
        Err(_) => None,
    }
}

/// Classify a line with its terminator already removed.
///
/// Checked in priority order: comment, `id`, `event`, `retry`, `data`,
/// empty. Field values are kept verbatim after the `": "` delimiter.
pub(crate) fn classify(line: Bytes) -> Line {
    if line.is_empty() {
        return Line::Empty;
    }
    if line[0] == COLON {
        return Line::Comment;
    }

    let fields: [(&[u8], fn(Str) -> Line); 4] = [
        (ID_PREFIX, Line::Id),
        (EVENT_PREFIX, Line::Event),
        (RETRY_PREFIX, Line::Retry),
        (DATA_PREFIX, Line::Data),
    ];

    fields
        .iter()
        .find(|(prefix, _)| line.starts_with(prefix))
        .and_then(|(prefix, field)| validate_bytes(line.slice(prefix.len()..)).map(*field))
        .unwrap_or(Line::Malformed)
}

/// Split the next LF-terminated line off the front of `buffer`.
///
/// A CR directly before the LF is dropped. Returns `None` when the buffer
/// holds no complete line yet.
pub(crate) fn next_line(buffer: &mut BytesMut) -> Option<Bytes> {
    let eol = memchr::memchr(LF, buffer)?;
    let mut line = buffer.split_to(eol).freeze();
    buffer.advance(1);
    strip_cr(&mut line);
    Some(line)
}

/// Take whatever is left in `buffer` as a final, unterminated line.
pub(crate) fn take_remainder(buffer: &mut BytesMut) -> Option<Bytes> {
    if buffer.is_empty() {
        return None;
    }
    let mut line = buffer.split().freeze();
    strip_cr(&mut line);
    Some(line)
}

fn strip_cr(line: &mut Bytes) {
    if line.last() == Some(&CR) {
        line.truncate(line.len() - 1);
    }
}
