//! Common constants used across the SSE parser.

use bytes_utils::Str;

/// Newline byte
pub(crate) const LF: u8 = b'\n';
/// Carriage return byte
pub(crate) const CR: u8 = b'\r';
/// Leading byte of a comment line
pub(crate) const COLON: u8 = b':';

/// Byte Order Mark as char
const BOM_CHAR: char = '\u{FEFF}';
const BOM_LEN: usize = BOM_CHAR.len_utf8();
/// Byte representation of the BOM [`char`]
pub(crate) const BOM: &[u8; BOM_LEN] = &{
    let mut buf = [0u8; BOM_LEN];
    BOM_CHAR.encode_utf8(&mut buf);
    buf
};

// Field prefixes, delimiter included. The value is everything after them.
pub(crate) const ID_PREFIX: &[u8] = b"id: ";
pub(crate) const EVENT_PREFIX: &[u8] = b"event: ";
pub(crate) const RETRY_PREFIX: &[u8] = b"retry: ";
pub(crate) const DATA_PREFIX: &[u8] = b"data: ";

/// Joins consecutive `data` values of one record.
pub(crate) const DATA_SEPARATOR: char = '\r';

/// Empty instance of [`Str`], from an `&'static ""`
pub(crate) const EMPTY_STR: Str = Str::from_static("");
/// Event name reported for records without an `event` field
pub(crate) const MESSAGE_EVENT_NAME: &str = "message";

/// Media type a response must declare to be accepted.
pub(crate) const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";
