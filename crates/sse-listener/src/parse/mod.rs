//! Event-stream frame parsing.
//!
//! Line-oriented parser for the `text/event-stream` wire format: lines are
//! classified by field prefix (`id: `, `event: `, `retry: `, `data: `),
//! comments start with `:`, and a blank line dispatches the record in
//! flight. Nothing in here touches the network or a clock.
//!
//! [`FrameParser`] works on single lines; [`EventStream`] wraps a stream of
//! byte chunks and yields [`Event`]s as they complete.

pub(crate) mod constants;
pub(crate) mod errors;
pub mod event;
pub mod event_stream;
pub(crate) mod line;
pub mod parser;
pub(crate) mod record;

pub use errors::{EventStreamError, MalformedLinesExceeded};
pub use event::{Continuation, Event};
pub use event_stream::EventStream;
pub use parser::{Events, FrameParser};
