//! [`Stream`] that converts a stream of
//! [`Bytes`](bytes::Bytes) chunks into [`Event`]s.

use core::{
    pin::Pin,
    task::{Context, Poll, ready},
    time::Duration,
};

use bytes::{Buf, BytesMut};
use futures_core::Stream;

use super::{
    constants::BOM,
    errors::EventStreamError,
    event::{Continuation, Event},
    line::{next_line, take_remainder},
    parser::FrameParser,
};

// ---------------------------------------------------------------------------
// EventStreamState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum EventStreamState {
    NotStarted,
    Started,
    Terminated,
}

impl EventStreamState {
    fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }

    fn is_not_started(self) -> bool {
        matches!(self, Self::NotStarted)
    }
}

// ---------------------------------------------------------------------------
// EventStream
// ---------------------------------------------------------------------------

pin_project_lite::pin_project! {
    /// A [`Stream`] that converts a stream of byte chunks from one stream
    /// instance into parsed [`Event`]s.
    ///
    /// Splits chunks into lines (LF, with an optional CR before it), skips a
    /// leading BOM and feeds every line to a [`FrameParser`]. Ends after the
    /// underlying stream ends or after the parser gives up on malformed
    /// input.
    #[project = EventStreamProjection]
    #[derive(Debug)]
    pub struct EventStream<S> {
        #[pin]
        stream: S,
        buffer: BytesMut,
        parser: FrameParser,
        state: EventStreamState,
    }
}

impl<S> EventStream<S> {
    /// Create a new [`EventStream`] from an underlying byte stream.
    pub fn new(stream: S, parser: FrameParser) -> Self {
        Self {
            stream,
            buffer: BytesMut::new(),
            parser,
            state: EventStreamState::NotStarted,
        }
    }

    /// The continuation as of the last parsed line.
    pub fn continuation(&self) -> &Continuation {
        self.parser.continuation()
    }

    /// Take the most recent `retry` interval advertised on this stream.
    pub fn take_retry(&mut self) -> Option<Duration> {
        self.parser.take_retry()
    }
}

// ---------------------------------------------------------------------------
// BOM helper
// ---------------------------------------------------------------------------

/// `Some(true)` if `buf` opens with a BOM, `Some(false)` if it cannot, and
/// `None` while it is too short to tell.
fn starts_with_bom(buf: &[u8]) -> Option<bool> {
    if buf.len() >= BOM.len() {
        Some(buf.starts_with(BOM))
    } else if BOM.starts_with(buf) {
        None
    } else {
        Some(false)
    }
}

// ---------------------------------------------------------------------------
// Parsing helper
// ---------------------------------------------------------------------------

fn parse_buffered<E>(
    buffer: &mut BytesMut,
    parser: &mut FrameParser,
) -> Result<Option<Event>, EventStreamError<E>> {
    while let Some(line) = next_line(buffer) {
        if let Some(event) = parser.feed_line(line)? {
            return Ok(Some(event));
        }
    }
    Ok(None)
}

macro_rules! try_parse_event_buffer {
    ($this:ident) => {
        match parse_buffered($this.buffer, $this.parser) {
            Ok(Some(event)) => return Poll::Ready(Some(Ok(event))),
            Err(e) => {
                *$this.state = EventStreamState::Terminated;
                $this.buffer.clear();
                return Poll::Ready(Some(Err(e)));
            }
            Ok(None) => {}
        }
    };
}

// ---------------------------------------------------------------------------
// Stream implementation
// ---------------------------------------------------------------------------

impl<S, E, B> Stream for EventStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    type Item = Result<Event, EventStreamError<E>>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<<Self as Stream>::Item>> {
        let mut this = self.project();

        try_parse_event_buffer!(this);

        if this.state.is_terminated() {
            return Poll::Ready(None);
        }

        loop {
            let new_bytes = match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(o)) => o,
                Some(Err(e)) => {
                    *this.state = EventStreamState::Terminated;
                    this.buffer.clear();
                    return Poll::Ready(Some(Err(EventStreamError::Transport(e))));
                }
                None => {
                    *this.state = EventStreamState::Terminated;
                    // An unterminated last line still counts as a line.
                    if let Some(line) = take_remainder(this.buffer) {
                        match this.parser.feed_line(line) {
                            Ok(Some(event)) => return Poll::Ready(Some(Ok(event))),
                            Ok(None) => {}
                            Err(e) => return Poll::Ready(Some(Err(e.into()))),
                        }
                    }
                    return Poll::Ready(None);
                }
            };

            let new_bytes = new_bytes.as_ref();

            if new_bytes.is_empty() {
                continue;
            }

            this.buffer.extend_from_slice(new_bytes);

            // BOM detection on the very first chunk(s).
            if this.state.is_not_started() {
                match starts_with_bom(this.buffer) {
                    Some(true) => {
                        *this.state = EventStreamState::Started;
                        this.buffer.advance(BOM.len());
                    }
                    Some(false) => *this.state = EventStreamState::Started,
                    None => continue,
                }
            }

            try_parse_event_buffer!(this);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_util::StreamExt;

    use super::*;
    use crate::parse::errors::MalformedLinesExceeded;

    macro_rules! chunks {
        ($($chunk:expr),* $(,)?) => {
            vec![$(Bytes::from_static($chunk)),*]
        };
    }

    async fn collect(
        chunks: Vec<Bytes>,
        max_malformed_lines: usize,
    ) -> Vec<Result<Event, EventStreamError<()>>> {
        let stream = futures_util::stream::iter(chunks.into_iter().map(Ok::<_, ()>));
        EventStream::new(
            stream,
            FrameParser::new(max_malformed_lines, Continuation::default()),
        )
        .collect()
        .await
    }

    #[tokio::test]
    async fn reference_stream() {
        assert_eq!(
            collect(
                chunks![
                    b"event: add\ndata: 73857293\n\n",
                    b"event: remove\n: skip comment\ndata: 2153\n\n",
                    b"event: doubleLine\ndata: line1\ndata: line2\n\n",
                ],
                100,
            )
            .await,
            vec![
                Ok(Event::new("add", "73857293", "")),
                Ok(Event::new("remove", "2153", "")),
                Ok(Event::new("doubleLine", "line1\rline2", "")),
            ]
        );
    }

    #[tokio::test]
    async fn lines_split_across_chunks() {
        assert_eq!(
            collect(
                chunks![b"data: Hel", b"", b"lo\r", b"\n", b"data: world\n", b"\n"],
                0,
            )
            .await,
            vec![Ok(Event::new("", "Hello\rworld", ""))]
        );
    }

    #[tokio::test]
    async fn incomplete_record_at_end_is_dropped() {
        assert_eq!(collect(chunks![b"data: Hello, world!\n"], 0).await, vec![]);
        assert_eq!(collect(chunks![b"data: Hello, world!"], 0).await, vec![]);
    }

    #[tokio::test]
    async fn trailing_cr_completes_record() {
        assert_eq!(
            collect(chunks![b"data: test\n\r"], 0).await,
            vec![Ok(Event::new("", "test", ""))]
        );
    }

    #[tokio::test]
    async fn bom_handling() {
        // BOM at start should be stripped.
        assert_eq!(
            collect(chunks![b"\xEF\xBB\xBFdata: test\n\n"], 0).await,
            vec![Ok(Event::new("", "test", ""))]
        );

        // BOM split across chunks.
        assert_eq!(
            collect(chunks![b"\xEF\xBB", b"\xBFdata: test\n\n"], 0).await,
            vec![Ok(Event::new("", "test", ""))]
        );

        // Short first line without BOM.
        assert_eq!(
            collect(chunks![b":\n", b"data: test\n\n"], 0).await,
            vec![Ok(Event::new("", "test", ""))]
        );
    }

    #[tokio::test]
    async fn malformed_ceiling_ends_stream() {
        assert_eq!(
            collect(
                chunks![
                    b"data: first\n\n",
                    b"event: half\nnot a field\nstill not\n",
                    b"data: never\n\n",
                ],
                1,
            )
            .await,
            vec![
                Ok(Event::new("", "first", "")),
                Err(EventStreamError::Malformed(MalformedLinesExceeded {
                    count: 2,
                    limit: 1,
                })),
            ]
        );
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let stream = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"data: a\n\n")),
            Err("reset"),
            Ok(Bytes::from_static(b"data: b\n\n")),
        ]);
        let parser = FrameParser::new(0, Continuation::default());
        let events: Vec<_> = EventStream::new(stream, parser).collect().await;
        assert_eq!(
            events,
            vec![
                Ok(Event::new("", "a", "")),
                Err(EventStreamError::Transport("reset")),
            ]
        );
    }

    #[tokio::test]
    async fn continuation_survives_the_stream() {
        let stream = futures_util::stream::iter(vec![Ok::<_, ()>(Bytes::from_static(
            b"data: a\n\nid: 12\nretry: 750\n",
        ))]);
        let mut events = EventStream::new(stream, FrameParser::new(0, Continuation::new("11")));

        let first = events.next().await.expect("event").expect("ok");
        assert_eq!(first.last_event_id(), "11");
        assert!(events.next().await.is_none());

        assert_eq!(events.continuation().last_event_id(), "12");
        assert_eq!(events.take_retry(), Some(Duration::from_millis(750)));
    }
}
