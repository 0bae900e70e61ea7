//! Line-driven frame parser.

use core::{mem, time::Duration};

use bytes::Bytes;

use super::{
    errors::MalformedLinesExceeded,
    event::{Continuation, Event},
    line::{Line, classify},
    record::RecordBuilder,
};

/// Assembles classified lines of one stream instance into [`Event`]s.
///
/// Has no knowledge of the network or of time: it is fed one line at a time
/// (terminator removed) and hands back an event whenever a blank line closes
/// a populated record. A fresh parser is created for every stream instance,
/// seeded with the session's [`Continuation`].
#[derive(Debug, Clone)]
pub struct FrameParser {
    record: RecordBuilder,
    malformed_lines: usize,
    max_malformed_lines: usize,
    retry: Option<Duration>,
    aborted: bool,
}

impl FrameParser {
    /// Create a parser that gives up after more than `max_malformed_lines`
    /// unrecognised lines.
    pub fn new(max_malformed_lines: usize, continuation: Continuation) -> Self {
        Self {
            record: RecordBuilder::new(continuation),
            malformed_lines: 0,
            max_malformed_lines,
            retry: None,
            aborted: false,
        }
    }

    /// Feed one line.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedLinesExceeded`] once the malformed-line ceiling has
    /// been passed, and on every call after that. The record in flight at
    /// that point is discarded.
    pub fn feed_line(&mut self, line: Bytes) -> Result<Option<Event>, MalformedLinesExceeded> {
        if self.aborted {
            return Err(self.exceeded());
        }

        match classify(line) {
            Line::Comment => {}
            Line::Id(id) => self.record.set_last_event_id(id),
            Line::Event(event_type) => self.record.set_event_type(event_type),
            Line::Retry(value) => {
                if let Ok(millis) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(millis));
                }
            }
            Line::Data(data) => self.record.push_data(data),
            Line::Empty => return Ok(self.dispatch()),
            Line::Malformed => {
                self.malformed_lines += 1;
                if self.malformed_lines > self.max_malformed_lines {
                    self.aborted = true;
                    self.record = RecordBuilder::new(self.record.continuation().clone());
                    return Err(self.exceeded());
                }
            }
        }
        Ok(None)
    }

    /// Parse a sequence of lines lazily.
    ///
    /// The iterator ends after the first error.
    pub fn events<I>(self, lines: I) -> Events<I::IntoIter>
    where
        I: IntoIterator<Item = Bytes>,
    {
        Events {
            parser: self,
            lines: lines.into_iter(),
        }
    }

    /// Lines so far that matched no known field.
    pub fn malformed_lines(&self) -> usize {
        self.malformed_lines
    }

    /// Whether the malformed-line ceiling has been passed.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// The continuation as of the last line fed.
    pub fn continuation(&self) -> &Continuation {
        self.record.continuation()
    }

    /// Take the most recent `retry` interval advertised by the server.
    pub fn take_retry(&mut self) -> Option<Duration> {
        self.retry.take()
    }

    fn dispatch(&mut self) -> Option<Event> {
        if !self.record.is_populated() {
            return None;
        }
        let (event, continuation) = mem::take(&mut self.record).dispatch();
        self.record = RecordBuilder::new(continuation);
        event
    }

    fn exceeded(&self) -> MalformedLinesExceeded {
        MalformedLinesExceeded {
            count: self.malformed_lines,
            limit: self.max_malformed_lines,
        }
    }
}

/// Iterator returned by [`FrameParser::events`].
#[derive(Debug)]
pub struct Events<I> {
    parser: FrameParser,
    lines: I,
}

impl<I> Events<I> {
    /// The underlying parser, for its counters and continuation.
    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }
}

impl<I> Iterator for Events<I>
where
    I: Iterator<Item = Bytes>,
{
    type Item = Result<Event, MalformedLinesExceeded>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.parser.is_aborted() {
            return None;
        }
        for line in self.lines.by_ref() {
            match self.parser.feed_line(line) {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &'static str) -> Vec<Bytes> {
        text.split('\n')
            .map(|line| Bytes::from_static(line.as_bytes()))
            .collect()
    }

    fn parse(
        text: &'static str,
        max_malformed_lines: usize,
    ) -> Vec<Result<Event, MalformedLinesExceeded>> {
        FrameParser::new(max_malformed_lines, Continuation::default())
            .events(lines(text))
            .collect()
    }

    #[test]
    fn test_reference_stream() {
        let events = parse(
            "event: add\ndata: 73857293\n\nevent: remove\n: skip comment\ndata: 2153\n\nevent: doubleLine\ndata: line1\ndata: line2\n\n",
            100,
        );
        assert_eq!(
            events,
            vec![
                Ok(Event::new("add", "73857293", "")),
                Ok(Event::new("remove", "2153", "")),
                Ok(Event::new("doubleLine", "line1\rline2", "")),
            ]
        );
    }

    #[test]
    fn test_one_event_per_populated_record() {
        let events = parse("\n\ndata: a\n\n\n\nid: 5\n\nevent: b\n\n: only a comment\n\n", 100);
        assert_eq!(
            events,
            vec![Ok(Event::new("", "a", "")), Ok(Event::new("b", "", "5"))]
        );
    }

    #[test]
    fn test_last_event_id_is_sticky() {
        let events = parse(
            "id: 1\ndata: a\n\ndata: b\n\nid: 2\ndata: c\n\nid: \ndata: d\n\n",
            100,
        );
        let ids: Vec<_> = events
            .iter()
            .map(|e| e.as_ref().expect("event").last_event_id().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "1", "2", ""]);
    }

    #[test]
    fn test_comment_changes_nothing() {
        let with_comments = parse(": a\nevent: x\n: b\ndata: y\n:id: 4\n\n", 0);
        let without = parse("event: x\ndata: y\n\n", 0);
        assert_eq!(with_comments, without);
    }

    #[test]
    fn test_retry_applies_on_valid_integer() {
        let mut parser = FrameParser::new(10, Continuation::default());
        assert_eq!(parser.feed_line(Bytes::from_static(b"retry: 2500")), Ok(None));
        assert_eq!(parser.take_retry(), Some(Duration::from_millis(2500)));
        assert_eq!(parser.take_retry(), None);

        assert_eq!(parser.feed_line(Bytes::from_static(b"retry: soon")), Ok(None));
        assert_eq!(parser.feed_line(Bytes::from_static(b"retry: -1")), Ok(None));
        assert_eq!(parser.take_retry(), None);
        assert_eq!(parser.malformed_lines(), 0);
    }

    #[test]
    fn test_retry_alone_does_not_dispatch() {
        assert!(parse("retry: 1000\n\n", 0).is_empty());
    }

    #[test]
    fn test_malformed_lines_counted() {
        let mut parser = FrameParser::new(10, Continuation::default());
        for line in ["garbage", "data:x", "unknown: field"] {
            assert_eq!(parser.feed_line(Bytes::from_static(line.as_bytes())), Ok(None));
        }
        assert_eq!(parser.malformed_lines(), 3);
        assert!(!parser.is_aborted());
    }

    #[test]
    fn test_malformed_ceiling_discards_partial_record() {
        let events = parse("data: kept\n\nevent: partial\nbad\nbad\nbad\n\ndata: late\n\n", 2);
        assert_eq!(
            events,
            vec![
                Ok(Event::new("", "kept", "")),
                Err(MalformedLinesExceeded { count: 3, limit: 2 }),
            ]
        );
    }

    #[test]
    fn test_aborted_parser_stays_aborted() {
        let mut parser = FrameParser::new(0, Continuation::new("7"));
        let err = parser
            .feed_line(Bytes::from_static(b"nope"))
            .expect_err("ceiling of zero");
        assert_eq!(err, MalformedLinesExceeded { count: 1, limit: 0 });
        assert!(parser.feed_line(Bytes::from_static(b"data: x")).is_err());
        assert!(parser.feed_line(Bytes::new()).is_err());
        assert_eq!(parser.continuation().last_event_id(), "7");
    }

    #[test]
    fn test_events_iterator_is_lazy() {
        let mut events = FrameParser::new(0, Continuation::default())
            .events(lines("data: a\n\ndata: b\n\n"));
        assert_eq!(events.next(), Some(Ok(Event::new("", "a", ""))));
        assert_eq!(events.next(), Some(Ok(Event::new("", "b", ""))));
        assert_eq!(events.next(), None);
        assert_eq!(events.parser().malformed_lines(), 0);
    }
}
