//! The collaborator that (re)opens event streams.
//!
//! The session never builds requests itself. It asks a [`StreamOpener`] for a
//! fresh stream, handing over the [`Continuation`] so the opener can resume
//! where the previous stream left off, and then judges the returned status
//! and content type.

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use futures_util::{StreamExt, stream::BoxStream};
use http::{HeaderMap, StatusCode, header::CONTENT_TYPE};

use crate::{
    error::{ListenerError, ListenerResult},
    parse::{Continuation, constants::EVENT_STREAM_MEDIA_TYPE},
};

/// Body of an opened stream. Dropping it closes the stream.
pub type ByteStream = BoxStream<'static, ListenerResult<Bytes>>;

/// An open response: status, headers and the not-yet-read body.
pub struct OpenedStream {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: ByteStream,
}

impl OpenedStream {
    /// Wrap response parts.
    pub fn new<S>(status: StatusCode, headers: HeaderMap, body: S) -> Self
    where
        S: Stream<Item = ListenerResult<Bytes>> + Send + 'static,
    {
        Self {
            status,
            headers,
            body: body.boxed(),
        }
    }

    /// The declared `Content-Type`, if any and if printable.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Accept the response as an event stream, or explain why not.
    ///
    /// The status must be a success, and the media type (parameters such as
    /// `charset` aside) must be `text/event-stream`.
    pub(crate) fn into_event_body(self) -> ListenerResult<ByteStream> {
        if !self.status.is_success() {
            return Err(ListenerError::invalid_status(self.status));
        }

        let content_type = self.content_type().unwrap_or_default();
        let media_type = content_type.split(';').next().unwrap_or_default().trim();
        if !media_type.eq_ignore_ascii_case(EVENT_STREAM_MEDIA_TYPE) {
            return Err(ListenerError::invalid_content_type(content_type));
        }

        Ok(self.body)
    }
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Opens a fresh event stream.
///
/// Called for the first connection and again for every reconnection.
/// Implementations return the raw response; status and content-type checks
/// are done by the session.
///
/// An `Err` is treated as fatal: the session terminates without retrying.
/// Retriable conditions are expressed through the returned status.
#[async_trait]
pub trait StreamOpener: Send + Sync + 'static {
    /// Open a stream, resuming from `continuation` where supported.
    async fn open(&self, continuation: &Continuation) -> ListenerResult<OpenedStream>;
}
