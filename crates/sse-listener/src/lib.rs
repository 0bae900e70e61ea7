//! # SSE Listener
//!
//! Resilient client for `text/event-stream` sources.
//!
//! A session opens a stream, parses it into [`Event`]s, forwards them to a
//! consumer in wire order and, when the stream ends, reopens it with the
//! last seen event id, backing off exponentially while the server keeps
//! answering with errors.
//!
//! ## Features
//!
//! - **Frame Parsing**: line-oriented parser with a per-stream ceiling on
//!   malformed lines ([`parse`]).
//! - **Reconnection**: bounded exponential backoff, a retry budget for
//!   retriable statuses and server-advertised `retry:` intervals
//!   ([`session`]).
//! - **Pluggable Transport**: streams are opened through the
//!   [`StreamOpener`] trait; an HTTP implementation on `reqwest` ships
//!   behind the default `http` feature.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "http")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = sse_listener::listen("https://example.com/events").await?;
//! let (handle, mut stream) = session.split();
//!
//! while let Some(event) = stream.next_event().await {
//!     println!("{event}");
//! }
//!
//! println!("session ended: {}", handle.termination().await);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod parse;
pub(crate) mod reconnect;
pub mod session;

#[cfg(feature = "http")]
pub mod http;

// Re-export commonly used types
pub use error::{ListenerError, ListenerResult};
#[cfg(feature = "http")]
pub use http::{HttpOpener, HttpOpenerConfig, listen, listen_request};
pub use parse::{Continuation, Event};
pub use session::{
    ListenerConfig, OpenedStream, SessionState, SseHandle, SseSession, SseStream, StreamOpener,
    Termination,
};
