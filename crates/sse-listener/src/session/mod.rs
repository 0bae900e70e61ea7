//! Resilient listening sessions.
//!
//! A session keeps one logical event stream alive across many physical
//! streams:
//!
//! - **Opening**: a [`StreamOpener`] produces a fresh stream, resuming from
//!   the last [`Continuation`](crate::parse::Continuation).
//! - **Backoff**: the servers' retriable statuses (500, 502, 504) are retried
//!   with exponential backoff bounded by the configured interval range and
//!   retry budget; anything else terminates the session.
//! - **Reopening**: when a stream ends, errors or turns out to be garbage, it
//!   is dropped and reopened after the current interval.
//! - **Session/Handle/Stream Split**: a background task owns the stream;
//!   interact with it through a clone-able [`SseHandle`] and a consumable
//!   [`SseStream`].
//!
//! # Architecture
//!
//! ```text
//! SseSession::start(opener, config)
//!   ├─ first open (awaited)
//!   └─ spawns background task ──► tokio::spawn(driver.run)
//!        │                              │
//!        ├── SseHandle ◄─── mpsc ───────┤  (commands: Close, Reconnect)
//!        │             ◄─── watch ──────┤  (SessionState)
//!        │                              │
//!        └── SseStream ◄─── mpsc ◄──────┘  (Event items)
//! ```
//!
//! # Module Index
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | [`ListenerConfig`] builder for session settings |
//! | [`connection`] | [`SseSession`], [`SseHandle`], [`SseStream`] |
//! | [`opener`] | [`StreamOpener`] trait and [`OpenedStream`] |
//! | `types` | [`SessionState`], [`Termination`] |

mod config;
pub mod connection;
pub mod opener;
mod types;

// Re-export config types
pub use config::ListenerConfig;
// Re-export session types
pub use connection::{SseCommand, SseHandle, SseSession, SseStream};
// Re-export opener types
pub use opener::{ByteStream, OpenedStream, StreamOpener};
// Re-export state types
pub use types::{SessionState, Termination};
