//! Session driver implementation.
//!
//! Provides [`SseSession`], [`SseHandle`], and [`SseStream`] for listening to
//! an event stream that is transparently reopened when it ends.

use std::{
    ops::ControlFlow,
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::{
    config::ListenerConfig,
    opener::{ByteStream, OpenedStream, StreamOpener},
    types::{SessionState, Termination},
};
use crate::{
    error::{ListenerError, ListenerResult},
    parse::{Continuation, Event, EventStream, EventStreamError, FrameParser},
    reconnect::Backoff,
};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Control commands sent from [`SseHandle`] to the background task.
#[derive(Debug)]
pub enum SseCommand {
    /// Stop listening.
    Close,
    /// Drop the current stream (or skip the current wait) and reopen now.
    Reconnect {
        /// Human-readable reason for the reconnection request.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Public API: SseSession
// ---------------------------------------------------------------------------

/// Entry point for listening sessions.
///
/// Call [`start()`](SseSession::start) to open the stream and then
/// [`split()`](SseSession::split) to obtain a [`SseHandle`] (for control)
/// and [`SseStream`] (for events).
pub struct SseSession {
    handle: SseHandle,
    stream: SseStream,
}

impl SseSession {
    /// Start a session that opens streams through `opener`.
    ///
    /// The first open attempt is awaited here. On success, or on a retriable
    /// failure, a background task takes over and keeps the stream alive
    /// until the session terminates.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails, or if the first
    /// open attempt fails fatally (opener error, non-retriable status,
    /// unexpected content type).
    pub async fn start<O: StreamOpener>(opener: O, config: ListenerConfig) -> ListenerResult<Self> {
        config.validate().map_err(ListenerError::config)?;

        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_capacity);
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let (state_tx, state_rx) = watch::channel(SessionState::Opening);

        let mut driver = SessionDriver::new(opener, config, state_tx);
        let first = match driver.open().await {
            Ok(Some(body)) => Phase::Stream(body),
            Ok(None) => Phase::Wait { grow: true },
            Err(err) => {
                driver.terminate(Termination::from(&err));
                return Err(err);
            }
        };

        tokio::spawn(driver.run(first, cmd_rx, event_tx));

        let handle = SseHandle { cmd_tx, state_rx };
        let stream = SseStream { rx: event_rx };

        Ok(Self { handle, stream })
    }

    /// Split the session into a control handle and event stream.
    ///
    /// Dropping every [`SseHandle`] closes the session, as does dropping the
    /// [`SseStream`].
    pub fn split(self) -> (SseHandle, SseStream) {
        (self.handle, self.stream)
    }

    /// Get a reference to the control handle.
    pub fn handle(&self) -> &SseHandle {
        &self.handle
    }
}

impl Stream for SseSession {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.stream).poll_next(cx)
    }
}

// ---------------------------------------------------------------------------
// SseHandle
// ---------------------------------------------------------------------------

/// Clone-able handle for controlling a running session.
#[derive(Clone, Debug)]
pub struct SseHandle {
    cmd_tx: mpsc::Sender<SseCommand>,
    state_rx: watch::Receiver<SessionState>,
}

impl SseHandle {
    /// Request a close. Interrupts reads, opens and backoff sleeps.
    ///
    /// # Errors
    ///
    /// Returns an error if the background task has already shut down.
    pub async fn close(&self) -> ListenerResult<()> {
        self.cmd_tx
            .send(SseCommand::Close)
            .await
            .map_err(|_| background_task_gone())
    }

    /// Request a reconnection.
    ///
    /// # Errors
    ///
    /// Returns an error if the background task has already shut down.
    pub async fn reconnect(&self, reason: &str) -> ListenerResult<()> {
        self.cmd_tx
            .send(SseCommand::Reconnect {
                reason: reason.to_string(),
            })
            .await
            .map_err(|_| background_task_gone())
    }

    /// Check whether the background task is still running.
    pub fn is_running(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Wait until the session terminates and return why.
    pub async fn termination(&self) -> Termination {
        let mut state_rx = self.state_rx.clone();
        let Ok(state) = state_rx.wait_for(SessionState::is_terminated).await else {
            return Termination::Closed;
        };
        match &*state {
            SessionState::Terminated(termination) => termination.clone(),
            _ => Termination::Closed,
        }
    }
}

fn background_task_gone() -> ListenerError {
    ListenerError::session_closed(Some("SSE background task shut down".to_string()))
}

// ---------------------------------------------------------------------------
// SseStream
// ---------------------------------------------------------------------------

/// Stream of [`Event`]s from a session, in wire order.
///
/// Ends once the session terminates. Implements [`Stream`] for use with
/// `StreamExt` combinators.
pub struct SseStream {
    rx: mpsc::Receiver<Event>,
}

impl SseStream {
    /// Receive the next event, waiting until one is available.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl Stream for SseStream {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.rx).poll_recv(cx)
    }
}

// ---------------------------------------------------------------------------
// Internal: background driver
// ---------------------------------------------------------------------------

/// What the driver does next.
enum Phase {
    Open,
    Stream(ByteStream),
    /// Sleep the reconnection interval, then open. `grow` is set after a
    /// failed open.
    Wait {
        grow: bool,
    },
}

enum OpenStep {
    Command(Option<SseCommand>),
    ConsumerGone,
    Opened(ListenerResult<Option<ByteStream>>),
}

enum StreamStep {
    Command(Option<SseCommand>),
    ConsumerGone,
    Item(Option<Result<Event, EventStreamError<ListenerError>>>),
}

enum WaitStep {
    Command(Option<SseCommand>),
    ConsumerGone,
    Elapsed,
}

/// State owned by the background task.
struct SessionDriver<O> {
    opener: O,
    config: ListenerConfig,
    backoff: Backoff,
    retry_count: u32,
    continuation: Continuation,
    state_tx: watch::Sender<SessionState>,
}

impl<O: StreamOpener> SessionDriver<O> {
    fn new(opener: O, config: ListenerConfig, state_tx: watch::Sender<SessionState>) -> Self {
        Self {
            opener,
            backoff: Backoff::new(config.backoff()),
            config,
            retry_count: 0,
            continuation: Continuation::default(),
            state_tx,
        }
    }

    /// The long-lived loop: stream, wait, reopen, until terminated.
    async fn run(
        mut self,
        first: Phase,
        mut cmd_rx: mpsc::Receiver<SseCommand>,
        event_tx: mpsc::Sender<Event>,
    ) {
        let mut phase = first;
        let termination = loop {
            let flow = match phase {
                Phase::Open => self.open_phase(&mut cmd_rx, &event_tx).await,
                Phase::Stream(body) => self.stream_phase(body, &mut cmd_rx, &event_tx).await,
                Phase::Wait { grow } => self.wait_phase(grow, &mut cmd_rx, &event_tx).await,
            };
            match flow {
                ControlFlow::Continue(next) => phase = next,
                ControlFlow::Break(termination) => break termination,
            }
        };

        // Refuse further commands before the terminal state becomes visible.
        drop(cmd_rx);
        self.terminate(termination);
        // Closing the event channel is the consumer's end-of-stream signal.
        drop(event_tx);
    }

    /// One open attempt.
    ///
    /// `Ok(Some(_))` on success, `Ok(None)` on a retriable failure within
    /// budget, `Err` when the session must terminate.
    async fn open(&mut self) -> ListenerResult<Option<ByteStream>> {
        self.set_state(SessionState::Opening);
        info!(
            attempt = self.retry_count,
            last_event_id = %self.continuation.last_event_id(),
            "SSE connecting"
        );

        let result = self
            .opener
            .open(&self.continuation)
            .await
            .and_then(OpenedStream::into_event_body);

        match result {
            Ok(body) => {
                info!("SSE stream opened");
                self.backoff.reset();
                self.retry_count = 0;
                self.set_state(SessionState::Streaming);
                Ok(Some(body))
            }
            Err(err) if err.is_retriable() => {
                self.retry_count = self.retry_count.saturating_add(1);
                if let Some(max) = self.config.max_retries
                    && self.retry_count > max
                {
                    error!(attempts = self.retry_count, error = %err, "Max SSE retries exceeded");
                    return Err(ListenerError::retries_exhausted(self.retry_count));
                }
                warn!(attempt = self.retry_count, error = %err, "SSE open failed, will retry");
                Ok(None)
            }
            Err(err) => {
                error!(error = %err, "SSE open failed");
                Err(err)
            }
        }
    }

    async fn open_phase(
        &mut self,
        cmd_rx: &mut mpsc::Receiver<SseCommand>,
        event_tx: &mpsc::Sender<Event>,
    ) -> ControlFlow<Termination, Phase> {
        let step = tokio::select! {
            biased;

            cmd = cmd_rx.recv() => OpenStep::Command(cmd),
            () = event_tx.closed() => OpenStep::ConsumerGone,
            opened = self.open() => OpenStep::Opened(opened),
        };

        match step {
            OpenStep::Command(cmd) => on_command(cmd),
            OpenStep::ConsumerGone => consumer_gone(),
            OpenStep::Opened(Ok(Some(body))) => ControlFlow::Continue(Phase::Stream(body)),
            OpenStep::Opened(Ok(None)) => ControlFlow::Continue(Phase::Wait { grow: true }),
            OpenStep::Opened(Err(err)) => ControlFlow::Break(Termination::from(&err)),
        }
    }

    async fn stream_phase(
        &mut self,
        body: ByteStream,
        cmd_rx: &mut mpsc::Receiver<SseCommand>,
        event_tx: &mpsc::Sender<Event>,
    ) -> ControlFlow<Termination, Phase> {
        let parser = FrameParser::new(self.config.max_malformed_lines, self.continuation.clone());
        let mut events = EventStream::new(body, parser);

        let flow = loop {
            let step = tokio::select! {
                biased;

                cmd = cmd_rx.recv() => StreamStep::Command(cmd),
                () = event_tx.closed() => StreamStep::ConsumerGone,
                item = events.next() => StreamStep::Item(item),
            };

            match step {
                StreamStep::Command(cmd) => break on_command(cmd),
                StreamStep::ConsumerGone => break consumer_gone(),
                StreamStep::Item(Some(Ok(event))) => {
                    debug!(
                        event_type = %event.event_type(),
                        id = %event.last_event_id(),
                        "SSE event received",
                    );
                    if event_tx.send(event).await.is_err() {
                        break consumer_gone();
                    }
                }
                StreamStep::Item(Some(Err(EventStreamError::Transport(err)))) => {
                    warn!(error = %err, "SSE stream error");
                    break ControlFlow::Continue(Phase::Wait { grow: false });
                }
                StreamStep::Item(Some(Err(EventStreamError::Malformed(err)))) => {
                    warn!(error = %err, "SSE stream dropped");
                    break ControlFlow::Continue(Phase::Wait { grow: false });
                }
                StreamStep::Item(None) => {
                    warn!("SSE stream ended");
                    break ControlFlow::Continue(Phase::Wait { grow: false });
                }
            }
        };

        self.continuation = events.continuation().clone();
        if let Some(retry) = events.take_retry() {
            self.backoff.set_interval(retry);
            debug!(
                retry_ms = duration_millis(retry),
                interval_ms = duration_millis(self.backoff.interval()),
                "SSE retry interval updated"
            );
        }

        flow
    }

    async fn wait_phase(
        &mut self,
        grow: bool,
        cmd_rx: &mut mpsc::Receiver<SseCommand>,
        event_tx: &mpsc::Sender<Event>,
    ) -> ControlFlow<Termination, Phase> {
        let delay = self.backoff.delay();
        if grow {
            self.backoff.grow();
        }

        self.set_state(SessionState::Reconnecting {
            attempt: self.retry_count,
        });
        warn!(
            attempt = self.retry_count,
            delay_ms = duration_millis(delay),
            "SSE reconnecting after backoff"
        );

        let step = tokio::select! {
            biased;

            cmd = cmd_rx.recv() => WaitStep::Command(cmd),
            () = event_tx.closed() => WaitStep::ConsumerGone,
            () = tokio::time::sleep(delay) => WaitStep::Elapsed,
        };

        match step {
            WaitStep::Command(cmd) => on_command(cmd),
            WaitStep::ConsumerGone => consumer_gone(),
            WaitStep::Elapsed => ControlFlow::Continue(Phase::Open),
        }
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }

    fn terminate(&self, termination: Termination) {
        match &termination {
            Termination::Closed => info!("SSE session closed"),
            other => error!(reason = %other, "SSE session terminated"),
        }
        self.set_state(SessionState::Terminated(termination));
    }
}

fn on_command(cmd: Option<SseCommand>) -> ControlFlow<Termination, Phase> {
    match cmd {
        Some(SseCommand::Close) | None => {
            info!("SSE session closing (requested)");
            ControlFlow::Break(Termination::Closed)
        }
        Some(SseCommand::Reconnect { reason }) => {
            warn!(reason = %reason, "SSE reconnect requested");
            ControlFlow::Continue(Phase::Open)
        }
    }
}

fn consumer_gone() -> ControlFlow<Termination, Phase> {
    info!("SSE consumer dropped, shutting down");
    ControlFlow::Break(Termination::Closed)
}

fn duration_millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
