//! Capture session orchestration for a single device connection.
//!
//! A `CaptureSession` ties one WebSocket telemetry feed to one [`LogWriter`].
//! It moves through `Connecting → Streaming → Closing → Closed`, and every way
//! out of streaming (operator signal, capture deadline, remote close,
//! connection error) is funneled through one [`ShutdownSignal`] so teardown
//! runs exactly once:
//! 1. send a close frame to the device,
//! 2. append whatever text messages are still in flight, for a bounded time,
//! 3. close the writer, which is always the last action.
//!
//! Logging
//! - INFO for lifecycle milestones
//! - DEBUG/TRACE for control traffic and individual frames

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use futures::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, error, info, trace, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::configuration::types::CaptureSettings;
use crate::error_handling::types::CaptureError;
use crate::storage::file_storage::session_file_name;

use super::log_writer::LogWriter;
use super::shutdown::{arm_deadline, ShutdownSignal};
use super::types::{CaptureSummary, SessionState, ShutdownReason, TelemetryEvent};

pub type DeviceStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct CaptureSession {
    /// Correlates log lines of one capture run.
    session_id: Uuid,
    /// Device address as given by the operator (`host[:port]`).
    address: String,
    writer: LogWriter,
    signal: Arc<ShutdownSignal>,
    state: Mutex<SessionState>,
    /// Set by the one teardown that is allowed to run.
    closing: AtomicBool,
    write_failures: AtomicU64,
    drain_timeout: Duration,
}

impl CaptureSession {
    /// Creates the session log for a run starting now.
    ///
    /// Fails before any network activity when the log file cannot be created.
    pub fn open(
        settings: &CaptureSettings,
        signal: Arc<ShutdownSignal>,
    ) -> Result<Self, CaptureError> {
        Self::open_at(settings, Local::now(), signal)
    }

    pub fn open_at(
        settings: &CaptureSettings,
        started: DateTime<Local>,
        signal: Arc<ShutdownSignal>,
    ) -> Result<Self, CaptureError> {
        let session_id = Uuid::new_v4();
        let filename = session_file_name(&settings.address, started);
        let writer = LogWriter::open(&settings.log_dir, &filename)?;

        debug!("[{}] CaptureSession created for {}", session_id, settings.address);
        Ok(Self {
            session_id,
            address: settings.address.clone(),
            writer,
            signal,
            state: Mutex::new(SessionState::Connecting),
            closing: AtomicBool::new(false),
            write_failures: AtomicU64::new(0),
            drain_timeout: settings.drain_timeout,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn writer(&self) -> &LogWriter {
        &self.writer
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("[{}] {:?} -> {:?}", self.session_id, *state, next);
        *state = next;
    }

    /// Opens the WebSocket feed at `ws://<address>`.
    pub async fn connect(&self, connect_timeout: Duration) -> Result<DeviceStream, CaptureError> {
        let url = format!("ws://{}", self.address);
        info!("[{}] Connecting to {}", self.session_id, url);

        let (stream, _response) = tokio::time::timeout(connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| CaptureError::ConnectionTimeout(connect_timeout))?
            .map_err(|e| CaptureError::ConnectionFailed(format!("{}: {}", url, e)))?;

        info!("[{}] Connected to WebSocket ({}) successfully", self.session_id, url);
        Ok(stream)
    }

    /// Sends the control message that makes the device start its feed.
    pub async fn start_feed<S>(&self, stream: &mut S) -> Result<(), CaptureError>
    where
        S: Sink<Message, Error = WsError> + Unpin,
    {
        let message = format!("init:[{}]", Utc::now().timestamp_millis());
        debug!("[{}] Sending {} to device", self.session_id, message);
        stream
            .send(Message::Text(message))
            .await
            .map_err(|e| CaptureError::Send(e.to_string()))
    }

    /// Appends one received message, stamped with the receipt time.
    ///
    /// A failed write is reported and counted; it never ends the stream.
    pub fn record(&self, text: String) {
        trace!("[{}] received {}", self.session_id, text);
        let event = TelemetryEvent::received_now(text);
        if let Err(e) = self.writer.append(&event) {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
            error!("[{}] Failed to write line to log file: {}", self.session_id, e);
        }
    }

    /// Streams messages into the log until a shutdown trigger fires, then
    /// tears the session down.
    pub async fn stream<S>(&self, mut stream: S) -> ShutdownReason
    where
        S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
    {
        self.set_state(SessionState::Streaming);

        let reason = loop {
            tokio::select! {
                biased;
                reason = self.signal.wait() => break reason,
                next = stream.next() => match next {
                    Some(Ok(message)) => self.handle_message(message),
                    Some(Err(e)) => {
                        error!("[{}] Failed to receive message from WebSocket: {}", self.session_id, e);
                        self.signal.trigger(ShutdownReason::ConnectionLost);
                    }
                    None => {
                        self.signal.trigger(ShutdownReason::RemoteClosed);
                    }
                },
            }
        };

        self.teardown(stream, reason).await;
        reason
    }

    fn handle_message(&self, message: Message) {
        match message {
            Message::Text(text) => self.record(text),
            Message::Binary(data) => {
                warn!(
                    "[{}] Ignoring binary frame of {} byte(s)",
                    self.session_id,
                    data.len()
                );
            }
            Message::Close(frame) => {
                info!("[{}] Device closed the connection: {:?}", self.session_id, frame);
                self.signal.trigger(ShutdownReason::RemoteClosed);
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                trace!("[{}] control frame", self.session_id);
            }
        }
    }

    async fn teardown<S>(&self, mut stream: S, reason: ShutdownReason)
    where
        S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
    {
        if self
            .closing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("[{}] Teardown already done", self.session_id);
            return;
        }

        self.set_state(SessionState::Closing);
        info!("[{}] Terminating ({})", self.session_id, reason);

        if reason != ShutdownReason::ConnectionLost {
            match tokio::time::timeout(self.drain_timeout, stream.close()).await {
                Ok(Ok(())) => debug!("[{}] Close frame sent", self.session_id),
                Ok(Err(e)) => debug!("[{}] Disconnect: {}", self.session_id, e),
                Err(_) => warn!("[{}] Timed out sending close frame", self.session_id),
            }

            let drain = async {
                while let Some(Ok(message)) = stream.next().await {
                    if let Message::Text(text) = message {
                        self.record(text);
                    }
                }
            };
            if tokio::time::timeout(self.drain_timeout, drain).await.is_err() {
                warn!("[{}] Gave up draining in-flight messages", self.session_id);
            }
        }
        drop(stream);

        self.close_writer();
    }

    /// Ends a session that never reached streaming.
    pub fn abort(&self) {
        if self
            .closing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.close_writer();
        }
    }

    fn close_writer(&self) {
        if let Err(e) = self.writer.close() {
            error!("[{}] Failed to finish writing to log file: {}", self.session_id, e);
        }
        self.set_state(SessionState::Closed);
    }

    pub fn summary(&self, reason: ShutdownReason) -> CaptureSummary {
        CaptureSummary {
            path: self.writer.path().to_path_buf(),
            events_written: self.writer.lines_written(),
            write_failures: self.write_failures(),
            reason,
        }
    }
}

/// Runs one complete capture: log file, connection, stream, teardown.
///
/// The caller owns `signal` and may publish operator signals to it; the
/// capture-duration deadline from `settings` is armed here.
pub async fn run_capture(
    settings: &CaptureSettings,
    signal: Arc<ShutdownSignal>,
) -> Result<CaptureSummary, CaptureError> {
    let session = CaptureSession::open(settings, signal)?;
    run_session(&session, settings).await
}

pub async fn run_session(
    session: &CaptureSession,
    settings: &CaptureSettings,
) -> Result<CaptureSummary, CaptureError> {
    let mut stream = match session.connect(settings.connect_timeout).await {
        Ok(stream) => stream,
        Err(e) => {
            session.abort();
            return Err(e);
        }
    };

    if let Err(e) = session.start_feed(&mut stream).await {
        session.abort();
        return Err(e);
    }

    let deadline = arm_deadline(&session.signal, settings.duration);
    let reason = session.stream(stream).await;
    if let Some(timer) = deadline {
        timer.abort();
    }

    let summary = session.summary(reason);
    info!(
        "[{}] Capture finished: {} event(s) written to {}, {} write failure(s)",
        session.session_id(),
        summary.events_written,
        summary.path.display(),
        summary.write_failures
    );
    Ok(summary)
}
