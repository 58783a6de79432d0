//! Streaming recognition session lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  commands (mpsc, bounded)  ┌─────────────────┐
//! │  write()/stop() │──────────────────────────▶│ Transport Task  │
//! └─────────────────┘                            └────────┬────────┘
//!                                                         │ frames (mpsc)
//!                                                ┌────────▼────────┐
//!                                                │  Dispatch Task  │──▶ Listener
//!                                                └─────────────────┘
//! ```
//!
//! The session owns the command sender and the dispatch task. The state
//! (`Configured → Active → Failed? → Closed`) sits behind a mutex that the
//! dispatch task holds while it checks the state and invokes the listener,
//! so once `stop()` (or drop) has published `Closed` no further event can
//! reach the listener.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::base::{
    RecognitionEvent, RecognitionListener, RecognitionRequest, STTError, SessionState,
    VoiceFormat,
};
use super::tencent::messages::RecognitionResponse;
use crate::core::providers::tencent::TencentCredential;

// =============================================================================
// Transport boundary
// =============================================================================

/// Instruction sent from the session to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    /// Raw audio bytes to forward as-is.
    Audio(Bytes),
    /// No more audio will follow.
    End,
}

/// Inbound item produced by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFrame {
    Response(RecognitionResponse),
    /// The transport itself failed (socket error, idle timeout, ...).
    Error(STTError),
}

/// An open transport connection.
///
/// Contract: the transport closes `frames` once the service has finished
/// the stream, after it reports an error, or once `commands` is closed
/// without an `End` having been sent.
pub struct TransportChannel {
    /// Stream id acknowledged by the service.
    pub voice_id: String,
    pub commands: mpsc::Sender<TransportCommand>,
    pub frames: mpsc::Receiver<TransportFrame>,
    /// Background task driving the connection, if the transport has one.
    pub task: Option<JoinHandle<()>>,
}

/// Opens bidirectional recognition channels.
#[async_trait]
pub trait RecognitionTransport: Send + Sync {
    /// Establish the connection and complete the service handshake.
    async fn open(
        &self,
        credential: &TencentCredential,
        request: &RecognitionRequest,
    ) -> Result<TransportChannel, STTError>;

    /// Provider name used in logs.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Session
// =============================================================================

struct SessionShared {
    state: Mutex<SessionState>,
    stopping: AtomicBool,
}

/// One streaming recognition session.
///
/// Owned by the caller that created it. `start`, `write` and `stop` take
/// `&mut self`; events are delivered from a background task.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use cloud_speech::core::providers::tencent::TencentCredential;
/// use cloud_speech::core::stt::{
///     RecognitionEvent, RecognitionRequest, RecognitionSession, TencentAsrTransport, VoiceFormat,
/// };
///
/// # async fn run(audio: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
/// let credential = Arc::new(TencentCredential::new("1250000000", "secret-id", "secret-key"));
/// let mut session = RecognitionSession::new(
///     Arc::new(TencentAsrTransport::default()),
///     credential,
///     RecognitionRequest::new("16k_zh", VoiceFormat::Wav),
///     Arc::new(|event: RecognitionEvent| {
///         if let RecognitionEvent::SentenceEnd(result) = event {
///             println!("ASR result: {}", result.text);
///         }
///     }),
/// );
///
/// session.start().await?;
/// session.write(audio).await?;
/// session.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct RecognitionSession {
    transport: Arc<dyn RecognitionTransport>,
    credential: Arc<TencentCredential>,
    request: RecognitionRequest,
    listener: Arc<dyn RecognitionListener>,
    shared: Arc<SessionShared>,
    voice_id: Option<String>,
    commands: Option<mpsc::Sender<TransportCommand>>,
    dispatch_handle: Option<JoinHandle<()>>,
    transport_handle: Option<JoinHandle<()>>,
}

impl RecognitionSession {
    pub fn new(
        transport: Arc<dyn RecognitionTransport>,
        credential: Arc<TencentCredential>,
        request: RecognitionRequest,
        listener: Arc<dyn RecognitionListener>,
    ) -> Self {
        Self {
            transport,
            credential,
            request,
            listener,
            shared: Arc::new(SessionShared {
                state: Mutex::new(SessionState::Configured),
                stopping: AtomicBool::new(false),
            }),
            voice_id: None,
            commands: None,
            dispatch_handle: None,
            transport_handle: None,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    pub fn request(&self) -> &RecognitionRequest {
        &self.request
    }

    /// Stream id acknowledged by the service, once started.
    pub fn voice_id(&self) -> Option<&str> {
        self.voice_id.as_deref()
    }

    /// Change the audio format. Only allowed before `start()`.
    pub fn set_voice_format(&mut self, format: VoiceFormat) -> Result<(), STTError> {
        self.ensure_configured("set_voice_format")?;
        self.request.voice_format = format;
        Ok(())
    }

    /// Change the engine model. Only allowed before `start()`.
    pub fn set_engine_model(&mut self, engine_model_type: impl Into<String>) -> Result<(), STTError> {
        self.ensure_configured("set_engine_model")?;
        self.request.engine_model_type = engine_model_type.into();
        Ok(())
    }

    fn ensure_configured(&self, operation: &str) -> Result<(), STTError> {
        match self.state() {
            SessionState::Configured => Ok(()),
            state => Err(STTError::InvalidState(format!(
                "{operation} requires a configured session, current state is {state:?}"
            ))),
        }
    }

    /// Open the transport and begin delivering events.
    ///
    /// On failure the session stays `Configured` and `start()` may be called
    /// again. There is no automatic retry.
    pub async fn start(&mut self) -> Result<(), STTError> {
        self.ensure_configured("start")?;
        self.request.validate()?;

        let channel = match self.transport.open(&self.credential, &self.request).await {
            Ok(channel) => channel,
            Err(e) => {
                warn!(
                    "Failed to open {} recognition stream: {}",
                    self.transport.name(),
                    e
                );
                return Err(e);
            }
        };

        let TransportChannel {
            voice_id,
            commands,
            frames,
            task,
        } = channel;

        {
            let mut state = self.shared.state.lock();
            *state = SessionState::Active;
            self.listener.on_event(RecognitionEvent::SessionStarted {
                voice_id: voice_id.clone(),
            });
        }

        info!(
            "Recognition session {} started ({}, {}, {})",
            voice_id,
            self.transport.name(),
            self.request.engine_model_type,
            self.request.voice_format
        );

        self.voice_id = Some(voice_id);
        self.commands = Some(commands);
        self.transport_handle = task;
        self.dispatch_handle = Some(tokio::spawn(dispatch_events(
            frames,
            self.shared.clone(),
            self.listener.clone(),
        )));

        Ok(())
    }

    /// Stream a chunk of raw audio.
    ///
    /// Waits while the transport's queue is full. A transport that has gone
    /// away is reported as `ConnectionFailed`.
    pub async fn write(&mut self, chunk: impl Into<Bytes>) -> Result<(), STTError> {
        let state = self.state();
        if state != SessionState::Active {
            return Err(STTError::InvalidState(format!(
                "write requires an active session, current state is {state:?}"
            )));
        }

        let commands = self.commands.as_ref().ok_or_else(|| {
            STTError::InvalidState("session has no open transport".to_string())
        })?;

        let chunk = chunk.into();
        let len = chunk.len();
        commands
            .send(TransportCommand::Audio(chunk))
            .await
            .map_err(|_| {
                STTError::ConnectionFailed("recognition transport is closed".to_string())
            })?;

        debug!("Queued {} bytes of audio for recognition", len);
        Ok(())
    }

    /// Signal end of stream, drain pending events and release the transport.
    ///
    /// Calling `stop()` on a closed session does nothing.
    pub async fn stop(&mut self) -> Result<(), STTError> {
        {
            let mut state = self.shared.state.lock();
            match *state {
                SessionState::Closed => return Ok(()),
                SessionState::Configured => {
                    *state = SessionState::Closed;
                    return Ok(());
                }
                SessionState::Active | SessionState::Failed => {}
            }
        }

        self.shared.stopping.store(true, Ordering::Release);

        if let Some(commands) = self.commands.take() {
            if commands.send(TransportCommand::End).await.is_err() {
                debug!("Transport already closed before end of stream");
            }
        }

        if let Some(handle) = self.dispatch_handle.take() {
            if let Err(e) = handle.await {
                warn!("Recognition dispatch task ended abnormally: {}", e);
            }
        }

        if let Some(handle) = self.transport_handle.take() {
            if let Err(e) = handle.await {
                warn!("Recognition transport task ended abnormally: {}", e);
            }
        }

        *self.shared.state.lock() = SessionState::Closed;

        info!(
            "Recognition session {} closed",
            self.voice_id.as_deref().unwrap_or("-")
        );
        Ok(())
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        *self.shared.state.lock() = SessionState::Closed;
        // Dropping the sender without `End` tells the transport to shut down.
        self.commands.take();
        if let Some(handle) = self.dispatch_handle.take() {
            handle.abort();
        }
    }
}

/// Decode transport frames and hand them to the listener in arrival order.
async fn dispatch_events(
    mut frames: mpsc::Receiver<TransportFrame>,
    shared: Arc<SessionShared>,
    listener: Arc<dyn RecognitionListener>,
) {
    let mut completed = false;

    while let Some(frame) = frames.recv().await {
        let events = match frame {
            TransportFrame::Response(response) => response.into_events(),
            TransportFrame::Error(error) => vec![RecognitionEvent::Failed(error)],
        };

        completed |= events
            .iter()
            .any(|e| matches!(e, RecognitionEvent::RecognitionComplete));

        deliver(&shared, listener.as_ref(), events);
    }

    if !completed && !shared.stopping.load(Ordering::Acquire) {
        deliver(
            &shared,
            listener.as_ref(),
            vec![RecognitionEvent::Failed(STTError::ConnectionFailed(
                "transport closed before recognition completed".to_string(),
            ))],
        );
    }

    debug!("Recognition event dispatch finished");
}

fn deliver(shared: &SessionShared, listener: &dyn RecognitionListener, events: Vec<RecognitionEvent>) {
    let mut state = shared.state.lock();
    for event in events {
        if *state != SessionState::Active {
            debug!("Dropping {} event in {:?} state", event.kind(), *state);
            continue;
        }

        let failed = matches!(event, RecognitionEvent::Failed(_));
        if let RecognitionEvent::Failed(error) = &event {
            warn!("Recognition stream failed: {}", error);
        }
        listener.on_event(event);
        if failed {
            *state = SessionState::Failed;
        }
    }
}

/// Feed `audio` to the session in `chunk_size` pieces, sleeping `pace`
/// between chunks when given.
///
/// Returns the number of chunks written. The first write error is returned
/// unchanged.
pub async fn stream_audio(
    session: &mut RecognitionSession,
    audio: &[u8],
    chunk_size: usize,
    pace: Option<Duration>,
) -> Result<usize, STTError> {
    if chunk_size == 0 {
        return Err(STTError::ConfigurationError(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let mut written = 0;
    for chunk in audio.chunks(chunk_size) {
        if written > 0 {
            if let Some(delay) = pace {
                tokio::time::sleep(delay).await;
            }
        }
        session.write(Bytes::copy_from_slice(chunk)).await?;
        written += 1;
    }
    Ok(written)
}
