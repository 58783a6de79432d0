//! Tencent real-time ASR WebSocket transport.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌───────────────────┐     ┌─────────────────┐
//! │ session.write()  │────▶│ commands (mpsc)   │────▶│  WebSocket Task │
//! └──────────────────┘     └───────────────────┘     └────────┬────────┘
//!                                                            │
//!                          ┌───────────────────┐             │
//!                          │ frames (mpsc)     │◀────────────┘
//!                          └────────┬──────────┘
//!                                   ▼
//!                           session dispatch task
//! ```
//!
//! # Tencent-Specific Details
//!
//! - Credentials travel as a signed query string; there is no token exchange
//! - The first server frame acknowledges the handshake; a non-zero `code` rejects it
//! - Audio is sent as binary frames, end of stream as `{"type":"end"}`
//! - The server closes the stream after a frame with `final: 1`

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use super::config::TencentAsrConfig;
use super::messages::{EndMessage, RecognitionResponse};
use crate::core::providers::tencent::TencentCredential;
use crate::core::stt::base::{RecognitionRequest, STTError};
use crate::core::stt::session::{
    RecognitionTransport, TransportChannel, TransportCommand, TransportFrame,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Capacity of the inbound frame queue.
const FRAME_BUFFER: usize = 256;

/// Opens signed WebSocket connections to the Tencent real-time ASR service.
#[derive(Debug, Clone, Default)]
pub struct TencentAsrTransport {
    config: TencentAsrConfig,
}

impl TencentAsrTransport {
    pub fn new(config: TencentAsrConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TencentAsrConfig {
        &self.config
    }

    async fn connect(&self, url: &str) -> Result<WsStream, STTError> {
        let connect_timeout = self.config.connect_timeout;
        let result = timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                STTError::ConnectionFailed(format!(
                    "Connection to Tencent ASR timed out after {} seconds",
                    connect_timeout.as_secs()
                ))
            })?;

        let (stream, _response) = result.map_err(|e| {
            STTError::ConnectionFailed(format!("Failed to connect to Tencent ASR: {e}"))
        })?;
        Ok(stream)
    }

    /// Wait for the handshake frame and check its status.
    async fn handshake(&self, source: &mut WsSource) -> Result<RecognitionResponse, STTError> {
        let wait = async {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        return RecognitionResponse::parse(&text).map_err(|e| {
                            STTError::ConnectionFailed(format!(
                                "Malformed handshake from Tencent ASR: {e}"
                            ))
                        });
                    }
                    Ok(Message::Close(frame)) => {
                        return Err(STTError::ConnectionFailed(format!(
                            "Tencent ASR closed the connection during handshake: {frame:?}"
                        )));
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        return Err(STTError::ConnectionFailed(format!(
                            "WebSocket error during handshake: {e}"
                        )));
                    }
                }
            }
            Err(STTError::ConnectionFailed(
                "Tencent ASR closed the connection before the handshake".to_string(),
            ))
        };

        let response = timeout(self.config.handshake_timeout, wait)
            .await
            .map_err(|_| {
                STTError::ConnectionFailed("Did not receive handshake from Tencent ASR".to_string())
            })??;

        if !response.is_success() {
            return Err(STTError::ConnectionFailed(format!(
                "Tencent ASR rejected the session ({}): {}",
                response.code, response.message
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl RecognitionTransport for TencentAsrTransport {
    async fn open(
        &self,
        credential: &TencentCredential,
        request: &RecognitionRequest,
    ) -> Result<TransportChannel, STTError> {
        let url = self
            .config
            .build_url(credential, request, SystemTime::now(), rand_nonce())?;

        debug!("Connecting to Tencent ASR for voice_id {}", request.voice_id);
        let stream = self.connect(&url).await?;
        let (sink, mut source) = stream.split();

        let ack = self.handshake(&mut source).await?;
        let voice_id = if ack.voice_id.is_empty() {
            request.voice_id.clone()
        } else {
            ack.voice_id
        };
        info!("Connected to Tencent ASR, voice_id {}", voice_id);

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer.max(1));
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let task = tokio::spawn(run_connection(
            sink,
            source,
            command_rx,
            frame_tx,
            self.config.message_timeout,
        ));

        Ok(TransportChannel {
            voice_id,
            commands: command_tx,
            frames: frame_rx,
            task: Some(task),
        })
    }

    fn name(&self) -> &'static str {
        "tencent"
    }
}

/// Drive one connection until the service finishes, fails or the session
/// goes away.
async fn run_connection(
    mut sink: WsSink,
    mut source: WsSource,
    mut commands: mpsc::Receiver<TransportCommand>,
    frames: mpsc::Sender<TransportFrame>,
    message_timeout: Duration,
) {
    let mut ended = false;

    loop {
        tokio::select! {
            biased;

            command = commands.recv(), if !ended => {
                match command {
                    Some(TransportCommand::Audio(data)) => {
                        if let Err(e) = sink.send(Message::Binary(data)).await {
                            let stt_error = STTError::NetworkError(format!(
                                "Failed to send audio to Tencent ASR: {e}"
                            ));
                            error!("{}", stt_error);
                            let _ = frames.send(TransportFrame::Error(stt_error)).await;
                            break;
                        }
                    }
                    Some(TransportCommand::End) => {
                        ended = true;
                        let end = EndMessage::new().to_json();
                        if let Err(e) = sink.send(Message::Text(end.into())).await {
                            let stt_error = STTError::NetworkError(format!(
                                "Failed to send end of stream to Tencent ASR: {e}"
                            ));
                            error!("{}", stt_error);
                            let _ = frames.send(TransportFrame::Error(stt_error)).await;
                            break;
                        }
                        debug!("Sent end of stream to Tencent ASR");
                    }
                    None => {
                        debug!("Recognition session released the transport");
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            message = timeout(message_timeout, source.next()) => {
                match message {
                    Ok(Some(Ok(Message::Text(text)))) => {
                        match RecognitionResponse::parse(&text) {
                            Ok(response) => {
                                let done = response.is_final() || !response.is_success();
                                if frames.send(TransportFrame::Response(response)).await.is_err() {
                                    break;
                                }
                                if done {
                                    let _ = sink.send(Message::Close(None)).await;
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Ignoring unparseable Tencent ASR frame: {}", e);
                            }
                        }
                    }
                    Ok(Some(Ok(Message::Close(frame)))) => {
                        info!("Tencent ASR closed the connection: {:?}", frame);
                        break;
                    }
                    Ok(Some(Ok(_))) => {}
                    Ok(Some(Err(e))) => {
                        let stt_error = STTError::NetworkError(format!("WebSocket error: {e}"));
                        error!("{}", stt_error);
                        let _ = frames.send(TransportFrame::Error(stt_error)).await;
                        break;
                    }
                    Ok(None) => {
                        info!("Tencent ASR WebSocket stream ended");
                        break;
                    }
                    Err(_elapsed) => {
                        let stt_error = STTError::NetworkError(format!(
                            "WebSocket idle timeout - no message for {} seconds",
                            message_timeout.as_secs()
                        ));
                        error!("Tencent ASR idle timeout: {}", stt_error);
                        let _ = frames.send(TransportFrame::Error(stt_error)).await;
                        break;
                    }
                }
            }
        }
    }

    info!("Tencent ASR WebSocket connection closed");
}

/// Random nonce for the signed URL.
fn rand_nonce() -> u32 {
    let bytes = *uuid::Uuid::new_v4().as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) % 1_000_000_000
}
