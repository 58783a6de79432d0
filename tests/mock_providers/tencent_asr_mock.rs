//! WebSocket mock server for the Tencent real-time ASR endpoint
//!
//! Accepts any signed URL, records it, acknowledges the handshake and then
//! answers audio according to the configured [`MockBehavior`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

use cloud_speech::core::stt::tencent::RecognitionResponse;

/// How the mock answers a connection.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Reply to every audio frame with a begin slice and an end slice
    /// `received N bytes`, and finish with a final frame on `{"type":"end"}`.
    Echo,
    /// Reject the handshake with a vendor error code.
    RejectHandshake { code: i64, message: String },
    /// Echo `chunks` audio frames, then report a service error.
    FailAfter { chunks: usize, code: i64, message: String },
    /// Acknowledge the handshake, then close without a final frame.
    DropAfterHandshake,
}

/// Running mock server.
pub struct TencentAsrMock {
    pub addr: SocketAddr,
    /// Request URIs (path and query) of every accepted connection.
    pub requests: Arc<Mutex<Vec<String>>>,
    /// Text frames received from clients.
    pub text_frames: Arc<Mutex<Vec<String>>>,
    /// Connections whose handler has finished.
    pub closed: Arc<AtomicUsize>,
}

impl TencentAsrMock {
    pub async fn start(behavior: MockBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let text_frames = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicUsize::new(0));

        let requests_ref = requests.clone();
        let text_ref = text_frames.clone();
        let closed_ref = closed.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let behavior = behavior.clone();
                let requests = requests_ref.clone();
                let text_frames = text_ref.clone();
                let closed = closed_ref.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, behavior, requests, text_frames).await;
                    closed.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            addr,
            requests,
            text_frames,
            closed,
        }
    }

    /// Base URL to configure the transport with.
    pub fn base_url(&self) -> String {
        format!("ws://{}/asr/v2", self.addr)
    }

    pub fn closed_connections(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn last_request_url(&self) -> Option<url::Url> {
        let uri = self.requests.lock().last().cloned()?;
        url::Url::parse(&format!("ws://{}{}", self.addr, uri)).ok()
    }
}

async fn handle_connection(
    stream: TcpStream,
    behavior: MockBehavior,
    requests: Arc<Mutex<Vec<String>>>,
    text_frames: Arc<Mutex<Vec<String>>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut voice_id = String::new();
    let ws_stream = accept_hdr_async(stream, |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let uri = request.uri().to_string();
        if let Some(query) = request.uri().query() {
            voice_id = url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "voice_id")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default();
        }
        requests.lock().push(uri);
        Ok(response)
    })
    .await?;
    let (mut write, mut read) = ws_stream.split();

    let send = |response: RecognitionResponse| {
        Message::Text(serde_json::to_string(&response).unwrap().into())
    };

    if let MockBehavior::RejectHandshake { code, message } = &behavior {
        write
            .send(send(RecognitionResponse::failure(&voice_id, *code, message.as_str())))
            .await?;
        write.send(Message::Close(None)).await?;
        return Ok(());
    }

    write.send(send(RecognitionResponse::handshake(&voice_id))).await?;

    if matches!(behavior, MockBehavior::DropAfterHandshake) {
        write.send(Message::Close(None)).await?;
        return Ok(());
    }

    let mut index = 0i64;
    while let Some(message) = read.next().await {
        match message? {
            Message::Binary(audio) => {
                if let MockBehavior::FailAfter {
                    chunks,
                    code,
                    message,
                } = &behavior
                {
                    if index as usize >= *chunks {
                        write
                            .send(send(RecognitionResponse::failure(&voice_id, *code, message.as_str())))
                            .await?;
                        break;
                    }
                }

                write
                    .send(send(RecognitionResponse::slice(&voice_id, index, 0, "")))
                    .await?;
                write
                    .send(send(RecognitionResponse::slice(
                        &voice_id,
                        index,
                        2,
                        format!("received {} bytes", audio.len()),
                    )))
                    .await?;
                index += 1;
            }
            Message::Text(text) => {
                text_frames.lock().push(text.as_str().to_string());
                if text.as_str().contains("\"end\"") {
                    write
                        .send(send(RecognitionResponse::completed(&voice_id)))
                        .await?;
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    let _ = write.send(Message::Close(None)).await;
    Ok(())
}
