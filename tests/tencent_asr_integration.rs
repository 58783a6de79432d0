//! Integration tests for the Tencent real-time ASR transport
//!
//! A local WebSocket server speaks the recognition protocol. These tests
//! verify:
//! - Signed connection URLs
//! - Handshake acceptance and rejection
//! - Event ordering for a full WAV file
//! - Mid-stream failures and dropped connections

mod mock_providers;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use cloud_speech::core::audio::AudioSampleBuffer;
use cloud_speech::core::providers::tencent::{RequestParameters, Signer, TencentCredential};
use cloud_speech::core::stt::{
    RecognitionEvent, RecognitionListener, RecognitionRequest, RecognitionSession, STTError,
    SessionState, TencentAsrConfig, TencentAsrTransport, VoiceFormat, stream_audio,
};

use mock_providers::tencent_asr_mock::{MockBehavior, TencentAsrMock};

const APP_ID: &str = "1250000000";
const SECRET_KEY: &str = "asr-secret";

type Events = Arc<Mutex<Vec<RecognitionEvent>>>;

fn session_for(mock: &TencentAsrMock, format: VoiceFormat) -> (RecognitionSession, Events) {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let listener: Arc<dyn RecognitionListener> =
        Arc::new(move |event: RecognitionEvent| sink.lock().push(event));

    let transport = TencentAsrTransport::new(
        TencentAsrConfig::default().with_base_url(mock.base_url()),
    );
    let session = RecognitionSession::new(
        Arc::new(transport),
        Arc::new(TencentCredential::new(APP_ID, "AKIDasr", SECRET_KEY)),
        RecognitionRequest::new("16k_zh", format),
        listener,
    );
    (session, events)
}

fn wav_bytes() -> Vec<u8> {
    let samples = (0..8000).map(|i| ((i % 200) * 100 - 10000) as i16).collect();
    AudioSampleBuffer::new(samples, 1, 16000)
        .to_wav_bytes()
        .unwrap()
}

async fn wait_for_state(session: &RecognitionSession, state: SessionState) {
    for _ in 0..200 {
        if session.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session never reached {state:?}, stuck in {:?}", session.state());
}

#[tokio::test]
async fn test_wav_file_yields_sentence_end_before_completion() {
    let mock = TencentAsrMock::start(MockBehavior::Echo).await;
    let (mut session, events) = session_for(&mock, VoiceFormat::Wav);
    let audio = wav_bytes();
    let audio_len = audio.len();

    session.start().await.unwrap();
    assert_eq!(session.state(), SessionState::Active);
    session.write(audio).await.unwrap();
    session.stop().await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);

    let events = events.lock();
    assert!(matches!(events.first(), Some(RecognitionEvent::SessionStarted { .. })));

    let end = events
        .iter()
        .position(|e| matches!(e, RecognitionEvent::SentenceEnd(_)))
        .expect("sentence end delivered");
    let complete = events
        .iter()
        .position(|e| matches!(e, RecognitionEvent::RecognitionComplete))
        .expect("completion delivered");
    assert!(end < complete);
    assert_eq!(
        events[end].text(),
        Some(format!("received {audio_len} bytes").as_str())
    );
    assert!(!events.iter().any(|e| matches!(e, RecognitionEvent::Failed(_))));

    assert_eq!(mock.text_frames.lock().as_slice(), [r#"{"type":"end"}"#]);
}

#[tokio::test]
async fn test_connection_url_is_signed() {
    let mock = TencentAsrMock::start(MockBehavior::Echo).await;
    let (mut session, _events) = session_for(&mock, VoiceFormat::Wav);

    session.start().await.unwrap();
    session.stop().await.unwrap();

    let url = mock.last_request_url().expect("request recorded");
    assert_eq!(url.path(), format!("/asr/v2/{APP_ID}"));

    let mut signature = None;
    let params: RequestParameters = url
        .query_pairs()
        .filter_map(|(key, value)| {
            if key == "signature" {
                signature = Some(value.into_owned());
                None
            } else {
                Some((key.into_owned(), value.into_owned()))
            }
        })
        .collect();

    assert_eq!(params.get("secretid").unwrap().to_string(), "AKIDasr");
    assert_eq!(params.get("voice_format").unwrap().to_string(), "12");
    assert_eq!(params.get("engine_model_type").unwrap().to_string(), "16k_zh");
    assert_eq!(
        params.get("voice_id").unwrap().to_string(),
        session.voice_id().unwrap()
    );

    let target = format!("{}/asr/v2/{APP_ID}", mock.addr);
    let expected = Signer::new(SECRET_KEY).sign("", &target, &params);
    assert_eq!(signature.as_deref(), Some(expected.as_str()));
}

#[tokio::test]
async fn test_chunked_stream_keeps_order() {
    let mock = TencentAsrMock::start(MockBehavior::Echo).await;
    let (mut session, events) = session_for(&mock, VoiceFormat::Pcm);

    session.start().await.unwrap();
    let chunks = stream_audio(&mut session, &[0u8; 3200], 1280, Some(Duration::from_millis(5)))
        .await
        .unwrap();
    assert_eq!(chunks, 3);
    session.stop().await.unwrap();

    let texts: Vec<String> = events
        .lock()
        .iter()
        .filter_map(|e| match e {
            RecognitionEvent::SentenceEnd(result) => Some(result.text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        texts,
        vec!["received 1280 bytes", "received 1280 bytes", "received 640 bytes"]
    );
}

#[tokio::test]
async fn test_rejected_handshake_keeps_session_configured() {
    let mock = TencentAsrMock::start(MockBehavior::RejectHandshake {
        code: 4002,
        message: "authentication failed".to_string(),
    })
    .await;
    let (mut session, events) = session_for(&mock, VoiceFormat::Wav);

    let result = session.start().await;
    match result {
        Err(STTError::ConnectionFailed(message)) => {
            assert!(message.contains("authentication failed"));
        }
        other => panic!("expected ConnectionFailed, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Configured);
    assert!(events.lock().is_empty());
    assert!(matches!(
        session.write(vec![0u8; 2]).await,
        Err(STTError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_service_error_mid_stream() {
    let mock = TencentAsrMock::start(MockBehavior::FailAfter {
        chunks: 1,
        code: 4008,
        message: "client idle too long".to_string(),
    })
    .await;
    let (mut session, events) = session_for(&mock, VoiceFormat::Pcm);

    session.start().await.unwrap();
    session.write(vec![0u8; 640]).await.unwrap();
    session.write(vec![0u8; 640]).await.unwrap();
    wait_for_state(&session, SessionState::Failed).await;

    assert!(matches!(
        session.write(vec![0u8; 640]).await,
        Err(STTError::InvalidState(_))
    ));
    session.stop().await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);

    let events = events.lock();
    let failed = events
        .iter()
        .position(|e| matches!(e, RecognitionEvent::Failed(_)))
        .unwrap();
    assert!(matches!(
        &events[failed],
        RecognitionEvent::Failed(STTError::ServiceError { code: 4008, .. })
    ));
    assert_eq!(failed, events.len() - 1);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, RecognitionEvent::SentenceEnd(_)))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_dropped_connection_reports_failure() {
    let mock = TencentAsrMock::start(MockBehavior::DropAfterHandshake).await;
    let (mut session, events) = session_for(&mock, VoiceFormat::Pcm);

    session.start().await.unwrap();
    wait_for_state(&session, SessionState::Failed).await;
    session.stop().await.unwrap();

    let events = events.lock();
    assert!(matches!(
        events.last(),
        Some(RecognitionEvent::Failed(STTError::ConnectionFailed(_)))
    ));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let transport = TencentAsrTransport::new(
        TencentAsrConfig::default().with_base_url(format!("ws://127.0.0.1:{port}/asr/v2")),
    );
    let mut session = RecognitionSession::new(
        Arc::new(transport),
        Arc::new(TencentCredential::new(APP_ID, "AKIDasr", SECRET_KEY)),
        RecognitionRequest::new("16k_zh", VoiceFormat::Wav),
        Arc::new(|_event: RecognitionEvent| {}),
    );

    assert!(matches!(
        session.start().await,
        Err(STTError::ConnectionFailed(_))
    ));
    assert_eq!(session.state(), SessionState::Configured);
}

#[tokio::test]
async fn test_dropping_session_closes_connection_and_stops_events() {
    let mock = TencentAsrMock::start(MockBehavior::Echo).await;
    let (mut session, events) = session_for(&mock, VoiceFormat::Pcm);

    session.start().await.unwrap();
    session.write(vec![0u8; 640]).await.unwrap();

    for _ in 0..200 {
        if events
            .lock()
            .iter()
            .any(|e| matches!(e, RecognitionEvent::SentenceEnd(_)))
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let before = events.lock().len();
    assert_eq!(before, 3);

    drop(session);

    for _ in 0..200 {
        if mock.closed_connections() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(mock.closed_connections(), 1);

    // Give any stray frame time to arrive before checking nothing was delivered.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(events.lock().len(), before);
    assert!(mock.text_frames.lock().is_empty());
}
