//! Integration tests for the Tencent TTS provider
//!
//! A wiremock server stands in for the streaming TTS endpoint. These tests
//! verify:
//! - The signed request (headers, body, signature)
//! - Decoding a PCM body into a WAV file
//! - Error bodies delivered with a successful status

use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cloud_speech::core::audio::read_wav_file;
use cloud_speech::core::providers::tencent::{ParamValue, RequestParameters, Signer, TencentCredential};
use cloud_speech::core::tts::{TTSError, TencentTTS, TencentTTSConfig};

const SECRET_KEY: &str = "integration-secret";

fn credential() -> Arc<TencentCredential> {
    Arc::new(TencentCredential::new("1250000000", "AKIDintegration", SECRET_KEY))
}

fn provider(server: &MockServer) -> TencentTTS {
    let config = TencentTTSConfig::default().with_url(format!("{}/stream", server.uri()));
    TencentTTS::new(credential(), config).expect("provider should build")
}

fn pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

async fn mount(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/stream"))
        .and(header("content-type", "application/json"))
        .and(header_exists("authorization"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_synthesize_to_file_writes_wav() {
    let server = MockServer::start().await;
    let samples: Vec<i16> = (0..1600).map(|i| ((i * 20) % 2000 - 1000) as i16).collect();
    mount(&server, ResponseTemplate::new(200).set_body_bytes(pcm(&samples))).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("tencent_tts.wav");

    let frames = provider(&server)
        .synthesize_to_file("Hello World!", &output)
        .await
        .unwrap();
    assert_eq!(frames, samples.len());

    let decoded = read_wav_file(&output).unwrap();
    assert_eq!(decoded.samples, samples);
    assert_eq!(decoded.sample_rate, 16000);
    assert_eq!(decoded.channels, 1);
    assert_eq!(decoded.duration_ms(), 100);
}

#[tokio::test]
async fn test_request_is_signed_over_body() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(200).set_body_bytes(pcm(&[0, 1]))).await;

    provider(&server).synthesize("Hello World!").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let body: Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body["Action"], "TextToStreamAudio");
    assert_eq!(body["AppId"], 1250000000);
    assert_eq!(body["SecretId"], "AKIDintegration");
    assert_eq!(body["Text"], "Hello World!");
    assert_eq!(
        body["Expired"].as_i64().unwrap() - body["Timestamp"].as_i64().unwrap(),
        3600
    );

    // Rebuild the canonical string from what actually went over the wire.
    let params: RequestParameters = body
        .as_object()
        .unwrap()
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => ParamValue::Str(text.clone()),
                Value::Number(number) => ParamValue::Int(number.as_i64().unwrap()),
                other => panic!("unexpected body value {other}"),
            };
            (key.clone(), value)
        })
        .collect();

    let target = format!(
        "{}/stream",
        server.uri().trim_start_matches("http://")
    );
    let expected = Signer::new(SECRET_KEY).sign("POST", &target, &params);
    let authorization = request
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(authorization, expected.as_str());
}

#[tokio::test]
async fn test_structured_error_body_is_service_error() {
    let server = MockServer::start().await;
    let body = r#"{"Response":{"Error":{"Code":"AuthFailure.SignatureFailure","Message":"signature mismatch"},"RequestId":"r-1"}}"#;
    mount(&server, ResponseTemplate::new(200).set_body_string(body)).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("never.wav");
    let result = provider(&server).synthesize_to_file("hi", &output).await;

    assert_eq!(
        result,
        Err(TTSError::ServiceError {
            code: "AuthFailure.SignatureFailure".to_string(),
            message: "signature mismatch".to_string(),
        })
    );
    assert!(!output.exists());
}

#[tokio::test]
async fn test_error_marker_is_service_error() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_string("Error: request quota exhausted"),
    )
    .await;

    let result = provider(&server).synthesize("hi").await;
    assert!(matches!(result, Err(TTSError::ServiceError { .. })));
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(503).set_body_string("unavailable")).await;

    let result = provider(&server).synthesize("hi").await;
    assert_eq!(
        result,
        Err(TTSError::ServiceError {
            code: "503".to_string(),
            message: "unavailable".to_string(),
        })
    );
}

#[tokio::test]
async fn test_odd_length_body_is_malformed() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3])).await;

    let result = provider(&server).synthesize("hi").await;
    assert!(matches!(result, Err(TTSError::MalformedPayload(_))));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_connection_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = TencentTTSConfig::default().with_url(format!("http://127.0.0.1:{port}/stream"));
    let tts = TencentTTS::new(credential(), config).unwrap();

    let result = tts.synthesize("hi").await;
    assert!(matches!(result, Err(TTSError::ConnectionFailed(_))));
}

#[tokio::test]
async fn test_unwritable_output_is_audio_error() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(200).set_body_bytes(pcm(&[0, 1, 2]))).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("missing").join("out.wav");
    let result = provider(&server).synthesize_to_file("hi", &output).await;

    assert!(matches!(result, Err(TTSError::AudioEncoding(_))));
    assert!(!output.exists());
}
