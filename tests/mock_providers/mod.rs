//! Mock provider servers for integration tests
//!
//! - WebSocket (Tencent real-time ASR)

// Each test binary uses a different subset of the helpers
#![allow(dead_code)]

pub mod tencent_asr_mock;
