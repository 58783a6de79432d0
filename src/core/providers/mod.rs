//! Cloud provider plumbing shared between STT and TTS implementations.

pub mod tencent;
