//! Tencent Cloud shared pieces: credentials and request signing.
//!
//! Both the streaming recognition transport and the TTS provider sign their
//! requests with [`Signer`].

pub mod auth;
mod credential;

pub use auth::{
    ParamValue, RequestParameters, Signature, Signer, canonical_string, signing_target,
};
pub use credential::TencentCredential;
