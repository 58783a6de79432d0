//! Tencent Cloud API credentials.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Credentials for Tencent Cloud speech services.
///
/// The secret key is wiped from memory when the credential is dropped and is
/// never printed by the `Debug` implementation.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TencentCredential {
    /// Numeric application id (`AppId`), kept in its textual form.
    pub app_id: String,
    /// API secret id (`SecretId`), sent in the clear with each request.
    pub secret_id: String,
    /// API secret key, used only as the HMAC key.
    pub secret_key: String,
}

impl TencentCredential {
    pub fn new(
        app_id: impl Into<String>,
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
        }
    }

    /// The `AppId` as the integer the TTS wire format expects.
    ///
    /// Returns `None` when the id is not a valid integer.
    pub fn app_id_number(&self) -> Option<i64> {
        self.app_id.trim().parse::<i64>().ok()
    }
}

impl std::fmt::Debug for TencentCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TencentCredential")
            .field("app_id", &self.app_id)
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
