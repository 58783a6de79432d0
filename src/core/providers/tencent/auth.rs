//! Request signing for Tencent Cloud speech APIs.
//!
//! Both speech endpoints authenticate a request with an HMAC-SHA1 digest over
//! a canonical string built from the request parameters:
//!
//! ```text
//! METHOD + host/path + "?" + k1=v1&k2=v2&...   (keys in ascending byte order)
//! ```
//!
//! The digest is base64 encoded. The TTS endpoint expects it verbatim in the
//! `Authorization` header; the ASR endpoint signs with an empty method and
//! expects the URL-encoded signature as the last query parameter.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::{Serialize, Serializer};
use sha1::Sha1;
use url::form_urlencoded;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha1 = Hmac<Sha1>;

// =============================================================================
// Parameter values
// =============================================================================

/// A scalar request parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    /// Rendered as Unix seconds, both in the canonical string and in JSON.
    Timestamp(SystemTime),
}

impl ParamValue {
    /// Seconds since the Unix epoch for a timestamp value.
    fn unix_seconds(time: &SystemTime) -> i64 {
        match time.duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs() as i64,
            Err(before) => -(before.duration().as_secs() as i64),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(value) => f.write_str(value),
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Timestamp(time) => write!(f, "{}", Self::unix_seconds(time)),
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Str(value) => serializer.serialize_str(value),
            ParamValue::Int(value) => serializer.serialize_i64(*value),
            ParamValue::Timestamp(time) => serializer.serialize_i64(Self::unix_seconds(time)),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<SystemTime> for ParamValue {
    fn from(value: SystemTime) -> Self {
        ParamValue::Timestamp(value)
    }
}

// =============================================================================
// Request parameters
// =============================================================================

/// Request parameters keyed by name.
///
/// Iteration always follows ascending byte order of the keys, whatever the
/// insertion order was, which is the order the canonical string requires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequestParameters {
    entries: BTreeMap<String, ParamValue>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in canonical (sorted) key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `k1=v1&k2=v2` with raw values, as used in the canonical string.
    pub fn to_canonical_query(&self) -> String {
        let mut query = String::new();
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                query.push('&');
            }
            query.push_str(key);
            query.push('=');
            query.push_str(&value.to_string());
        }
        query
    }

    /// Percent-encoded query string in canonical key order.
    pub fn to_url_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.iter() {
            serializer.append_pair(key, &value.to_string());
        }
        serializer.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParameters
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RequestParameters::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

// =============================================================================
// Signature
// =============================================================================

/// Base64 encoded HMAC-SHA1 digest of a canonical request string.
///
/// A signature is bound to one request attempt: the parameters it covers
/// carry a timestamp and an expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form for use as a query parameter value.
    pub fn url_encoded(&self) -> String {
        form_urlencoded::byte_serialize(self.0.as_bytes()).collect()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Signer
// =============================================================================

/// Build the canonical string `METHOD + url + "?" + sorted k=v pairs`.
///
/// An empty parameter set yields `METHOD + url + "?"`.
pub fn canonical_string(method: &str, url: &str, params: &RequestParameters) -> String {
    let mut canonical = String::with_capacity(method.len() + url.len() + 1 + params.len() * 16);
    canonical.push_str(method);
    canonical.push_str(url);
    canonical.push('?');
    canonical.push_str(&params.to_canonical_query());
    canonical
}

/// The `host[:port]/path` portion of an endpoint URL, which is what the
/// canonical string covers. Default ports are omitted.
pub fn signing_target(url: &url::Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}{}", url.path()),
        None => format!("{host}{}", url.path()),
    })
}

/// Signs canonical request strings with a secret key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Signer {
    secret_key: String,
}

impl Signer {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
        }
    }

    /// Sign a request given its method, target (`host/path`, no scheme) and
    /// parameters.
    pub fn sign(&self, method: &str, url: &str, params: &RequestParameters) -> Signature {
        self.sign_canonical(&canonical_string(method, url, params))
    }

    /// Sign an already canonicalized string.
    pub fn sign_canonical(&self, canonical: &str) -> Signature {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(canonical.as_bytes());
        Signature(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
