//! Shared-secret API key authentication.

use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the client credential.
pub const API_KEY_HEADER: &str = "x-api-key";

type HmacSha256 = Hmac<Sha256>;

/// Compares presented keys against the configured one in constant time.
///
/// Both sides are reduced to an HMAC tag under a per-process salt and the
/// tags are compared with `verify_slice`.
#[derive(Clone)]
pub struct ApiKeyVerifier {
    salt: [u8; 16],
    expected: Vec<u8>,
}

impl ApiKeyVerifier {
    pub fn new(api_key: &str) -> Self {
        let salt = Uuid::new_v4().into_bytes();
        let expected = Self::mac(&salt, api_key)
            .map(|mac| mac.finalize().into_bytes().to_vec())
            .unwrap_or_default();
        Self { salt, expected }
    }

    fn mac(salt: &[u8], key: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(salt).ok()?;
        mac.update(key.as_bytes());
        Some(mac)
    }

    /// Check a presented key.
    pub fn verify(&self, candidate: &str) -> bool {
        match Self::mac(&self.salt, candidate) {
            Some(mac) => mac.verify_slice(&self.expected).is_ok(),
            None => false,
        }
    }
}

impl fmt::Debug for ApiKeyVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyVerifier").finish_non_exhaustive()
    }
}

/// Axum extractor proving the request carried a valid API key.
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

#[axum::async_trait]
impl FromRequestParts<AppState> for ApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing API key"))?;

        if !state.api_key.verify(presented) {
            warn!(uri = %parts.uri, "Rejected request with invalid API key");
            return Err(ApiError::unauthorized("Invalid API key"));
        }

        Ok(ApiKey)
    }
}
