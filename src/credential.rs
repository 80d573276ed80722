use reqwest::header::HeaderValue;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::errors::AppError;

/// Per-request credential for the language model service.
///
/// Held only for the duration of one batch. `Debug` is redacted; use
/// [`ApiKey::fingerprint`] to correlate batches in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Validates a raw credential from a request body.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::BadRequest("api_key is required".to_string()));
        }
        // Must travel as an HTTP header value: visible ASCII only.
        if !trimmed.chars().all(|c| c.is_ascii_graphic()) || HeaderValue::from_str(trimmed).is_err()
        {
            return Err(AppError::BadRequest("api_key is malformed".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The secret itself. Only the HTTP client should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars of the key's SHA-256 digest.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(12);
        digest
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey([REDACTED] {})", self.fingerprint())
    }
}
