//! Credential and claims types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A signed bearer credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// The signed token string
    pub token: String,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// When the token expires
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Check whether the credential is within `buffer` of its expiry.
    ///
    /// A stale credential is still cryptographically valid but should no
    /// longer be handed out for new requests.
    pub fn is_stale(&self, buffer: chrono::Duration) -> bool {
        Utc::now() >= self.expires_at - buffer
    }
}

/// Claims carried by every signed token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Issuer: the application id
    pub iss: String,
    /// Subject: the application id
    pub sub: String,
    /// Audience: the API base URL
    pub aud: String,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Unique token id; guarantees forced refreshes produce distinct tokens
    pub jti: String,
}

/// Status of the cached credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// No credential has been generated yet
    NoToken,
    /// Cached credential is usable
    Valid,
    /// Cached credential is within the expiry buffer
    Stale,
}

/// Snapshot of the cached credential state
#[derive(Debug, Clone, Serialize)]
pub struct TokenInfo {
    pub status: TokenStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub application_id: String,
}
