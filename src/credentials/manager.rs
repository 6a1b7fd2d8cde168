//! Credential manager
//!
//! Produces a valid bearer credential on demand, signing only when the cached
//! one is missing or within the expiry buffer. Regeneration is synchronous and
//! idempotent: concurrent callers racing past the buffer check may each sign a
//! token, which is benign (claims are deterministic modulo timestamp and jti,
//! and the cache slot is last-writer-wins).

use super::types::{Claims, Credential, TokenInfo, TokenStatus};
use crate::config::{ApiConfig, CredentialConfig};
use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Manages signing and caching of bearer credentials
pub struct CredentialManager {
    application_id: String,
    audience: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_lifetime: chrono::Duration,
    expiry_buffer: chrono::Duration,
    // Single shared cache slot; see module docs for the regeneration race.
    cached: RwLock<Option<Credential>>,
}

impl CredentialManager {
    /// Create a new credential manager.
    ///
    /// Both PEM halves are parsed here; a key that cannot be loaded is fatal
    /// and no credential can ever be produced from this instance.
    pub fn new(api: &ApiConfig, config: CredentialConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key_pem.as_bytes())
            .map_err(|e| Error::key_unavailable(format!("invalid private key: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key_pem.as_bytes())
            .map_err(|e| Error::key_unavailable(format!("invalid public key: {e}")))?;

        let token_lifetime = chrono::Duration::from_std(config.token_lifetime)
            .map_err(|e| Error::config(format!("token lifetime out of range: {e}")))?;
        let expiry_buffer = chrono::Duration::from_std(config.expiry_buffer)
            .map_err(|e| Error::config(format!("expiry buffer out of range: {e}")))?;

        debug!(
            application_id = %api.application_id,
            "credential manager initialized"
        );

        Ok(Self {
            application_id: api.application_id.clone(),
            audience: api.base_url.clone(),
            encoding_key,
            decoding_key,
            token_lifetime,
            expiry_buffer,
            cached: RwLock::new(None),
        })
    }

    /// Return a valid credential, signing a new one only when necessary.
    ///
    /// With `force_refresh` false, a cached credential whose expiry is more
    /// than the configured buffer away is returned unchanged.
    pub fn generate(&self, force_refresh: bool) -> Result<Credential> {
        if !force_refresh {
            let cached = self.read_cache();
            if let Some(credential) = cached {
                if !credential.is_stale(self.expiry_buffer) {
                    debug!("returning cached credential");
                    return Ok(credential);
                }
            }
        }

        let credential = self.sign_new()?;

        let mut slot = self.cached.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(credential.clone());
        debug!(expires_at = %credential.expires_at, "new credential signed");

        Ok(credential)
    }

    /// Verify a token's signature, expiry, and audience, returning its claims.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::token_malformed(e.to_string()),
            }
        })?;

        Ok(data.claims)
    }

    /// Build the `Authorization: Bearer <token>` header map.
    pub fn authorization_header(&self) -> Result<HashMap<String, String>> {
        let credential = self.generate(false)?;
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", credential.token),
        );
        Ok(headers)
    }

    /// Snapshot of the cached credential state
    pub fn token_info(&self) -> TokenInfo {
        let cached = self.read_cache();
        let (status, expires_at) = match cached {
            None => (TokenStatus::NoToken, None),
            Some(credential) => {
                let status = if credential.is_stale(self.expiry_buffer) {
                    TokenStatus::Stale
                } else {
                    TokenStatus::Valid
                };
                (status, Some(credential.expires_at))
            }
        };
        TokenInfo {
            status,
            expires_at,
            application_id: self.application_id.clone(),
        }
    }

    fn read_cache(&self) -> Option<Credential> {
        self.cached
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn sign_new(&self) -> Result<Credential> {
        let now = Utc::now();
        let expires_at = now + self.token_lifetime;

        let claims = Claims {
            iss: self.application_id.clone(),
            sub: self.application_id.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::RS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| Error::signing_failed(e.to_string()))?;

        Ok(Credential {
            token,
            issued_at: truncate_to_seconds(now),
            expires_at: truncate_to_seconds(expires_at),
        })
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("application_id", &self.application_id)
            .field("audience", &self.audience)
            .field("token_lifetime", &self.token_lifetime)
            .finish_non_exhaustive()
    }
}

// Claims carry whole-second timestamps; keep the cached credential consistent
// with what was actually signed.
fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(ts.timestamp(), 0).single().unwrap_or(ts)
}
