//! Authorization flow operations

use crate::api::{ApplicationInfo, AuthorizationRequest, AuthorizationStarted, SessionRequest, SessionResponse};
use crate::credentials::CredentialManager;
use crate::error::Result;
use crate::http::{RequestConfig, Transport};
use crate::session::{Session, SessionStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Operations for registering consent and opening sessions
pub struct AuthOperations {
    transport: Arc<Transport>,
    credentials: Arc<CredentialManager>,
    sessions: Arc<SessionStore>,
}

impl AuthOperations {
    pub fn new(
        transport: Arc<Transport>,
        credentials: Arc<CredentialManager>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            transport,
            credentials,
            sessions,
        }
    }

    /// Fetch the registered application's details
    pub async fn application_info(&self) -> Result<ApplicationInfo> {
        let request = RequestConfig::new().headers(self.credentials.authorization_header()?);
        self.transport.get("/application", request).await?.decode()
    }

    /// Start an authorization flow with a bank.
    ///
    /// Returns the URL the end-user must visit to consent. `psu_ip_address`
    /// is forwarded to the bank when the call is user-initiated.
    pub async fn start_authorization(
        &self,
        authorization: &AuthorizationRequest,
        psu_ip_address: Option<&str>,
    ) -> Result<AuthorizationStarted> {
        let mut request = RequestConfig::new()
            .headers(self.credentials.authorization_header()?)
            .json(serde_json::to_value(authorization)?);
        if let Some(ip) = psu_ip_address {
            request = request.header("PSU-IP-Address", ip);
        }

        let started: AuthorizationStarted =
            self.transport.post("/auth", request).await?.decode()?;

        info!(
            authorization_id = %started.authorization_id,
            aspsp = %authorization.aspsp,
            country = %authorization.country,
            "authorization started"
        );
        Ok(started)
    }

    /// Redeem a consent code for a session.
    ///
    /// The upstream response is recorded in the local session store; the raw
    /// PSU identifier it carries is hashed on the way in and never kept. When
    /// the upstream omits an expiry, the store's default TTL applies.
    pub async fn create_session(
        &self,
        redemption: &SessionRequest,
        psu_ip_address: Option<&str>,
    ) -> Result<Session> {
        let mut request = RequestConfig::new()
            .headers(self.credentials.authorization_header()?)
            .json(serde_json::to_value(redemption)?);
        if let Some(ip) = psu_ip_address {
            request = request.header("PSU-IP-Address", ip);
        }

        let response: SessionResponse =
            self.transport.post("/sessions", request).await?.decode()?;

        let mut metadata = HashMap::new();
        metadata.insert(
            "upstream_session_id".to_string(),
            serde_json::Value::String(response.session_id.clone()),
        );

        let session = self
            .sessions
            .create(
                &response.authorization_id,
                &response.psu_id,
                response.aspsp,
                response.accounts,
                response.expires_at,
                metadata,
            )
            .await;

        info!(
            session_id = %session.session_id,
            accounts = session.accounts.len(),
            "session opened from consent code"
        );
        Ok(session)
    }
}

impl std::fmt::Debug for AuthOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthOperations").finish_non_exhaustive()
    }
}
