//! Account data operations
//!
//! Every call authorizes against the local session store first: a request
//! for an account the session does not cover fails before anything is sent
//! upstream.

use crate::api::{BalanceReport, TransactionFilter, TransactionPage};
use crate::credentials::CredentialManager;
use crate::error::{Error, Result};
use crate::http::{RequestConfig, Transport};
use crate::session::{Account, Session, SessionStore};
use std::sync::Arc;
use tracing::debug;

/// Operations for reading authorized account data
pub struct AccountOperations {
    transport: Arc<Transport>,
    credentials: Arc<CredentialManager>,
    sessions: Arc<SessionStore>,
}

impl AccountOperations {
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

    /// List the accounts a session is authorized for.
    ///
    /// Served entirely from the local store; no upstream call is made.
    pub async fn accounts(&self, session_id: &str) -> Result<Vec<Account>> {
        let session = self
            .sessions
            .get(session_id)
            .await
            .ok_or_else(|| Error::session_not_found(session_id))?;
        Ok(session.accounts)
    }

    /// Fetch current balances for one authorized account
    pub async fn balances(
        &self,
        session_id: &str,
        account_uid: &str,
        psu_ip_address: Option<&str>,
    ) -> Result<BalanceReport> {
        let (session, account) = self.sessions.authorized_account(session_id, account_uid).await?;
        debug!(session_id, account_uid, "fetching balances");

        let request = self.data_request(&session, psu_ip_address)?;
        self.transport
            .get(&format!("/accounts/{}/balances", account.uid), request)
            .await?
            .decode()
    }

    /// Fetch a page of transactions for one authorized account
    pub async fn transactions(
        &self,
        session_id: &str,
        account_uid: &str,
        filter: &TransactionFilter,
        psu_ip_address: Option<&str>,
    ) -> Result<TransactionPage> {
        let (session, account) = self.sessions.authorized_account(session_id, account_uid).await?;
        debug!(session_id, account_uid, "fetching transactions");

        let mut request = self.data_request(&session, psu_ip_address)?;
        request.query.extend(filter.to_query_params());
        self.transport
            .get(&format!("/accounts/{}/transactions", account.uid), request)
            .await?
            .decode()
    }

    /// Base request for an account data call: signed credential header plus
    /// the upstream session reference.
    fn data_request(&self, session: &Session, psu_ip_address: Option<&str>) -> Result<RequestConfig> {
        let upstream_id = session
            .metadata
            .get("upstream_session_id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(&session.session_id);

        let mut request = RequestConfig::new()
            .headers(self.credentials.authorization_header()?)
            .header("Session-ID", upstream_id);
        if let Some(ip) = psu_ip_address {
            request = request.header("PSU-IP-Address", ip);
        }
        Ok(request)
    }
}

impl std::fmt::Debug for AccountOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountOperations").finish_non_exhaustive()
    }
}
