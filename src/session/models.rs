//! Session data records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Length of the truncated PSU id hash.
// TODO: revisit whether 16 hex chars is enough collision resistance once the
// expected user population is known.
const PSU_HASH_LEN: usize = 16;

/// One-way hash of the raw end-user identifier.
///
/// The raw identifier is never persisted anywhere; only this digest is.
pub fn hash_psu_id(raw_psu_id: &str) -> String {
    let digest = Sha256::digest(raw_psu_id.as_bytes());
    let hex = format!("{digest:x}");
    hex[..PSU_HASH_LEN].to_string()
}

/// A bank account the end-user authorized access to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier within a session
    pub uid: String,
    /// Account IBAN
    pub iban: Option<String>,
    /// Account name/description
    pub name: String,
    /// Currency code
    pub currency: String,
    /// Type of account
    pub account_type: Option<String>,
    /// Account status
    pub status: Option<String>,
}

/// Account Servicing Payment Service Provider (bank) descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aspsp {
    /// Bank name
    pub name: String,
    /// Country code (ISO 2-letter)
    pub country: String,
    /// Bank BIC code
    pub bic: Option<String>,
    /// Bank logo URL
    pub logo_url: Option<String>,
}

/// A bounded-lifetime grant of access to a set of bank accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session id
    pub session_id: String,
    /// Authorization id issued by the remote API
    pub authorization_id: String,
    /// Truncated one-way hash of the PSU identifier
    pub psu_id_hash: String,
    /// Authorized accounts (unique by uid)
    pub accounts: Vec<Account>,
    /// The bank this session is authorized against
    pub aspsp: Aspsp,
    /// When the session expires
    pub expires_at: DateTime<Utc>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last time the session was read
    pub last_accessed: DateTime<Utc>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Session {
    /// Construct a fully-populated session.
    ///
    /// Accounts are deduplicated by uid, keeping the first occurrence.
    pub fn new(
        authorization_id: impl Into<String>,
        psu_id_hash: impl Into<String>,
        aspsp: Aspsp,
        accounts: Vec<Account>,
        expires_at: DateTime<Utc>,
        metadata: HashMap<String, Value>,
    ) -> Self {
        let now = Utc::now();
        let mut seen = HashSet::new();
        let accounts = accounts
            .into_iter()
            .filter(|account| seen.insert(account.uid.clone()))
            .collect();

        Self {
            session_id: Uuid::new_v4().to_string(),
            authorization_id: authorization_id.into(),
            psu_id_hash: psu_id_hash.into(),
            accounts,
            aspsp,
            expires_at,
            created_at: now,
            last_accessed: now,
            metadata,
        }
    }

    /// Whether the session has passed its expiry
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Seconds until expiry, zero if already expired
    pub fn time_until_expiry(&self) -> u64 {
        (self.expires_at - Utc::now()).num_seconds().max(0) as u64
    }

    /// Update the last-accessed timestamp
    pub fn refresh_last_accessed(&mut self) {
        self.last_accessed = Utc::now();
    }

    /// Look up an authorized account by uid
    pub fn account(&self, account_uid: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.uid == account_uid)
    }

    /// Attach an account, ignoring duplicates by uid
    pub fn add_account(&mut self, account: Account) {
        if self.account(&account.uid).is_none() {
            self.accounts.push(account);
        }
    }
}
