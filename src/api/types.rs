//! Request and response records

use crate::session::{Account, Aspsp};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request to start a bank authorization flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Bank identifier
    pub aspsp: String,
    /// Country code (ISO 2-letter)
    pub country: String,
    /// Where the end-user is redirected after consenting
    pub redirect_uri: String,
    /// Opaque state echoed back on the redirect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// End-user identifier known to the bank
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psu_id: Option<String>,
}

/// Upstream acknowledgement of a started authorization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationStarted {
    /// Authorization id to redeem once the user consents
    pub authorization_id: String,
    /// URL the end-user must visit to consent
    pub auth_url: String,
    /// When the pending authorization expires
    pub expires_at: DateTime<Utc>,
    /// Echo of the request state, if any
    #[serde(default)]
    pub state: Option<String>,
}

/// Request to redeem an authorization code for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Authorization code from the consent redirect
    pub code: String,
    /// State from the consent redirect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Upstream view of a redeemed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Upstream session id
    pub session_id: String,
    /// Authorization the session was created from
    pub authorization_id: String,
    /// Raw end-user identifier as known upstream
    pub psu_id: String,
    /// Accounts the end-user granted access to
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// The bank the session is authorized against
    pub aspsp: Aspsp,
    /// When the upstream session expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Registered application details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    /// Application id
    pub application_id: String,
    /// Display name
    pub name: String,
    /// Registration status
    pub status: String,
    /// When the application was registered
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Granted API permissions
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// A monetary amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    /// Decimal value carried as a string to preserve precision
    pub value: String,
    /// Currency code
    pub currency: String,
}

/// One balance figure for an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Balance type (e.g. "closingBooked", "interimAvailable")
    pub balance_type: String,
    /// The balance amount
    pub amount: Amount,
    /// Date the balance refers to
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
    /// When the balance last changed
    #[serde(default)]
    pub last_change_date: Option<DateTime<Utc>>,
}

/// Balances reported for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    /// Account the balances belong to
    pub account_uid: String,
    /// Reported balances
    #[serde(default)]
    pub balances: Vec<Balance>,
    /// When the report was produced
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One booked or pending transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id
    pub transaction_id: String,
    /// End-to-end reference
    #[serde(default)]
    pub end_to_end_id: Option<String>,
    /// Booking date
    #[serde(default)]
    pub booking_date: Option<NaiveDate>,
    /// Value date
    #[serde(default)]
    pub value_date: Option<NaiveDate>,
    /// Signed transaction amount
    pub transaction_amount: Amount,
    /// Creditor name
    #[serde(default)]
    pub creditor_name: Option<String>,
    /// Debtor name
    #[serde(default)]
    pub debtor_name: Option<String>,
    /// Unstructured remittance text
    #[serde(default)]
    pub remittance_information: Option<Vec<String>>,
    /// Booking status ("BOOK" or "PDNG")
    #[serde(default)]
    pub booking_status: Option<String>,
}

/// One page of transactions for an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPage {
    /// Account the transactions belong to
    pub account_uid: String,
    /// Transactions in this page
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Total matching transactions, when the upstream reports it
    #[serde(default)]
    pub total_count: Option<u64>,
    /// Whether more pages exist
    #[serde(default)]
    pub has_more: bool,
    /// Offset of the next page, when more pages exist
    #[serde(default)]
    pub next_offset: Option<u64>,
}

/// Filter and pagination controls for a transaction query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Earliest booking date, inclusive
    pub date_from: Option<NaiveDate>,
    /// Latest booking date, inclusive
    pub date_to: Option<NaiveDate>,
    /// Page size
    pub limit: Option<u32>,
    /// Page offset
    pub offset: Option<u32>,
    /// Restrict to "BOOK" or "PDNG" entries
    pub booking_status: Option<String>,
}

impl TransactionFilter {
    /// Create an empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to transactions booked on or after `date`
    #[must_use]
    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    /// Restrict to transactions booked on or before `date`
    #[must_use]
    pub fn to_date(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }

    /// Set the page size
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the page offset
    #[must_use]
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Restrict to one booking status
    #[must_use]
    pub fn booking_status(mut self, status: impl Into<String>) -> Self {
        self.booking_status = Some(status.into());
        self
    }

    /// Render the filter as query parameters, omitting unset fields
    pub fn to_query_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some(date) = self.date_from {
            params.insert("date_from".to_string(), date.format("%Y-%m-%d").to_string());
        }
        if let Some(date) = self.date_to {
            params.insert("date_to".to_string(), date.format("%Y-%m-%d").to_string());
        }
        if let Some(limit) = self.limit {
            params.insert("limit".to_string(), limit.to_string());
        }
        if let Some(offset) = self.offset {
            params.insert("offset".to_string(), offset.to_string());
        }
        if let Some(status) = &self.booking_status {
            params.insert("booking_status".to_string(), status.clone());
        }
        params
    }
}
