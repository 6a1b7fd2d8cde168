//! Wire records for the remote API
//!
//! Typed request and response shapes exchanged with the upstream service.
//! Requests skip `None` fields on serialization; responses tolerate missing
//! optional fields so upstream additions do not break deserialization.

mod types;

pub use types::{
    Amount, ApplicationInfo, AuthorizationRequest, AuthorizationStarted, Balance, BalanceReport,
    SessionRequest, SessionResponse, Transaction, TransactionFilter, TransactionPage,
};

#[cfg(test)]
mod tests;
