//! High-level operations against the remote API
//!
//! Each operation group composes the signed credential header, the rate
//! limited transport, and the session store into one call per API action.
//! Account data operations always resolve the session and account locally
//! before any request leaves the process.

mod accounts;
mod auth;

pub use accounts::AccountOperations;
pub use auth::AuthOperations;
