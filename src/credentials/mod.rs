//! Credential management
//!
//! Signs RS256 bearer tokens for the remote API and caches the live token
//! until it nears expiry. The manager holds both halves of the signing key:
//! the private half for signing, the public half for validating tokens it
//! (or a peer instance) issued.

mod manager;
mod types;

pub use manager::CredentialManager;
pub use types::{Claims, Credential, TokenInfo, TokenStatus};
