//! # bankbridge
//!
//! A mediation layer for an open-banking account information API. It owns
//! the three concerns callers should not have to re-implement per call:
//!
//! - **Credentials**: RS256-signed JWT access tokens, cached and refreshed
//!   ahead of expiry
//! - **Transport**: rate-limited HTTP with retry, backoff, and a closed
//!   error taxonomy
//! - **Sessions**: TTL-bounded records of which accounts an end-user
//!   authorized, optionally mirrored into Redis
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bankbridge::config::CoreConfig;
//! use bankbridge::credentials::CredentialManager;
//! use bankbridge::http::Transport;
//! use bankbridge::ops::{AccountOperations, AuthOperations};
//! use bankbridge::session::SessionStore;
//! use bankbridge::Result;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = CoreConfig::default();
//!
//!     let credentials = Arc::new(CredentialManager::new(&config.api, config.credentials)?);
//!     let transport = Arc::new(Transport::new(&config.api, config.transport)?);
//!     let sessions = Arc::new(SessionStore::open(config.session).await);
//!     sessions.start();
//!
//!     let auth = AuthOperations::new(transport.clone(), credentials.clone(), sessions.clone());
//!     let info = auth.application_info().await?;
//!     println!("registered as {}", info.name);
//!
//!     sessions.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error taxonomy
pub mod error;

/// Component configuration records
pub mod config;

/// JWT credential management
pub mod credentials;

/// Rate-limited HTTP transport
pub mod http;

/// Authorization session storage
pub mod session;

/// Wire records for the remote API
pub mod api;

/// High-level API operations
pub mod ops;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

pub use config::CoreConfig;
pub use credentials::CredentialManager;
pub use http::Transport;
pub use ops::{AccountOperations, AuthOperations};
pub use session::{Session, SessionStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
