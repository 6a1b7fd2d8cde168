//! Authorization session storage
//!
//! Sessions record which accounts an end-user granted access to and for how
//! long. The store is authoritative in a local in-process map and optionally
//! mirrored into Redis for horizontal scaling; the mirror is strictly a
//! best-effort write-behind tier and never affects the outcome of a session
//! operation.

mod mirror;
mod models;
mod store;

pub use mirror::SessionMirror;
pub use models::{hash_psu_id, Account, Aspsp, Session};
pub use store::{SessionStats, SessionStore};
