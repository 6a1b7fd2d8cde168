//! HTTP transport module
//!
//! Provides the outbound HTTP layer for the remote API:
//!
//! - **Admission control**: sliding-window rate limiting, partitioned by
//!   endpoint class so heavy account-data traffic cannot starve
//!   authorization calls
//! - **Retries**: exponential backoff on server errors and transport
//!   failures, never on 4xx
//! - **Error classification**: a closed mapping from status codes to the
//!   crate error taxonomy

mod rate_limit;
mod transport;

pub use rate_limit::{EndpointClass, RateLimiter};
pub use transport::{mask_sensitive, RequestConfig, ResponseBody, Transport};

#[cfg(test)]
mod tests;
