//! Redis mirror for session storage
//!
//! Write-behind tier used when horizontally scaling: sessions are stored as
//! JSON under `session:{id}` with a TTL equal to the session's remaining
//! lifetime, so Redis expires them on its own. All failures are returned to
//! the store, which logs and swallows them; the local map stays
//! authoritative.

use super::models::Session;
use redis::{AsyncCommands, Client, RedisError, RedisResult};

/// Redis-backed session mirror
#[derive(Clone)]
pub struct SessionMirror {
    client: Client,
}

impl SessionMirror {
    /// Create a mirror from a Redis URL. No connection is made until the
    /// first command; use [`ping`](Self::ping) to probe reachability.
    pub fn connect(url: &str) -> RedisResult<Self> {
        Ok(Self {
            client: Client::open(url)?,
        })
    }

    fn key(session_id: &str) -> String {
        format!("session:{session_id}")
    }

    /// Probe the mirror connection
    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Write a session with TTL equal to its remaining lifetime.
    ///
    /// A session with no remaining lifetime is not written at all.
    pub async fn put(&self, session: &Session) -> RedisResult<()> {
        let ttl = session.time_until_expiry();
        if ttl == 0 {
            return Ok(());
        }

        let json = serde_json::to_string(session).map_err(serde_to_redis_err)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(Self::key(&session.session_id), json, ttl).await?;
        Ok(())
    }

    /// Fetch and deserialize a session, if present
    pub async fn fetch(&self, session_id: &str) -> RedisResult<Option<Session>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let json: Option<String> = conn.get(Self::key(session_id)).await?;
        match json {
            Some(json) => {
                let session = serde_json::from_str(&json).map_err(serde_to_redis_err)?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Delete a session, returning whether an entry was removed
    pub async fn remove(&self, session_id: &str) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let removed: u64 = conn.del(Self::key(session_id)).await?;
        Ok(removed > 0)
    }
}

impl std::fmt::Debug for SessionMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMirror").finish_non_exhaustive()
    }
}

fn serde_to_redis_err(e: serde_json::Error) -> RedisError {
    RedisError::from((
        redis::ErrorKind::IoError,
        "session serialization failed",
        e.to_string(),
    ))
}
