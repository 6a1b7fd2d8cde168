//! Session store
//!
//! Authoritative TTL-bounded store of authorization sessions. The local map
//! is the single source of truth within one process; the optional Redis
//! mirror is a best-effort cache-fill source checked only when the local map
//! misses. Expired sessions are evicted lazily on read and by a background
//! sweep; both paths are required, since a session can expire and never be
//! read again.

use super::mirror::SessionMirror;
use super::models::{hash_psu_id, Account, Aspsp, Session};
use crate::config::SessionStoreConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type SessionMap = Mutex<HashMap<String, Session>>;

/// Aggregate counts over the local map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub unique_banks: usize,
    pub mirror_enabled: bool,
}

struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Dual-backed store of authorization sessions
pub struct SessionStore {
    sessions: Arc<SessionMap>,
    mirror: Option<SessionMirror>,
    config: SessionStoreConfig,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl SessionStore {
    /// Open a store, probing the mirror if one is configured.
    ///
    /// An unreachable or misconfigured mirror degrades to local-only storage
    /// with a warning; it never fails the open.
    pub async fn open(config: SessionStoreConfig) -> Self {
        let mirror = match config.redis_url.as_deref() {
            Some(url) => match SessionMirror::connect(url) {
                Ok(mirror) => match mirror.ping().await {
                    Ok(()) => {
                        info!("session mirror connected");
                        Some(mirror)
                    }
                    Err(e) => {
                        warn!(error = %e, "session mirror unreachable, using local storage only");
                        None
                    }
                },
                Err(e) => {
                    warn!(error = %e, "invalid mirror URL, using local storage only");
                    None
                }
            },
            None => None,
        };

        info!(
            mirror = mirror.is_some(),
            default_ttl_secs = config.default_ttl.as_secs(),
            "session store opened"
        );

        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            mirror,
            config,
            sweeper: Mutex::new(None),
        }
    }

    /// Whether a mirror is connected
    pub fn mirror_enabled(&self) -> bool {
        self.mirror.is_some()
    }

    /// Create a session.
    ///
    /// The raw PSU identifier is hashed immediately and never stored. When no
    /// explicit expiry is given, the configured default TTL applies.
    pub async fn create(
        &self,
        authorization_id: &str,
        raw_psu_id: &str,
        aspsp: Aspsp,
        accounts: Vec<Account>,
        expires_at: Option<DateTime<Utc>>,
        metadata: HashMap<String, Value>,
    ) -> Session {
        let expires_at = expires_at.unwrap_or_else(|| {
            Utc::now() + chrono::Duration::seconds(self.config.default_ttl.as_secs() as i64)
        });

        let session = Session::new(
            authorization_id,
            hash_psu_id(raw_psu_id),
            aspsp,
            accounts,
            expires_at,
            metadata,
        );

        self.persist(&session).await;

        info!(
            session_id = %session.session_id,
            aspsp = %session.aspsp.name,
            accounts = session.accounts.len(),
            expires_at = %session.expires_at,
            "session created"
        );

        session
    }

    /// Get a session by id.
    ///
    /// Checks the local map first, then the mirror (cache-filling on a hit).
    /// A session found expired through either path is purged from both tiers
    /// and reported absent. On a live hit, `last_accessed` is refreshed by a
    /// detached task; the returned snapshot reflects the pre-update state.
    pub async fn get(&self, session_id: &str) -> Option<Session> {
        let mut session = lock(&self.sessions).get(session_id).cloned();

        if session.is_none() {
            if let Some(mirror) = &self.mirror {
                match mirror.fetch(session_id).await {
                    Ok(Some(found)) => {
                        debug!(session_id, "session cache-filled from mirror");
                        lock(&self.sessions).insert(session_id.to_string(), found.clone());
                        session = Some(found);
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, session_id, "mirror read failed"),
                }
            }
        }

        let session = session?;
        if session.is_expired() {
            debug!(session_id, "session expired, purging");
            self.delete(session_id).await;
            return None;
        }

        self.spawn_touch(session.session_id.clone());
        Some(session)
    }

    /// Delete a session from both tiers.
    ///
    /// Returns true if it was found in either; idempotent.
    pub async fn delete(&self, session_id: &str) -> bool {
        let mut found = lock(&self.sessions).remove(session_id).is_some();

        if let Some(mirror) = &self.mirror {
            match mirror.remove(session_id).await {
                Ok(removed) => found = found || removed,
                Err(e) => warn!(error = %e, session_id, "mirror delete failed"),
            }
        }

        if found {
            info!(session_id, "session deleted");
        }
        found
    }

    /// Push a session's expiry forward by `additional_seconds`.
    ///
    /// Goes through [`get`](Self::get), so an already-expired session cannot
    /// be revived.
    pub async fn extend(&self, session_id: &str, additional_seconds: i64) -> Option<Session> {
        let mut session = self.get(session_id).await?;
        session.expires_at += chrono::Duration::seconds(additional_seconds);
        self.persist(&session).await;

        info!(session_id, additional_seconds, "session extended");
        Some(session)
    }

    /// List sessions from the local map.
    ///
    /// Expired entries are excluded unless requested; the bank-name filter is
    /// a case-insensitive exact match.
    pub fn list(&self, include_expired: bool, aspsp_name: Option<&str>) -> Vec<Session> {
        let filter = aspsp_name.map(str::to_lowercase);
        lock(&self.sessions)
            .values()
            .filter(|session| include_expired || !session.is_expired())
            .filter(|session| match &filter {
                Some(name) => session.aspsp.name.to_lowercase() == *name,
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Aggregate counts over the local map at call time
    pub fn stats(&self) -> SessionStats {
        let map = lock(&self.sessions);
        let mut active = 0;
        let mut expired = 0;
        let mut banks = HashSet::new();

        for session in map.values() {
            if session.is_expired() {
                expired += 1;
            } else {
                active += 1;
                banks.insert(session.aspsp.name.to_lowercase());
            }
        }

        SessionStats {
            total: map.len(),
            active,
            expired,
            unique_banks: banks.len(),
            mirror_enabled: self.mirror.is_some(),
        }
    }

    /// Resolve an account within a live session.
    ///
    /// Distinguishes a missing/expired session from an account the session
    /// does not cover.
    pub async fn authorized_account(
        &self,
        session_id: &str,
        account_uid: &str,
    ) -> Result<(Session, Account)> {
        let session = self
            .get(session_id)
            .await
            .ok_or_else(|| Error::session_not_found(session_id))?;

        let account = session
            .account(account_uid)
            .cloned()
            .ok_or_else(|| Error::AccountNotAuthorized {
                session_id: session_id.to_string(),
                account_uid: account_uid.to_string(),
            })?;

        Ok((session, account))
    }

    /// Start the background sweep task. Calling this twice is a no-op.
    pub fn start(&self) {
        let mut guard = self
            .sweeper
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.is_some() {
            return;
        }

        let (shutdown, mut rx) = watch::channel(false);
        let sessions = Arc::clone(&self.sessions);
        let mirror = self.mirror.clone();
        let interval = self.config.cleanup_interval;

        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs_f64(), "session sweep task started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the first
            // sweep happens one full interval after start.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sweep_once(&sessions, mirror.as_ref()).await;
                    }
                    _ = rx.changed() => {
                        info!("session sweep task stopping");
                        break;
                    }
                }
            }
        });

        *guard = Some(SweeperHandle { shutdown, handle });
    }

    /// Signal the sweep task to stop and wait for it to exit
    pub async fn shutdown(&self) {
        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();

        if let Some(SweeperHandle { shutdown, handle }) = sweeper {
            let _ = shutdown.send(true);
            let _ = handle.await;
        }
    }

    /// Write a session to the local map, then best-effort to the mirror
    async fn persist(&self, session: &Session) {
        lock(&self.sessions).insert(session.session_id.clone(), session.clone());

        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.put(session).await {
                warn!(
                    error = %e,
                    session_id = %session.session_id,
                    "mirror write failed"
                );
            }
        }
    }

    /// Refresh `last_accessed` without blocking the caller.
    ///
    /// Reads the entry back from the map inside the task so a concurrent
    /// `extend` is not clobbered; only the timestamp is touched.
    fn spawn_touch(&self, session_id: String) {
        let sessions = Arc::clone(&self.sessions);
        let mirror = self.mirror.clone();

        tokio::spawn(async move {
            let updated = {
                let mut map = lock(&sessions);
                map.get_mut(&session_id).map(|session| {
                    session.refresh_last_accessed();
                    session.clone()
                })
            };

            if let (Some(mirror), Some(session)) = (mirror, updated) {
                if let Err(e) = mirror.put(&session).await {
                    warn!(error = %e, session_id, "mirror write failed");
                }
            }
        });
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.config)
            .field("mirror_enabled", &self.mirror.is_some())
            .finish_non_exhaustive()
    }
}

/// One sweep pass: collect expired ids under the lock, then delete each from
/// both tiers. Any per-entry failure is logged and the pass continues.
async fn sweep_once(sessions: &Arc<SessionMap>, mirror: Option<&SessionMirror>) {
    let expired: Vec<String> = lock(sessions)
        .iter()
        .filter(|(_, session)| session.is_expired())
        .map(|(id, _)| id.clone())
        .collect();

    if expired.is_empty() {
        return;
    }

    let mut removed = 0usize;
    for session_id in expired {
        lock(sessions).remove(&session_id);
        if let Some(mirror) = mirror {
            if let Err(e) = mirror.remove(&session_id).await {
                error!(error = %e, session_id, "sweep failed to delete from mirror");
            }
        }
        removed += 1;
    }

    info!(removed, "swept expired sessions");
}

// The map lock is held only for short, non-async critical sections; a
// poisoned lock still holds consistent data, so recover instead of panicking.
fn lock(map: &SessionMap) -> MutexGuard<'_, HashMap<String, Session>> {
    map.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
