//! Out-of-band cancellation of in-flight uploads.
//!
//! While a session is being written its marker `upload_<session id>`
//! exists in the ephemeral store. Cancelling deletes the marker; the
//! writer notices the absence on its next poll and tears the upload down.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use lanyue_cache::CacheManager;
use lanyue_cache::keys;
use lanyue_core::result::AppResult;
use lanyue_core::traits::cache::CacheProvider;

/// Marker store shared by writers and cancellers.
#[derive(Debug, Clone)]
pub struct CancellationChannel {
    cache: CacheManager,
}

impl CancellationChannel {
    pub fn new(cache: CacheManager) -> Self {
        Self { cache }
    }

    /// Mark the session as actively written. Returns `false` if the marker
    /// was already present. Markers never expire on their own.
    pub async fn register(&self, session_id: &str, task_id: i64) -> AppResult<bool> {
        self.cache
            .set_nx_persistent(&keys::upload_marker(session_id), &task_id.to_string())
            .await
    }

    pub async fn is_active(&self, session_id: &str) -> AppResult<bool> {
        self.cache.exists(&keys::upload_marker(session_id)).await
    }

    /// Request cancellation. Returns whether a marker was removed, that is
    /// whether the session was being written.
    pub async fn cancel(&self, session_id: &str) -> AppResult<bool> {
        let removed = self.cache.delete(&keys::upload_marker(session_id)).await?;
        if removed {
            info!(session_id, "Cancellation requested");
        }
        Ok(removed)
    }

    /// Drop the marker after the writer finished on its own.
    pub async fn clear(&self, session_id: &str) -> AppResult<()> {
        self.cache.delete(&keys::upload_marker(session_id)).await?;
        Ok(())
    }

    /// Polled token for one write loop.
    pub fn probe(&self, session_id: &str, interval: Duration) -> CancellationProbe {
        CancellationProbe {
            channel: self.clone(),
            session_id: session_id.to_string(),
            interval,
            last_checked: None,
            cancelled: false,
        }
    }
}

/// Cancellation token handed to a write loop.
///
/// [`CancellationProbe::poll`] consults the store at most once per
/// interval; a zero interval checks on every call.
/// [`CancellationProbe::poll_now`] always consults it. Once absence has been
/// observed the probe stays cancelled.
#[derive(Debug)]
pub struct CancellationProbe {
    channel: CancellationChannel,
    session_id: String,
    interval: Duration,
    last_checked: Option<Instant>,
    cancelled: bool,
}

impl CancellationProbe {
    /// Whether cancellation has been requested.
    pub async fn poll(&mut self) -> AppResult<bool> {
        if self.cancelled {
            return Ok(true);
        }
        let due = self
            .last_checked
            .is_none_or(|at| at.elapsed() >= self.interval);
        if !due {
            return Ok(false);
        }
        self.check().await
    }

    /// Like [`CancellationProbe::poll`] but ignores the interval. The write
    /// loop calls this once the body is exhausted, before the session is
    /// finalised.
    pub async fn poll_now(&mut self) -> AppResult<bool> {
        if self.cancelled {
            return Ok(true);
        }
        self.check().await
    }

    async fn check(&mut self) -> AppResult<bool> {
        self.last_checked = Some(Instant::now());
        if !self.channel.is_active(&self.session_id).await? {
            debug!(session_id = %self.session_id, "Upload marker is gone");
            self.cancelled = true;
        }
        Ok(self.cancelled)
    }
}
