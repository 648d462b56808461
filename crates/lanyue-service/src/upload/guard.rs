//! At most one writer per upload session.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;

/// In-process registry of sessions that currently have a writer.
#[derive(Debug, Clone, Default)]
pub struct WriterGuard {
    active: Arc<DashMap<String, ()>>,
}

impl WriterGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the session for one writer. Fails with a session-busy error
    /// while another permit for the same session is alive.
    pub fn try_acquire(&self, session_id: &str) -> AppResult<WriterPermit> {
        match self.active.entry(session_id.to_string()) {
            Entry::Occupied(_) => Err(AppError::session_busy(session_id)),
            Entry::Vacant(slot) => {
                slot.insert(());
                debug!(session_id, "Acquired upload writer permit");
                Ok(WriterPermit {
                    active: Arc::clone(&self.active),
                    session_id: session_id.to_string(),
                })
            }
        }
    }

    pub fn is_held(&self, session_id: &str) -> bool {
        self.active.contains_key(session_id)
    }
}

/// Exclusive write access to one session. Released on drop.
#[derive(Debug)]
pub struct WriterPermit {
    active: Arc<DashMap<String, ()>>,
    session_id: String,
}

impl Drop for WriterPermit {
    fn drop(&mut self) {
        self.active.remove(&self.session_id);
    }
}
