//! Connection admission.
//!
//! # Responsibilities
//! - Enforce `max_connections` via semaphore, when configured
//! - Hand out permits that live as long as the connection task
//!
//! # Design Decisions
//! - No limit configured means no semaphore at all
//! - The permit is taken before accept(), so a full server stops calling
//!   accept() instead of accepting and dropping; the TLS listener then
//!   holds at most its queue depth of waiting connections

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::AdmissionConfig;

/// Gate in front of the accept loop.
#[derive(Debug, Clone)]
pub struct AdmissionControl {
    limit: Option<Arc<Semaphore>>,
}

impl AdmissionControl {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            limit: config.max_connections.map(|max| Arc::new(Semaphore::new(max))),
        }
    }

    /// Admission without any limit.
    pub fn unbounded() -> Self {
        Self { limit: None }
    }

    /// Wait for a connection slot.
    ///
    /// Resolves immediately when unbounded.
    pub async fn admit(&self) -> ConnectionPermit {
        let permit = match &self.limit {
            // The semaphore is never closed, so acquire only fails if that changes.
            Some(limit) => Arc::clone(limit).acquire_owned().await.ok(),
            None => None,
        };
        ConnectionPermit { _permit: permit }
    }

    /// Free slots, or `None` when unbounded.
    pub fn available_permits(&self) -> Option<usize> {
        self.limit.as_ref().map(|limit| limit.available_permits())
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
/// This keeps the count right even if the connection task panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: Option<OwnedSemaphorePermit>,
}
