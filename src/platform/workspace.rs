//! Swappable in-memory workspace holder.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use super::WorkspaceFetcher;
use crate::models::workspace::Workspace;

/// Holds the most recently loaded workspace snapshot.
///
/// Refreshing is owned by whoever calls [`replace`](Self::replace); the
/// pipeline only reads.
#[derive(Default)]
pub struct SnapshotWorkspaceFetcher {
    snapshot: RwLock<Option<Arc<Workspace>>>,
}

impl SnapshotWorkspaceFetcher {
    /// Fetcher pre-loaded with `workspace`.
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        Self {
            snapshot: RwLock::new(Some(Arc::new(workspace))),
        }
    }

    /// Fetcher with no snapshot yet.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Swap in a freshly loaded snapshot.
    pub fn replace(&self, workspace: Workspace) {
        let count = workspace.in_app_messages.len();
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(workspace));
        info!(in_app_messages = count, "workspace snapshot replaced");
    }
}

impl WorkspaceFetcher for SnapshotWorkspaceFetcher {
    fn fetch(&self) -> Option<Arc<Workspace>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
