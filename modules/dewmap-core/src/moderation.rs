//! Admin moderation list.
//!
//! The list is replaced wholesale by every load and shrinks only when the
//! server confirms a delete. Deletes are keyed by id: a second delete for an
//! id already in flight is refused locally, deletes for different ids run
//! concurrently.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dewmap_client::{validate_page_size, ClientError, Result};
use dewmap_common::config::ADMIN_PAGE_SIZES;
use dewmap_common::{Find, FindId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{top_flavors, FlavorCount};
use crate::loader::LoadOutcome;
use crate::traits::AdminApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Server confirmed; the find is gone from the local list.
    Removed,
    /// A delete for this id is already in flight; nothing was sent.
    AlreadyPending,
}

/// Header numbers for the moderation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub total: usize,
    pub top_flavor: Option<FlavorCount>,
}

struct ModerationState {
    finds: Arc<Vec<Find>>,
    limit: u32,
    loading: bool,
    error: Option<String>,
    pending: HashSet<FindId>,
    generation: u64,
}

fn lock(m: &Mutex<ModerationState>) -> MutexGuard<'_, ModerationState> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ModerationStore {
    api: Arc<dyn AdminApi>,
    state: Mutex<ModerationState>,
}

impl ModerationStore {
    pub fn new(api: Arc<dyn AdminApi>) -> Self {
        Self::with_limit(api, ADMIN_PAGE_SIZES[0])
    }

    pub fn with_limit(api: Arc<dyn AdminApi>, limit: u32) -> Self {
        Self {
            api,
            state: Mutex::new(ModerationState {
                finds: Arc::new(Vec::new()),
                limit,
                loading: false,
                error: None,
                pending: HashSet::new(),
                generation: 0,
            }),
        }
    }

    /// Fetch the newest `limit` finds and replace the local list with them.
    ///
    /// The server's order is kept as-is. `limit` becomes the current page
    /// size only once the page arrives.
    pub async fn load(&self, limit: u32) -> Result<LoadOutcome> {
        let limit = match validate_page_size(limit) {
            Ok(limit) => limit,
            Err(invalid) => {
                let err = ClientError::from(invalid);
                warn!(limit, error = %err, "Rejected moderation page size");
                lock(&self.state).error = Some(err.to_string());
                return Err(err);
            }
        };
        let generation = {
            let mut s = lock(&self.state);
            s.generation += 1;
            s.loading = true;
            s.generation
        };
        debug!(limit, generation, "Moderation load started");

        let result = self.api.finds(limit).await;

        let mut s = lock(&self.state);
        if s.generation != generation {
            debug!(generation, current = s.generation, "Discarding superseded moderation load");
            return Ok(LoadOutcome::Discarded);
        }
        s.loading = false;

        match result {
            Ok(finds) => {
                info!(limit, count = finds.len(), "Moderation list loaded");
                s.finds = Arc::new(finds);
                s.limit = limit;
                s.error = None;
                Ok(LoadOutcome::Applied)
            }
            Err(err) => {
                warn!(limit, error = %err, "Moderation load failed, keeping list");
                s.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Reload at the current page size.
    pub async fn reload(&self) -> Result<LoadOutcome> {
        let limit = self.limit();
        self.load(limit).await
    }

    /// Change the page size. Always a full reload, even when shrinking.
    pub async fn set_limit(&self, limit: u32) -> Result<LoadOutcome> {
        self.load(limit).await
    }

    /// Remove a find once the server confirms it.
    pub async fn delete(&self, id: &FindId) -> Result<DeleteOutcome> {
        if !lock(&self.state).pending.insert(id.clone()) {
            debug!(find_id = %id, "Delete already in flight");
            return Ok(DeleteOutcome::AlreadyPending);
        }
        info!(find_id = %id, "Delete issued");

        let result = self.api.delete_find(id).await;

        let mut s = lock(&self.state);
        s.pending.remove(id);
        match result {
            Ok(()) => {
                let remaining: Vec<Find> =
                    s.finds.iter().filter(|f| &f.id != id).cloned().collect();
                s.finds = Arc::new(remaining);
                s.error = None;
                info!(find_id = %id, "Delete confirmed");
                Ok(DeleteOutcome::Removed)
            }
            Err(err) => {
                warn!(find_id = %id, error = %err, "Delete failed, list unchanged");
                s.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn is_deleting(&self, id: &FindId) -> bool {
        lock(&self.state).pending.contains(id)
    }

    pub fn finds(&self) -> Arc<Vec<Find>> {
        Arc::clone(&lock(&self.state).finds)
    }

    pub fn limit(&self) -> u32 {
        lock(&self.state).limit
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).loading
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    /// Forget everything loaded. In-flight loads are superseded.
    pub fn clear(&self) {
        let mut s = lock(&self.state);
        s.generation += 1;
        s.finds = Arc::new(Vec::new());
        s.loading = false;
        s.error = None;
    }

    pub fn stats(&self) -> AdminStats {
        let finds = self.finds();
        AdminStats {
            total: finds.len(),
            top_flavor: top_flavors(finds.as_slice(), 1).into_iter().next(),
        }
    }
}
