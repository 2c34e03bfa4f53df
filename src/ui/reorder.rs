// Drag-and-drop reordering
//
// Runs the drag gesture state machine and applies a completed gesture to both
// storage and the store without triggering a rebuild: storage is reordered
// silently, the store moves one item in place, and only then is the change
// broadcast to everyone else.

use crate::metrics::Metrics;
use crate::state::{OrderedCollectionStore, StoreError};
use crate::storage::{AddonStorage, OrderChange};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// Gesture state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        /// Row index when the drag started
        origin: usize,
        id: String,
    },
}

/// How a finished gesture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Moved { from: usize, to: usize },
    /// Dropped where it started
    Unchanged,
    /// The drop could not be resolved to a row
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    #[error("addon {0} is not in the list")]
    UnknownItem(String),

    #[error("a drag of {0} is already in progress")]
    AlreadyDragging(String),

    #[error("no drag in progress")]
    NotDragging,

    #[error("storage rejected reorder {from} -> {to}")]
    StorageRejected { from: usize, to: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Applies user reorder gestures to a store and its storage.
pub struct ReorderCoordinator {
    store: Arc<OrderedCollectionStore>,
    metrics: Arc<Metrics>,
    state: Mutex<DragState>,
}

impl ReorderCoordinator {
    pub fn new(store: Arc<OrderedCollectionStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            metrics,
            state: Mutex::new(DragState::Idle),
        }
    }

    pub fn state(&self) -> DragState {
        self.state.lock().clone()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(*self.state.lock(), DragState::Dragging { .. })
    }

    /// Start dragging the row showing addon `id`. Returns its index.
    pub fn begin_drag(&self, id: &str) -> Result<usize, ReorderError> {
        let mut state = self.state.lock();
        if let DragState::Dragging { id: current, .. } = &*state {
            return Err(ReorderError::AlreadyDragging(current.clone()));
        }

        let Some(origin) = self.store.position_of(id) else {
            self.metrics.record_rejected_gesture();
            tracing::warn!("Drag rejected: {} is not in the list", id);
            return Err(ReorderError::UnknownItem(id.to_string()));
        };

        tracing::debug!("Dragging {} from {}", id, origin);
        *state = DragState::Dragging {
            origin,
            id: id.to_string(),
        };
        Ok(origin)
    }

    /// Finish the gesture on row `target`. `None` means the drop landed
    /// somewhere that is not a row.
    pub fn drop_at(&self, target: Option<usize>) -> Result<DropOutcome, ReorderError> {
        let DragState::Dragging { origin, id } = std::mem::take(&mut *self.state.lock()) else {
            return Err(ReorderError::NotDragging);
        };

        // The list may have been rebuilt under the drag; follow the addon.
        let Some(from) = self.store.position_of(&id) else {
            return Ok(self.cancelled(&format!("{id} left the list during the drag")));
        };
        if from != origin {
            tracing::debug!("{} drifted from {} to {} during the drag", id, origin, from);
        }

        let count = self.store.count();
        let Some(to) = target.filter(|to| *to < count) else {
            return Ok(self.cancelled(&format!("no row at drop target {target:?} of {count}")));
        };

        self.commit(&id, from, to)
    }

    /// Abandon the gesture. Returns `false` if there was none.
    pub fn cancel(&self) -> bool {
        let previous = std::mem::take(&mut *self.state.lock());
        match previous {
            DragState::Dragging { id, .. } => {
                tracing::debug!("Drag of {} cancelled", id);
                true
            }
            DragState::Idle => false,
        }
    }

    /// Move addon `id` one row up. The first row stays put.
    pub fn move_up(&self, id: &str) -> Result<DropOutcome, ReorderError> {
        let from = self.locate(id)?;
        if from == 0 {
            return Ok(DropOutcome::Unchanged);
        }
        self.commit(id, from, from - 1)
    }

    /// Move addon `id` one row down. The last row stays put.
    pub fn move_down(&self, id: &str) -> Result<DropOutcome, ReorderError> {
        let from = self.locate(id)?;
        if from + 1 >= self.store.count() {
            return Ok(DropOutcome::Unchanged);
        }
        self.commit(id, from, from + 1)
    }

    fn locate(&self, id: &str) -> Result<usize, ReorderError> {
        self.store
            .position_of(id)
            .ok_or_else(|| ReorderError::UnknownItem(id.to_string()))
    }

    fn cancelled(&self, reason: &str) -> DropOutcome {
        self.metrics.record_rejected_gesture();
        tracing::warn!("Drop cancelled: {}", reason);
        DropOutcome::Cancelled
    }

    fn commit(&self, id: &str, from: usize, to: usize) -> Result<DropOutcome, ReorderError> {
        if from == to {
            return Ok(DropOutcome::Unchanged);
        }

        let storage = self.store.storage();
        let (storage_from, storage_to) = self.storage_positions(storage.as_ref(), id, to)?;

        if !storage.reorder_silently(storage_from, storage_to) {
            return Err(ReorderError::StorageRejected {
                from: storage_from,
                to: storage_to,
            });
        }
        if let Err(e) = self.store.move_item(from, to) {
            // Storage already moved; everyone re-derives the order from it
            tracing::warn!("Store rejected move {} -> {} of {}: {}", from, to, id, e);
            storage.broadcast_order_changed(OrderChange::Replaced);
            return Err(e.into());
        }
        storage.broadcast_order_changed(OrderChange::Moved {
            id: id.to_string(),
            from,
            to,
            origin: self.store.id(),
        });

        tracing::info!("Moved {} from {} to {}", id, from, to);
        Ok(DropOutcome::Moved { from, to })
    }

    /// Translate a row move into positions of the storage order, which also
    /// holds separators. The moved addon lands next to the addon currently at
    /// row `to`, on the same side the row move puts it.
    fn storage_positions(
        &self,
        storage: &dyn AddonStorage,
        id: &str,
        to: usize,
    ) -> Result<(usize, usize), ReorderError> {
        let order = storage.ordered_identifiers();
        let displaced = self
            .store
            .item_at(to)
            .ok_or(StoreError::OutOfRange {
                index: to,
                len: self.store.count(),
            })?;

        let find = |wanted: &str| {
            order
                .iter()
                .position(|candidate| candidate == wanted)
                .ok_or_else(|| ReorderError::UnknownItem(wanted.to_string()))
        };

        Ok((find(id)?, find(displaced.id())?))
    }
}

impl std::fmt::Debug for ReorderCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReorderCoordinator")
            .field("store", &self.store.id())
            .field("state", &*self.state.lock())
            .finish()
    }
}
