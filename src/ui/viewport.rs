use crate::state::{ModelChange, OrderedCollectionStore};
use crate::ui::binding::{BindingLifecycleManager, RowSlot};
use crate::ui::section::RefreshReport;
use std::ops::Range;

/// A fixed number of recycled rows scrolled over a store.
///
/// Only the rows in view are bound. A move patches only the visible rows
/// between its two indices; every other row keeps its bindings.
#[derive(Debug)]
pub struct Viewport {
    manager: BindingLifecycleManager,
    slots: Vec<RowSlot>,
    first: usize,
}

impl Viewport {
    pub fn new(manager: BindingLifecycleManager, capacity: usize) -> Self {
        Self {
            manager,
            slots: (0..capacity).map(|_| RowSlot::new()).collect(),
            first: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Store index shown in the top row.
    pub fn first(&self) -> usize {
        self.first
    }

    pub fn slots(&self) -> &[RowSlot] {
        &self.slots
    }

    /// Identifiers in view, top to bottom.
    pub fn visible_ids(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter_map(|slot| slot.item().map(|item| item.id().to_string()))
            .collect()
    }

    /// Scroll so that store index `first` is on top, clamped to the end.
    pub fn scroll_to(&mut self, store: &OrderedCollectionStore, first: usize) -> RefreshReport {
        self.first = first.min(self.last_start(store));
        self.sync(store)
    }

    /// Point every row at the item it should show.
    pub fn sync(&mut self, store: &OrderedCollectionStore) -> RefreshReport {
        self.assign_rows(store, 0..self.capacity())
    }

    pub fn apply_change(&mut self, store: &OrderedCollectionStore, change: ModelChange) -> RefreshReport {
        match change {
            ModelChange::Structural => {
                self.first = self.first.min(self.last_start(store));
                self.sync(store)
            }
            ModelChange::Moved { from, to } => {
                let (low, high) = (from.min(to), from.max(to));
                let start = low.max(self.first).saturating_sub(self.first);
                let end = (high + 1).min(self.first + self.capacity()).saturating_sub(self.first);
                self.assign_rows(store, start..end.max(start))
            }
        }
    }

    fn last_start(&self, store: &OrderedCollectionStore) -> usize {
        store.count().saturating_sub(self.capacity())
    }

    fn assign_rows(&mut self, store: &OrderedCollectionStore, rows: Range<usize>) -> RefreshReport {
        let mut report = RefreshReport::default();
        for row in rows {
            let item = store.item_at(self.first + row);
            match self.manager.assign(&mut self.slots[row], item.as_ref()) {
                Ok(assignment) => report.record(assignment),
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!("Viewport row {}: {}", row, e);
                }
            }
        }
        report
    }

    /// Unbind every row.
    pub fn teardown(&mut self) -> RefreshReport {
        let mut report = RefreshReport::default();
        for slot in &mut self.slots {
            match self.manager.clear(slot) {
                Ok(()) => report.cleared += 1,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!("Viewport teardown: {}", e);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use crate::models::{Configuration, Entry};
    use crate::services::ViewItemProjector;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    fn store(len: usize) -> (Arc<OrderedCollectionStore>, BindingLifecycleManager) {
        let storage = Arc::new(MemoryStorage::default());
        for i in 0..len {
            let id = format!("id{i}");
            storage.upsert_entry(Entry::new(id.clone()));
            storage.push(id, Configuration::addon(true));
        }
        let metrics = Arc::new(Metrics::new());
        let store = OrderedCollectionStore::attach(storage, ViewItemProjector::default(), metrics.clone());
        (store, BindingLifecycleManager::new(metrics, "?"))
    }

    #[test]
    fn test_sync_binds_visible_window() {
        let (store, manager) = store(10);
        let mut viewport = Viewport::new(manager, 4);

        let report = viewport.sync(&store);

        assert_eq!(report.bound, 4);
        assert_eq!(viewport.visible_ids(), vec!["id0", "id1", "id2", "id3"]);
    }

    #[test]
    fn test_scroll_clamps_to_end() {
        let (store, manager) = store(6);
        let mut viewport = Viewport::new(manager, 4);
        viewport.sync(&store);

        let report = viewport.scroll_to(&store, 100);

        assert_eq!(viewport.first(), 2);
        assert_eq!(report.rebound, 4);
        assert_eq!(viewport.visible_ids(), vec!["id2", "id3", "id4", "id5"]);
    }

    #[test]
    fn test_move_touches_only_affected_rows() {
        let (store, manager) = store(10);
        let mut viewport = Viewport::new(manager, 5);
        viewport.sync(&store);

        store.move_item(1, 3).unwrap();
        let report = viewport.apply_change(&store, ModelChange::Moved { from: 1, to: 3 });

        assert_eq!(report.rebound, 3);
        assert_eq!(report.unchanged, 0);
        assert_eq!(viewport.visible_ids(), vec!["id0", "id2", "id3", "id1", "id4"]);
    }

    #[test]
    fn test_move_outside_window_is_ignored() {
        let (store, manager) = store(10);
        let mut viewport = Viewport::new(manager, 3);
        viewport.sync(&store);

        store.move_item(6, 8).unwrap();
        let report = viewport.apply_change(&store, ModelChange::Moved { from: 6, to: 8 });

        assert_eq!(report, RefreshReport::default());
    }

    #[test]
    fn test_short_store_leaves_rows_empty() {
        let (store, manager) = store(2);
        let mut viewport = Viewport::new(manager.clone(), 4);
        viewport.sync(&store);

        assert_eq!(viewport.visible_ids(), vec!["id0", "id1"]);
        assert!(!viewport.slots()[3].is_bound());

        viewport.teardown();
        assert_eq!(manager.metrics().live_handles(), 0);
    }
}
