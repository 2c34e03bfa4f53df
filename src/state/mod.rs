// State management module
//
// This module provides the OrderedCollectionStore: the ordered, observable
// sequence of view items that a list view renders, kept in sync with storage.

use crate::metrics::Metrics;
use crate::models::{Configuration, ItemKind, OrderedEntry, ViewItem};
use crate::observe::{Signal, Subscription};
use crate::services::ViewItemProjector;
use crate::storage::{AddonStorage, OrderChange, StorageEvent};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use thiserror::Error;

pub use crate::storage::StoreId;

/// Notifications emitted when the sequence changes
///
/// A `Moved` is always delivered before any later `Structural`; listeners may
/// patch in place on `Moved` and must re-query everything on `Structural`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelChange {
    /// The whole collection may have changed shape
    Structural,

    /// One item moved from `from` to `to`; nothing else changed
    Moved { from: usize, to: usize },
}

impl ModelChange {
    pub fn is_structural(&self) -> bool {
        matches!(self, ModelChange::Structural)
    }
}

/// Rejected in-place move
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("index {index} is out of range for {len} items")]
    OutOfRange { index: usize, len: usize },

    #[error("source and destination are both {0}")]
    SameIndex(usize),
}

/// Ordered, index-addressable collection of [`ViewItem`]s
///
/// The store:
/// - Derives its sequence from storage order, configuration and entries,
///   keeping only addon-kind identifiers and substituting placeholders for
///   identifiers with no live entry
/// - Rebuilds on storage `EntriesChanged` and generic `OrderChanged` events
/// - Applies single-item order patches in place instead of rebuilding, and
///   skips patches it published itself
/// - Emits [`ModelChange`] notifications synchronously
///
/// # Usage
///
/// Stores are constructed explicitly with [`attach()`](Self::attach) and shared
/// through an `Arc`; there is no global instance. Any number of stores may
/// observe the same storage.
///
/// # Related Types
///
/// - [`crate::ui::ReorderCoordinator`]: the only caller of [`move_item()`](Self::move_item)
/// - [`crate::ui::SectionView`]: renders the sequence through the list-model contract
pub struct OrderedCollectionStore {
    id: StoreId,

    /// The sequence, replaced wholesale on rebuild
    items: RwLock<Vec<Arc<ViewItem>>>,

    changed: Arc<Signal<ModelChange>>,

    storage: Arc<dyn AddonStorage>,
    projector: ViewItemProjector,
    metrics: Arc<Metrics>,

    /// Connection to the storage event signal, released on detach
    storage_link: Mutex<Option<Subscription>>,
}

impl OrderedCollectionStore {
    /// Create a store, subscribe it to storage events and build its initial
    /// sequence.
    pub fn attach(
        storage: Arc<dyn AddonStorage>,
        projector: ViewItemProjector,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        let store = Arc::new(Self {
            id: StoreId::next(),
            items: RwLock::new(Vec::new()),
            changed: Arc::new(Signal::new()),
            storage,
            projector,
            metrics,
            storage_link: Mutex::new(None),
        });

        let events = store.storage.events();
        let weak = Arc::downgrade(&store);
        let connection = events.connect(move |event| {
            if let Some(store) = weak.upgrade() {
                store.handle_event(event);
            }
        });
        *store.storage_link.lock() = Some(Subscription::new(
            format!("store {:?} storage events", store.id),
            &events,
            connection,
        ));

        tracing::info!("Attached store {:?} to storage", store.id);
        store.rebuild();
        store
    }

    /// Stop following storage. The current sequence stays as it is.
    pub fn detach(&self) {
        let link = self.storage_link.lock().take();
        if let Some(link) = link {
            if let Err(e) = link.release() {
                tracing::warn!("Detaching store {:?}: {}", self.id, e);
            }
        }
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn storage(&self) -> &Arc<dyn AddonStorage> {
        &self.storage
    }

    /// Change notifications.
    pub fn changed(&self) -> &Arc<Signal<ModelChange>> {
        &self.changed
    }

    /// Recompute the whole sequence from storage.
    ///
    /// The new sequence replaces the old one in a single swap, followed by
    /// exactly one [`ModelChange::Structural`].
    pub fn rebuild(&self) {
        let identifiers = self.storage.ordered_identifiers();
        let mut items = Vec::with_capacity(identifiers.len());

        for id in &identifiers {
            let Some((ordered, configuration)) = self.resolve(id) else {
                continue;
            };
            match ordered {
                OrderedEntry::Addon(entry) => {
                    let item = self.projector.project_or_mask(&entry, Some(&configuration));
                    items.push(Arc::new(item));
                }
                OrderedEntry::Separator(separator) => {
                    tracing::trace!("Skipping separator {} ({})", separator.id, separator.name);
                }
            }
        }

        let count = items.len();
        *self.items.write() = items;
        self.metrics.record_rebuild();
        tracing::debug!(
            "Store {:?} rebuilt: {} addons from {} identifiers",
            self.id,
            count,
            identifiers.len()
        );

        self.changed.emit(ModelChange::Structural);
    }

    /// Look up what an ordered identifier stands for.
    fn resolve(&self, id: &str) -> Option<(OrderedEntry, Configuration)> {
        let Some(configuration) = self.storage.configuration_for(id) else {
            tracing::warn!("No configuration for ordered identifier {}", id);
            return None;
        };

        let ordered = match configuration.kind {
            ItemKind::Addon => OrderedEntry::Addon(
                self.storage
                    .entry_for(id)
                    .unwrap_or_else(|| self.storage.placeholder_entry_for(id)),
            ),
            ItemKind::Separator => match self.storage.separator_for(id) {
                Some(separator) => OrderedEntry::Separator(separator),
                None => {
                    tracing::warn!("No separator record for {}", id);
                    return None;
                }
            },
        };

        Some((ordered, configuration))
    }

    pub fn count(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Item at `index`, or `None` when out of range.
    pub fn item_at(&self, index: usize) -> Option<Arc<ViewItem>> {
        self.items.read().get(index).cloned()
    }

    /// The whole sequence, read under one lock.
    pub fn items(&self) -> Vec<Arc<ViewItem>> {
        self.items.read().clone()
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.items.read().iter().position(|item| item.id() == id)
    }

    /// Current identifiers, in order.
    pub fn ids(&self) -> Vec<String> {
        self.items
            .read()
            .iter()
            .map(|item| item.id().to_string())
            .collect()
    }

    /// Move the item at `from` so that it ends up at `to`.
    ///
    /// Emits one [`ModelChange::Moved`] on success. Out-of-range or equal
    /// indices change nothing and emit nothing.
    pub fn move_item(&self, from: usize, to: usize) -> Result<(), StoreError> {
        {
            let mut items = self.items.write();
            let len = items.len();
            for index in [from, to] {
                if index >= len {
                    return Err(StoreError::OutOfRange { index, len });
                }
            }
            if from == to {
                return Err(StoreError::SameIndex(from));
            }

            let item = items.remove(from);
            items.insert(to, item);
        }

        self.metrics.record_point_move();
        tracing::debug!("Store {:?} moved {} -> {}", self.id, from, to);
        self.changed.emit(ModelChange::Moved { from, to });
        Ok(())
    }

    fn handle_event(&self, event: &StorageEvent) {
        match event {
            StorageEvent::EntriesChanged | StorageEvent::OrderChanged(OrderChange::Replaced) => {
                self.rebuild();
            }
            StorageEvent::OrderChanged(OrderChange::Moved { origin, .. }) if *origin == self.id => {
                self.metrics.record_suppressed_rebuild();
                tracing::trace!("Store {:?} ignoring its own order patch", self.id);
            }
            StorageEvent::OrderChanged(OrderChange::Moved { id, from, to, .. }) => {
                self.apply_patch(id, *from, *to);
            }
            StorageEvent::ConfigurationChanged { .. } | StorageEvent::AddonsEnabledChanged(_) => {}
        }
    }

    /// Apply an order patch from another store, rebuilding when the patch
    /// does not describe this sequence.
    fn apply_patch(&self, id: &str, from: usize, to: usize) {
        let matches = self.item_at(from).is_some_and(|item| item.id() == id);
        if matches && self.move_item(from, to).is_ok() {
            self.metrics.record_patch_applied();
            return;
        }

        tracing::debug!(
            "Store {:?} cannot apply patch {} {} -> {}, rebuilding",
            self.id,
            id,
            from,
            to
        );
        self.rebuild();
    }
}

impl std::fmt::Debug for OrderedCollectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedCollectionStore")
            .field("id", &self.id)
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entry, Separator};
    use crate::storage::MemoryStorage;
    use proptest::prelude::*;
    use std::sync::atomic::Ordering;

    fn storage_with(ids: &[&str]) -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::default());
        for id in ids {
            storage.push(*id, Configuration::addon(true));
            storage.upsert_entry(Entry::new(*id).with_title(id.to_uppercase()));
        }
        storage
    }

    fn attach(storage: &Arc<MemoryStorage>) -> (Arc<OrderedCollectionStore>, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new());
        let store = OrderedCollectionStore::attach(
            storage.clone(),
            ViewItemProjector::default(),
            metrics.clone(),
        );
        (store, metrics)
    }

    fn record(store: &OrderedCollectionStore) -> Arc<Mutex<Vec<ModelChange>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        store.changed().connect(move |change| seen_clone.lock().push(*change));
        seen
    }

    #[test]
    fn test_rebuild_filters_separators() {
        let storage = storage_with(&["a", "b"]);
        storage.add_separator(Separator {
            id: "sep".to_string(),
            name: "Maps".to_string(),
        });
        storage.set_order(vec!["a".into(), "sep".into(), "b".into()]);
        storage.set_configuration("sep", Configuration::separator());
        let (store, _) = attach(&storage);

        assert_eq!(store.ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_entry_becomes_placeholder() {
        let storage = storage_with(&["a"]);
        storage.push("ghost", Configuration::addon(false));
        let (store, _) = attach(&storage);

        assert_eq!(store.count(), 2);
        let ghost = store.item_at(1).unwrap();
        assert_eq!(ghost.id(), "ghost");
        assert!(ghost.is_placeholder());
    }

    #[test]
    fn test_unconfigured_identifier_is_skipped() {
        let storage = storage_with(&["a"]);
        storage.set_order(vec!["a".into(), "orphan".into()]);
        let (store, _) = attach(&storage);

        assert_eq!(store.ids(), vec!["a"]);
    }

    #[test]
    fn test_item_at_out_of_range() {
        let storage = storage_with(&["a"]);
        let (store, _) = attach(&storage);
        assert!(store.item_at(1).is_none());
    }

    #[test]
    fn test_rebuild_emits_one_structural() {
        let storage = storage_with(&["a", "b"]);
        let (store, _) = attach(&storage);
        let seen = record(&store);

        store.rebuild();
        assert_eq!(*seen.lock(), vec![ModelChange::Structural]);
    }

    #[test]
    fn test_entries_changed_triggers_rebuild() {
        let storage = storage_with(&["a"]);
        let (store, metrics) = attach(&storage);
        let before = metrics.rebuilds.load(Ordering::Relaxed);

        storage.upsert_entry(Entry::new("a").with_title("Renamed"));

        assert_eq!(metrics.rebuilds.load(Ordering::Relaxed), before + 1);
        assert_eq!(store.item_at(0).unwrap().name().get(), "Renamed");
    }

    #[test]
    fn test_configuration_changes_do_not_rebuild() {
        let storage = storage_with(&["a"]);
        let (_store, metrics) = attach(&storage);
        let before = metrics.rebuilds.load(Ordering::Relaxed);

        storage.set_configuration("a", Configuration::addon(false));
        storage.set_addons_enabled(false);

        assert_eq!(metrics.rebuilds.load(Ordering::Relaxed), before);
    }

    #[test]
    fn test_move_item_emits_moved() {
        let storage = storage_with(&["a", "b", "c"]);
        let (store, _) = attach(&storage);
        let seen = record(&store);

        store.move_item(0, 2).unwrap();

        assert_eq!(store.ids(), vec!["b", "c", "a"]);
        assert_eq!(*seen.lock(), vec![ModelChange::Moved { from: 0, to: 2 }]);
    }

    #[test]
    fn test_move_item_same_index_is_silent() {
        let storage = storage_with(&["a", "b"]);
        let (store, _) = attach(&storage);
        let seen = record(&store);

        assert_eq!(store.move_item(1, 1), Err(StoreError::SameIndex(1)));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_move_item_out_of_range() {
        let storage = storage_with(&["a", "b"]);
        let (store, _) = attach(&storage);

        assert_eq!(
            store.move_item(0, 5),
            Err(StoreError::OutOfRange { index: 5, len: 2 })
        );
        assert_eq!(store.ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_own_patch_is_suppressed() {
        let storage = storage_with(&["a", "b"]);
        let (store, metrics) = attach(&storage);
        let seen = record(&store);

        storage.broadcast_order_changed(OrderChange::Moved {
            id: "a".to_string(),
            from: 0,
            to: 1,
            origin: store.id(),
        });

        assert!(seen.lock().is_empty());
        assert_eq!(metrics.suppressed_rebuilds.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_foreign_patch_applied_in_place() {
        let storage = storage_with(&["a", "b", "c"]);
        let (store, metrics) = attach(&storage);
        let seen = record(&store);

        storage.reorder_silently(0, 2);
        storage.broadcast_order_changed(OrderChange::Moved {
            id: "a".to_string(),
            from: 0,
            to: 2,
            origin: StoreId::next(),
        });

        assert_eq!(store.ids(), vec!["b", "c", "a"]);
        assert_eq!(*seen.lock(), vec![ModelChange::Moved { from: 0, to: 2 }]);
        assert_eq!(metrics.patches_applied.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_stale_patch_falls_back_to_rebuild() {
        let storage = storage_with(&["a", "b", "c"]);
        let (store, _) = attach(&storage);
        let seen = record(&store);

        storage.reorder_silently(2, 0);
        storage.broadcast_order_changed(OrderChange::Moved {
            id: "x".to_string(),
            from: 2,
            to: 0,
            origin: StoreId::next(),
        });

        assert_eq!(store.ids(), vec!["c", "a", "b"]);
        assert_eq!(*seen.lock(), vec![ModelChange::Structural]);
    }

    #[test]
    fn test_detach_stops_following_storage() {
        let storage = storage_with(&["a"]);
        let (store, _) = attach(&storage);
        store.detach();

        storage.push("b", Configuration::addon(true));
        assert_eq!(store.count(), 1);
        assert_eq!(storage.events().connection_count(), 0);
    }

    #[test]
    fn test_dropped_store_disconnects() {
        let storage = storage_with(&["a"]);
        let (store, _) = attach(&storage);
        assert_eq!(storage.events().connection_count(), 1);

        drop(store);
        assert_eq!(storage.events().connection_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_move_round_trip(len in 1usize..12, a in 0usize..12, b in 0usize..12) {
            let ids: Vec<String> = (0..len).map(|i| format!("id{i}")).collect();
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            let storage = storage_with(&refs);
            let (store, _) = attach(&storage);
            let (from, to) = (a % len, b % len);
            let before = store.ids();

            match store.move_item(from, to) {
                Ok(()) => {
                    store.move_item(to, from).unwrap();
                }
                Err(e) => prop_assert_eq!(e, StoreError::SameIndex(from)),
            }

            prop_assert_eq!(store.ids(), before);
        }

        #[test]
        fn prop_count_matches_addon_identifiers(kinds in proptest::collection::vec(any::<bool>(), 0..16)) {
            let storage = Arc::new(MemoryStorage::default());
            for (i, is_addon) in kinds.iter().enumerate() {
                let id = format!("id{i}");
                if *is_addon {
                    storage.push(id, Configuration::addon(true));
                } else {
                    storage.add_separator(Separator { id: id.clone(), name: id.clone() });
                    storage.push(id, Configuration::separator());
                }
            }
            let (store, _) = attach(&storage);

            prop_assert_eq!(store.count(), kinds.iter().filter(|k| **k).count());
        }
    }
}
