//! Storage collaborator.
//!
//! [`AddonStorage`] is everything the core consumes from the backing store: the
//! interleaved load order, per-identifier configuration and entries, a silent
//! reorder, an explicit order-changed broadcast, and a synchronous event signal.
//! [`MemoryStorage`] is the in-process implementation used by the binary and the
//! tests; it also mirrors every event onto a tokio broadcast channel for async
//! consumers.

use crate::models::{Configuration, Entry, Separator, StorageSnapshot};
use crate::observe::Signal;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Identifies one [`OrderedCollectionStore`](crate::state::OrderedCollectionStore)
/// so it can recognise order patches it published itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// How the load order changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderChange {
    /// Anything may have moved; consumers re-derive the whole order.
    Replaced,

    /// One addon moved between two positions of the addon-only sequence.
    Moved {
        id: String,
        from: usize,
        to: usize,
        origin: StoreId,
    },
}

/// Change notifications emitted by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    EntriesChanged,
    OrderChanged(OrderChange),
    /// Self-applied by whichever widget made the change; stores ignore it.
    ConfigurationChanged { id: String },
    AddonsEnabledChanged(bool),
}

/// Everything the core reads from or asks of the backing store.
#[cfg_attr(test, mockall::automock)]
pub trait AddonStorage: Send + Sync {
    /// Persisted order, addon and separator identifiers interleaved.
    fn ordered_identifiers(&self) -> Vec<String>;

    fn configuration_for(&self, id: &str) -> Option<Configuration>;

    fn entry_for(&self, id: &str) -> Option<Entry>;

    /// Stand-in for an identifier with no live entry. Never absent.
    fn placeholder_entry_for(&self, id: &str) -> Entry;

    fn separator_for(&self, id: &str) -> Option<Separator>;

    /// Move the identifier at `from` to `to` in the persisted order without
    /// emitting any event. Returns `false` if either position is invalid.
    fn reorder_silently(&self, from: usize, to: usize) -> bool;

    /// Tell every listener the order changed.
    fn broadcast_order_changed(&self, change: OrderChange);

    fn addons_enabled(&self) -> bool;

    /// Synchronous event source.
    fn events(&self) -> Arc<Signal<StorageEvent>>;
}

#[derive(Debug, Default)]
struct StorageData {
    order: Vec<String>,
    configurations: IndexMap<String, Configuration>,
    entries: IndexMap<String, Entry>,
    separators: IndexMap<String, Separator>,
    addons_enabled: bool,
}

/// In-memory [`AddonStorage`].
pub struct MemoryStorage {
    data: RwLock<StorageData>,
    events: Arc<Signal<StorageEvent>>,
    broadcast_tx: broadcast::Sender<StorageEvent>,
}

impl MemoryStorage {
    /// Empty storage with an async event buffer of `capacity`.
    pub fn new(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            data: RwLock::new(StorageData {
                addons_enabled: true,
                ..Default::default()
            }),
            events: Arc::new(Signal::new()),
            broadcast_tx,
        }
    }

    pub fn from_snapshot(snapshot: StorageSnapshot, capacity: usize) -> Self {
        let storage = Self::new(capacity);
        {
            let mut data = storage.data.write();
            data.order = snapshot.order;
            data.configurations = snapshot.configurations;
            data.entries = snapshot
                .entries
                .into_iter()
                .map(|entry| (entry.id.clone(), entry))
                .collect();
            data.separators = snapshot
                .separators
                .into_iter()
                .map(|sep| (sep.id.clone(), sep))
                .collect();
            data.addons_enabled = snapshot.addons_enabled;
        }
        tracing::info!(
            "Storage seeded: {} ordered identifiers, {} entries",
            storage.data.read().order.len(),
            storage.data.read().entries.len()
        );
        storage
    }

    pub fn snapshot(&self) -> StorageSnapshot {
        let data = self.data.read();
        StorageSnapshot {
            order: data.order.clone(),
            configurations: data.configurations.clone(),
            entries: data.entries.values().cloned().collect(),
            separators: data.separators.values().cloned().collect(),
            addons_enabled: data.addons_enabled,
        }
    }

    /// Subscribe to storage events from async code.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Replace the entry table.
    pub fn set_entries(&self, entries: Vec<Entry>) {
        self.data.write().entries = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();
        self.emit(StorageEvent::EntriesChanged);
    }

    /// Insert or replace one entry.
    pub fn upsert_entry(&self, entry: Entry) {
        self.data.write().entries.insert(entry.id.clone(), entry);
        self.emit(StorageEvent::EntriesChanged);
    }

    pub fn remove_entry(&self, id: &str) -> Option<Entry> {
        let removed = self.data.write().entries.shift_remove(id);
        if removed.is_some() {
            self.emit(StorageEvent::EntriesChanged);
        }
        removed
    }

    /// Replace the whole load order.
    pub fn set_order(&self, order: Vec<String>) {
        self.data.write().order = order;
        self.emit(StorageEvent::OrderChanged(OrderChange::Replaced));
    }

    /// Append an identifier with its configuration.
    pub fn push(&self, id: impl Into<String>, configuration: Configuration) {
        let id = id.into();
        {
            let mut data = self.data.write();
            data.configurations.insert(id.clone(), configuration);
            data.order.push(id);
        }
        self.emit(StorageEvent::OrderChanged(OrderChange::Replaced));
    }

    pub fn add_separator(&self, separator: Separator) {
        self.data
            .write()
            .separators
            .insert(separator.id.clone(), separator);
    }

    pub fn set_configuration(&self, id: impl Into<String>, configuration: Configuration) {
        let id = id.into();
        self.data
            .write()
            .configurations
            .insert(id.clone(), configuration);
        self.emit(StorageEvent::ConfigurationChanged { id });
    }

    /// Reorder and announce a generic order change.
    pub fn reorder(&self, from: usize, to: usize) -> bool {
        if !self.reorder_silently(from, to) {
            return false;
        }
        self.emit(StorageEvent::OrderChanged(OrderChange::Replaced));
        true
    }

    pub fn set_addons_enabled(&self, enabled: bool) {
        {
            let mut data = self.data.write();
            if data.addons_enabled == enabled {
                return;
            }
            data.addons_enabled = enabled;
        }
        self.emit(StorageEvent::AddonsEnabledChanged(enabled));
    }

    /// Deliver an event to synchronous listeners, then to async subscribers.
    fn emit(&self, event: StorageEvent) {
        tracing::debug!("Storage event: {:?}", event);
        self.events.emit(event.clone());
        // Ignore send errors - it's OK if no one is listening
        let _ = self.broadcast_tx.send(event);
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(100)
    }
}

impl AddonStorage for MemoryStorage {
    fn ordered_identifiers(&self) -> Vec<String> {
        self.data.read().order.clone()
    }

    fn configuration_for(&self, id: &str) -> Option<Configuration> {
        self.data.read().configurations.get(id).cloned()
    }

    fn entry_for(&self, id: &str) -> Option<Entry> {
        self.data.read().entries.get(id).cloned()
    }

    fn placeholder_entry_for(&self, id: &str) -> Entry {
        Entry::placeholder(id)
    }

    fn separator_for(&self, id: &str) -> Option<Separator> {
        self.data.read().separators.get(id).cloned()
    }

    fn reorder_silently(&self, from: usize, to: usize) -> bool {
        let mut data = self.data.write();
        let len = data.order.len();
        if from >= len || to >= len {
            tracing::warn!("Rejected reorder {} -> {} of {} identifiers", from, to, len);
            return false;
        }
        let id = data.order.remove(from);
        data.order.insert(to, id);
        true
    }

    fn broadcast_order_changed(&self, change: OrderChange) {
        self.emit(StorageEvent::OrderChanged(change));
    }

    fn addons_enabled(&self) -> bool {
        self.data.read().addons_enabled
    }

    fn events(&self) -> Arc<Signal<StorageEvent>> {
        Arc::clone(&self.events)
    }
}
