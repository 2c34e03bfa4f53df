// Section view and launchpad page
//
// SectionView is a list of recycled rows rendering a store. LaunchpadPage owns
// one, keeps it in step with the store's notifications, and carries the global
// "addons enabled" switch.

use crate::models::ViewItem;
use crate::observe::{Property, Subscription};
use crate::state::{ModelChange, OrderedCollectionStore};
use crate::storage::StorageEvent;
use crate::ui::binding::{Assignment, BindingLifecycleManager, RowSlot};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

type ItemFilter = Box<dyn Fn(&ViewItem) -> bool + Send + Sync>;

/// Tally of what a refresh did to the rows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub unchanged: usize,
    pub bound: usize,
    pub refreshed: usize,
    pub rebound: usize,
    pub cleared: usize,
    pub failures: usize,
}

impl RefreshReport {
    pub(crate) fn record(&mut self, assignment: Assignment) {
        match assignment {
            Assignment::Unchanged => self.unchanged += 1,
            Assignment::Bound => self.bound += 1,
            Assignment::Refreshed => self.refreshed += 1,
            Assignment::Rebound => self.rebound += 1,
            Assignment::Cleared => self.cleared += 1,
        }
    }

    /// Rows whose bindings were touched.
    pub fn touched(&self) -> usize {
        self.bound + self.refreshed + self.rebound + self.cleared
    }
}

/// A titled list of rows rendering the items of a store.
pub struct SectionView {
    title: Property<String>,
    subtitle: Property<String>,
    visible: Property<bool>,
    sensitive: Property<bool>,
    filter: Option<ItemFilter>,
    rows: Vec<RowSlot>,
    manager: BindingLifecycleManager,
}

impl SectionView {
    pub fn new(title: impl Into<String>, manager: BindingLifecycleManager) -> Self {
        Self {
            title: Property::new(title.into()),
            subtitle: Property::default(),
            visible: Property::new(false),
            sensitive: Property::new(true),
            filter: None,
            rows: Vec::new(),
            manager,
        }
    }

    /// Only show items accepted by `filter`.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ViewItem) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn title(&self) -> &Property<String> {
        &self.title
    }

    pub fn subtitle(&self) -> &Property<String> {
        &self.subtitle
    }

    /// Hidden while there are no rows.
    pub fn visible(&self) -> &Property<bool> {
        &self.visible
    }

    pub fn sensitive(&self) -> &Property<bool> {
        &self.sensitive
    }

    pub fn rows(&self) -> &[RowSlot] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&RowSlot> {
        self.rows.get(index)
    }

    /// Identifiers of the bound rows, top to bottom.
    pub fn bound_ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.item().map(|item| item.id().to_string()))
            .collect()
    }

    fn accepts(&self, item: &ViewItem) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(item))
    }

    /// Re-query the whole store and recycle rows onto its items.
    pub fn refresh_all(&mut self, store: &OrderedCollectionStore) -> RefreshReport {
        let items: Vec<Arc<ViewItem>> = store
            .items()
            .into_iter()
            .filter(|item| self.accepts(item))
            .collect();
        let mut report = RefreshReport::default();

        for (index, item) in items.iter().enumerate() {
            if index == self.rows.len() {
                self.rows.push(RowSlot::new());
            }
            match self.manager.assign(&mut self.rows[index], Some(item)) {
                Ok(assignment) => report.record(assignment),
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!("Row {} of section '{}': {}", index, self.title.get(), e);
                }
            }
        }

        let surplus: Vec<RowSlot> = self.rows.drain(items.len()..).collect();
        for mut slot in surplus {
            match self.manager.clear(&mut slot) {
                Ok(()) => report.cleared += 1,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!("Dropping row of section '{}': {}", self.title.get(), e);
                }
            }
        }

        self.visible.set(!self.rows.is_empty());
        tracing::debug!("Section '{}' refreshed: {:?}", self.title.get(), report);
        report
    }

    /// Follow a single move in the store by moving the row itself.
    ///
    /// Falls back to [`refresh_all`](Self::refresh_all) when rows and store do
    /// not line up one to one. Returns `true` when the move was patched.
    pub fn apply_move(&mut self, store: &OrderedCollectionStore, from: usize, to: usize) -> bool {
        if self.patchable(store, from, to) {
            let slot = self.rows.remove(from);
            self.rows.insert(to, slot);
            tracing::debug!("Section '{}' moved row {} -> {}", self.title.get(), from, to);
            return true;
        }

        self.refresh_all(store);
        false
    }

    fn patchable(&self, store: &OrderedCollectionStore, from: usize, to: usize) -> bool {
        if self.filter.is_some() || self.rows.len() != store.count() {
            return false;
        }
        let moved = self.rows.get(from).and_then(RowSlot::item);
        let landed = store.item_at(to);
        match (moved, landed) {
            (Some(moved), Some(landed)) => Arc::ptr_eq(moved, &landed),
            _ => false,
        }
    }

    /// Unbind every row and drop them.
    pub fn teardown(&mut self) -> RefreshReport {
        let mut report = RefreshReport::default();
        for mut slot in self.rows.drain(..) {
            match self.manager.clear(&mut slot) {
                Ok(()) => report.cleared += 1,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!("Tearing down section '{}': {}", self.title.get(), e);
                }
            }
        }
        self.visible.set(false);
        report
    }
}

impl fmt::Debug for SectionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionView")
            .field("title", &self.title.get())
            .field("rows", &self.rows.len())
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

/// The addon list page.
///
/// Structural store changes refresh the section, moves patch it. The global
/// switch mirrors storage's "addons enabled" flag, publishes its inverse as
/// the switch action, and makes the section insensitive while addons are off.
pub struct LaunchpadPage {
    store: Arc<OrderedCollectionStore>,
    section: Mutex<SectionView>,
    addons_enabled: Property<bool>,
    enable_target: Property<bool>,
    links: Mutex<Vec<Subscription>>,
}

impl LaunchpadPage {
    pub fn new(store: Arc<OrderedCollectionStore>, manager: BindingLifecycleManager) -> Arc<Self> {
        Self::with_section(store, SectionView::new("Add-ons", manager))
    }

    pub fn with_section(store: Arc<OrderedCollectionStore>, section: SectionView) -> Arc<Self> {
        let page = Arc::new(Self {
            store,
            section: Mutex::new(section),
            addons_enabled: Property::new(true),
            enable_target: Property::new(false),
            links: Mutex::new(Vec::new()),
        });

        let changes = page.store.changed();
        let weak = Arc::downgrade(&page);
        let connection = changes.connect(move |change| {
            if let Some(page) = weak.upgrade() {
                page.on_model_change(*change);
            }
        });
        page.links
            .lock()
            .push(Subscription::new("page: store changes", changes, connection));

        let events = page.store.storage().events();
        let weak = Arc::downgrade(&page);
        let connection = events.connect(move |event| {
            if let StorageEvent::AddonsEnabledChanged(enabled) = event {
                if let Some(page) = weak.upgrade() {
                    page.apply_addons_enabled(*enabled);
                }
            }
        });
        page.links
            .lock()
            .push(Subscription::new("page: addons enabled", &events, connection));

        page.apply_addons_enabled(page.store.storage().addons_enabled());
        page.section.lock().refresh_all(&page.store);
        tracing::info!("Launchpad page ready with {} addons", page.store.count());
        page
    }

    pub fn store(&self) -> &Arc<OrderedCollectionStore> {
        &self.store
    }

    pub fn addons_enabled(&self) -> &Property<bool> {
        &self.addons_enabled
    }

    /// Value the global switch action sets when activated.
    pub fn enable_target(&self) -> &Property<bool> {
        &self.enable_target
    }

    /// Run `f` against the section.
    pub fn section<R>(&self, f: impl FnOnce(&SectionView) -> R) -> R {
        f(&self.section.lock())
    }

    fn on_model_change(&self, change: ModelChange) {
        let mut section = self.section.lock();
        match change {
            ModelChange::Structural => {
                section.refresh_all(&self.store);
            }
            ModelChange::Moved { from, to } => {
                section.apply_move(&self.store, from, to);
            }
        }
    }

    fn apply_addons_enabled(&self, enabled: bool) {
        self.addons_enabled.set(enabled);
        self.enable_target.set(!enabled);
        self.section.lock().sensitive().set(enabled);
    }

    /// Disconnect from the store and storage and unbind every row.
    pub fn teardown(&self) -> RefreshReport {
        for link in self.links.lock().drain(..) {
            if let Err(e) = link.release() {
                tracing::warn!("Tearing down page: {}", e);
            }
        }
        self.section.lock().teardown()
    }
}

impl fmt::Debug for LaunchpadPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchpadPage")
            .field("store", &self.store.id())
            .field("addons_enabled", &self.addons_enabled.get())
            .finish()
    }
}
