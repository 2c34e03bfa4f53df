// Row binding lifecycle
//
// Attaches the observers that keep a recycled row in sync with one view item
// and tears them down again when the row moves on to another item.

use crate::metrics::Metrics;
use crate::models::{LaunchpadSettings, ViewItem};
use crate::observe::{ReleaseError, Subscription, bind_one_way, bind_two_way};
use crate::ui::row::{MenuEntry, RowWidgets, ToggleTarget};
use std::sync::Arc;
use thiserror::Error;

/// Binding misuse or incomplete teardown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("row is already bound to {bound}; refusing to bind {requested}")]
    AlreadyBound { bound: String, requested: String },

    #[error("row is not bound")]
    NotBound,

    #[error("row is bound to {bound}, not {requested}")]
    ItemMismatch { bound: String, requested: String },

    #[error("{} of {} binding handles failed to release", .failures.len(), .released + .failures.len())]
    PartialRelease {
        released: usize,
        failures: Vec<ReleaseError>,
    },
}

/// Every observer handle created for one bound row.
#[derive(Debug, Default)]
pub struct BindingSet {
    property_bindings: Vec<Subscription>,
    event_subscriptions: Vec<Subscription>,
}

impl BindingSet {
    pub fn len(&self) -> usize {
        self.property_bindings.len() + self.event_subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn labels(&self) -> Vec<&str> {
        self.property_bindings
            .iter()
            .chain(&self.event_subscriptions)
            .map(Subscription::label)
            .collect()
    }

    /// Release every handle, continuing past failures. Returns the number
    /// released cleanly and the failures.
    fn release_all(self) -> (usize, Vec<ReleaseError>) {
        let mut released = 0;
        let mut failures = Vec::new();

        for handle in self.property_bindings.into_iter().chain(self.event_subscriptions) {
            match handle.release() {
                Ok(()) => released += 1,
                Err(e) => failures.push(e),
            }
        }

        (released, failures)
    }
}

/// Binding state of a row.
#[derive(Debug, Default)]
pub enum SlotState {
    #[default]
    Empty,
    Bound {
        item: Arc<ViewItem>,
        bindings: BindingSet,
    },
}

/// A recyclable row: its widgets plus what they are currently bound to.
///
/// The state only changes through [`BindingLifecycleManager`].
#[derive(Debug, Default)]
pub struct RowSlot {
    widgets: Arc<RowWidgets>,
    state: SlotState,
}

impl RowSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn widgets(&self) -> &Arc<RowWidgets> {
        &self.widgets
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, SlotState::Bound { .. })
    }

    pub fn item(&self) -> Option<&Arc<ViewItem>> {
        match &self.state {
            SlotState::Bound { item, .. } => Some(item),
            SlotState::Empty => None,
        }
    }

    pub fn bindings(&self) -> Option<&BindingSet> {
        match &self.state {
            SlotState::Bound { bindings, .. } => Some(bindings),
            SlotState::Empty => None,
        }
    }
}

/// What [`BindingLifecycleManager::assign`] did to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Already bound to this exact item
    Unchanged,
    /// Was empty, now bound
    Bound,
    /// Same addon, new item instance (after a rebuild)
    Refreshed,
    /// Moved on to a different addon
    Rebound,
    /// Bound before, empty now
    Cleared,
}

/// Binds rows to view items and releases those bindings again.
///
/// Display labels are one-way bindings from the item; the enable switch is a
/// two-way binding; the switch's action target is an event subscription that
/// publishes the inverse of the current state.
#[derive(Debug, Clone)]
pub struct BindingLifecycleManager {
    metrics: Arc<Metrics>,
    placeholder_title: String,
}

impl BindingLifecycleManager {
    pub fn new(metrics: Arc<Metrics>, placeholder_title: impl Into<String>) -> Self {
        Self {
            metrics,
            placeholder_title: placeholder_title.into(),
        }
    }

    pub fn from_settings(metrics: Arc<Metrics>, settings: &LaunchpadSettings) -> Self {
        Self::new(metrics, settings.placeholder_title.clone())
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Bind an empty row to `item`.
    pub fn bind(&self, slot: &mut RowSlot, item: &Arc<ViewItem>) -> Result<(), BindingError> {
        if let SlotState::Bound { item: bound, .. } = &slot.state {
            tracing::warn!("Refusing to bind {} over {}", item.id(), bound.id());
            return Err(BindingError::AlreadyBound {
                bound: bound.id().to_string(),
                requested: item.id().to_string(),
            });
        }

        let bindings = self.create_bindings(&slot.widgets, item);
        self.metrics.record_bind(bindings.len());
        tracing::debug!("Bound row to {} ({} handles)", item.id(), bindings.len());

        slot.state = SlotState::Bound {
            item: Arc::clone(item),
            bindings,
        };
        Ok(())
    }

    /// Unbind a row from `item`, releasing every handle it holds.
    ///
    /// Release failures do not stop the teardown: every other handle is still
    /// released, the row is left empty, and the failures are reported together.
    pub fn unbind(&self, slot: &mut RowSlot, item: &ViewItem) -> Result<(), BindingError> {
        match &slot.state {
            SlotState::Empty => return Err(BindingError::NotBound),
            SlotState::Bound { item: bound, .. } if bound.id() != item.id() => {
                return Err(BindingError::ItemMismatch {
                    bound: bound.id().to_string(),
                    requested: item.id().to_string(),
                });
            }
            SlotState::Bound { .. } => {}
        }
        self.teardown(slot)
    }

    /// Unbind whatever the row is bound to. Empty rows are left alone.
    pub fn clear(&self, slot: &mut RowSlot) -> Result<(), BindingError> {
        if slot.is_bound() {
            self.teardown(slot)
        } else {
            Ok(())
        }
    }

    /// Point a recycled row at `item`, doing as little as possible.
    pub fn assign(
        &self,
        slot: &mut RowSlot,
        item: Option<&Arc<ViewItem>>,
    ) -> Result<Assignment, BindingError> {
        let Some(item) = item else {
            return if slot.is_bound() {
                self.teardown(slot)?;
                Ok(Assignment::Cleared)
            } else {
                Ok(Assignment::Unchanged)
            };
        };

        let outcome = match slot.item() {
            Some(bound) if Arc::ptr_eq(bound, item) => return Ok(Assignment::Unchanged),
            Some(bound) if bound.id() == item.id() => Assignment::Refreshed,
            Some(_) => Assignment::Rebound,
            None => Assignment::Bound,
        };

        if outcome != Assignment::Bound {
            if let Err(e) = self.teardown(slot) {
                tracing::warn!("Recycling row for {}: {}", item.id(), e);
            }
        }
        self.bind(slot, item)?;
        Ok(outcome)
    }

    fn teardown(&self, slot: &mut RowSlot) -> Result<(), BindingError> {
        let SlotState::Bound { item, bindings } = std::mem::take(&mut slot.state) else {
            return Err(BindingError::NotBound);
        };

        let handles = bindings.len();
        let (released, failures) = bindings.release_all();
        self.metrics.record_unbind(handles, failures.len());
        slot.widgets.reset();
        tracing::debug!("Unbound row from {} ({} handles)", item.id(), handles);

        if failures.is_empty() {
            Ok(())
        } else {
            for failure in &failures {
                tracing::warn!("Unbinding {}: {}", item.id(), failure);
            }
            Err(BindingError::PartialRelease { released, failures })
        }
    }

    fn create_bindings(&self, widgets: &Arc<RowWidgets>, item: &Arc<ViewItem>) -> BindingSet {
        let id = item.id();
        let mut set = BindingSet::default();
        let label = |what: &str| format!("{id}: {what}");

        if item.is_placeholder() {
            widgets.title().set(self.placeholder_title.clone());
            widgets.warning_visible().set(true);
        } else {
            set.property_bindings.push(bind_one_way(
                item,
                ViewItem::name,
                widgets,
                RowWidgets::title,
                String::clone,
                &label("name -> title"),
            ));
            widgets.warning_visible().set(false);
        }

        set.property_bindings.extend([
            bind_one_way(
                item,
                ViewItem::name,
                widgets,
                RowWidgets::heading,
                String::clone,
                &label("name -> heading"),
            ),
            bind_one_way(
                item,
                ViewItem::description_short,
                widgets,
                RowWidgets::excerpt,
                String::clone,
                &label("excerpt"),
            ),
            bind_one_way(
                item,
                ViewItem::description,
                widgets,
                RowWidgets::description,
                String::clone,
                &label("description"),
            ),
            bind_one_way(
                item,
                ViewItem::last_update,
                widgets,
                RowWidgets::last_update,
                String::clone,
                &label("last update"),
            ),
            bind_one_way(
                item,
                ViewItem::has_archive,
                widgets,
                RowWidgets::no_archive_visible,
                |has_archive: &bool| !*has_archive,
                &label("has archive -> no-archive icon"),
            ),
            bind_one_way(
                item,
                ViewItem::install_missing_archive,
                widgets,
                RowWidgets::install_archive_visible,
                |install: &bool| *install,
                &label("install missing archive"),
            ),
        ]);
        set.property_bindings.extend(bind_two_way(
            item,
            ViewItem::enabled,
            widgets,
            RowWidgets::toggle_active,
            &label("enabled <-> switch"),
        ));

        let publish = {
            let weak_widgets = Arc::downgrade(widgets);
            let id = id.to_string();
            move |enabled: &bool| {
                if let Some(widgets) = weak_widgets.upgrade() {
                    widgets.toggle_target().set(Some(ToggleTarget {
                        id: id.clone(),
                        next: !*enabled,
                    }));
                }
            }
        };
        item.enabled().with(&publish);
        let connection = item.enabled().observe(publish);
        set.event_subscriptions.push(Subscription::new(
            label("enabled -> switch target"),
            item.enabled().changed(),
            connection,
        ));

        widgets.subtitle().set(id.to_string());
        widgets.action_target().set(Some(id.to_string()));
        widgets.menu().set(MenuEntry::reorder_entries(id));

        set
    }
}
