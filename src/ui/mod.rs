// UI module - headless view layer
//
// This module contains:
// - RowWidgets: observable model of one addon row
// - BindingLifecycleManager: binds recycled rows to view items and releases them
// - ReorderCoordinator: drag and keyboard reordering without full rebuilds
// - SectionView / LaunchpadPage: the list of rows and the page that owns it
// - Viewport: a virtualized window of rows over a store

pub mod binding;
pub mod reorder;
pub mod row;
pub mod section;
pub mod viewport;

pub use binding::{Assignment, BindingError, BindingLifecycleManager, BindingSet, RowSlot, SlotState};
pub use reorder::{DragState, DropOutcome, ReorderCoordinator, ReorderError};
pub use row::{MenuEntry, RowWidgets, ToggleTarget};
pub use section::{LaunchpadPage, RefreshReport, SectionView};
pub use viewport::Viewport;
