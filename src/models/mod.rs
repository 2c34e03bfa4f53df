//! Data models for the launchpad.
//!
//! - [`Entry`], [`Configuration`], [`Separator`]: storage-owned records the core only reads
//! - [`AddonFlags`]: validated capability bitset
//! - [`ViewItem`]: the observable, display-ready projection of one addon
//! - [`LaunchpadSettings`], [`StorageSnapshot`]: YAML documents loaded by
//!   [`ConfigManager`](crate::config::ConfigManager)

pub mod addon;
pub mod config;
pub mod view_item;

pub use addon::{AddonFlags, Configuration, Entry, ItemKind, OrderedEntry, Separator};
pub use config::{LaunchpadSettings, StorageSnapshot};
pub use view_item::{ViewItem, ViewItemError, ViewItemInit};
