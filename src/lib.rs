// Launchpad - load-order projection and synchronization engine
//
// This is the library crate: it projects storage records into observable view
// items, keeps an ordered store of them in sync with storage, binds recycled
// rows to those items, and applies drag-and-drop reorders without rebuilding.
// The binary crate (main.rs) runs a headless session over a YAML snapshot.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod observe;
pub mod services;
pub mod state;
pub mod storage;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{Configuration, Entry, LaunchpadSettings, StorageSnapshot, ViewItem};
pub use services::ViewItemProjector;
pub use state::{ModelChange, OrderedCollectionStore};
pub use storage::{AddonStorage, MemoryStorage, OrderChange, StorageEvent};
pub use ui::{BindingLifecycleManager, LaunchpadPage, ReorderCoordinator};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
