use crate::models::addon::{Configuration, Entry, Separator};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Application settings from `launchpad.yaml`, overridable through
/// `LAUNCHPAD_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchpadSettings {
    /// Characters kept in a row's description excerpt.
    pub excerpt_length: usize,

    /// chrono format string for the last-update label.
    pub timestamp_format: String,

    /// Row title shown for identifiers with no live entry.
    pub placeholder_title: String,

    /// Buffer of the async storage-event channel.
    pub broadcast_capacity: usize,

    pub log_dir: String,

    pub debug_mode: bool,
}

impl Default for LaunchpadSettings {
    fn default() -> Self {
        Self {
            excerpt_length: default_excerpt_length(),
            timestamp_format: default_timestamp_format(),
            placeholder_title: default_placeholder_title(),
            broadcast_capacity: 100,
            log_dir: "logs".to_string(),
            debug_mode: false,
        }
    }
}

pub(crate) fn default_excerpt_length() -> usize {
    100
}

pub(crate) fn default_timestamp_format() -> String {
    "%a %b %d %Y @ %H:%M:%S".to_string()
}

pub(crate) fn default_placeholder_title() -> String {
    "<i>Unknown add-on</i>".to_string()
}

/// Storage contents in one document. Used to seed an in-memory storage for a
/// headless session or a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSnapshot {
    /// Addon and separator identifiers, interleaved.
    #[serde(default)]
    pub order: Vec<String>,

    #[serde(default)]
    pub configurations: IndexMap<String, Configuration>,

    #[serde(default)]
    pub entries: Vec<Entry>,

    #[serde(default)]
    pub separators: Vec<Separator>,

    #[serde(default = "default_addons_enabled")]
    pub addons_enabled: bool,
}

impl Default for StorageSnapshot {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            configurations: IndexMap::new(),
            entries: Vec::new(),
            separators: Vec::new(),
            addons_enabled: default_addons_enabled(),
        }
    }
}

fn default_addons_enabled() -> bool {
    true
}
