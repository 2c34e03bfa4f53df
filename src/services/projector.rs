//! Entry + configuration → [`ViewItem`].

use crate::models::config::{default_excerpt_length, default_timestamp_format};
use crate::models::{AddonFlags, Configuration, Entry, LaunchpadSettings, ViewItem, ViewItemError, ViewItemInit};
use crate::services::markup::{MarkupTransform, TextTransform};
use chrono::format::{Item, StrftimeItems};
use std::fmt::Write;
use std::sync::Arc;

/// Projects storage records into view items.
///
/// Projection is deterministic and never fails on display data: a description
/// whose markup does not validate falls back to its escaped plain text. The only
/// failure is an entry whose flag bits are outside [`AddonFlags::KNOWN`].
#[derive(Clone)]
pub struct ViewItemProjector {
    transform: Arc<dyn TextTransform>,
    excerpt_length: usize,
    timestamp_format: String,
}

impl ViewItemProjector {
    pub fn new(transform: Arc<dyn TextTransform>) -> Self {
        Self {
            transform,
            excerpt_length: default_excerpt_length(),
            timestamp_format: default_timestamp_format(),
        }
    }

    pub fn from_settings(transform: Arc<dyn TextTransform>, settings: &LaunchpadSettings) -> Self {
        Self {
            transform,
            excerpt_length: settings.excerpt_length,
            timestamp_format: checked_timestamp_format(&settings.timestamp_format),
        }
    }

    pub fn with_excerpt_length(mut self, excerpt_length: usize) -> Self {
        self.excerpt_length = excerpt_length;
        self
    }

    /// Project an entry. `configuration` absent means the entry starts disabled.
    pub fn project(
        &self,
        entry: &Entry,
        configuration: Option<&Configuration>,
    ) -> Result<ViewItem, ViewItemError> {
        ViewItem::new(self.init(entry, configuration))
    }

    /// Project an entry, masking off unknown flag bits instead of failing.
    ///
    /// The violation is still logged as an error: it means the flag set and
    /// its validity mask no longer agree.
    pub fn project_or_mask(&self, entry: &Entry, configuration: Option<&Configuration>) -> ViewItem {
        let init = self.init(entry, configuration);
        let masked = AddonFlags::from_bits_truncate(init.flags);

        match ViewItem::new(init.clone()) {
            Ok(item) => item,
            Err(e) => {
                tracing::error!("{} - dropping unknown bits", e);
                ViewItem::with_flags(init, masked)
            }
        }
    }

    fn init(&self, entry: &Entry, configuration: Option<&Configuration>) -> ViewItemInit {
        let title = entry.title.as_deref().unwrap_or_default();
        let description = entry.description.as_deref().unwrap_or_default();

        ViewItemInit {
            id: entry.id.clone(),
            name: self.transform.escape(title),
            description: self.description(description),
            description_short: self.excerpt(description),
            last_update: self.last_update(entry),
            enabled: configuration.is_some_and(|c| c.active),
            flags: entry.flags,
            has_archive: entry.has_archive(),
            install_missing_archive: entry.can_install_missing_archive(),
        }
    }

    fn description(&self, description: &str) -> String {
        match self.transform.rich(description) {
            Ok(markup) => markup,
            Err(e) => {
                tracing::debug!("Description markup rejected ({}), using plain text", e);
                self.transform.escape(description)
            }
        }
    }

    fn excerpt(&self, description: &str) -> String {
        let excerpt: String = description.chars().take(self.excerpt_length).collect();
        self.transform.escape(&excerpt)
    }

    fn last_update(&self, entry: &Entry) -> String {
        let Some(time) = entry.time_updated else {
            return String::new();
        };

        let mut label = String::new();
        if write!(label, "{}", time.format(&self.timestamp_format)).is_err() {
            tracing::warn!(
                "Could not format last update of {} with '{}'",
                entry.id,
                self.timestamp_format
            );
            label.clear();
            let _ = write!(label, "{}", time.format(&default_timestamp_format()));
        }
        label
    }
}

/// `format` if chrono understands every specifier in it, the default otherwise.
fn checked_timestamp_format(format: &str) -> String {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        tracing::warn!(
            "Invalid timestamp format '{}', using '{}'",
            format,
            default_timestamp_format()
        );
        return default_timestamp_format();
    }
    format.to_string()
}

impl Default for ViewItemProjector {
    fn default() -> Self {
        Self::new(Arc::new(MarkupTransform::new()))
    }
}
