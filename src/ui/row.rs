use crate::observe::Property;

/// Action published by a row's enable switch: activating it sets addon `id`
/// to `next`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToggleTarget {
    pub id: String,
    pub next: bool,
}

/// One entry of a row's context menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: String,
    pub action: String,
    pub target: String,
}

pub const MOVE_UP_ACTION: &str = "addons.move-up";
pub const MOVE_DOWN_ACTION: &str = "addons.move-down";

impl MenuEntry {
    /// The reorder entries every addon row carries.
    pub fn reorder_entries(id: &str) -> Vec<MenuEntry> {
        vec![
            MenuEntry {
                label: "Move Up".to_string(),
                action: MOVE_UP_ACTION.to_string(),
                target: id.to_string(),
            },
            MenuEntry {
                label: "Move Down".to_string(),
                action: MOVE_DOWN_ACTION.to_string(),
                target: id.to_string(),
            },
        ]
    }
}

/// Headless model of the widgets in one addon row.
///
/// Rows are recycled: the same `RowWidgets` is bound to a sequence of items
/// over its lifetime, so every field is an observable [`Property`] and
/// [`reset`](Self::reset) returns it to the blank state.
#[derive(Debug, Default)]
pub struct RowWidgets {
    title: Property<String>,
    heading: Property<String>,
    subtitle: Property<String>,
    excerpt: Property<String>,
    description: Property<String>,
    last_update: Property<String>,

    toggle_active: Property<bool>,
    toggle_target: Property<Option<ToggleTarget>>,

    /// Addon id targeted by the details, remove and install-archive actions
    action_target: Property<Option<String>>,
    menu: Property<Vec<MenuEntry>>,

    warning_visible: Property<bool>,
    no_archive_visible: Property<bool>,
    install_archive_visible: Property<bool>,
}

impl RowWidgets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> &Property<String> {
        &self.title
    }

    /// Title of the details dialog.
    pub fn heading(&self) -> &Property<String> {
        &self.heading
    }

    pub fn subtitle(&self) -> &Property<String> {
        &self.subtitle
    }

    pub fn excerpt(&self) -> &Property<String> {
        &self.excerpt
    }

    pub fn description(&self) -> &Property<String> {
        &self.description
    }

    pub fn last_update(&self) -> &Property<String> {
        &self.last_update
    }

    pub fn toggle_active(&self) -> &Property<bool> {
        &self.toggle_active
    }

    pub fn toggle_target(&self) -> &Property<Option<ToggleTarget>> {
        &self.toggle_target
    }

    pub fn action_target(&self) -> &Property<Option<String>> {
        &self.action_target
    }

    pub fn menu(&self) -> &Property<Vec<MenuEntry>> {
        &self.menu
    }

    pub fn warning_visible(&self) -> &Property<bool> {
        &self.warning_visible
    }

    pub fn no_archive_visible(&self) -> &Property<bool> {
        &self.no_archive_visible
    }

    pub fn install_archive_visible(&self) -> &Property<bool> {
        &self.install_archive_visible
    }

    /// Blank every widget.
    pub fn reset(&self) {
        self.title.set(String::new());
        self.heading.set(String::new());
        self.subtitle.set(String::new());
        self.excerpt.set(String::new());
        self.description.set(String::new());
        self.last_update.set(String::new());
        self.toggle_active.set(false);
        self.toggle_target.set(None);
        self.action_target.set(None);
        self.menu.set(Vec::new());
        self.warning_visible.set(false);
        self.no_archive_visible.set(false);
        self.install_archive_visible.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_blanks_everything() {
        let row = RowWidgets::new();
        row.title().set("Title".to_string());
        row.toggle_active().set(true);
        row.menu().set(MenuEntry::reorder_entries("7"));
        row.warning_visible().set(true);

        row.reset();

        assert_eq!(row.title().get(), "");
        assert!(!row.toggle_active().get());
        assert!(row.menu().get().is_empty());
        assert!(!row.warning_visible().get());
    }

    #[test]
    fn test_reorder_entries() {
        let entries = MenuEntry::reorder_entries("7");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, MOVE_UP_ACTION);
        assert_eq!(entries[1].label, "Move Down");
        assert!(entries.iter().all(|entry| entry.target == "7"));
    }
}
