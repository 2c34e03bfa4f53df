use crate::models::addon::AddonFlags;
use crate::observe::Property;
use thiserror::Error;

/// Construction failure of a [`ViewItem`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewItemError {
    /// The flag set and the known-flag mask have drifted apart.
    #[error("addon {id} carries unknown flag bits {unknown:#x} (raw {bits:#x})")]
    UnknownFlags { id: String, bits: u32, unknown: u32 },
}

/// Everything needed to construct a [`ViewItem`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewItemInit {
    pub id: String,
    pub name: String,
    pub description: String,
    pub description_short: String,
    pub last_update: String,
    pub enabled: bool,
    /// Raw bits, validated by [`ViewItem::new`].
    pub flags: u32,
    pub has_archive: bool,
    pub install_missing_archive: bool,
}

/// Display-ready, observable projection of one addon.
///
/// `id` and `flags` are fixed at construction; a different identifier means a
/// different `ViewItem`. Everything else is an observable [`Property`] that
/// rows bind to.
#[derive(Debug)]
pub struct ViewItem {
    id: String,
    flags: AddonFlags,
    name: Property<String>,
    description: Property<String>,
    description_short: Property<String>,
    last_update: Property<String>,
    enabled: Property<bool>,
    in_randomizer: Property<bool>,
    has_archive: Property<bool>,
    install_missing_archive: Property<bool>,
}

impl ViewItem {
    /// Build a view item, rejecting unknown flag bits.
    pub fn new(init: ViewItemInit) -> Result<Self, ViewItemError> {
        let flags = AddonFlags::from_bits(init.flags).ok_or_else(|| ViewItemError::UnknownFlags {
            id: init.id.clone(),
            bits: init.flags,
            unknown: AddonFlags::unknown_bits(init.flags),
        })?;
        Ok(Self::with_flags(init, flags))
    }

    /// Build a view item from flags that are already validated.
    pub(crate) fn with_flags(init: ViewItemInit, flags: AddonFlags) -> Self {
        Self {
            id: init.id,
            flags,
            name: Property::new(init.name),
            description: Property::new(init.description),
            description_short: Property::new(init.description_short),
            last_update: Property::new(init.last_update),
            enabled: Property::new(init.enabled),
            in_randomizer: Property::new(false),
            has_archive: Property::new(init.has_archive),
            install_missing_archive: Property::new(init.install_missing_archive),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn flags(&self) -> AddonFlags {
        self.flags
    }

    pub fn is_placeholder(&self) -> bool {
        self.flags.contains(AddonFlags::DUMMY)
    }

    pub fn name(&self) -> &Property<String> {
        &self.name
    }

    pub fn description(&self) -> &Property<String> {
        &self.description
    }

    pub fn description_short(&self) -> &Property<String> {
        &self.description_short
    }

    pub fn last_update(&self) -> &Property<String> {
        &self.last_update
    }

    pub fn enabled(&self) -> &Property<bool> {
        &self.enabled
    }

    pub fn in_randomizer(&self) -> &Property<bool> {
        &self.in_randomizer
    }

    pub fn has_archive(&self) -> &Property<bool> {
        &self.has_archive
    }

    pub fn install_missing_archive(&self) -> &Property<bool> {
        &self.install_missing_archive
    }
}
