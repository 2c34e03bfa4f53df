use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability bits carried by an [`Entry`].
///
/// Stored as a plain bitset; [`AddonFlags::from_bits`] rejects any bit outside
/// [`AddonFlags::KNOWN`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AddonFlags(u32);

impl AddonFlags {
    pub const NONE: Self = Self(0);

    /// Synthesized stand-in for an identifier with no live entry.
    pub const DUMMY: Self = Self(1 << 0);

    /// The addon archive is present locally.
    pub const HAS_ARCHIVE: Self = Self(1 << 1);

    /// The addon has a remote origin an archive can be installed from.
    pub const REMOTE: Self = Self(1 << 2);

    /// Every bit with a meaning.
    pub const KNOWN: Self = Self(Self::DUMMY.0 | Self::HAS_ARCHIVE.0 | Self::REMOTE.0);

    /// Validate a raw bitset. Returns `None` if any unknown bit is set.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::KNOWN.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Keep only the known bits.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::KNOWN.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// The unknown part of a raw bitset.
    pub const fn unknown_bits(bits: u32) -> u32 {
        bits & !Self::KNOWN.0
    }
}

impl std::ops::BitOr for AddonFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for AddonFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::DUMMY) {
            names.push("DUMMY");
        }
        if self.contains(Self::HAS_ARCHIVE) {
            names.push("HAS_ARCHIVE");
        }
        if self.contains(Self::REMOTE) {
            names.push("REMOTE");
        }
        if names.is_empty() {
            names.push("NONE");
        }
        write!(f, "AddonFlags({})", names.join(" | "))
    }
}

/// Addon metadata as storage knows it. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub time_updated: Option<DateTime<Utc>>,

    /// Raw capability bits, unvalidated.
    #[serde(default)]
    pub flags: u32,
}

impl Entry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            time_updated: None,
            flags: AddonFlags::NONE.bits(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_time_updated(mut self, time: DateTime<Utc>) -> Self {
        self.time_updated = Some(time);
        self
    }

    pub fn with_flags(mut self, flags: AddonFlags) -> Self {
        self.flags = flags.bits();
        self
    }

    /// Placeholder for an identifier referenced by the load order but missing
    /// from the entry table.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self::new(id).with_flags(AddonFlags::DUMMY)
    }

    fn has_flag(&self, flag: AddonFlags) -> bool {
        self.flags & flag.bits() == flag.bits()
    }

    pub fn is_placeholder(&self) -> bool {
        self.has_flag(AddonFlags::DUMMY)
    }

    pub fn has_archive(&self) -> bool {
        self.has_flag(AddonFlags::HAS_ARCHIVE)
    }

    /// A missing archive can be fetched: the entry is real, has a remote
    /// origin, and no local archive.
    pub fn can_install_missing_archive(&self) -> bool {
        !self.is_placeholder() && self.has_flag(AddonFlags::REMOTE) && !self.has_archive()
    }
}

/// Kind of a load-order slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Addon,
    Separator,
}

/// Persisted per-identifier state. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(alias = "enabled", default)]
    pub active: bool,

    #[serde(rename = "type", alias = "kind", default)]
    pub kind: ItemKind,

    #[serde(default)]
    pub section: Option<String>,

    #[serde(default)]
    pub position: Option<usize>,
}

impl Configuration {
    pub fn addon(active: bool) -> Self {
        Self {
            active,
            kind: ItemKind::Addon,
            ..Default::default()
        }
    }

    pub fn separator() -> Self {
        Self {
            active: false,
            kind: ItemKind::Separator,
            ..Default::default()
        }
    }
}

/// A named divider in the load order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separator {
    pub id: String,
    pub name: String,
}

/// A load-order slot resolved against storage.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderedEntry {
    Addon(Entry),
    Separator(Separator),
}
