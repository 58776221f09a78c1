#![forbid(unsafe_code)]

//! Group/item data model and the derived row type.
//!
//! Groups and items are caller-owned snapshots: the engine never mutates them
//! and rebuilds every derived structure when a new snapshot arrives.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a group: a name qualified by the location that hosts it.
///
/// Equality and hashing are by value. The string encoding returned by
/// [`GroupAddress::key`] (`name@location`) is what the expansion store
/// persists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupAddress {
    /// Group name.
    pub name: String,
    /// Location qualifier.
    pub location: String,
}

impl GroupAddress {
    /// Create an address from a name and a location.
    #[must_use]
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }

    /// Stable string encoding used as the expanded-set key.
    ///
    /// `%` and `@` inside either component are percent-escaped, so the single
    /// unescaped `@` separates them and distinct addresses never share a key.
    #[must_use]
    pub fn key(&self) -> String {
        format!(
            "{}@{}",
            escape_component(&self.name),
            escape_component(&self.location)
        )
    }
}

fn escape_component(part: &str) -> String {
    part.replace('%', "%25").replace('@', "%40")
}

impl fmt::Display for GroupAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.location)
    }
}

/// Which flavor of leaf entry an item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Primary,
    Secondary,
}

impl ItemKind {
    /// Short label for text renderers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// A single leaf entry belonging to one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Address of the owning group.
    pub group: GroupAddress,
    pub kind: ItemKind,
    /// Unique within the owning group.
    pub name: String,
}

impl Item {
    /// Identity of this item for caching and fetch scheduling.
    #[must_use]
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.group.clone(), self.name.clone())
    }
}

/// Identity of an item across snapshots: owning group plus item name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub group: GroupAddress,
    pub name: String,
}

impl ItemKey {
    #[must_use]
    pub fn new(group: GroupAddress, name: impl Into<String>) -> Self {
        Self {
            group,
            name: name.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}

/// A named, collapsible collection of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GroupRecord", into = "GroupRecord")]
pub struct Group {
    pub address: GroupAddress,
    pub items: Vec<Item>,
}

impl Group {
    /// Create an empty group.
    #[must_use]
    pub fn new(address: GroupAddress) -> Self {
        Self {
            address,
            items: Vec::new(),
        }
    }

    /// Append an item (builder style).
    #[must_use]
    pub fn with_item(mut self, kind: ItemKind, name: impl Into<String>) -> Self {
        self.items.push(Item {
            group: self.address.clone(),
            kind,
            name: name.into(),
        });
        self
    }

    /// Append several items of the same kind.
    #[must_use]
    pub fn with_items<I, S>(mut self, kind: ItemKind, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self = self.with_item(kind, name);
        }
        self
    }

    /// Number of items in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the group has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Wire shape of a group: items carry only kind and name, the owning address
/// is implied by nesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GroupRecord {
    address: GroupAddress,
    #[serde(default)]
    items: Vec<ItemRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRecord {
    kind: ItemKind,
    name: String,
}

impl From<GroupRecord> for Group {
    fn from(record: GroupRecord) -> Self {
        let items = record
            .items
            .into_iter()
            .map(|item| Item {
                group: record.address.clone(),
                kind: item.kind,
                name: item.name,
            })
            .collect();
        Self {
            address: record.address,
            items,
        }
    }
}

impl From<Group> for GroupRecord {
    fn from(group: Group) -> Self {
        Self {
            address: group.address,
            items: group
                .items
                .into_iter()
                .map(|item| ItemRecord {
                    kind: item.kind,
                    name: item.name,
                })
                .collect(),
        }
    }
}

/// One entry of the flattened sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// Group header; present for every group regardless of expansion.
    Header {
        group: GroupAddress,
        item_count: usize,
    },
    /// Item row; present only while its group is expanded.
    Item {
        group: GroupAddress,
        kind: ItemKind,
        name: String,
    },
}

impl Row {
    /// Address of the group this row belongs to.
    #[must_use]
    pub fn group(&self) -> &GroupAddress {
        match self {
            Self::Header { group, .. } | Self::Item { group, .. } => group,
        }
    }

    #[must_use]
    pub fn is_header(&self) -> bool {
        matches!(self, Self::Header { .. })
    }

    /// Item identity, for item rows.
    #[must_use]
    pub fn item_key(&self) -> Option<ItemKey> {
        match self {
            Self::Header { .. } => None,
            Self::Item { group, name, .. } => Some(ItemKey::new(group.clone(), name.clone())),
        }
    }

    pub(crate) fn header(group: &Group) -> Self {
        Self::Header {
            group: group.address.clone(),
            item_count: group.items.len(),
        }
    }

    pub(crate) fn item(item: &Item) -> Self {
        Self::Item {
            group: item.group.clone(),
            kind: item.kind,
            name: item.name.clone(),
        }
    }
}
