//! The persisted permission grant.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use kissen_types::{TemporalWindow, Timestamp};
use serde::{Deserialize, Serialize};

/// One permission granted (or denied) to an entry.
///
/// Nodes are immutable; the `with_*` methods return an updated copy.
/// Identity is `(name, owner)`: two nodes with the same name on the same
/// entry are the same permission regardless of value, window, or options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionNode {
    /// Permission name, possibly containing `*` and `?` wildcards.
    pub name: String,
    /// Permission id of the owning entry.
    pub owner: String,
    pub value: bool,
    #[serde(flatten)]
    pub window: TemporalWindow,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl PermissionNode {
    /// A node without options that never expires.
    pub fn new(name: impl Into<String>, owner: impl Into<String>, value: bool, start: Timestamp) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            value,
            window: TemporalWindow::unlimited(start),
            options: BTreeMap::new(),
        }
    }

    pub fn with_window(mut self, window: TemporalWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_value(mut self, value: bool) -> Self {
        self.value = value;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn without_option(mut self, key: &str) -> Self {
        self.options.remove(key);
        self
    }

    /// Moves the end of the window; the predicted end is kept.
    pub fn with_end(mut self, end: Option<Timestamp>) -> Self {
        self.window = self.window.with_end(end);
        self
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Whether the node has not expired at `now`.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.window.is_valid(now)
    }

    /// Whether the node grants its permission at `now`.
    pub fn is_valid(&self, now: Timestamp) -> bool {
        self.value && self.is_active(now)
    }
}

impl PartialEq for PermissionNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.owner == other.owner
    }
}

impl Eq for PermissionNode {}

impl Hash for PermissionNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.owner.hash(state);
    }
}
