//! The permission registry.
//!
//! Owns every loaded entry and resolves permissions across the group graph.
//! Membership is stored on the group (`group_member`), so "which groups is X
//! in" is answered by scanning the loaded groups.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use kissen_meta::ObjectMeta;
use kissen_savable::Savable;
use kissen_types::{Event, EventCancelled, EventDispatcher, Timestamp};
use tracing::{debug, info, warn};

use crate::entry::{EntryKind, PermissionEntry, PermissionSet};
use crate::error::{PermissionError, Result};
use crate::event::PermissionEvent;
use crate::matcher::resolve;
use crate::node::PermissionNode;

/// Arena of permission entries with cached resolution.
///
/// Mutations take `&mut self`; resolution takes `&self` and fills a
/// per-entry cache. Every persisted mutation invalidates the cache of the
/// touched entry and of everything that inherits from it.
pub struct PermissionRegistry {
    meta: Arc<ObjectMeta>,
    events: Arc<dyn EventDispatcher<PermissionEvent>>,
    entries: BTreeMap<String, PermissionEntry>,
}

impl std::fmt::Debug for PermissionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionRegistry")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl PermissionRegistry {
    pub fn new(meta: Arc<ObjectMeta>, events: Arc<dyn EventDispatcher<PermissionEvent>>) -> Self {
        Self {
            meta,
            events,
            entries: BTreeMap::new(),
        }
    }

    fn dispatch(&self, event: &mut PermissionEvent) -> Result<()> {
        EventCancelled::check(self.events.as_ref(), event)?;
        Ok(())
    }

    // ========================================================================
    // Entries
    // ========================================================================

    /// Loads every stored group; returns how many were newly loaded.
    pub fn load_groups(&mut self) -> Result<usize> {
        let save_id = EntryKind::Group.save_id();
        let stored = self.meta.get_data_by_prefix(save_id)?;
        let mut loaded = 0;
        for (total_id, data) in stored {
            let Some(name) = total_id.strip_prefix(save_id) else {
                continue;
            };
            if self.entries.contains_key(name) {
                continue;
            }
            let group = PermissionEntry::load(Arc::clone(&self.meta), EntryKind::Group, name, Some(data))?;
            self.entries.insert(name.to_string(), group);
            loaded += 1;
        }
        info!(groups = loaded, "Loaded permission groups");
        Ok(loaded)
    }

    /// Creates a new, empty group.
    pub fn create_group(&mut self, name: &str) -> Result<&PermissionEntry> {
        if self.entries.contains_key(name) {
            return Err(PermissionError::GroupExists(name.to_string()));
        }
        let mut event = PermissionEvent::GroupCreate {
            name: name.to_string(),
        };
        self.dispatch(&mut event)?;

        let group = PermissionEntry::load(Arc::clone(&self.meta), EntryKind::Group, name, None)?;
        debug!(group = name, "Created permission group");
        Ok(self.entries.entry(name.to_string()).or_insert(group))
    }

    /// Returns the entry, loading (or creating) a member entry if needed.
    pub fn entry(&mut self, id: &str) -> Result<&PermissionEntry> {
        if !self.entries.contains_key(id) {
            let member = PermissionEntry::load(Arc::clone(&self.meta), EntryKind::Member, id, None)?;
            self.entries.insert(id.to_string(), member);
        }
        self.get(id)
    }

    pub fn get(&self, id: &str) -> Result<&PermissionEntry> {
        self.entries
            .get(id)
            .ok_or_else(|| PermissionError::UnknownEntry(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut PermissionEntry> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| PermissionError::UnknownEntry(id.to_string()))
    }

    fn group(&self, id: &str) -> Result<&PermissionEntry> {
        let entry = self.get(id)?;
        if entry.is_group() {
            Ok(entry)
        } else {
            Err(PermissionError::NotAGroup(id.to_string()))
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Ids of every loaded group, sorted.
    pub fn groups(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|entry| entry.is_group())
            .map(|entry| entry.permission_id().to_string())
            .collect()
    }

    /// Purges the entry, detaches it from its groups and drops it.
    ///
    /// Returns the number of stored entries removed.
    pub fn delete_entry(&mut self, id: &str) -> Result<usize> {
        self.get(id)?;
        self.wipe_groups(id)?;
        self.permission_update(id);

        let Some(mut entry) = self.entries.remove(id) else {
            return Ok(0);
        };
        let removed = entry.delete()?;
        debug!(entry = id, removed, "Deleted permission entry");
        Ok(removed)
    }

    // ========================================================================
    // Own permissions
    // ========================================================================

    /// Sets (or overwrites the value of) a permission on the entry.
    pub fn set_permission(&mut self, id: &str, name: &str, value: bool) -> Result<PermissionNode> {
        let node = match self.get(id)?.own_permission(name)? {
            Some(current) => current.with_value(value),
            None => PermissionNode::new(name, id, value, Timestamp::now()),
        };
        self.set_permission_node(id, node)
    }

    /// Stores `node` on the entry that owns it.
    pub fn set_permission_node(&mut self, id: &str, node: PermissionNode) -> Result<PermissionNode> {
        if node.owner != id {
            return Err(PermissionError::OwnerMismatch {
                owner: node.owner,
                entry: id.to_string(),
            });
        }
        let existed = self.get(id)?.own_permission(&node.name)?.is_some();
        let mut event = PermissionEvent::SetPermission { node, existed };
        self.dispatch(&mut event)?;
        let node = match event {
            PermissionEvent::SetPermission { node, .. } => node,
            other => return Err(PermissionError::EventRewritten(other.name())),
        };
        self.store(id, node)
    }

    /// Removes a permission; returns whether it was set.
    pub fn unset_permission(&mut self, id: &str, name: &str) -> Result<bool> {
        let Some(node) = self.get(id)?.own_permission(name)? else {
            return Ok(false);
        };
        self.dispatch(&mut PermissionEvent::UnsetPermission { node })?;

        let removed = self.get_mut(id)?.remove_permission(name)?;
        self.permission_update(id);
        Ok(removed)
    }

    /// Removes every own permission; returns how many were removed.
    pub fn wipe_permissions(&mut self, id: &str) -> Result<usize> {
        let count = self.get(id)?.own_permissions()?.len();
        if count == 0 {
            return Ok(0);
        }
        self.dispatch(&mut PermissionEvent::Clear {
            entry: id.to_string(),
            count,
        })?;

        let removed = self.get_mut(id)?.clear_permissions()?;
        self.permission_update(id);
        Ok(removed)
    }

    fn own_node(&self, id: &str, name: &str) -> Result<PermissionNode> {
        self.get(id)?
            .own_permission(name)?
            .ok_or_else(|| PermissionError::UnknownPermission {
                entry: id.to_string(),
                permission: name.to_string(),
            })
    }

    pub fn set_option(&mut self, id: &str, name: &str, key: &str, value: &str) -> Result<PermissionNode> {
        let mut event = PermissionEvent::OptionSet {
            node: self.own_node(id, name)?,
            key: key.to_string(),
            value: value.to_string(),
        };
        self.dispatch(&mut event)?;
        let (node, key, value) = match event {
            PermissionEvent::OptionSet { node, key, value } => (node, key, value),
            other => return Err(PermissionError::EventRewritten(other.name())),
        };
        self.store(id, node.with_option(key, value))
    }

    pub fn delete_option(&mut self, id: &str, name: &str, key: &str) -> Result<PermissionNode> {
        let mut event = PermissionEvent::OptionDelete {
            node: self.own_node(id, name)?,
            key: key.to_string(),
        };
        self.dispatch(&mut event)?;
        let (node, key) = match event {
            PermissionEvent::OptionDelete { node, key } => (node, key),
            other => return Err(PermissionError::EventRewritten(other.name())),
        };
        self.store(id, node.without_option(&key))
    }

    /// Moves the end of a permission; `None` makes it permanent.
    pub fn set_end(&mut self, id: &str, name: &str, end: Option<Timestamp>) -> Result<PermissionNode> {
        let mut event = PermissionEvent::EndUpdate {
            node: self.own_node(id, name)?,
            end,
        };
        self.dispatch(&mut event)?;
        let (node, end) = match event {
            PermissionEvent::EndUpdate { node, end } => (node, end),
            other => return Err(PermissionError::EventRewritten(other.name())),
        };
        self.store(id, node.with_end(end))
    }

    fn store(&mut self, id: &str, node: PermissionNode) -> Result<PermissionNode> {
        self.get_mut(id)?.store(&node)?;
        self.permission_update(id);
        Ok(node)
    }

    // ========================================================================
    // Groups
    // ========================================================================

    /// Adds `member` to `group`.
    ///
    /// Returns `false` if it already was a direct member. Fails with
    /// [`PermissionError::GroupConflict`] if `group` is `member` itself or
    /// already (transitively) a member of `member`.
    pub fn add_member(&mut self, group: &str, member: &str) -> Result<bool> {
        self.group(group)?;
        let joining = self.get(member)?;
        if member == group || (joining.is_group() && self.group_collector(group).contains(member)) {
            return Err(PermissionError::GroupConflict {
                group: group.to_string(),
                member: member.to_string(),
            });
        }
        if self.group(group)?.has_member(member) {
            return Ok(false);
        }
        self.dispatch(&mut PermissionEvent::GroupMemberAdd {
            group: group.to_string(),
            member: member.to_string(),
        })?;

        let added = self.get_mut(group)?.add_member(member)?;
        info!(group, member, "Added group member");
        self.permission_update(member);
        Ok(added)
    }

    /// Removes a direct member; returns whether it was one.
    pub fn remove_member(&mut self, group: &str, member: &str) -> Result<bool> {
        if !self.group(group)?.has_member(member) {
            return Ok(false);
        }
        self.dispatch(&mut PermissionEvent::GroupMemberRemove {
            group: group.to_string(),
            member: member.to_string(),
        })?;

        let removed = self.get_mut(group)?.remove_member(member)?;
        info!(group, member, "Removed group member");
        self.permission_update(member);
        Ok(removed)
    }

    /// Leaves every group `id` is a direct member of; returns how many.
    pub fn wipe_groups(&mut self, id: &str) -> Result<usize> {
        let mut left = 0;
        for group in self.groups_of(id) {
            if self.remove_member(&group, id)? {
                left += 1;
            }
        }
        Ok(left)
    }

    /// Groups `id` is a direct member of, sorted by id.
    pub fn groups_of(&self, id: &str) -> Vec<String> {
        self.entries
            .values()
            .filter(|entry| entry.is_group() && entry.has_member(id))
            .map(|entry| entry.permission_id().to_string())
            .collect()
    }

    /// Every group `id` belongs to, directly or through other groups.
    pub fn group_collector(&self, id: &str) -> BTreeSet<String> {
        let mut visited = BTreeSet::new();
        let mut stack = self.groups_of(id);
        while let Some(group) = stack.pop() {
            if group != id && visited.insert(group.clone()) {
                stack.extend(self.groups_of(&group));
            }
        }
        visited
    }

    /// Every member of `group`, including members of member groups.
    pub fn members(&self, group: &str) -> Result<BTreeSet<String>> {
        self.group(group)?;
        let mut members = BTreeSet::new();
        let mut visited = BTreeSet::from([group.to_string()]);
        let mut stack = vec![group.to_string()];
        while let Some(current) = stack.pop() {
            let Some(entry) = self.entries.get(&current) else {
                continue;
            };
            for member in entry.own_members() {
                members.insert(member.clone());
                if visited.insert(member.clone()) {
                    stack.push(member.clone());
                }
            }
        }
        Ok(members)
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Own permissions followed by inherited ones, in scope order.
    ///
    /// Groups are walked depth first in id order, each group once. Nodes with
    /// the same name may appear in several scopes; expired nodes are kept.
    /// The result is cached until the entry is invalidated.
    pub fn permission_list(&self, id: &str) -> Result<PermissionSet> {
        let entry = self.get(id)?;
        if let Some(cached) = entry.cached() {
            return Ok(cached);
        }

        let mut visited = BTreeSet::new();
        let mut permissions = Vec::new();
        self.collect(id, &mut visited, &mut permissions)?;

        let permissions: PermissionSet = permissions.into();
        entry.cache(Arc::clone(&permissions));
        Ok(permissions)
    }

    fn collect(&self, id: &str, visited: &mut BTreeSet<String>, out: &mut Vec<PermissionNode>) -> Result<()> {
        if !visited.insert(id.to_string()) {
            return Ok(());
        }
        let Some(entry) = self.entries.get(id) else {
            return Ok(());
        };
        out.extend(entry.own_permissions()?);
        for group in self.groups_of(id) {
            self.collect(&group, visited, out)?;
        }
        Ok(())
    }

    /// The nodes resolution sees at `now`.
    ///
    /// Inactive nodes are dropped first; of the remaining nodes sharing a
    /// name, the one from the closest scope is kept.
    pub fn effective_permissions(&self, id: &str, now: Timestamp) -> Result<Vec<PermissionNode>> {
        let permissions = self.permission_list(id)?;
        Ok(effective(&permissions, now).cloned().collect())
    }

    /// Clears the cache of `id` and of every entry inheriting from it.
    pub fn permission_update(&self, id: &str) {
        let Some(entry) = self.entries.get(id) else {
            return;
        };
        entry.clear_cache();
        if entry.is_group() {
            if let Ok(members) = self.members(id) {
                for member in members {
                    if let Some(inheriting) = self.entries.get(&member) {
                        inheriting.clear_cache();
                    }
                }
            }
        }
    }

    /// The verdict for `permission`, or `None` if no active node matches.
    pub fn internal_permission(&self, id: &str, permission: &str) -> Result<Option<bool>> {
        let permissions = self.permission_list(id)?;
        Ok(resolve(permission, effective(&permissions, Timestamp::now())))
    }

    /// Whether `id` holds `permission`. Anything but an explicit grant is
    /// `false`, including lookup failures.
    pub fn has_permission(&self, id: &str, permission: &str) -> bool {
        match self.internal_permission(id, permission) {
            Ok(verdict) => verdict.unwrap_or(false),
            Err(e) => {
                warn!(entry = id, permission, error = %e, "Permission lookup failed");
                false
            }
        }
    }
}

/// Active nodes of a scope-ordered list, first seen name wins.
fn effective(nodes: &[PermissionNode], now: Timestamp) -> impl Iterator<Item = &PermissionNode> {
    let mut seen = BTreeSet::new();
    nodes
        .iter()
        .filter(move |node| node.is_active(now))
        .filter(move |&node| seen.insert(node.name.as_str()))
}
