//! Permission entries: members and groups.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use kissen_meta::{MetaData, ObjectMeta};
use kissen_savable::{Savable, SavableMap, setup_repository};
use tracing::debug;

use crate::error::Result;
use crate::node::PermissionNode;

/// Record list holding an entry's own permissions.
pub const PERMISSION_LIST: &str = "permission_list";

/// List on a group holding the permission ids of its direct members.
pub const GROUP_MEMBER: &str = "group_member";

/// Whether an entry can hold members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Member,
    Group,
}

impl EntryKind {
    /// Storage prefix of entries of this kind.
    pub fn save_id(self) -> &'static str {
        match self {
            Self::Member => "permissionentry",
            Self::Group => "permissiongroup",
        }
    }
}

/// Resolved permissions, shared with callers.
pub type PermissionSet = Arc<[PermissionNode]>;

/// A savable that holds permissions and can be a member of groups.
pub struct PermissionEntry {
    kind: EntryKind,
    permission_id: String,
    repository: SavableMap,
    cache: Mutex<Option<PermissionSet>>,
}

impl fmt::Debug for PermissionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionEntry")
            .field("kind", &self.kind)
            .field("permission_id", &self.permission_id)
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl PermissionEntry {
    /// Loads the entry from `meta`, or from `seed` when given.
    pub fn load(
        meta: Arc<ObjectMeta>,
        kind: EntryKind,
        permission_id: &str,
        seed: Option<MetaData>,
    ) -> Result<Self> {
        let repository = setup_repository(meta, kind.save_id(), permission_id, &[], seed)?;
        Ok(Self {
            kind,
            permission_id: permission_id.to_string(),
            repository,
            cache: Mutex::new(None),
        })
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_group(&self) -> bool {
        self.kind == EntryKind::Group
    }

    pub fn permission_id(&self) -> &str {
        &self.permission_id
    }

    /// Permissions set directly on this entry, in insertion order.
    pub fn own_permissions(&self) -> Result<Vec<PermissionNode>> {
        Ok(self.repository.records(PERMISSION_LIST)?)
    }

    pub fn own_permission(&self, name: &str) -> Result<Option<PermissionNode>> {
        Ok(self
            .own_permissions()?
            .into_iter()
            .find(|node| node.name == name))
    }

    /// Direct members; always empty for non-groups.
    pub fn own_members(&self) -> &[String] {
        self.repository
            .get_list(GROUP_MEMBER)
            .map(|list| list.as_slice())
            .unwrap_or_default()
    }

    pub fn has_member(&self, member: &str) -> bool {
        self.own_members().iter().any(|m| m == member)
    }

    /// Inserts or replaces the node of the same name.
    pub(crate) fn store(&mut self, node: &PermissionNode) -> Result<()> {
        let exists = self.own_permission(&node.name)?.is_some();
        let mut records = self.repository.record_list::<PermissionNode>(PERMISSION_LIST);
        if exists {
            records.replace_record(|current| current.name == node.name, node)?;
        } else {
            records.add(node)?;
        }
        Ok(())
    }

    pub(crate) fn remove_permission(&mut self, name: &str) -> Result<bool> {
        Ok(self
            .repository
            .record_list::<PermissionNode>(PERMISSION_LIST)
            .remove_if_record(|node| node.name == name)?)
    }

    pub(crate) fn clear_permissions(&mut self) -> Result<usize> {
        let Some(list) = self.repository.get_list_mut(PERMISSION_LIST) else {
            return Ok(0);
        };
        let count = list.len();
        list.clear()?;
        Ok(count)
    }

    pub(crate) fn add_member(&mut self, member: &str) -> Result<bool> {
        Ok(self.repository.set_list_value(GROUP_MEMBER, member.to_string())?)
    }

    pub(crate) fn remove_member(&mut self, member: &str) -> Result<bool> {
        Ok(self.repository.delete_list_value(GROUP_MEMBER, member)?)
    }

    pub(crate) fn cached(&self) -> Option<PermissionSet> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn cache(&self, permissions: PermissionSet) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(permissions);
    }

    pub(crate) fn clear_cache(&self) {
        let cleared = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if cleared {
            debug!(entry = %self.permission_id, "Permission cache cleared");
        }
    }
}

impl Savable for PermissionEntry {
    fn save_id(&self) -> &str {
        self.kind.save_id()
    }

    fn raw_id(&self) -> &str {
        &self.permission_id
    }

    fn repository(&self) -> &SavableMap {
        &self.repository
    }

    fn repository_mut(&mut self) -> &mut SavableMap {
        &mut self.repository
    }
}
