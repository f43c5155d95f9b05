use kissen_types::{Event, Timestamp};

use crate::node::PermissionNode;

/// Announced before a permission mutation is persisted.
///
/// Listeners may rewrite the payload; the registry persists what the event
/// holds after dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionEvent {
    GroupCreate {
        name: String,
    },
    SetPermission {
        node: PermissionNode,
        /// Whether the entry already held a node of that name.
        existed: bool,
    },
    UnsetPermission {
        node: PermissionNode,
    },
    Clear {
        entry: String,
        count: usize,
    },
    OptionSet {
        node: PermissionNode,
        key: String,
        value: String,
    },
    OptionDelete {
        node: PermissionNode,
        key: String,
    },
    EndUpdate {
        node: PermissionNode,
        end: Option<Timestamp>,
    },
    GroupMemberAdd {
        group: String,
        member: String,
    },
    GroupMemberRemove {
        group: String,
        member: String,
    },
}

impl Event for PermissionEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::GroupCreate { .. } => "permission_group_create",
            Self::SetPermission { .. } => "permission_set",
            Self::UnsetPermission { .. } => "permission_unset",
            Self::Clear { .. } => "permission_clear",
            Self::OptionSet { .. } => "permission_option_set",
            Self::OptionDelete { .. } => "permission_option_delete",
            Self::EndUpdate { .. } => "permission_end_update",
            Self::GroupMemberAdd { .. } => "group_member_add",
            Self::GroupMemberRemove { .. } => "group_member_remove",
        }
    }
}
