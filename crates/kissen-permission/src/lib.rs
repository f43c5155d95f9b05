//! # kissen-permission: Permission resolution
//!
//! Entries (players or any other permission holder) carry permission nodes
//! and can be members of groups. A group is itself an entry, so groups nest.
//!
//! ```text
//!              ┌──────────────┐
//!              │ group: admin │ com.*      = true
//!              └──────▲───────┘
//!                     │ member
//!              ┌──────┴───────┐
//!              │ group: mod   │ com.ban    = true
//!              └──────▲───────┘
//!                     │ member
//!              ┌──────┴───────┐
//!              │ entry: alice │ com.ban    = false   (shadows mod's node)
//!              └──────────────┘
//! ```
//!
//! Resolution happens in three steps:
//!
//! 1. [`PermissionRegistry::permission_list`] walks the entry and its groups
//!    depth first (groups in id order). The result is cached per entry.
//! 2. Expired nodes are dropped, then the first node seen for a name wins,
//!    so closer scopes shadow ancestor groups
//!    ([`PermissionRegistry::effective_permissions`]).
//! 3. [`resolve`] keeps the nodes whose name matches the requested
//!    permission (see [`matcher`]), sorts them by name and lets the last one
//!    decide. No match means no verdict, which `has_permission` reads as
//!    `false`.
//!
//! ```
//! use kissen_permission::{PermissionNode, resolve};
//! use kissen_types::Timestamp;
//!
//! let nodes = [
//!     PermissionNode::new("com.*", "alice", true, Timestamp::EPOCH),
//!     PermissionNode::new("com.feature", "alice", false, Timestamp::EPOCH),
//! ];
//! assert_eq!(resolve("com.feature", &nodes), Some(false));
//! assert_eq!(resolve("com.other", &nodes), Some(true));
//! assert_eq!(resolve("net.other", &nodes), None);
//! ```

mod entry;
mod error;
mod event;
mod matcher;
mod node;
mod registry;

pub use entry::{EntryKind, GROUP_MEMBER, PERMISSION_LIST, PermissionEntry, PermissionSet};
pub use error::{PermissionError, Result};
pub use event::PermissionEvent;
pub use matcher::{matcher, resolve, resolve_node};
pub use node::PermissionNode;
pub use registry::PermissionRegistry;
