//! # Kissen
//!
//! Persistence, permissions and punishments for game servers.
//!
//! Every entity is stored as `(total_id, key) → value` rows in a meta table.
//! On top of that sit in-memory savable maps and lists, a wildcard
//! permission engine with groups, and ban templates that are snapshotted
//! into punishments when issued.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                          Kissen                           │
//! │  ┌──────────────────────┐      ┌───────────────────────┐ │
//! │  │  PermissionRegistry  │      │      BanService       │ │
//! │  │ (groups, node cache) │      │ (bans → punishments)  │ │
//! │  └──────────┬───────────┘      └───────────┬───────────┘ │
//! │             └──────── Savable maps ────────┘             │
//! │                           │                              │
//! │              ObjectMeta (one per table)                  │
//! │                           │                              │
//! │          MemoryBackend  |  DuckDbBackend                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use kissen::{BanOperator, BanType, Kissen, KissenConfig};
//!
//! let mut kissen = Kissen::open(KissenConfig::development())?;
//!
//! let permissions = kissen.permissions_mut();
//! permissions.create_group("builder")?;
//! permissions.set_permission("builder", "world.edit.*", true)?;
//! permissions.entry("alice")?;
//! permissions.add_member("builder", "alice")?;
//! assert!(permissions.has_permission("alice", "world.edit.place"));
//!
//! kissen.bans_mut().create_ban(1, "Spam", BanType::Mute, Some(3_600_000))?;
//! kissen.bans().punish("alice", 1, BanOperator::console(), None)?;
//! assert!(kissen.bans().valid_punishment("alice", BanType::Mute)?.is_some());
//! # Ok::<(), kissen::KissenError>(())
//! ```

mod error;
mod kissen;
mod logging;

pub use error::{BACKEND_FAILURE_MESSAGE, KissenError, Result};
pub use kissen::Kissen;
pub use logging::init_tracing;

pub use kissen_config::{
    BanConfig, ConfigLoader, DatabaseConfig, KissenConfig, LoggingConfig, PermissionConfig,
    StorageBackend,
};

pub use kissen_permission::{PermissionEvent, PermissionNode, PermissionRegistry, matcher};

pub use kissen_ban::{Ban, BanEvent, BanOperator, BanService, BanType, Punishment, PunishmentNode};

pub use kissen_types::{EventBus, EventOutcome, TemporalWindow, Timestamp};

// Full crates for advanced usage
pub use kissen_ban as ban;
pub use kissen_meta as meta;
pub use kissen_permission as permission;
pub use kissen_savable as savable;
pub use kissen_types as types;
