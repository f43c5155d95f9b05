//! # kissen-savable: Write-through entity storage
//!
//! Entities keep their state in a [`SavableMap`], an in-memory overlay of
//! their meta rows. Reads are served from memory; `set*` writes go through
//! to the [`kissen_meta::ObjectMeta`] immediately.
//!
//! ```text
//!  Savable (Ban, PermissionEntry, ...)
//!     │ repository()
//!     ▼
//!  SavableMap ── values: key → string
//!     │        └─ lists:  key → KissenList ── ListAction ──┐
//!     │ set / set_list / delete                            │ persist
//!     ▼                                                    ▼
//!  ObjectMeta  ◄────────────────────────────────────────────
//! ```
//!
//! [`SavableRecordList`] layers typed JSON records over a string list.

mod error;
mod list;
mod map;
mod record;
mod savable;

pub use error::{Result, SavableError};
pub use list::{KissenList, ListAction, ListExecution, SavableList};
pub use map::SavableMap;
pub use record::SavableRecordList;
pub use savable::{Savable, setup_repository};

#[cfg(test)]
mod tests;
