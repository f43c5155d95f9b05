//! # kissen-ban: Bans and punishments
//!
//! A [`Ban`] is a template ("Spam", mute, 1 hour). Issuing it to a target
//! creates a [`Punishment`] that copies the template's name, type and
//! duration at that moment.
//!
//! ```text
//!  Ban #3 "Spam" mute 1h ──punish(alice)──► PunishmentNode { ban_name: "Spam",
//!        │                                                   ban_type: mute,
//!        │ set_duration(2h)                                  end: t+1h }
//!        ▼
//!  Ban #3 "Spam" mute 2h                    (issued punishment unchanged)
//! ```
//!
//! Storage layout, all in the ban table:
//!
//! | total id     | key           | value                         |
//! |--------------|---------------|-------------------------------|
//! | `banid3`     | `name`        | `Spam`                        |
//! | `banid3`     | `ban_type`    | `mute`                        |
//! | `banid3`     | `duration`    | `3600000`                     |
//! | `<target>`   | `_punishment` | JSON list of punishment nodes |

mod ban;
mod error;
mod event;
mod punishment;
mod service;

pub use ban::{BAN_SAVE_ID, Ban, BanType};
pub use error::{BanError, Result};
pub use event::BanEvent;
pub use punishment::{BanOperator, Comment, PUNISHMENT_KEY, Punishment, PunishmentNode};
pub use service::BanService;
