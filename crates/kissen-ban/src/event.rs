use kissen_types::{Event, Timestamp};

use crate::ban::BanType;
use crate::punishment::Comment;

/// Announced before a ban or punishment change is persisted.
///
/// Listeners may rewrite the new value; the rewritten value is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanEvent {
    Create {
        id: i32,
        name: String,
        ban_type: BanType,
        duration: Option<u64>,
    },
    Rename {
        id: i32,
        old: String,
        new: String,
    },
    AlterType {
        id: i32,
        old: BanType,
        new: BanType,
    },
    AlterDuration {
        id: i32,
        duration: Option<u64>,
    },
    CauseUpdate {
        punishment: String,
        cause: Option<String>,
    },
    AddComment {
        punishment: String,
        comment: Comment,
    },
    EndUpdate {
        punishment: String,
        end: Option<Timestamp>,
    },
}

impl Event for BanEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "ban_create",
            Self::Rename { .. } => "ban_rename",
            Self::AlterType { .. } => "ban_alter_type",
            Self::AlterDuration { .. } => "ban_alter_duration",
            Self::CauseUpdate { .. } => "punishment_cause_update",
            Self::AddComment { .. } => "punishment_add_comment",
            Self::EndUpdate { .. } => "punishment_end_update",
        }
    }
}
