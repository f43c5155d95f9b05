//! Issued punishments.
//!
//! A punishment copies everything it needs from its ban when it is issued.
//! Editing or deleting the ban afterwards leaves issued punishments as they
//! were.

use std::fmt;
use std::sync::Arc;

use kissen_meta::ObjectMeta;
use kissen_types::{
    Event, EventCancelled, EventDispatcher, TemporalWindow, Timestamp, from_json, generate_id, to_json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ban::{Ban, BanType};
use crate::error::{BanError, Result};
use crate::event::BanEvent;

/// List key holding a target's punishments.
pub const PUNISHMENT_KEY: &str = "punishment";

/// Who issued a punishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanOperator {
    /// Player id, `None` for the console.
    pub id: Option<String>,
    pub name: String,
}

impl BanOperator {
    pub fn console() -> Self {
        Self {
            id: None,
            name: "console".to_string(),
        }
    }

    pub fn player(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    /// Player id of the author, `None` for the console.
    pub sender: Option<String>,
    pub text: String,
    pub timestamp: Timestamp,
}

/// The stored form of a punishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunishmentNode {
    pub id: String,
    pub ban_name: String,
    pub ban_type: BanType,
    pub operator: BanOperator,
    pub cause: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(flatten)]
    pub window: TemporalWindow,
}

impl PunishmentNode {
    /// Snapshots `ban` into a new punishment starting at `now`.
    pub fn issue(ban: &Ban, operator: BanOperator, cause: Option<String>, now: Timestamp) -> Result<Self> {
        Ok(Self {
            id: generate_id(),
            ban_name: ban.name()?.to_string(),
            ban_type: ban.ban_type()?,
            operator,
            cause,
            comments: Vec::new(),
            window: TemporalWindow::with_duration(now, ban.duration()?),
        })
    }
}

/// Reads every punishment stored for `target`, in issue order.
pub(crate) fn load_nodes(meta: &ObjectMeta, target: &str) -> Result<Vec<PunishmentNode>> {
    let raw = meta.get_string_list(target, PUNISHMENT_KEY)?.unwrap_or_default();
    Ok(decode_nodes(target, &raw))
}

/// Decodes stored punishments, skipping entries that do not parse.
pub(crate) fn decode_nodes(target: &str, raw: &[String]) -> Vec<PunishmentNode> {
    raw.iter()
        .filter_map(|entry| match from_json(entry) {
            Ok(node) => Some(node),
            Err(e) => {
                warn!(total_id = target, error = %e, "Skipping undecodable punishment");
                None
            }
        })
        .collect()
}

/// Inserts `node` into the target's list, replacing the entry with its id.
///
/// Entries that do not decode are kept as they are.
pub(crate) fn store_node(meta: &ObjectMeta, target: &str, node: &PunishmentNode) -> Result<()> {
    let mut raw = meta.get_string_list(target, PUNISHMENT_KEY)?.unwrap_or_default();
    let encoded = to_json(node)?;
    let position = raw.iter().position(|entry| {
        from_json::<PunishmentNode>(entry).is_ok_and(|current| current.id == node.id)
    });
    match position {
        Some(index) => raw[index] = encoded,
        None => raw.push(encoded),
    }
    meta.set_string_list(target, PUNISHMENT_KEY, Some(raw.as_slice()))?;
    Ok(())
}

/// A punishment issued to one target.
///
/// Setters announce the change, then write the updated node back to the
/// target's punishment list.
pub struct Punishment {
    target: String,
    node: PunishmentNode,
    meta: Arc<ObjectMeta>,
    events: Arc<dyn EventDispatcher<BanEvent>>,
}

impl fmt::Debug for Punishment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Punishment")
            .field("target", &self.target)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl Punishment {
    pub(crate) fn new(
        target: impl Into<String>,
        node: PunishmentNode,
        meta: Arc<ObjectMeta>,
        events: Arc<dyn EventDispatcher<BanEvent>>,
    ) -> Self {
        Self {
            target: target.into(),
            node,
            meta,
            events,
        }
    }

    /// Total id of the punished entity.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn node(&self) -> &PunishmentNode {
        &self.node
    }

    pub fn ban_name(&self) -> &str {
        &self.node.ban_name
    }

    pub fn ban_type(&self) -> BanType {
        self.node.ban_type
    }

    pub fn operator(&self) -> &BanOperator {
        &self.node.operator
    }

    pub fn cause(&self) -> Option<&str> {
        self.node.cause.as_deref()
    }

    pub fn comments(&self) -> &[Comment] {
        &self.node.comments
    }

    pub fn window(&self) -> &TemporalWindow {
        &self.node.window
    }

    /// Kicks are instantaneous and never in force.
    pub fn is_valid(&self, now: Timestamp) -> bool {
        self.node.ban_type != BanType::Kick && self.node.window.is_valid(now)
    }

    fn dispatch(&self, mut event: BanEvent) -> Result<BanEvent> {
        EventCancelled::check(self.events.as_ref(), &mut event)?;
        Ok(event)
    }

    fn save(&mut self, node: PunishmentNode) -> Result<()> {
        store_node(&self.meta, &self.target, &node)?;
        self.node = node;
        Ok(())
    }

    pub fn set_cause(&mut self, cause: Option<String>) -> Result<()> {
        let cause = match self.dispatch(BanEvent::CauseUpdate {
            punishment: self.node.id.clone(),
            cause,
        })? {
            BanEvent::CauseUpdate { cause, .. } => cause,
            other => return Err(BanError::EventRewritten(other.name())),
        };
        let mut node = self.node.clone();
        node.cause = cause;
        self.save(node)
    }

    pub fn add_comment(&mut self, sender: Option<String>, text: impl Into<String>) -> Result<Comment> {
        let comment = Comment {
            id: generate_id(),
            sender,
            text: text.into(),
            timestamp: Timestamp::now(),
        };
        let comment = match self.dispatch(BanEvent::AddComment {
            punishment: self.node.id.clone(),
            comment,
        })? {
            BanEvent::AddComment { comment, .. } => comment,
            other => return Err(BanError::EventRewritten(other.name())),
        };
        let mut node = self.node.clone();
        node.comments.push(comment.clone());
        self.save(node)?;
        Ok(comment)
    }

    /// Moves the end of the punishment; `None` makes it permanent.
    pub fn set_end(&mut self, end: Option<Timestamp>) -> Result<()> {
        let end = match self.dispatch(BanEvent::EndUpdate {
            punishment: self.node.id.clone(),
            end,
        })? {
            BanEvent::EndUpdate { end, .. } => end,
            other => return Err(BanError::EventRewritten(other.name())),
        };
        let mut node = self.node.clone();
        node.window = node.window.with_end(end);
        self.save(node)
    }
}
