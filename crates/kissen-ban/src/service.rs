//! The ban service.

use std::collections::BTreeMap;
use std::sync::Arc;

use kissen_meta::{Column, FilterBuilder, ObjectMeta, list_key};
use kissen_savable::Savable;
use kissen_types::{EventCancelled, EventDispatcher, Timestamp, from_json};
use tracing::{debug, info, warn};

use crate::ban::{BAN_SAVE_ID, Ban, BanType};
use crate::error::{BanError, Result};
use crate::event::BanEvent;
use crate::punishment::{
    BanOperator, PUNISHMENT_KEY, Punishment, PunishmentNode, decode_nodes, load_nodes, store_node,
};

/// Owns the loaded bans and issues punishments.
///
/// Punishments live in the same table as the bans, as a list under the key
/// `punishment` of the punished total id.
pub struct BanService {
    meta: Arc<ObjectMeta>,
    events: Arc<dyn EventDispatcher<BanEvent>>,
    bans: BTreeMap<i32, Ban>,
}

impl std::fmt::Debug for BanService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BanService")
            .field("bans", &self.bans.len())
            .finish_non_exhaustive()
    }
}

impl BanService {
    pub fn new(meta: Arc<ObjectMeta>, events: Arc<dyn EventDispatcher<BanEvent>>) -> Self {
        Self {
            meta,
            events,
            bans: BTreeMap::new(),
        }
    }

    /// Loads every stored ban; returns how many were newly loaded.
    pub fn load(&mut self) -> Result<usize> {
        let mut loaded = 0;
        for (total_id, data) in self.meta.get_data_by_prefix(BAN_SAVE_ID)? {
            let Some(id) = total_id
                .strip_prefix(BAN_SAVE_ID)
                .and_then(|raw| raw.parse::<i32>().ok())
            else {
                warn!(total_id = %total_id, "Ignoring ban with a non-numeric id");
                continue;
            };
            if self.bans.contains_key(&id) {
                continue;
            }
            let ban = Ban::load(Arc::clone(&self.meta), Arc::clone(&self.events), id, Some(data))?;
            self.bans.insert(id, ban);
            loaded += 1;
        }
        info!(bans = loaded, "Loaded bans");
        Ok(loaded)
    }

    /// Creates (or replaces) the ban with `id`.
    pub fn create_ban(
        &mut self,
        id: i32,
        name: &str,
        ban_type: BanType,
        duration: Option<u64>,
    ) -> Result<&Ban> {
        let mut event = BanEvent::Create {
            id,
            name: name.to_string(),
            ban_type,
            duration,
        };
        EventCancelled::check(self.events.as_ref(), &mut event)?;
        let BanEvent::Create {
            name,
            ban_type,
            duration,
            ..
        } = event
        else {
            return Err(BanError::EventRewritten("ban_create"));
        };

        self.bans.remove(&id);
        self.meta.purge(&format!("{BAN_SAVE_ID}{id}"))?;
        let seed = Ban::seed(&name, ban_type, duration);
        let ban = Ban::load(Arc::clone(&self.meta), Arc::clone(&self.events), id, Some(seed))?;
        debug!(id, name = %name, %ban_type, "Created ban");
        Ok(self.bans.entry(id).or_insert(ban))
    }

    pub fn ban(&self, id: i32) -> Option<&Ban> {
        self.bans.get(&id)
    }

    pub fn ban_mut(&mut self, id: i32) -> Option<&mut Ban> {
        self.bans.get_mut(&id)
    }

    /// Loaded bans ordered by id.
    pub fn bans(&self) -> impl Iterator<Item = &Ban> {
        self.bans.values()
    }

    /// Deletes a ban template. Issued punishments are unaffected.
    pub fn delete_ban(&mut self, id: i32) -> Result<bool> {
        let Some(mut ban) = self.bans.remove(&id) else {
            return Ok(false);
        };
        ban.delete()?;
        debug!(id, "Deleted ban");
        Ok(true)
    }

    fn view(&self, target: &str, node: PunishmentNode) -> Punishment {
        Punishment::new(target, node, Arc::clone(&self.meta), Arc::clone(&self.events))
    }

    /// Issues the ban `ban_id` to `target`.
    pub fn punish(
        &self,
        target: &str,
        ban_id: i32,
        operator: BanOperator,
        cause: Option<String>,
    ) -> Result<Punishment> {
        let ban = self.ban(ban_id).ok_or(BanError::UnknownBan(ban_id))?;
        let node = PunishmentNode::issue(ban, operator, cause, Timestamp::now())?;
        store_node(&self.meta, target, &node)?;
        info!(
            total_id = target,
            ban = ban_id,
            ban_type = %node.ban_type,
            punishment = %node.id,
            "Issued punishment"
        );
        Ok(self.view(target, node))
    }

    /// Every punishment issued to `target`, oldest first.
    pub fn punishments(&self, target: &str) -> Result<Vec<Punishment>> {
        Ok(load_nodes(&self.meta, target)?
            .into_iter()
            .map(|node| self.view(target, node))
            .collect())
    }

    /// Every punishment issued to anyone.
    ///
    /// Unreadable lists and entries are logged and skipped.
    pub fn all_punishments(&self) -> Result<Vec<Punishment>> {
        let rows = self
            .meta
            .select([Column::TotalId, Column::Value])
            .where_eq(Column::Key, list_key(PUNISHMENT_KEY))
            .execute()?;

        let mut punishments = Vec::new();
        for row in rows {
            let [target, value] = row.as_slice() else {
                continue;
            };
            let raw: Vec<String> = match from_json(value) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(total_id = %target, error = %e, "Skipping unreadable punishment list");
                    continue;
                }
            };
            punishments.extend(
                decode_nodes(target, &raw)
                    .into_iter()
                    .map(|node| self.view(target, node)),
            );
        }
        Ok(punishments)
    }

    /// The earliest issued punishment of `ban_type` still in force.
    pub fn valid_punishment(&self, target: &str, ban_type: BanType) -> Result<Option<Punishment>> {
        let now = Timestamp::now();
        Ok(self
            .punishments(target)?
            .into_iter()
            .filter(|p| p.ban_type() == ban_type && p.is_valid(now))
            .min_by_key(|p| p.window().start))
    }

    /// The earliest issued punishment of any type still in force.
    pub fn active_punishment(&self, target: &str) -> Result<Option<Punishment>> {
        let now = Timestamp::now();
        Ok(self
            .punishments(target)?
            .into_iter()
            .filter(|p| p.is_valid(now))
            .min_by_key(|p| p.window().start))
    }
}
