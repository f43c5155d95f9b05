//! Ban templates.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use kissen_meta::{MetaData, ObjectMeta};
use kissen_savable::{Savable, SavableMap, setup_repository};
use kissen_types::{Event, EventCancelled, EventDispatcher};
use serde::{Deserialize, Serialize};

use crate::error::{BanError, Result};
use crate::event::BanEvent;

/// Storage prefix of bans.
pub const BAN_SAVE_ID: &str = "banid";

const NAME: &str = "name";
const BAN_TYPE: &str = "ban_type";
const DURATION: &str = "duration";

/// What a punishment does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BanType {
    Ban,
    Mute,
    Kick,
}

impl BanType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Mute => "mute",
            Self::Kick => "kick",
        }
    }
}

impl fmt::Display for BanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BanType {
    type Err = BanError;

    /// Accepts any casing, so `BAN` and `ban` both parse.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ban" => Ok(Self::Ban),
            "mute" => Ok(Self::Mute),
            "kick" => Ok(Self::Kick),
            _ => Err(BanError::UnknownBanType(s.to_string())),
        }
    }
}

/// A reusable ban template.
///
/// Stored under `banid<id>` with the keys `name`, `ban_type` and the
/// optional `duration` in milliseconds (absent means permanent).
pub struct Ban {
    id: i32,
    raw_id: String,
    repository: SavableMap,
    events: Arc<dyn EventDispatcher<BanEvent>>,
}

impl fmt::Debug for Ban {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ban")
            .field("id", &self.id)
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl Ban {
    /// Loads the ban from `meta`, or from `seed` when given.
    ///
    /// Fails if `name` or `ban_type` is missing.
    pub fn load(
        meta: Arc<ObjectMeta>,
        events: Arc<dyn EventDispatcher<BanEvent>>,
        id: i32,
        seed: Option<MetaData>,
    ) -> Result<Self> {
        let raw_id = id.to_string();
        let repository = setup_repository(meta, BAN_SAVE_ID, &raw_id, &[NAME, BAN_TYPE], seed)?;
        let ban = Self {
            id,
            raw_id,
            repository,
            events,
        };
        ban.ban_type()?;
        ban.duration()?;
        Ok(ban)
    }

    /// Seed data for a new ban.
    pub(crate) fn seed(name: &str, ban_type: BanType, duration: Option<u64>) -> MetaData {
        let mut data = MetaData::default();
        data.values.insert(NAME.to_string(), name.to_string());
        data.values.insert(BAN_TYPE.to_string(), ban_type.to_string());
        if let Some(duration) = duration {
            data.values.insert(DURATION.to_string(), duration.to_string());
        }
        data
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> Result<&str> {
        Ok(self.repository.get_not_null(NAME)?)
    }

    pub fn ban_type(&self) -> Result<BanType> {
        self.repository.get_not_null(BAN_TYPE)?.parse()
    }

    /// Duration in milliseconds; `None` is permanent.
    pub fn duration(&self) -> Result<Option<u64>> {
        self.repository
            .get(DURATION)
            .map(|raw| {
                raw.parse().map_err(|_| BanError::InvalidValue {
                    id: self.id,
                    key: DURATION.to_string(),
                    value: raw.to_string(),
                })
            })
            .transpose()
    }

    fn dispatch(&self, event: &mut BanEvent) -> Result<()> {
        EventCancelled::check(self.events.as_ref(), event)?;
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let mut event = BanEvent::Rename {
            id: self.id,
            old: self.name()?.to_string(),
            new: name.to_string(),
        };
        self.dispatch(&mut event)?;
        let name = match event {
            BanEvent::Rename { new, .. } => new,
            other => return Err(BanError::EventRewritten(other.name())),
        };
        self.repository.set(NAME, Some(name.as_str()))?;
        Ok(())
    }

    pub fn set_ban_type(&mut self, ban_type: BanType) -> Result<()> {
        let mut event = BanEvent::AlterType {
            id: self.id,
            old: self.ban_type()?,
            new: ban_type,
        };
        self.dispatch(&mut event)?;
        let ban_type = match event {
            BanEvent::AlterType { new, .. } => new,
            other => return Err(BanError::EventRewritten(other.name())),
        };
        self.repository.set(BAN_TYPE, Some(ban_type.as_str()))?;
        Ok(())
    }

    /// Sets the duration of future punishments; `None` makes them permanent.
    pub fn set_duration(&mut self, duration: Option<u64>) -> Result<()> {
        let mut event = BanEvent::AlterDuration {
            id: self.id,
            duration,
        };
        self.dispatch(&mut event)?;
        let duration = match event {
            BanEvent::AlterDuration { duration, .. } => duration,
            other => return Err(BanError::EventRewritten(other.name())),
        };
        self.repository
            .set(DURATION, duration.map(|d| d.to_string()).as_deref())?;
        Ok(())
    }
}

impl Savable for Ban {
    fn save_id(&self) -> &str {
        BAN_SAVE_ID
    }

    fn raw_id(&self) -> &str {
        &self.raw_id
    }

    fn repository(&self) -> &SavableMap {
        &self.repository
    }

    fn repository_mut(&mut self) -> &mut SavableMap {
        &mut self.repository
    }
}
