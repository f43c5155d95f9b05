//! Main entry point.
//!
//! [`Kissen`] turns a [`KissenConfig`] into live services: one meta table
//! per domain, the permission registry and the ban service, each with its
//! own event bus.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use kissen_ban::{BanEvent, BanService};
use kissen_config::{ConfigLoader, DatabaseConfig, KissenConfig, StorageBackend};
use kissen_meta::sql::{DbLocation, DuckDbBackend};
use kissen_meta::{MemoryBackend, MetaBackend, ObjectMeta, Table};
use kissen_permission::{PermissionEvent, PermissionRegistry};
use kissen_types::EventBus;
use tracing::info;

use crate::error::{KissenError, Result};

/// Opened Kissen services.
pub struct Kissen {
    config: KissenConfig,
    permission_events: Arc<EventBus<PermissionEvent>>,
    ban_events: Arc<EventBus<BanEvent>>,
    permissions: PermissionRegistry,
    bans: BanService,
}

impl fmt::Debug for Kissen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kissen")
            .field("config", &self.config)
            .field("bans", &self.bans)
            .finish_non_exhaustive()
    }
}

impl Kissen {
    /// Loads the layered configuration from `project_dir` and opens it.
    pub fn open_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .load()
            .map_err(KissenError::Load)?;
        Self::open(config)
    }

    /// Opens the configured backend and loads stored groups and bans.
    pub fn open(config: KissenConfig) -> Result<Self> {
        config.validate()?;

        let permission_meta = open_meta(&config.database, &config.permission.table)?;
        let ban_meta = open_meta(&config.database, &config.ban.table)?;

        let permission_events = Arc::new(EventBus::new());
        let ban_events = Arc::new(EventBus::new());

        let mut permissions = PermissionRegistry::new(permission_meta, permission_events.clone());
        let groups = permissions.load_groups()?;

        let mut bans = BanService::new(ban_meta, ban_events.clone());
        let loaded = bans.load()?;

        info!(
            backend = ?config.database.backend,
            groups,
            bans = loaded,
            "Kissen opened"
        );

        Ok(Self {
            config,
            permission_events,
            ban_events,
            permissions,
            bans,
        })
    }

    pub fn config(&self) -> &KissenConfig {
        &self.config
    }

    pub fn permissions(&self) -> &PermissionRegistry {
        &self.permissions
    }

    pub fn permissions_mut(&mut self) -> &mut PermissionRegistry {
        &mut self.permissions
    }

    pub fn bans(&self) -> &BanService {
        &self.bans
    }

    pub fn bans_mut(&mut self) -> &mut BanService {
        &mut self.bans
    }

    /// Listeners registered here see every permission change.
    pub fn permission_events(&self) -> &EventBus<PermissionEvent> {
        &self.permission_events
    }

    /// Listeners registered here see every ban and punishment change.
    pub fn ban_events(&self) -> &EventBus<BanEvent> {
        &self.ban_events
    }
}

fn open_meta(database: &DatabaseConfig, table: &str) -> Result<Arc<ObjectMeta>> {
    let layout = Table::object(table);
    let backend: Arc<dyn MetaBackend> = match database.backend {
        StorageBackend::Memory => Arc::new(MemoryBackend::new(layout)),
        StorageBackend::DuckDb => {
            std::fs::create_dir_all(&database.data_dir)?;
            let location = DbLocation::File(database.table_file(table));
            Arc::new(DuckDbBackend::open(layout, location).map_err(kissen_meta::MetaError::from)?)
        }
    };
    Ok(Arc::new(ObjectMeta::new(backend)))
}
