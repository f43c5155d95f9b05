use std::sync::Arc;

use kissen_meta::{MetaData, ObjectMeta};
use tracing::debug;

use crate::error::{Result, SavableError};
use crate::map::SavableMap;

/// An entity persisted as a [`SavableMap`].
///
/// The storage id is `save_id + raw_id`, so all entities of one kind share
/// a prefix and can be bulk-loaded with
/// [`ObjectMeta::get_data_by_prefix`].
pub trait Savable {
    /// Prefix shared by every entity of this kind.
    fn save_id(&self) -> &str;

    fn raw_id(&self) -> &str;

    fn id(&self) -> String {
        format!("{}{}", self.save_id(), self.raw_id())
    }

    fn repository(&self) -> &SavableMap;

    fn repository_mut(&mut self) -> &mut SavableMap;

    /// Purges the entity; returns the number of entries dropped.
    fn delete(&mut self) -> Result<usize> {
        self.repository_mut().purge()
    }
}

/// Loads (or seeds) the repository of a savable.
///
/// Without `seed` the data is read from `meta`. Every key in
/// `required_keys` must be present. A repository without an `id` entry is
/// new: `id` is set to `raw_id` and the whole map is written in one batch.
pub fn setup_repository(
    meta: Arc<ObjectMeta>,
    save_id: &str,
    raw_id: &str,
    required_keys: &[&str],
    seed: Option<MetaData>,
) -> Result<SavableMap> {
    let id = format!("{save_id}{raw_id}");
    let data = match seed {
        Some(data) => data,
        None => meta.get_data(&id),
    };

    let missing: Vec<String> = required_keys
        .iter()
        .filter(|key| !data.values.contains_key(**key) && !data.lists.contains_key(**key))
        .map(|key| (*key).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SavableError::Initialize { id, missing });
    }

    let mut repository = SavableMap::from_data(id, meta, data);
    if !repository.contains_key("id") {
        repository.put("id", Some(raw_id.to_string()));
        let rows = repository.flush()?;
        debug!(id = repository.id(), rows, "Created savable");
    }
    Ok(repository)
}
