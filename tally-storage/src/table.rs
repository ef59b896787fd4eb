//! TableVotingStorage: votes as `(key, actor, value)` rows in SQLite.

use std::path::Path;

use tally_core::config::StorageConfig;
use tally_core::errors::StorageError;
use tally_core::models::{Actor, ActorSet, Key, StoreId, VoteMap};
use tally_core::traits::VotingStorage;

use crate::connection::writer::with_immediate_transaction;
use crate::connection::DatabaseManager;
use crate::consistency::check_storage_consistency;
use crate::diff::{VoteDiff, VoteRow};
use crate::layout::TableLayout;
use crate::queries::votes;
use crate::to_storage_err;

pub struct TableVotingStorage {
    db: DatabaseManager,
    layout: TableLayout,
    store_id: StoreId,
    max_sql_params: usize,
    check_consistency: bool,
}

impl TableVotingStorage {
    pub fn open(path: &Path, config: &StorageConfig) -> Result<Self, StorageError> {
        Self::with_manager(DatabaseManager::open(path)?, config)
    }

    pub fn open_in_memory(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::with_manager(DatabaseManager::open_in_memory()?, config)
    }

    /// Bind to an opened database. A non-default layout gets its table
    /// created if missing.
    pub fn with_manager(db: DatabaseManager, config: &StorageConfig) -> Result<Self, StorageError> {
        let layout = TableLayout::from_config(config)?;
        let storage = Self {
            store_id: StoreId::sql(layout.table()),
            db,
            layout,
            max_sql_params: config.effective_max_sql_params(),
            check_consistency: config.effective_check_consistency(),
        };
        if !storage.layout.is_default() {
            storage.ensure_table()?;
        }
        Ok(storage)
    }

    /// Create the vote table of this layout if it does not exist.
    pub fn ensure_table(&self) -> Result<(), StorageError> {
        let sql = self.layout.create_table_sql();
        self.db
            .with_writer(|conn| conn.execute_batch(&sql).map_err(to_storage_err))
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Diff against `previous` (reloaded inside the transaction when
    /// absent) and write the result in one immediate transaction.
    fn store_diff(&self, current: &VoteMap, previous: Option<&VoteMap>) -> Result<(), StorageError> {
        let keys: Vec<Key> = current.keys().copied().collect();
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                let loaded;
                let previous = match previous {
                    Some(previous) => previous,
                    None => {
                        loaded = votes::select_keys(tx, &self.layout, &keys, self.max_sql_params)?;
                        &loaded
                    }
                };
                let diff = VoteDiff::compute(current, previous);
                tracing::debug!(
                    store = %self.store_id,
                    added = diff.added.len(),
                    modified = diff.modified.len(),
                    deleted_keys = diff.deleted.len(),
                    "vote diff computed"
                );
                if diff.is_empty() {
                    return Ok(());
                }
                votes::write_diff(tx, &self.layout, &diff, self.max_sql_params)
            })
        })
    }

    /// Per-row reconciliation: every vote of `current` is updated or
    /// inserted, then actors no longer in `current` are deleted, one
    /// transaction per key. Afterwards each key of `current` is persisted
    /// exactly as given.
    fn store_ultra_safe(&self, current: &VoteMap) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            for (&key, set) in current {
                with_immediate_transaction(conn, |tx| {
                    for token in set.iter() {
                        votes::upsert_row(tx, &self.layout, &VoteRow::new(key, token))?;
                    }
                    let stored = votes::select_key(tx, &self.layout, key)?;
                    let stale: Vec<Actor> = stored
                        .actors()
                        .filter(|&actor| !set.contains_actor(actor))
                        .collect();
                    if !stale.is_empty() {
                        votes::delete_actors(tx, &self.layout, key, &stale, self.max_sql_params)?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    }
}

impl VotingStorage for TableVotingStorage {
    fn storage_id(&self) -> &StoreId {
        &self.store_id
    }

    fn load(&self, key: Key) -> Result<ActorSet, StorageError> {
        self.db
            .with_reader(|conn| votes::select_key(conn, &self.layout, key))
    }

    fn load_batch(&self, keys: &[Key]) -> Result<VoteMap, StorageError> {
        if keys.is_empty() {
            return Ok(VoteMap::default());
        }
        self.db
            .with_reader(|conn| votes::select_keys(conn, &self.layout, keys, self.max_sql_params))
    }

    fn load_all(&self) -> Result<VoteMap, StorageError> {
        self.db
            .with_reader(|conn| votes::select_all(conn, &self.layout))
    }

    fn store_batch(&self, current: &VoteMap, previous: Option<&VoteMap>) -> Result<(), StorageError> {
        let _span = tracing::info_span!("tally.store_batch", store = %self.store_id, keys = current.len())
            .entered();

        if let (Some(previous), true) = (previous, self.check_consistency) {
            if let Err(e) = check_storage_consistency(self, current, previous) {
                tracing::warn!(store = %self.store_id, error = %e, "consistency check failed to run");
            }
        }

        match self.store_diff(current, previous) {
            Ok(()) => Ok(()),
            Err(e) if e.is_query_error() => {
                tracing::error!(
                    store = %self.store_id,
                    error = %e,
                    "batched vote store failed, falling back to per-row writes"
                );
                self.store_ultra_safe(current)
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for TableVotingStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableVotingStorage")
            .field("store_id", &self.store_id)
            .field("layout", &self.layout)
            .field("max_sql_params", &self.max_sql_params)
            .finish()
    }
}
