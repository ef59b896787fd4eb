//! Identity of a backing store, used to filter change notifications.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of backend a vote store is persisted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    SqlDb,
    KeyValueDb,
}

/// `(backend kind, backend name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId {
    pub kind: StorageKind,
    pub name: String,
}

impl StoreId {
    pub fn new(kind: StorageKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn sql(table: impl Into<String>) -> Self {
        Self::new(StorageKind::SqlDb, table)
    }

    pub fn key_value(name: impl Into<String>) -> Self {
        Self::new(StorageKind::KeyValueDb, name)
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            StorageKind::SqlDb => "sql",
            StorageKind::KeyValueDb => "kv",
        };
        write!(f, "{kind}:{}", self.name)
    }
}
