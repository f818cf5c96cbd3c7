//! Key/value storage - the shared "local storage" both contexts read and write.
//!
//! Values are whole JSON documents keyed by [`StorageKey`]. Every write replaces
//! the previous value (last writer wins); there is no merge or versioning.
//! Reads are forgiving: a missing key or a value that no longer parses yields
//! an empty list rather than an error, so a corrupted entry degrades to "no
//! data" instead of taking a page down.

use crate::{
    entities::{StorageEntry, storage_entry},
    errors::Result,
};
use sea_orm::{Set, prelude::*};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use tracing::{instrument, trace, warn};

/// The fixed keys shared by the admin and storefront stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// The admin's authoritative product snapshot
    AdminProducts,
    /// Every order placed so far
    Orders,
    /// The storefront cart
    Cart,
    /// The storefront's last-known mirror of the catalog
    SyncedProducts,
}

impl StorageKey {
    /// Key string as stored in the table
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdminProducts => "adminProducts",
            Self::Orders => "orders",
            Self::Cart => "cart",
            Self::SyncedProducts => "syncedProducts",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the raw value stored under `key`, if any.
pub async fn get_item(db: &DatabaseConnection, key: StorageKey) -> Result<Option<String>> {
    let entry = StorageEntry::find_by_id(key.as_str().to_string())
        .one(db)
        .await?;
    Ok(entry.map(|e| e.value))
}

/// Stores `value` under `key`, replacing whatever was there.
#[instrument(skip(db, value), fields(bytes = value.len()))]
pub async fn set_item(db: &DatabaseConnection, key: StorageKey, value: String) -> Result<()> {
    let now = chrono::Utc::now();

    let existing = StorageEntry::find_by_id(key.as_str().to_string())
        .one(db)
        .await?;

    if let Some(entry) = existing {
        let mut active_model: storage_entry::ActiveModel = entry.into();
        active_model.value = Set(value);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let active_model = storage_entry::ActiveModel {
            key: Set(key.as_str().to_string()),
            value: Set(value),
            updated_at: Set(now),
        };
        active_model.insert(db).await?;
    }

    trace!("Wrote storage key {}", key);
    Ok(())
}

/// Deletes `key`. Removing a key that is not present is not an error.
pub async fn remove_item(db: &DatabaseConnection, key: StorageKey) -> Result<()> {
    StorageEntry::delete_by_id(key.as_str().to_string())
        .exec(db)
        .await?;
    Ok(())
}

/// Reads the JSON array under `key`.
///
/// A missing key or a value that fails to parse yields an empty list; only a
/// database failure is reported as an error.
#[instrument(skip(db))]
pub async fn read_list<T: DeserializeOwned>(
    db: &DatabaseConnection,
    key: StorageKey,
) -> Result<Vec<T>> {
    let Some(raw) = get_item(db, key).await? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str(&raw) {
        Ok(list) => Ok(list),
        Err(e) => {
            warn!("Storage key {} holds unparsable data, treating as empty: {}", key, e);
            Ok(Vec::new())
        }
    }
}

/// Serializes `list` as a JSON array and stores it under `key`.
pub async fn write_list<T: Serialize>(
    db: &DatabaseConnection,
    key: StorageKey,
    list: &[T],
) -> Result<()> {
    let raw = serde_json::to_string(list)?;
    set_item(db, key, raw).await
}
