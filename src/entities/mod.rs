//! Entity module - Contains the SeaORM entity definitions for the database.
//! The whole store is a single key/value table mirroring browser local storage.

pub mod storage_entry;

pub use storage_entry::{
    Column as StorageEntryColumn, Entity as StorageEntry, Model as StorageEntryModel,
};
