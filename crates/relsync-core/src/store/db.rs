//! Hierarchical bucket storage on top of redb.
//!
//! # Table design
//!
//! redb tables are flat, so the bucket tree is kept in two tables:
//! ```text
//! buckets: "a" | "a/b" | "a/b/c"        -> b""     (one row per bucket path)
//! entries: "a/b/c/data"                 -> payload (one row per leaf key)
//! ```
//!
//! Every prefix of a leaf key is a bucket row, so a prefix range scan over
//! `"<bucket>/"` yields exactly that bucket's descendants.

use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, TableError};

use super::StoreError;

const BUCKETS: TableDefinition<&str, &[u8]> = TableDefinition::new("buckets");
const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

type Result<T> = std::result::Result<T, StoreError>;

fn db_err(e: impl Display) -> StoreError {
    StoreError::Db(e.to_string())
}

/// Split and validate a `/`-delimited key. Returns the normalized key and its
/// segments.
pub(crate) fn parse_key(key: &str) -> Result<(String, Vec<&str>)> {
    let segments: Vec<&str> = key.trim_matches('/').split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok((segments.join("/"), segments))
}

/// All proper prefixes of `segments`, shortest first: `a`, `a/b`, ...
fn bucket_prefixes(segments: &[&str]) -> Vec<String> {
    (1..segments.len())
        .map(|n| segments[..n].join("/"))
        .collect()
}

fn descendants<T: ReadableTable<&'static str, &'static [u8]>>(
    table: &T,
    bucket: &str,
) -> Result<Vec<String>> {
    let prefix = format!("{bucket}/");
    let mut keys = Vec::new();
    for entry in table.range(prefix.as_str()..).map_err(db_err)? {
        let (k, _) = entry.map_err(db_err)?;
        let k = k.value();
        if !k.starts_with(&prefix) {
            break;
        }
        keys.push(k.to_string());
    }
    Ok(keys)
}

fn tables_exist(db: &Database) -> Result<bool> {
    let rt = db.begin_read().map_err(db_err)?;
    for table in [BUCKETS, ENTRIES] {
        match rt.open_table(table) {
            Ok(_) => {}
            Err(TableError::TableDoesNotExist(_)) => return Ok(false),
            Err(e) => return Err(db_err(e)),
        }
    }
    Ok(true)
}

/// The single owner of the database file. Only the store actor holds one.
pub struct BucketDb {
    db: Database,
}

impl BucketDb {
    /// Open or create the database at `path`. The tables are created only
    /// when missing, so opening an existing store writes nothing.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(db_err)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        if !tables_exist(&db)? {
            let wt = db.begin_write().map_err(db_err)?;
            wt.open_table(BUCKETS).map_err(db_err)?;
            wt.open_table(ENTRIES).map_err(db_err)?;
            wt.commit().map_err(db_err)?;
        }
        Ok(Self { db })
    }

    /// Read a leaf key. Missing keys and missing buckets are `NilRead`.
    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        let (key, _) = parse_key(key)?;
        let rt = self.db.begin_read().map_err(db_err)?;
        let entries = rt.open_table(ENTRIES).map_err(db_err)?;
        match entries.get(key.as_str()).map_err(db_err)? {
            Some(v) => Ok(v.value().to_vec()),
            None => Err(StoreError::NilRead(key)),
        }
    }

    /// Write a leaf key, creating any missing parent buckets.
    pub fn write(&self, key: &str, payload: &[u8], overwrite: bool) -> Result<()> {
        let (key, segments) = parse_key(key)?;
        if segments.len() < 2 {
            return Err(StoreError::InvalidKey(key));
        }
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut buckets = wt.open_table(BUCKETS).map_err(db_err)?;
            let mut entries = wt.open_table(ENTRIES).map_err(db_err)?;

            if buckets.get(key.as_str()).map_err(db_err)?.is_some() {
                return Err(StoreError::IncompatibleValue(key));
            }
            for bucket in bucket_prefixes(&segments) {
                if entries.get(bucket.as_str()).map_err(db_err)?.is_some() {
                    return Err(StoreError::IncompatibleValue(bucket));
                }
                buckets.insert(bucket.as_str(), b"".as_slice()).map_err(db_err)?;
            }
            if !overwrite && entries.get(key.as_str()).map_err(db_err)?.is_some() {
                return Err(StoreError::KeyExists(key));
            }
            entries.insert(key.as_str(), payload).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    /// Delete a bucket (with everything under it) if `key` names one,
    /// otherwise the leaf key. Deleting an absent key is a no-op.
    pub fn delete(&self, key: &str) -> Result<()> {
        let (key, _) = parse_key(key)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut buckets = wt.open_table(BUCKETS).map_err(db_err)?;
            let mut entries = wt.open_table(ENTRIES).map_err(db_err)?;

            if buckets.get(key.as_str()).map_err(db_err)?.is_some() {
                for child in descendants(&buckets, &key)? {
                    buckets.remove(child.as_str()).map_err(db_err)?;
                }
                for leaf in descendants(&entries, &key)? {
                    entries.remove(leaf.as_str()).map_err(db_err)?;
                }
                buckets.remove(key.as_str()).map_err(db_err)?;
            } else {
                entries.remove(key.as_str()).map_err(db_err)?;
            }
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    /// Names of the direct child buckets of `key`, in key order.
    pub fn list_buckets(&self, key: &str) -> Result<Vec<String>> {
        let (key, _) = parse_key(key)?;
        let rt = self.db.begin_read().map_err(db_err)?;
        let buckets = rt.open_table(BUCKETS).map_err(db_err)?;
        if buckets.get(key.as_str()).map_err(db_err)?.is_none() {
            return Err(StoreError::NilRead(key));
        }
        let prefix_len = key.len() + 1;
        Ok(descendants(&buckets, &key)?
            .into_iter()
            .map(|path| path[prefix_len..].to_string())
            .filter(|name| !name.contains('/'))
            .collect())
    }
}
