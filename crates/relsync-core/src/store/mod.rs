//! Version store: a single actor task owns the embedded database and every
//! other component talks to it through [`StoreHandle`] messages.

pub mod actor;
pub mod db;

use thiserror::Error;

pub use actor::{Store, StoreHandle, StoreOp, StoreReply, StoreRequest};
pub use db::BucketDb;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key exists: {0}")]
    KeyExists(String),

    #[error("nil read: {0}")]
    NilRead(String),

    #[error("incompatible value at {0}: bucket and key names collide")]
    IncompatibleValue(String),

    #[error("store corrupt: {0}")]
    Corrupt(String),

    #[error("invalid key '{0}'")]
    InvalidKey(String),

    #[error("database error: {0}")]
    Db(String),

    #[error("version store is closed")]
    Closed,
}

impl StoreError {
    pub fn is_nil_read(&self) -> bool {
        matches!(self, Self::NilRead(_))
    }

    pub fn is_key_exists(&self) -> bool {
        matches!(self, Self::KeyExists(_))
    }
}
