pub mod archive;
pub mod asset;
pub mod cleanup;
pub mod config;
pub mod context;
pub mod download;
pub mod error;
pub mod io;
pub mod paths;
pub mod pipeline;
pub mod record;
pub mod release;
pub mod source;
pub mod store;
pub mod sync;
pub mod template;

#[cfg(test)]
pub(crate) mod testutil;

pub use context::SyncContext;
pub use error::{RelsyncError, Result};
pub use release::Release;
