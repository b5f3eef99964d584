//! Local username mapping.
//!
//! Resolved identities can be translated to local account names through an
//! externally maintained file of `external_name local_name` pairs. The file
//! is re-read whenever its modification time moves forward, so edits take
//! effect without a restart.
//!
//! - [`MappingTable`] - parsed file contents
//! - [`MappingSource`] / [`FileMappingSource`] - where contents come from
//! - [`MappingCache`] - mtime-invalidated, atomically swapped table
//! - [`UsernameMapper`] - the [`UsernameMap`] used at login normalization

pub mod cache;
pub mod mapper;
pub mod source;
pub mod table;

use async_trait::async_trait;

use crate::AuthResult;

pub use cache::{MappingCache, MappingCacheStats};
pub use mapper::{NameShortener, UsernameMapper};
pub use source::{FileMappingSource, MappingSource};
pub use table::MappingTable;

/// Translates a resolved username into a local account name.
#[async_trait]
pub trait UsernameMap: Send + Sync {
    /// Returns the local name for `username`; unmapped names pass through
    /// in normalized form.
    async fn resolve(&self, username: &str) -> AuthResult<String>;
}
