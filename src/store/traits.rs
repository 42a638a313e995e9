//! Key-value persistence capability.

use async_trait::async_trait;

use crate::error::StoreError;

/// String-keyed, string-valued persistent store.
///
/// The session storage service is the only caller; it owns key naming and
/// the JSON encoding of values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Returns whether anything was removed.
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;
}
