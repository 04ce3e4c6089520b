//! State store trait definition.

use async_trait::async_trait;

use super::lock::LockInfo;
use super::types::SyncState;
use crate::error::Result;

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the sync state. Returns `None` if no state exists yet.
    async fn load(&self) -> Result<Option<SyncState>>;

    /// Saves the sync state.
    async fn save(&self, state: &SyncState) -> Result<()>;

    /// Deletes the sync state and any lock.
    async fn delete(&self) -> Result<()>;

    /// Checks if state exists.
    async fn exists(&self) -> Result<bool>;

    /// Acquires the state lock for an operation.
    ///
    /// An empty holder generates one for the current process.
    async fn acquire_lock(&self, holder: &str, operation: &str) -> Result<LockInfo>;

    /// Releases the lock if `lock_id` still owns it.
    async fn release_lock(&self, lock_id: &str) -> Result<()>;

    /// Removes the lock regardless of its holder.
    async fn force_unlock(&self) -> Result<Option<LockInfo>>;

    /// Gets the current lock, expired or not.
    async fn lock_info(&self) -> Result<Option<LockInfo>>;

    /// Human-readable location of the state.
    fn location(&self) -> String;
}

#[async_trait]
impl StateStore for Box<dyn StateStore> {
    async fn load(&self) -> Result<Option<SyncState>> {
        (**self).load().await
    }

    async fn save(&self, state: &SyncState) -> Result<()> {
        (**self).save(state).await
    }

    async fn delete(&self) -> Result<()> {
        (**self).delete().await
    }

    async fn exists(&self) -> Result<bool> {
        (**self).exists().await
    }

    async fn acquire_lock(&self, holder: &str, operation: &str) -> Result<LockInfo> {
        (**self).acquire_lock(holder, operation).await
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        (**self).release_lock(lock_id).await
    }

    async fn force_unlock(&self) -> Result<Option<LockInfo>> {
        (**self).force_unlock().await
    }

    async fn lock_info(&self) -> Result<Option<LockInfo>> {
        (**self).lock_info().await
    }

    fn location(&self) -> String {
        (**self).location()
    }
}
