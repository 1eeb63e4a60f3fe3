pub mod dialect;
pub mod sql;

use async_trait::async_trait;

use crate::errors::StoreResult;
use crate::models::token::TokenInfo;

/// Token persistence as seen by the grant-flow layer.
///
/// "Not found" is never an error: lookups return `None`, removals succeed.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn create(&self, info: &dyn TokenInfo) -> StoreResult<()>;

    async fn remove_by_code(&self, code: &str) -> StoreResult<()>;

    async fn remove_by_access(&self, access: &str) -> StoreResult<()>;

    async fn remove_by_refresh(&self, refresh: &str) -> StoreResult<()>;

    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Box<dyn TokenInfo>>>;

    async fn get_by_access(&self, access: &str) -> StoreResult<Option<Box<dyn TokenInfo>>>;

    async fn get_by_refresh(&self, refresh: &str) -> StoreResult<Option<Box<dyn TokenInfo>>>;
}
