use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::entities::discount_codes::DiscountCodeEntity;

#[automock]
#[async_trait]
pub trait DiscountCodeRepository {
    /// Looks up a code. `code` must already be normalized (trimmed, upper-case).
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCodeEntity>>;

    /// Records one redemption through the `increment_discount_usage` database function.
    /// Returns `false` when the code is unknown or already at `max_uses`.
    async fn increment_usage(&self, code: &str) -> Result<bool>;
}
