use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::{
    entities::profiles::ProfileEntity,
    value_objects::enums::profile_subscription_statuses::ProfileSubscriptionStatus,
};

#[automock]
#[async_trait]
pub trait ProfileRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<ProfileEntity>>;

    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: ProfileSubscriptionStatus,
    ) -> Result<()>;

    async fn set_mollie_customer_id(&self, user_id: Uuid, customer_id: &str) -> Result<()>;
}
