use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    /// Finds the subscription created from `mollie_payment_id`, or the one whose
    /// reference equals it (one-time payments use the payment id as reference).
    async fn find_by_payment_id(&self, mollie_payment_id: &str)
    -> Result<Option<SubscriptionEntity>>;

    async fn find_by_reference_id(
        &self,
        mollie_reference_id: &str,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Inserts unless a row with the same reference or payment id already exists.
    /// Returns the new id, or `None` when another delivery won the race.
    async fn insert_if_absent(&self, subscription: InsertSubscriptionEntity)
    -> Result<Option<Uuid>>;

    async fn update_status_by_reference_id(
        &self,
        mollie_reference_id: &str,
        status: SubscriptionStatus,
    ) -> Result<()>;

    async fn find_latest_for_user(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn mark_canceled(&self, subscription_id: Uuid, canceled_at: DateTime<Utc>) -> Result<()>;
}
