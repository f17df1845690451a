use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::entities::payments::{PaymentEntity, UpsertPaymentEntity};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn upsert_payment(&self, payment: UpsertPaymentEntity) -> Result<()>;

    async fn find_by_mollie_payment_id(
        &self,
        mollie_payment_id: &str,
    ) -> Result<Option<PaymentEntity>>;
}
