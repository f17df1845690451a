use chrono::{DateTime, Utc};
use domain::entities::payments::UpsertPaymentEntity;
use uuid::Uuid;

use crate::interfaces::payment_gateway::ProviderPayment;

pub(crate) fn cache_entry(
    payment: &ProviderPayment,
    user_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> UpsertPaymentEntity {
    UpsertPaymentEntity {
        mollie_payment_id: payment.id.clone(),
        user_id,
        status: payment.status.clone(),
        amount_minor: payment.amount_minor,
        description: payment.description.clone(),
        sequence_type: payment.sequence_type.clone(),
        mollie_subscription_id: payment.subscription_id.clone(),
        updated_at: now,
    }
}
