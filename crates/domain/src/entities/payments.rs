use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::payments;

/// Local mirror of a Mollie payment. The provider stays the source of truth.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub mollie_payment_id: String,
    pub user_id: Option<Uuid>,
    pub status: String,
    pub amount_minor: i32,
    pub description: String,
    pub sequence_type: String,
    pub mollie_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = payments)]
pub struct UpsertPaymentEntity {
    pub mollie_payment_id: String,
    pub user_id: Option<Uuid>,
    pub status: String,
    pub amount_minor: i32,
    pub description: String,
    pub sequence_type: String,
    pub mollie_subscription_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}
