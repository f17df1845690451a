use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::subscriptions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mollie_reference_id: String,
    pub mollie_payment_id: String,
    pub mollie_customer_id: Option<String>,
    pub plan: String,
    pub billing_period: String,
    pub status: String,
    pub is_recurring: bool,
    pub contract_start_date: DateTime<Utc>,
    pub contract_end_date: DateTime<Utc>,
    pub opt_out_deadline: DateTime<Utc>,
    pub amount_minor: i32,
    pub discount_code: Option<String>,
    pub discount_amount_minor: i32,
    pub original_price_minor: i32,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub user_id: Uuid,
    pub mollie_reference_id: String,
    pub mollie_payment_id: String,
    pub mollie_customer_id: Option<String>,
    pub plan: String,
    pub billing_period: String,
    pub status: String,
    pub is_recurring: bool,
    pub contract_start_date: DateTime<Utc>,
    pub contract_end_date: DateTime<Utc>,
    pub opt_out_deadline: DateTime<Utc>,
    pub amount_minor: i32,
    pub discount_code: Option<String>,
    pub discount_amount_minor: i32,
    pub original_price_minor: i32,
}
