use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    entities::subscriptions::SubscriptionEntity,
    value_objects::{
        contracts::{days_until, is_contract_active, is_in_opt_out_period},
        enums::subscription_statuses::SubscriptionStatus,
    },
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionOverviewDto {
    pub id: Uuid,
    pub plan: String,
    pub billing_period: String,
    pub status: SubscriptionStatus,
    pub is_recurring: bool,
    pub amount_minor: i32,
    pub original_price_minor: i32,
    pub discount_code: Option<String>,
    pub contract_start_date: DateTime<Utc>,
    pub contract_end_date: DateTime<Utc>,
    pub opt_out_deadline: DateTime<Utc>,
    pub in_opt_out_period: bool,
    pub contract_active: bool,
    pub opt_out_days_left: i64,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl SubscriptionOverviewDto {
    pub fn from_entity(entity: SubscriptionEntity, now: DateTime<Utc>) -> Self {
        Self {
            id: entity.id,
            status: SubscriptionStatus::from_str(&entity.status).unwrap_or_default(),
            in_opt_out_period: is_in_opt_out_period(Some(entity.opt_out_deadline), now),
            contract_active: is_contract_active(Some(entity.contract_end_date), now),
            opt_out_days_left: days_until(entity.opt_out_deadline, now),
            plan: entity.plan,
            billing_period: entity.billing_period,
            is_recurring: entity.is_recurring,
            amount_minor: entity.amount_minor,
            original_price_minor: entity.original_price_minor,
            discount_code: entity.discount_code,
            contract_start_date: entity.contract_start_date,
            contract_end_date: entity.contract_end_date,
            opt_out_deadline: entity.opt_out_deadline,
            canceled_at: entity.canceled_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CancelSubscriptionResponse {
    pub status: SubscriptionStatus,
    pub canceled_at: DateTime<Utc>,
    pub in_opt_out_period: bool,
    pub contract_end_date: DateTime<Utc>,
}
