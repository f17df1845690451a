use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::discount_codes;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = discount_codes)]
pub struct DiscountCodeEntity {
    pub id: Uuid,
    pub code: String,
    pub discount_percentage: Option<f64>,
    pub discount_amount_minor: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
