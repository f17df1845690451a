use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::profiles;

// Rows are created by the auth provider's signup trigger; only a few columns are written here.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = profiles)]
pub struct ProfileEntity {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub subscription_status: String,
    pub mollie_customer_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}
