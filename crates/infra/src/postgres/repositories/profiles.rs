use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::postgres::postgres_connection::PgPoolSquad;
use domain::{
    entities::profiles::ProfileEntity,
    repositories::profiles::ProfileRepository,
    schema::profiles,
    value_objects::enums::profile_subscription_statuses::ProfileSubscriptionStatus,
};

pub struct ProfilePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ProfilePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ProfileRepository for ProfilePostgres {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<ProfileEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = profiles::table
            .find(user_id)
            .select(ProfileEntity::as_select())
            .first::<ProfileEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: ProfileSubscriptionStatus,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(profiles::table)
            .filter(profiles::id.eq(user_id))
            .set((
                profiles::subscription_status.eq(status.to_string()),
                profiles::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn set_mollie_customer_id(&self, user_id: Uuid, customer_id: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(profiles::table)
            .filter(profiles::id.eq(user_id))
            .set((
                profiles::mollie_customer_id.eq(Some(customer_id)),
                profiles::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
