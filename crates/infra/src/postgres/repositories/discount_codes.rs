use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    OptionalExtension, QueryDsl, QueryableByName, RunQueryDsl, SelectableHelper,
    sql_types::{Bool, Text},
};
use diesel::{ExpressionMethods, sql_query};
use std::sync::Arc;

use crate::postgres::postgres_connection::PgPoolSquad;
use domain::{
    entities::discount_codes::DiscountCodeEntity,
    repositories::discount_codes::DiscountCodeRepository, schema::discount_codes,
};

#[derive(QueryableByName)]
struct IncrementResult {
    #[diesel(sql_type = Bool)]
    incremented: bool,
}

pub struct DiscountCodePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl DiscountCodePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl DiscountCodeRepository for DiscountCodePostgres {
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCodeEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = discount_codes::table
            .filter(discount_codes::code.eq(code))
            .select(DiscountCodeEntity::as_select())
            .first::<DiscountCodeEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn increment_usage(&self, code: &str) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // The function locks the row and checks max_uses in one statement.
        let result = sql_query("SELECT increment_discount_usage($1) AS incremented")
            .bind::<Text, _>(code)
            .get_result::<IncrementResult>(&mut conn)?;

        Ok(result.incremented)
    }
}
