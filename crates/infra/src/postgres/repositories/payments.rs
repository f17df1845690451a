use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper,
    dsl::sql,
    insert_into,
    sql_types::{Nullable, Uuid as SqlUuid},
};
use std::sync::Arc;

use crate::postgres::postgres_connection::PgPoolSquad;
use domain::{
    entities::payments::{PaymentEntity, UpsertPaymentEntity},
    repositories::payments::PaymentRepository,
    schema::payments,
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn upsert_payment(&self, payment: UpsertPaymentEntity) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // A webhook without metadata must not clear the owner recorded at checkout.
        let keep_owner = sql::<Nullable<SqlUuid>>("COALESCE(excluded.user_id, payments.user_id)");

        insert_into(payments::table)
            .values(&payment)
            .on_conflict(payments::mollie_payment_id)
            .do_update()
            .set((
                payments::status.eq(&payment.status),
                payments::amount_minor.eq(payment.amount_minor),
                payments::description.eq(&payment.description),
                payments::sequence_type.eq(&payment.sequence_type),
                payments::mollie_subscription_id.eq(&payment.mollie_subscription_id),
                payments::updated_at.eq(payment.updated_at),
                payments::user_id.eq(keep_owner),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn find_by_mollie_payment_id(
        &self,
        mollie_payment_id: &str,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::mollie_payment_id.eq(mollie_payment_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
