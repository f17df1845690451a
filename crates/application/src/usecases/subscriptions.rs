use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::{
    repositories::{profiles::ProfileRepository, subscriptions::SubscriptionRepository},
    value_objects::{
        contracts::is_in_opt_out_period,
        enums::{
            profile_subscription_statuses::ProfileSubscriptionStatus,
            subscription_statuses::SubscriptionStatus,
        },
        subscriptions::{CancelSubscriptionResponse, SubscriptionOverviewDto},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::interfaces::payment_gateway::PaymentGateway;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Geen abonnement gevonden")]
    NotFound,
    #[error("Een jaarabonnement kan niet tussentijds worden opgezegd")]
    NotRecurring,
    #[error("Dit abonnement is al opgezegd")]
    AlreadyCanceled,
    #[error("payment provider request failed")]
    Provider(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type SubscriptionResult<T> = std::result::Result<T, SubscriptionError>;

pub struct SubscriptionUseCase {
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    profile_repo: Arc<dyn ProfileRepository + Send + Sync>,
    payment_gateway: Arc<dyn PaymentGateway>,
}

impl SubscriptionUseCase {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        profile_repo: Arc<dyn ProfileRepository + Send + Sync>,
        payment_gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            subscription_repo,
            profile_repo,
            payment_gateway,
        }
    }

    pub async fn current(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<Option<SubscriptionOverviewDto>> {
        let subscription = self
            .subscription_repo
            .find_latest_for_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load subscription");
                SubscriptionError::Internal(err)
            })?;

        Ok(subscription.map(|entity| SubscriptionOverviewDto::from_entity(entity, now)))
    }

    /// Stops future charges at Mollie, then marks the local row and profile canceled.
    pub async fn cancel(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<CancelSubscriptionResponse> {
        let subscription = self
            .subscription_repo
            .find_latest_for_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load subscription");
                SubscriptionError::Internal(err)
            })?
            .ok_or(SubscriptionError::NotFound)?;

        if !subscription.is_recurring {
            warn!(%user_id, subscription_id = %subscription.id, "subscriptions: cancel requested for one-time subscription");
            return Err(SubscriptionError::NotRecurring);
        }
        if subscription.canceled_at.is_some()
            || subscription.status == SubscriptionStatus::Canceled.as_str()
        {
            return Err(SubscriptionError::AlreadyCanceled);
        }

        let customer_id = subscription.mollie_customer_id.as_deref().ok_or_else(|| {
            error!(subscription_id = %subscription.id, "subscriptions: recurring subscription has no customer");
            SubscriptionError::Internal(anyhow::anyhow!(
                "subscription {} has no mollie customer",
                subscription.id
            ))
        })?;

        self.payment_gateway
            .cancel_subscription(customer_id, &subscription.mollie_reference_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    reference_id = %subscription.mollie_reference_id,
                    error = ?err,
                    "subscriptions: mollie cancellation failed"
                );
                SubscriptionError::Provider(err)
            })?;

        self.subscription_repo
            .mark_canceled(subscription.id, now)
            .await
            .map_err(|err| {
                error!(subscription_id = %subscription.id, db_error = ?err, "subscriptions: failed to mark canceled");
                SubscriptionError::Internal(err)
            })?;

        if let Err(err) = self
            .profile_repo
            .update_subscription_status(user_id, ProfileSubscriptionStatus::Canceled)
            .await
        {
            warn!(%user_id, db_error = ?err, "subscriptions: failed to update profile status");
        }

        let in_opt_out_period = is_in_opt_out_period(Some(subscription.opt_out_deadline), now);
        info!(
            %user_id,
            subscription_id = %subscription.id,
            in_opt_out_period,
            "subscriptions: subscription canceled"
        );

        Ok(CancelSubscriptionResponse {
            status: SubscriptionStatus::Canceled,
            canceled_at: now,
            in_opt_out_period,
            contract_end_date: subscription.contract_end_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::payment_gateway::MockPaymentGateway;
    use chrono::{Duration, TimeZone};
    use domain::{
        entities::subscriptions::SubscriptionEntity,
        repositories::{profiles::MockProfileRepository, subscriptions::MockSubscriptionRepository},
        value_objects::contracts::calculate_contract_dates,
    };

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn subscription(user_id: Uuid, is_recurring: bool) -> SubscriptionEntity {
        let dates = calculate_contract_dates(start()).unwrap();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            mollie_reference_id: if is_recurring { "sub_1" } else { "tr_1" }.to_string(),
            mollie_payment_id: "tr_1".to_string(),
            mollie_customer_id: Some("cst_1".to_string()),
            plan: "solo".to_string(),
            billing_period: if is_recurring { "monthly" } else { "yearly" }.to_string(),
            status: "paid".to_string(),
            is_recurring,
            contract_start_date: dates.contract_start_date,
            contract_end_date: dates.contract_end_date,
            opt_out_deadline: dates.opt_out_deadline,
            amount_minor: 3_495,
            discount_code: None,
            discount_amount_minor: 0,
            original_price_minor: 3_495,
            canceled_at: None,
            created_at: start(),
            updated_at: start(),
        }
    }

    #[tokio::test]
    async fn overview_reports_the_opt_out_window() {
        let user_id = Uuid::new_v4();
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find_latest_for_user()
            .returning(move |id| Ok(Some(subscription(id, true))));

        let usecase = SubscriptionUseCase::new(
            Arc::new(subscriptions),
            Arc::new(MockProfileRepository::new()),
            Arc::new(MockPaymentGateway::new()),
        );
        let overview = usecase
            .current(user_id, start() + Duration::days(3))
            .await
            .unwrap()
            .unwrap();

        assert!(overview.in_opt_out_period);
        assert!(overview.contract_active);
        assert_eq!(overview.opt_out_days_left, 11);
        assert_eq!(overview.status, SubscriptionStatus::Paid);
    }

    #[tokio::test]
    async fn no_subscription_is_none() {
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find_latest_for_user()
            .returning(|_| Ok(None));

        let usecase = SubscriptionUseCase::new(
            Arc::new(subscriptions),
            Arc::new(MockProfileRepository::new()),
            Arc::new(MockPaymentGateway::new()),
        );
        assert!(usecase.current(Uuid::new_v4(), start()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recurring_subscription_is_canceled_at_mollie_and_locally() {
        let user_id = Uuid::new_v4();
        let now = start() + Duration::days(30);

        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find_latest_for_user()
            .returning(move |id| Ok(Some(subscription(id, true))));
        subscriptions
            .expect_mark_canceled()
            .withf(move |_, at| *at == now)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_update_subscription_status()
            .withf(|_, status| *status == ProfileSubscriptionStatus::Canceled)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_cancel_subscription()
            .withf(|customer, subscription| customer == "cst_1" && subscription == "sub_1")
            .times(1)
            .returning(|_, _| Ok(()));

        let usecase =
            SubscriptionUseCase::new(Arc::new(subscriptions), Arc::new(profiles), Arc::new(gateway));
        let response = usecase.cancel(user_id, now).await.unwrap();

        assert_eq!(response.status, SubscriptionStatus::Canceled);
        assert!(!response.in_opt_out_period);
        assert_eq!(response.canceled_at, now);
    }

    #[tokio::test]
    async fn one_time_subscription_cannot_be_canceled() {
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find_latest_for_user()
            .returning(|id| Ok(Some(subscription(id, false))));
        subscriptions.expect_mark_canceled().never();

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_cancel_subscription().never();

        let usecase = SubscriptionUseCase::new(
            Arc::new(subscriptions),
            Arc::new(MockProfileRepository::new()),
            Arc::new(gateway),
        );
        let err = usecase.cancel(Uuid::new_v4(), start()).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::NotRecurring));
    }

    #[tokio::test]
    async fn provider_failure_leaves_the_row_untouched() {
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find_latest_for_user()
            .returning(|id| Ok(Some(subscription(id, true))));
        subscriptions.expect_mark_canceled().never();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_cancel_subscription()
            .returning(|_, _| Err(anyhow::anyhow!("502 from mollie")));

        let usecase = SubscriptionUseCase::new(
            Arc::new(subscriptions),
            Arc::new(MockProfileRepository::new()),
            Arc::new(gateway),
        );
        let err = usecase.cancel(Uuid::new_v4(), start()).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::Provider(_)));
    }
}
