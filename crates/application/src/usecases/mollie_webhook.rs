use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use domain::{
    entities::subscriptions::InsertSubscriptionEntity,
    repositories::{
        discount_codes::DiscountCodeRepository, payments::PaymentRepository,
        profiles::ProfileRepository, subscriptions::SubscriptionRepository,
    },
    value_objects::{
        checkout::CheckoutMetadata,
        contracts::{ContractDates, calculate_contract_dates},
        enums::{
            profile_subscription_statuses::ProfileSubscriptionStatus,
            sequence_types::SequenceType, subscription_statuses::SubscriptionStatus,
        },
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::payment_cache::cache_entry;
use crate::{
    interfaces::{
        mailer::{Mailer, OutgoingEmail},
        payment_gateway::{
            CreateSubscriptionRequest, FIRST_PAYMENT_METADATA_KEY, PaymentGateway, ProviderPayment,
        },
    },
    templates::{WelcomeDetails, welcome_email},
};

const RECURRING_INTERVAL: &str = "1 month";
const PAYMENT_ID_PREFIX: &str = "tr_";

/// Mollie payment ids are `tr_` followed by alphanumerics. Anything else never reaches a URL.
pub fn is_mollie_payment_id(id: &str) -> bool {
    id.strip_prefix(PAYMENT_ID_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric()))
}

/// What a single webhook delivery ended up doing. The HTTP layer answers 200 for all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    MissingPaymentId,
    InvalidPaymentId,
    PaymentUnavailable,
    /// Only the local payment cache was refreshed.
    Recorded(SubscriptionStatus),
    AlreadyProcessed,
    InvalidMetadata,
    ProviderSubscriptionFailed,
    StorageFailed,
    SubscriptionCreated { subscription_id: Uuid, reference_id: String },
    /// Another delivery inserted the same subscription first.
    DuplicateDelivery,
    RenewalRecorded { reference_id: String, status: SubscriptionStatus },
    UnknownSubscription,
}

#[derive(Debug, Clone)]
pub struct MollieWebhookConfig {
    pub app_url: String,
    pub webhook_url: String,
}

pub struct MollieWebhookUseCase {
    payment_gateway: Arc<dyn PaymentGateway>,
    payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    profile_repo: Arc<dyn ProfileRepository + Send + Sync>,
    discount_repo: Arc<dyn DiscountCodeRepository + Send + Sync>,
    mailer: Arc<dyn Mailer>,
    config: MollieWebhookConfig,
}

impl MollieWebhookUseCase {
    pub fn new(
        payment_gateway: Arc<dyn PaymentGateway>,
        payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        profile_repo: Arc<dyn ProfileRepository + Send + Sync>,
        discount_repo: Arc<dyn DiscountCodeRepository + Send + Sync>,
        mailer: Arc<dyn Mailer>,
        config: MollieWebhookConfig,
    ) -> Self {
        Self {
            payment_gateway,
            payment_repo,
            subscription_repo,
            profile_repo,
            discount_repo,
            mailer,
            config,
        }
    }

    /// Processes one delivery for `payment_id`. Never fails: every problem is
    /// logged and turned into an outcome so the provider gets its 200.
    pub async fn handle(&self, payment_id: &str, now: DateTime<Utc>) -> WebhookOutcome {
        let payment_id = payment_id.trim();
        if payment_id.is_empty() {
            warn!("mollie_webhook: delivery without payment id");
            return WebhookOutcome::MissingPaymentId;
        }
        if !is_mollie_payment_id(payment_id) {
            warn!(%payment_id, "mollie_webhook: malformed payment id");
            return WebhookOutcome::InvalidPaymentId;
        }

        let payment = match self.payment_gateway.get_payment(payment_id).await {
            Ok(payment) => payment,
            Err(err) => {
                error!(%payment_id, error = ?err, "mollie_webhook: failed to fetch payment");
                return WebhookOutcome::PaymentUnavailable;
            }
        };

        let metadata = parse_metadata(&payment);
        let user_id = metadata.as_ref().map(|m| m.user_id);

        if let Err(err) = self
            .payment_repo
            .upsert_payment(cache_entry(&payment, user_id, now))
            .await
        {
            warn!(%payment_id, db_error = ?err, "mollie_webhook: failed to cache payment");
        }

        let Some(status) = SubscriptionStatus::from_str(&payment.status) else {
            warn!(%payment_id, status = %payment.status, "mollie_webhook: unknown payment status");
            return WebhookOutcome::Recorded(SubscriptionStatus::default());
        };

        info!(
            %payment_id,
            %status,
            sequence_type = %payment.sequence_type,
            "mollie_webhook: payment fetched"
        );

        match SequenceType::from_str(&payment.sequence_type) {
            Some(SequenceType::Recurring) => self.handle_renewal(&payment, status).await,
            _ if status == SubscriptionStatus::Paid => {
                self.activate_subscription(&payment, metadata, now).await
            }
            _ => WebhookOutcome::Recorded(status),
        }
    }

    async fn activate_subscription(
        &self,
        payment: &ProviderPayment,
        metadata: Option<CheckoutMetadata>,
        now: DateTime<Utc>,
    ) -> WebhookOutcome {
        let payment_id = payment.id.as_str();

        match self.subscription_repo.find_by_payment_id(payment_id).await {
            Ok(Some(existing)) => {
                info!(
                    %payment_id,
                    subscription_id = %existing.id,
                    "mollie_webhook: subscription already exists for payment"
                );
                return WebhookOutcome::AlreadyProcessed;
            }
            Ok(None) => {}
            Err(err) => {
                error!(%payment_id, db_error = ?err, "mollie_webhook: failed to check for existing subscription");
                return WebhookOutcome::StorageFailed;
            }
        }

        let Some(metadata) = metadata else {
            error!(%payment_id, "mollie_webhook: paid payment has missing or invalid metadata");
            return WebhookOutcome::InvalidMetadata;
        };
        let user_id = metadata.user_id;

        let paid_at = payment.paid_at.unwrap_or(now);
        let dates = match calculate_contract_dates(paid_at) {
            Ok(dates) => dates,
            Err(err) => {
                error!(%payment_id, error = ?err, "mollie_webhook: failed to compute contract dates");
                return WebhookOutcome::StorageFailed;
            }
        };

        let is_recurring = payment.sequence_type == SequenceType::First.as_str();
        let reference_id = if is_recurring {
            match self.create_provider_subscription(payment, &metadata, paid_at).await {
                Some(subscription_id) => subscription_id,
                None => return WebhookOutcome::ProviderSubscriptionFailed,
            }
        } else {
            payment.id.clone()
        };

        let insert = InsertSubscriptionEntity {
            user_id,
            mollie_reference_id: reference_id.clone(),
            mollie_payment_id: payment.id.clone(),
            mollie_customer_id: payment.customer_id.clone(),
            plan: metadata.plan.to_string(),
            billing_period: metadata.billing_period.to_string(),
            status: SubscriptionStatus::Paid.to_string(),
            is_recurring,
            contract_start_date: dates.contract_start_date,
            contract_end_date: dates.contract_end_date,
            opt_out_deadline: dates.opt_out_deadline,
            amount_minor: payment.amount_minor,
            discount_code: metadata.discount_code.clone(),
            discount_amount_minor: metadata.discount_amount,
            original_price_minor: metadata.original_price,
        };

        let subscription_id = match self.subscription_repo.insert_if_absent(insert).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                info!(%payment_id, %reference_id, "mollie_webhook: subscription inserted by a concurrent delivery");
                return WebhookOutcome::DuplicateDelivery;
            }
            Err(err) => {
                error!(%payment_id, %user_id, db_error = ?err, "mollie_webhook: failed to insert subscription");
                return WebhookOutcome::StorageFailed;
            }
        };

        info!(
            %payment_id,
            %user_id,
            %subscription_id,
            %reference_id,
            is_recurring,
            "mollie_webhook: subscription created"
        );

        self.after_activation(payment, &metadata, &dates).await;

        WebhookOutcome::SubscriptionCreated {
            subscription_id,
            reference_id,
        }
    }

    async fn create_provider_subscription(
        &self,
        payment: &ProviderPayment,
        metadata: &CheckoutMetadata,
        paid_at: DateTime<Utc>,
    ) -> Option<String> {
        let payment_id = payment.id.as_str();
        let Some(customer_id) = payment.customer_id.clone() else {
            error!(%payment_id, "mollie_webhook: first payment has no customer");
            return None;
        };
        let Some(start_date) = paid_at.date_naive().checked_add_months(Months::new(1)) else {
            error!(%payment_id, %paid_at, "mollie_webhook: failed to compute subscription start date");
            return None;
        };

        match self.payment_gateway.list_subscriptions(&customer_id).await {
            Ok(existing) => {
                if let Some(subscription) = existing.into_iter().find(|subscription| {
                    !subscription.is_canceled()
                        && subscription.first_payment_id.as_deref() == Some(payment_id)
                }) {
                    info!(
                        %payment_id,
                        %customer_id,
                        subscription_id = %subscription.id,
                        "mollie_webhook: reusing mollie subscription from an earlier delivery"
                    );
                    return Some(subscription.id);
                }
            }
            Err(err) => {
                error!(%payment_id, %customer_id, error = ?err, "mollie_webhook: failed to list mollie subscriptions");
                return None;
            }
        }

        let mut subscription_metadata = match payment.metadata.clone() {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        subscription_metadata.insert(
            FIRST_PAYMENT_METADATA_KEY.to_string(),
            serde_json::Value::String(payment.id.clone()),
        );

        let request = CreateSubscriptionRequest {
            customer_id: customer_id.clone(),
            mandate_id: payment.mandate_id.clone(),
            amount_minor: payment.amount_minor,
            interval: RECURRING_INTERVAL.to_string(),
            description: metadata.description(),
            start_date,
            webhook_url: self.config.webhook_url.clone(),
            metadata: serde_json::Value::Object(subscription_metadata),
            idempotency_key: payment.id.clone(),
        };

        match self.payment_gateway.create_subscription(request).await {
            Ok(subscription) => Some(subscription.id),
            Err(err) => {
                error!(
                    %payment_id,
                    %customer_id,
                    user_id = %metadata.user_id,
                    error = ?err,
                    "mollie_webhook: failed to create mollie subscription"
                );
                None
            }
        }
    }

    async fn after_activation(
        &self,
        payment: &ProviderPayment,
        metadata: &CheckoutMetadata,
        dates: &ContractDates,
    ) {
        let payment_id = payment.id.as_str();
        let user_id = metadata.user_id;

        if let Err(err) = self
            .profile_repo
            .update_subscription_status(user_id, ProfileSubscriptionStatus::Active)
            .await
        {
            warn!(%user_id, db_error = ?err, "mollie_webhook: failed to activate profile");
        }

        if let Some(code) = metadata.discount_code.as_deref() {
            match self.discount_repo.increment_usage(code).await {
                Ok(true) => info!(%code, %payment_id, "mollie_webhook: discount usage recorded"),
                Ok(false) => {
                    warn!(%code, %payment_id, "mollie_webhook: discount code exhausted or missing at redemption")
                }
                Err(err) => {
                    warn!(%code, %payment_id, db_error = ?err, "mollie_webhook: failed to record discount usage")
                }
            }
        }

        let recipient = match metadata.email.clone() {
            Some(email) => Some(email),
            None => match self.profile_repo.find_by_id(user_id).await {
                Ok(profile) => profile.and_then(|p| p.email),
                Err(err) => {
                    warn!(%user_id, db_error = ?err, "mollie_webhook: failed to load profile for welcome email");
                    None
                }
            },
        };
        let Some(recipient) = recipient else {
            warn!(%user_id, "mollie_webhook: no address for welcome email");
            return;
        };

        let rendered = welcome_email(&WelcomeDetails {
            full_name: metadata.full_name.clone(),
            plan: metadata.plan,
            billing_period: metadata.billing_period,
            amount_minor: payment.amount_minor,
            discount_code: metadata.discount_code.clone(),
            discount_amount_minor: metadata.discount_amount,
            contract_end_date: dates.contract_end_date,
            opt_out_deadline: dates.opt_out_deadline,
            app_url: self.config.app_url.clone(),
        });

        let email = OutgoingEmail::new(recipient, rendered.subject, rendered.html).text(rendered.text);
        match self.mailer.send(email).await {
            Ok(message_id) => info!(%user_id, %message_id, "mollie_webhook: welcome email sent"),
            Err(err) => warn!(%user_id, error = ?err, "mollie_webhook: failed to send welcome email"),
        }
    }

    async fn handle_renewal(
        &self,
        payment: &ProviderPayment,
        status: SubscriptionStatus,
    ) -> WebhookOutcome {
        let payment_id = payment.id.as_str();
        let Some(reference_id) = payment.subscription_id.clone() else {
            warn!(%payment_id, "mollie_webhook: recurring payment without subscription id");
            return WebhookOutcome::UnknownSubscription;
        };

        let subscription = match self.subscription_repo.find_by_reference_id(&reference_id).await {
            Ok(Some(subscription)) => subscription,
            Ok(None) => {
                warn!(%payment_id, %reference_id, "mollie_webhook: renewal for unknown subscription");
                return WebhookOutcome::UnknownSubscription;
            }
            Err(err) => {
                error!(%payment_id, %reference_id, db_error = ?err, "mollie_webhook: failed to load subscription");
                return WebhookOutcome::StorageFailed;
            }
        };

        if let Err(err) = self
            .subscription_repo
            .update_status_by_reference_id(&reference_id, status)
            .await
        {
            error!(%reference_id, %status, db_error = ?err, "mollie_webhook: failed to update subscription status");
            return WebhookOutcome::StorageFailed;
        }

        let profile_status = if status == SubscriptionStatus::Paid {
            Some(ProfileSubscriptionStatus::Active)
        } else if status.is_unsuccessful() {
            Some(ProfileSubscriptionStatus::PastDue)
        } else {
            None
        };

        if let Some(profile_status) = profile_status {
            let user_id = subscription.user_id;
            if let Err(err) = self
                .profile_repo
                .update_subscription_status(user_id, profile_status)
                .await
            {
                warn!(%user_id, %profile_status, db_error = ?err, "mollie_webhook: failed to update profile status");
            }
        }

        info!(%payment_id, %reference_id, %status, "mollie_webhook: renewal recorded");
        WebhookOutcome::RenewalRecorded {
            reference_id,
            status,
        }
    }
}

fn parse_metadata(payment: &ProviderPayment) -> Option<CheckoutMetadata> {
    let raw = payment.metadata.clone()?;
    match serde_json::from_value(raw) {
        Ok(metadata) => Some(metadata),
        Err(err) => {
            warn!(payment_id = %payment.id, error = %err, "mollie_webhook: payment metadata not recognized");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{
        mailer::MockMailer,
        payment_gateway::{MockPaymentGateway, ProviderSubscription},
    };
    use anyhow::anyhow;
    use chrono::{NaiveDate, TimeZone};
    use domain::{
        entities::subscriptions::SubscriptionEntity,
        repositories::{
            discount_codes::MockDiscountCodeRepository, payments::MockPaymentRepository,
            profiles::MockProfileRepository, subscriptions::MockSubscriptionRepository,
        },
    };
    use std::sync::Mutex;

    fn paid_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap()
    }

    fn user_id() -> Uuid {
        Uuid::parse_str("7f0c1d2e-3b4a-4c5d-8e9f-0a1b2c3d4e5f").unwrap()
    }

    fn metadata_json(discount: Option<&str>, period: &str) -> serde_json::Value {
        serde_json::json!({
            "user_id": user_id(),
            "plan": "solo",
            "billing_period": period,
            "discount_code": discount,
            "discount_amount": if discount.is_some() { 3_490 } else { 0 },
            "original_price": 34_900,
            "email": "jan@voorbeeld.nl",
            "full_name": "Jan Jansen"
        })
    }

    fn payment(status: &str, sequence_type: &str) -> ProviderPayment {
        ProviderPayment {
            id: "tr_paid".to_string(),
            status: status.to_string(),
            amount_minor: 31_410,
            description: "Solo abonnement (jaarlijks)".to_string(),
            sequence_type: sequence_type.to_string(),
            customer_id: Some("cst_1".to_string()),
            mandate_id: Some("mdt_1".to_string()),
            subscription_id: None,
            metadata: Some(metadata_json(Some("SAVE10"), "yearly")),
            checkout_url: None,
            paid_at: Some(paid_at()),
        }
    }

    fn stored(insert: &InsertSubscriptionEntity) -> SubscriptionEntity {
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id: insert.user_id,
            mollie_reference_id: insert.mollie_reference_id.clone(),
            mollie_payment_id: insert.mollie_payment_id.clone(),
            mollie_customer_id: insert.mollie_customer_id.clone(),
            plan: insert.plan.clone(),
            billing_period: insert.billing_period.clone(),
            status: insert.status.clone(),
            is_recurring: insert.is_recurring,
            contract_start_date: insert.contract_start_date,
            contract_end_date: insert.contract_end_date,
            opt_out_deadline: insert.opt_out_deadline,
            amount_minor: insert.amount_minor,
            discount_code: insert.discount_code.clone(),
            discount_amount_minor: insert.discount_amount_minor,
            original_price_minor: insert.original_price_minor,
            canceled_at: None,
            created_at: paid_at(),
            updated_at: paid_at(),
        }
    }

    struct Mocks {
        gateway: MockPaymentGateway,
        payments: MockPaymentRepository,
        subscriptions: MockSubscriptionRepository,
        profiles: MockProfileRepository,
        discounts: MockDiscountCodeRepository,
        mailer: MockMailer,
    }

    impl Mocks {
        fn new() -> Self {
            let mut payments = MockPaymentRepository::new();
            payments.expect_upsert_payment().returning(|_| Ok(()));
            Self {
                gateway: MockPaymentGateway::new(),
                payments,
                subscriptions: MockSubscriptionRepository::new(),
                profiles: MockProfileRepository::new(),
                discounts: MockDiscountCodeRepository::new(),
                mailer: MockMailer::new(),
            }
        }

        fn usecase(self) -> MollieWebhookUseCase {
            MollieWebhookUseCase::new(
                Arc::new(self.gateway),
                Arc::new(self.payments),
                Arc::new(self.subscriptions),
                Arc::new(self.profiles),
                Arc::new(self.discounts),
                Arc::new(self.mailer),
                MollieWebhookConfig {
                    app_url: "https://app.example.nl".to_string(),
                    webhook_url: "https://api.example.nl/api/webhooks/mollie".to_string(),
                },
            )
        }
    }

    #[tokio::test]
    async fn blank_id_is_ignored() {
        let mut mocks = Mocks::new();
        mocks.gateway.expect_get_payment().never();
        assert_eq!(
            mocks.usecase().handle("  ", paid_at()).await,
            WebhookOutcome::MissingPaymentId
        );
    }

    #[test]
    fn only_mollie_payment_ids_are_accepted() {
        assert!(is_mollie_payment_id("tr_WDqYK6vllg"));
        assert!(!is_mollie_payment_id("tr_"));
        assert!(!is_mollie_payment_id("../customers/cst_1"));
        assert!(!is_mollie_payment_id("tr_abc/../../customers"));
        assert!(!is_mollie_payment_id("sub_123"));
    }

    #[tokio::test]
    async fn malformed_id_is_never_fetched() {
        let mut mocks = Mocks::new();
        mocks.gateway.expect_get_payment().never();
        assert_eq!(
            mocks.usecase().handle("tr_1/../../customers/cst_1", paid_at()).await,
            WebhookOutcome::InvalidPaymentId
        );
    }

    #[tokio::test]
    async fn provider_failure_is_swallowed() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_get_payment()
            .returning(|_| Err(anyhow!("mollie unavailable")));
        assert_eq!(
            mocks.usecase().handle("tr_unknown", paid_at()).await,
            WebhookOutcome::PaymentUnavailable
        );
    }

    #[tokio::test]
    async fn open_payment_only_updates_the_cache() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_get_payment()
            .returning(|_| Ok(payment("open", "oneoff")));
        mocks.subscriptions.expect_insert_if_absent().never();

        assert_eq!(
            mocks.usecase().handle("tr_paid", paid_at()).await,
            WebhookOutcome::Recorded(SubscriptionStatus::Open)
        );
    }

    #[tokio::test]
    async fn paid_yearly_payment_creates_a_one_time_subscription() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_get_payment()
            .returning(|_| Ok(payment("paid", "oneoff")));
        mocks.gateway.expect_create_subscription().never();
        mocks
            .subscriptions
            .expect_find_by_payment_id()
            .returning(|_| Ok(None));
        mocks
            .subscriptions
            .expect_insert_if_absent()
            .withf(|insert| {
                insert.mollie_reference_id == "tr_paid"
                    && !insert.is_recurring
                    && insert.status == "paid"
                    && insert.amount_minor == 31_410
                    && insert.discount_amount_minor == 3_490
                    && insert.original_price_minor == 34_900
                    && insert.contract_end_date == Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap()
                    && insert.opt_out_deadline == Utc.with_ymd_and_hms(2025, 2, 14, 9, 0, 0).unwrap()
            })
            .times(1)
            .returning(|_| Ok(Some(Uuid::new_v4())));
        mocks
            .profiles
            .expect_update_subscription_status()
            .withf(|id, status| *id == user_id() && *status == ProfileSubscriptionStatus::Active)
            .times(1)
            .returning(|_, _| Ok(()));
        mocks
            .discounts
            .expect_increment_usage()
            .withf(|code| code == "SAVE10")
            .times(1)
            .returning(|_| Ok(true));
        mocks
            .mailer
            .expect_send()
            .withf(|email| email.to == vec!["jan@voorbeeld.nl".to_string()])
            .times(1)
            .returning(|_| Ok("msg_1".to_string()));

        let outcome = mocks.usecase().handle("tr_paid", paid_at()).await;
        assert!(matches!(
            outcome,
            WebhookOutcome::SubscriptionCreated { ref reference_id, .. } if reference_id == "tr_paid"
        ));
    }

    #[tokio::test]
    async fn paid_first_payment_starts_a_mollie_subscription_next_month() {
        let mut mocks = Mocks::new();
        mocks.gateway.expect_get_payment().returning(|_| {
            let mut first = payment("paid", "first");
            first.amount_minor = 3_495;
            first.metadata = Some(metadata_json(None, "monthly"));
            Ok(first)
        });
        mocks
            .gateway
            .expect_list_subscriptions()
            .withf(|customer_id| customer_id == "cst_1")
            .returning(|customer_id| {
                Ok(vec![ProviderSubscription {
                    id: "sub_old".to_string(),
                    status: "canceled".to_string(),
                    customer_id: customer_id.to_string(),
                    first_payment_id: Some("tr_paid".to_string()),
                }])
            });
        mocks
            .gateway
            .expect_create_subscription()
            .withf(|request| {
                request.customer_id == "cst_1"
                    && request.mandate_id.as_deref() == Some("mdt_1")
                    && request.amount_minor == 3_495
                    && request.interval == "1 month"
                    && request.start_date == NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
                    && request.idempotency_key == "tr_paid"
                    && request.metadata["first_payment_id"] == "tr_paid"
                    && request.metadata["plan"] == "solo"
            })
            .times(1)
            .returning(|request| {
                Ok(ProviderSubscription {
                    id: "sub_1".to_string(),
                    status: "active".to_string(),
                    customer_id: request.customer_id,
                    first_payment_id: Some("tr_paid".to_string()),
                })
            });
        mocks
            .subscriptions
            .expect_find_by_payment_id()
            .returning(|_| Ok(None));
        mocks
            .subscriptions
            .expect_insert_if_absent()
            .withf(|insert| insert.mollie_reference_id == "sub_1" && insert.is_recurring)
            .times(1)
            .returning(|_| Ok(Some(Uuid::new_v4())));
        mocks
            .profiles
            .expect_update_subscription_status()
            .returning(|_, _| Ok(()));
        mocks.discounts.expect_increment_usage().never();
        mocks
            .mailer
            .expect_send()
            .returning(|_| Err(anyhow!("resend down")));

        let outcome = mocks.usecase().handle("tr_paid", paid_at()).await;
        assert!(matches!(
            outcome,
            WebhookOutcome::SubscriptionCreated { ref reference_id, .. } if reference_id == "sub_1"
        ));
    }

    #[tokio::test]
    async fn failed_mollie_subscription_creates_no_row() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_get_payment()
            .returning(|_| Ok(payment("paid", "first")));
        mocks
            .gateway
            .expect_list_subscriptions()
            .returning(|_| Ok(Vec::new()));
        mocks
            .gateway
            .expect_create_subscription()
            .returning(|_| Err(anyhow!("mandate not valid")));
        mocks
            .subscriptions
            .expect_find_by_payment_id()
            .returning(|_| Ok(None));
        mocks.subscriptions.expect_insert_if_absent().never();

        assert_eq!(
            mocks.usecase().handle("tr_paid", paid_at()).await,
            WebhookOutcome::ProviderSubscriptionFailed
        );
    }

    #[tokio::test]
    async fn same_payment_delivered_twice_creates_one_subscription() {
        let rows: Arc<Mutex<Vec<SubscriptionEntity>>> = Arc::new(Mutex::new(Vec::new()));

        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_get_payment()
            .times(2)
            .returning(|_| Ok(payment("paid", "oneoff")));

        let lookup = rows.clone();
        mocks
            .subscriptions
            .expect_find_by_payment_id()
            .returning(move |payment_id| {
                Ok(lookup
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|row| row.mollie_payment_id == payment_id)
                    .cloned())
            });
        let inserted = rows.clone();
        mocks
            .subscriptions
            .expect_insert_if_absent()
            .returning(move |insert| {
                let mut rows = inserted.lock().unwrap();
                if rows
                    .iter()
                    .any(|row| row.mollie_reference_id == insert.mollie_reference_id)
                {
                    return Ok(None);
                }
                let row = stored(&insert);
                let id = row.id;
                rows.push(row);
                Ok(Some(id))
            });
        mocks
            .profiles
            .expect_update_subscription_status()
            .times(1)
            .returning(|_, _| Ok(()));
        mocks
            .discounts
            .expect_increment_usage()
            .times(1)
            .returning(|_| Ok(true));
        mocks
            .mailer
            .expect_send()
            .times(1)
            .returning(|_| Ok("msg_1".to_string()));

        let usecase = mocks.usecase();
        let first = usecase.handle("tr_paid", paid_at()).await;
        let second = usecase.handle("tr_paid", paid_at()).await;

        assert!(matches!(first, WebhookOutcome::SubscriptionCreated { .. }));
        assert_eq!(second, WebhookOutcome::AlreadyProcessed);
        assert_eq!(rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lost_insert_race_skips_side_effects() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_get_payment()
            .returning(|_| Ok(payment("paid", "oneoff")));
        mocks
            .subscriptions
            .expect_find_by_payment_id()
            .returning(|_| Ok(None));
        mocks
            .subscriptions
            .expect_insert_if_absent()
            .returning(|_| Ok(None));
        mocks.profiles.expect_update_subscription_status().never();
        mocks.discounts.expect_increment_usage().never();
        mocks.mailer.expect_send().never();

        assert_eq!(
            mocks.usecase().handle("tr_paid", paid_at()).await,
            WebhookOutcome::DuplicateDelivery
        );
    }

    #[tokio::test]
    async fn paid_payment_without_metadata_is_rejected() {
        let mut mocks = Mocks::new();
        mocks.gateway.expect_get_payment().returning(|_| {
            let mut bare = payment("paid", "oneoff");
            bare.metadata = Some(serde_json::json!({ "plan": "solo" }));
            Ok(bare)
        });
        mocks
            .subscriptions
            .expect_find_by_payment_id()
            .returning(|_| Ok(None));
        mocks.subscriptions.expect_insert_if_absent().never();

        assert_eq!(
            mocks.usecase().handle("tr_paid", paid_at()).await,
            WebhookOutcome::InvalidMetadata
        );
    }

    #[tokio::test]
    async fn failed_renewal_marks_the_profile_past_due() {
        let mut mocks = Mocks::new();
        mocks.gateway.expect_get_payment().returning(|_| {
            let mut renewal = payment("failed", "recurring");
            renewal.id = "tr_renewal".to_string();
            renewal.subscription_id = Some("sub_1".to_string());
            Ok(renewal)
        });
        mocks
            .subscriptions
            .expect_find_by_reference_id()
            .returning(|reference| {
                let insert = InsertSubscriptionEntity {
                    user_id: user_id(),
                    mollie_reference_id: reference.to_string(),
                    mollie_payment_id: "tr_first".to_string(),
                    mollie_customer_id: Some("cst_1".to_string()),
                    plan: "solo".to_string(),
                    billing_period: "monthly".to_string(),
                    status: "paid".to_string(),
                    is_recurring: true,
                    contract_start_date: paid_at(),
                    contract_end_date: paid_at(),
                    opt_out_deadline: paid_at(),
                    amount_minor: 3_495,
                    discount_code: None,
                    discount_amount_minor: 0,
                    original_price_minor: 3_495,
                };
                Ok(Some(stored(&insert)))
            });
        mocks
            .subscriptions
            .expect_update_status_by_reference_id()
            .withf(|reference, status| reference == "sub_1" && *status == SubscriptionStatus::Failed)
            .times(1)
            .returning(|_, _| Ok(()));
        mocks
            .profiles
            .expect_update_subscription_status()
            .withf(|id, status| *id == user_id() && *status == ProfileSubscriptionStatus::PastDue)
            .times(1)
            .returning(|_, _| Ok(()));
        mocks.subscriptions.expect_insert_if_absent().never();

        assert_eq!(
            mocks.usecase().handle("tr_renewal", paid_at()).await,
            WebhookOutcome::RenewalRecorded {
                reference_id: "sub_1".to_string(),
                status: SubscriptionStatus::Failed,
            }
        );
    }

    #[tokio::test]
    async fn redelivery_after_failed_insert_reuses_the_mollie_subscription() {
        let created: Arc<Mutex<Vec<ProviderSubscription>>> = Arc::new(Mutex::new(Vec::new()));
        let inserts = Arc::new(Mutex::new(0));

        let mut mocks = Mocks::new();
        mocks.gateway.expect_get_payment().times(2).returning(|_| {
            let mut first = payment("paid", "first");
            first.amount_minor = 3_495;
            first.metadata = Some(metadata_json(None, "monthly"));
            Ok(first)
        });
        let listed = created.clone();
        mocks
            .gateway
            .expect_list_subscriptions()
            .times(2)
            .returning(move |_| Ok(listed.lock().unwrap().clone()));
        let remembered = created.clone();
        mocks
            .gateway
            .expect_create_subscription()
            .times(1)
            .returning(move |request| {
                let subscription = ProviderSubscription {
                    id: "sub_1".to_string(),
                    status: "pending".to_string(),
                    customer_id: request.customer_id,
                    first_payment_id: request.metadata["first_payment_id"]
                        .as_str()
                        .map(str::to_string),
                };
                remembered.lock().unwrap().push(subscription.clone());
                Ok(subscription)
            });
        mocks
            .subscriptions
            .expect_find_by_payment_id()
            .returning(|_| Ok(None));
        let attempts = inserts.clone();
        mocks
            .subscriptions
            .expect_insert_if_absent()
            .withf(|insert| insert.mollie_reference_id == "sub_1")
            .times(2)
            .returning(move |_| {
                let mut attempts = attempts.lock().unwrap();
                *attempts += 1;
                if *attempts == 1 {
                    Err(anyhow!("connection reset"))
                } else {
                    Ok(Some(Uuid::new_v4()))
                }
            });
        mocks
            .profiles
            .expect_update_subscription_status()
            .times(1)
            .returning(|_, _| Ok(()));
        mocks
            .mailer
            .expect_send()
            .times(1)
            .returning(|_| Ok("msg_1".to_string()));

        let usecase = mocks.usecase();
        let first = usecase.handle("tr_paid", paid_at()).await;
        let second = usecase.handle("tr_paid", paid_at()).await;

        assert_eq!(first, WebhookOutcome::StorageFailed);
        assert!(matches!(
            second,
            WebhookOutcome::SubscriptionCreated { ref reference_id, .. } if reference_id == "sub_1"
        ));
        assert_eq!(created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unlisted_subscriptions_block_creation() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_get_payment()
            .returning(|_| Ok(payment("paid", "first")));
        mocks
            .gateway
            .expect_list_subscriptions()
            .returning(|_| Err(anyhow!("503 service unavailable")));
        mocks.gateway.expect_create_subscription().never();
        mocks
            .subscriptions
            .expect_find_by_payment_id()
            .returning(|_| Ok(None));
        mocks.subscriptions.expect_insert_if_absent().never();

        assert_eq!(
            mocks.usecase().handle("tr_paid", paid_at()).await,
            WebhookOutcome::ProviderSubscriptionFailed
        );
    }
}
