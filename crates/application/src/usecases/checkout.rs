use std::sync::Arc;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use domain::{
    entities::profiles::ProfileEntity,
    repositories::{
        discount_codes::DiscountCodeRepository, payments::PaymentRepository,
        profiles::ProfileRepository,
    },
    value_objects::{
        checkout::{
            CheckoutMetadata, CheckoutStatusDto, CreateCheckoutRequest, CreateCheckoutResponse,
        },
        discounts::{DiscountRejection, DiscountValidation},
        enums::{sequence_types::SequenceType, subscription_statuses::SubscriptionStatus},
        pricing::{PricingError, base_price, parse_selection},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{discounts::validate_discount_code, payment_cache::cache_entry};
use crate::interfaces::payment_gateway::{CreatePaymentRequest, PaymentGateway};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    InvalidSelection(#[from] PricingError),
    #[error("{0}")]
    InvalidDiscount(DiscountRejection),
    #[error("Deze kortingscode kan niet online worden gebruikt")]
    ZeroAmount,
    #[error("Je account heeft geen e-mailadres")]
    MissingEmail,
    #[error("Betaling niet gevonden")]
    PaymentNotFound,
    #[error("payment provider request failed")]
    Provider(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type CheckoutResult<T> = std::result::Result<T, CheckoutError>;

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Public base URL of the site, used for the return page after payment.
    pub app_url: String,
    /// Absolute URL of the Mollie webhook endpoint.
    pub webhook_url: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

pub struct CheckoutUseCase {
    discount_repo: Arc<dyn DiscountCodeRepository + Send + Sync>,
    profile_repo: Arc<dyn ProfileRepository + Send + Sync>,
    payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
    payment_gateway: Arc<dyn PaymentGateway>,
    config: CheckoutConfig,
}

impl CheckoutUseCase {
    pub fn new(
        discount_repo: Arc<dyn DiscountCodeRepository + Send + Sync>,
        profile_repo: Arc<dyn ProfileRepository + Send + Sync>,
        payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
        payment_gateway: Arc<dyn PaymentGateway>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            discount_repo,
            profile_repo,
            payment_repo,
            payment_gateway,
            config,
        }
    }

    pub async fn create_checkout(
        &self,
        user: CheckoutUser,
        request: CreateCheckoutRequest,
        now: DateTime<Utc>,
    ) -> CheckoutResult<CreateCheckoutResponse> {
        let user_id = user.user_id;
        let (plan, period) = parse_selection(&request.plan, &request.billing_period)?;
        info!(%user_id, %plan, %period, "checkout: create checkout requested");

        let original_price = base_price(plan, period);
        let requested_code = request
            .discount_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty());

        let (amount, discount_code, discount_amount) = match requested_code {
            Some(code) => {
                match validate_discount_code(self.discount_repo.as_ref(), code, plan, period, now)
                    .await
                {
                    DiscountValidation::Valid(applied) => {
                        (applied.final_price, Some(applied.code), applied.discount_amount)
                    }
                    DiscountValidation::Invalid(rejection) => {
                        warn!(%user_id, reason = ?rejection, "checkout: discount code rejected");
                        return Err(CheckoutError::InvalidDiscount(rejection));
                    }
                }
            }
            None => (original_price, None, 0),
        };

        if amount <= 0 {
            warn!(%user_id, ?discount_code, "checkout: discount reduces price to zero");
            return Err(CheckoutError::ZeroAmount);
        }

        let profile = self.profile_repo.find_by_id(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "checkout: failed to load profile");
            CheckoutError::Internal(err)
        })?;

        let email = user
            .email
            .clone()
            .or_else(|| profile.as_ref().and_then(|p| p.email.clone()))
            .ok_or_else(|| {
                warn!(%user_id, "checkout: no email address for customer");
                CheckoutError::MissingEmail
            })?;
        let full_name = profile.as_ref().and_then(|p| p.full_name.clone());

        let customer_id = self
            .resolve_customer(user_id, profile.as_ref(), full_name.as_deref(), &email)
            .await?;

        let metadata = CheckoutMetadata {
            user_id,
            plan,
            billing_period: period,
            discount_code: discount_code.clone(),
            discount_amount,
            original_price,
            email: Some(email),
            full_name,
        };

        let sequence_type = if period.is_recurring() {
            SequenceType::First
        } else {
            SequenceType::Oneoff
        };

        let payment = self
            .payment_gateway
            .create_payment(CreatePaymentRequest {
                amount_minor: amount,
                description: metadata.description(),
                redirect_url: format!("{}/checkout/return", self.config.app_url.trim_end_matches('/')),
                webhook_url: self.config.webhook_url.clone(),
                customer_id: Some(customer_id.clone()),
                sequence_type: sequence_type.to_string(),
                metadata: serde_json::to_value(&metadata)
                    .context("failed to serialize checkout metadata")?,
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %customer_id,
                    amount,
                    error = ?err,
                    "checkout: mollie payment creation failed"
                );
                CheckoutError::Provider(err)
            })?;

        let checkout_url = payment.checkout_url.clone().ok_or_else(|| {
            error!(%user_id, payment_id = %payment.id, "checkout: payment has no checkout url");
            CheckoutError::Provider(anyhow!("payment {} has no checkout url", payment.id))
        })?;

        if let Err(err) = self
            .payment_repo
            .upsert_payment(cache_entry(&payment, Some(user_id), now))
            .await
        {
            // The webhook rebuilds the row from Mollie.
            warn!(%user_id, payment_id = %payment.id, db_error = ?err, "checkout: failed to cache payment");
        }

        info!(
            %user_id,
            payment_id = %payment.id,
            amount,
            discount_amount,
            sequence_type = %sequence_type,
            "checkout: payment created"
        );

        Ok(CreateCheckoutResponse {
            checkout_url,
            payment_id: payment.id,
            amount_minor: amount,
            original_price_minor: original_price,
            discount_amount_minor: discount_amount,
        })
    }

    /// Status for the return page. Non-final cached states are refreshed from Mollie.
    pub async fn checkout_status(
        &self,
        user_id: Uuid,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> CheckoutResult<CheckoutStatusDto> {
        let cached = self
            .payment_repo
            .find_by_mollie_payment_id(payment_id)
            .await
            .map_err(|err| {
                error!(%user_id, %payment_id, db_error = ?err, "checkout: failed to load payment");
                CheckoutError::Internal(err)
            })?
            .filter(|payment| payment.user_id == Some(user_id))
            .ok_or(CheckoutError::PaymentNotFound)?;

        let mut status = SubscriptionStatus::from_str(&cached.status).unwrap_or_default();
        let mut amount_minor = cached.amount_minor;

        if !status.is_final() {
            match self.payment_gateway.get_payment(payment_id).await {
                Ok(fresh) => {
                    status = SubscriptionStatus::from_str(&fresh.status).unwrap_or(status);
                    amount_minor = fresh.amount_minor;
                    if let Err(err) = self
                        .payment_repo
                        .upsert_payment(cache_entry(&fresh, Some(user_id), now))
                        .await
                    {
                        warn!(%payment_id, db_error = ?err, "checkout: failed to refresh cached payment");
                    }
                }
                Err(err) => {
                    warn!(%payment_id, error = ?err, "checkout: mollie status refresh failed, using cache");
                }
            }
        }

        Ok(CheckoutStatusDto {
            payment_id: cached.mollie_payment_id,
            status,
            amount_minor,
            is_final: status.is_final(),
        })
    }

    async fn resolve_customer(
        &self,
        user_id: Uuid,
        profile: Option<&ProfileEntity>,
        full_name: Option<&str>,
        email: &str,
    ) -> CheckoutResult<String> {
        if let Some(existing) = profile.and_then(|p| p.mollie_customer_id.as_deref()) {
            match self.payment_gateway.get_customer(existing).await {
                Ok(Some(customer)) => return Ok(customer.id),
                Ok(None) => {
                    warn!(
                        %user_id,
                        customer_id = existing,
                        "checkout: stored mollie customer no longer exists, creating a new one"
                    );
                }
                Err(err) => {
                    error!(
                        %user_id,
                        customer_id = existing,
                        error = ?err,
                        "checkout: failed to verify stored mollie customer"
                    );
                    return Err(CheckoutError::Provider(err));
                }
            }
        }

        let name = full_name.filter(|n| !n.trim().is_empty()).unwrap_or(email);
        let customer = self
            .payment_gateway
            .create_customer(name, email, user_id)
            .await
            .map_err(|err| {
                error!(%user_id, error = ?err, "checkout: mollie customer creation failed");
                CheckoutError::Provider(err)
            })?;

        if let Err(err) = self
            .profile_repo
            .set_mollie_customer_id(user_id, &customer.id)
            .await
        {
            warn!(%user_id, customer_id = %customer.id, db_error = ?err, "checkout: failed to store mollie customer id");
        }

        Ok(customer.id)
    }
}
