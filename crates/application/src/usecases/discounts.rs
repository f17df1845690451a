use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::{
    repositories::discount_codes::DiscountCodeRepository,
    value_objects::{
        discounts::{
            DiscountRejection, DiscountValidation, ValidateDiscountRequest, evaluate_discount,
            normalize_code,
        },
        enums::{billing_periods::BillingPeriod, plans::Plan},
        pricing::{PricingError, base_price, parse_selection},
    },
};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum DiscountError {
    #[error(transparent)]
    InvalidSelection(#[from] PricingError),
}

/// Looks up `code` and prices it against the base price of `plan`/`period`.
/// Repository failures are logged and reported as a rejection.
pub async fn validate_discount_code<D>(
    repo: &D,
    code: &str,
    plan: Plan,
    period: BillingPeriod,
    now: DateTime<Utc>,
) -> DiscountValidation
where
    D: DiscountCodeRepository + Send + Sync + ?Sized,
{
    let normalized = normalize_code(code);
    if normalized.is_empty() {
        return DiscountValidation::Invalid(DiscountRejection::Empty);
    }

    let entity = match repo.find_by_code(&normalized).await {
        Ok(Some(entity)) => entity,
        Ok(None) => {
            info!(code = %normalized, "discounts: unknown code");
            return DiscountValidation::Invalid(DiscountRejection::NotFound);
        }
        Err(err) => {
            error!(code = %normalized, db_error = ?err, "discounts: failed to load code");
            return DiscountValidation::Invalid(DiscountRejection::LookupFailed);
        }
    };

    match evaluate_discount(&entity, base_price(plan, period), now) {
        Ok(applied) => {
            info!(
                code = %normalized,
                %plan,
                %period,
                discount_amount = applied.discount_amount,
                final_price = applied.final_price,
                "discounts: code accepted"
            );
            DiscountValidation::Valid(applied)
        }
        Err(rejection) => {
            info!(code = %normalized, %plan, %period, reason = ?rejection, "discounts: code rejected");
            DiscountValidation::Invalid(rejection)
        }
    }
}

pub struct DiscountUseCase<D>
where
    D: DiscountCodeRepository + Send + Sync + 'static,
{
    discount_repo: Arc<D>,
}

impl<D> DiscountUseCase<D>
where
    D: DiscountCodeRepository + Send + Sync + 'static,
{
    pub fn new(discount_repo: Arc<D>) -> Self {
        Self { discount_repo }
    }

    pub async fn validate(
        &self,
        request: ValidateDiscountRequest,
        now: DateTime<Utc>,
    ) -> Result<DiscountValidation, DiscountError> {
        let (plan, period) = parse_selection(&request.plan, &request.billing_period)?;
        Ok(validate_discount_code(self.discount_repo.as_ref(), &request.code, plan, period, now).await)
    }
}
