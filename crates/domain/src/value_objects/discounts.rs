use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::discount_codes::DiscountCodeEntity;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DiscountRejection {
    #[error("Voer een kortingscode in")]
    Empty,
    #[error("Deze kortingscode bestaat niet")]
    NotFound,
    #[error("Deze kortingscode is niet meer actief")]
    Inactive,
    #[error("Deze kortingscode is nog niet geldig")]
    NotYetValid,
    #[error("Deze kortingscode is verlopen")]
    Expired,
    #[error("Deze kortingscode is al het maximale aantal keer gebruikt")]
    Exhausted,
    #[error("Deze kortingscode kan niet worden toegepast")]
    Misconfigured,
    #[error("Er is een fout opgetreden bij het controleren van de kortingscode")]
    LookupFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDiscount {
    pub code: String,
    pub discount_percentage: Option<f64>,
    pub discount_amount: i32,
    pub original_price: i32,
    pub final_price: i32,
}

/// Outcome of validating a code against a price. Never an error: rejections carry
/// a user-facing message.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscountValidation {
    Valid(AppliedDiscount),
    Invalid(DiscountRejection),
}

impl DiscountValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, DiscountValidation::Valid(_))
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Checks the activity window and usage cap of `entity` at `now`, then prices it.
pub fn evaluate_discount(
    entity: &DiscountCodeEntity,
    base_price: i32,
    now: DateTime<Utc>,
) -> Result<AppliedDiscount, DiscountRejection> {
    if !entity.is_active {
        return Err(DiscountRejection::Inactive);
    }
    if now < entity.valid_from {
        return Err(DiscountRejection::NotYetValid);
    }
    if let Some(valid_until) = entity.valid_until {
        if now > valid_until {
            return Err(DiscountRejection::Expired);
        }
    }
    if let Some(max_uses) = entity.max_uses {
        if entity.current_uses >= max_uses {
            return Err(DiscountRejection::Exhausted);
        }
    }

    let discount_amount = compute_discount_amount(
        base_price,
        entity.discount_percentage,
        entity.discount_amount_minor,
    )?;

    Ok(AppliedDiscount {
        code: entity.code.clone(),
        discount_percentage: entity.discount_percentage,
        discount_amount,
        original_price: base_price,
        final_price: (base_price - discount_amount).max(0),
    })
}

/// Exactly one of `percentage` and `amount` must be set. The result is in cents and
/// never exceeds `base_price`.
pub fn compute_discount_amount(
    base_price: i32,
    percentage: Option<f64>,
    amount: Option<i32>,
) -> Result<i32, DiscountRejection> {
    let discount = match (percentage, amount) {
        (Some(pct), None) => {
            if !pct.is_finite() || pct <= 0.0 || pct > 100.0 {
                return Err(DiscountRejection::Misconfigured);
            }
            (f64::from(base_price) * pct / 100.0).round() as i32
        }
        (None, Some(flat)) => {
            if flat <= 0 {
                return Err(DiscountRejection::Misconfigured);
            }
            flat
        }
        _ => return Err(DiscountRejection::Misconfigured),
    };

    Ok(discount.clamp(0, base_price.max(0)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateDiscountRequest {
    pub code: String,
    pub plan: String,
    pub billing_period: String,
}

/// Wire shape of a validation result: `{ "valid": false, "error": "..." }` or the
/// priced discount with `valid: true`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiscountValidationDto {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount_minor: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price_minor: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_price_minor: Option<i32>,
}

impl From<DiscountValidation> for DiscountValidationDto {
    fn from(value: DiscountValidation) -> Self {
        match value {
            DiscountValidation::Valid(applied) => Self {
                valid: true,
                error: None,
                code: Some(applied.code),
                discount_percentage: applied.discount_percentage,
                discount_amount_minor: Some(applied.discount_amount),
                original_price_minor: Some(applied.original_price),
                final_price_minor: Some(applied.final_price),
            },
            DiscountValidation::Invalid(rejection) => Self {
                valid: false,
                error: Some(rejection.to_string()),
                code: None,
                discount_percentage: None,
                discount_amount_minor: None,
                original_price_minor: None,
                final_price_minor: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn save10() -> DiscountCodeEntity {
        DiscountCodeEntity {
            id: Uuid::new_v4(),
            code: "SAVE10".to_string(),
            discount_percentage: Some(10.0),
            discount_amount_minor: None,
            valid_from: now() - Duration::days(30),
            valid_until: Some(now() + Duration::days(30)),
            max_uses: Some(100),
            current_uses: 3,
            is_active: true,
            created_at: now() - Duration::days(30),
        }
    }

    #[test]
    fn codes_are_trimmed_and_upper_cased() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
    }

    #[test]
    fn ten_percent_off_solo_yearly() {
        let applied = evaluate_discount(&save10(), 34_900, now()).unwrap();
        assert_eq!(applied.discount_amount, 3_490);
        assert_eq!(applied.final_price, 31_410);
        assert_eq!(applied.original_price, 34_900);
    }

    #[test]
    fn percentage_discounts_round_to_whole_cents() {
        // 12.5% of 34.95 = 4.36875
        assert_eq!(compute_discount_amount(3_495, Some(12.5), None).unwrap(), 437);
    }

    #[test]
    fn flat_discount_never_drives_the_price_below_zero() {
        let mut code = save10();
        code.discount_percentage = None;
        code.discount_amount_minor = Some(50_000);

        let applied = evaluate_discount(&code, 34_900, now()).unwrap();
        assert_eq!(applied.discount_amount, 34_900);
        assert_eq!(applied.final_price, 0);
    }

    #[test]
    fn inactive_code_is_rejected() {
        let mut code = save10();
        code.is_active = false;
        assert_eq!(
            evaluate_discount(&code, 34_900, now()).unwrap_err(),
            DiscountRejection::Inactive
        );
    }

    #[test]
    fn code_before_valid_from_is_rejected() {
        let mut code = save10();
        code.valid_from = now() + Duration::seconds(1);
        assert_eq!(
            evaluate_discount(&code, 34_900, now()).unwrap_err(),
            DiscountRejection::NotYetValid
        );
    }

    #[test]
    fn code_after_valid_until_is_rejected() {
        let mut code = save10();
        code.valid_until = Some(now() - Duration::seconds(1));
        assert_eq!(
            evaluate_discount(&code, 34_900, now()).unwrap_err(),
            DiscountRejection::Expired
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let mut code = save10();
        code.valid_from = now();
        code.valid_until = Some(now());
        assert!(evaluate_discount(&code, 34_900, now()).is_ok());
    }

    #[test]
    fn code_at_max_uses_is_rejected() {
        let mut code = save10();
        code.max_uses = Some(5);
        code.current_uses = 5;
        assert_eq!(
            evaluate_discount(&code, 34_900, now()).unwrap_err(),
            DiscountRejection::Exhausted
        );

        code.current_uses = 4;
        assert!(evaluate_discount(&code, 34_900, now()).is_ok());
    }

    #[test]
    fn code_with_both_or_neither_discount_kind_is_rejected() {
        assert_eq!(
            compute_discount_amount(34_900, Some(10.0), Some(500)).unwrap_err(),
            DiscountRejection::Misconfigured
        );
        assert_eq!(
            compute_discount_amount(34_900, None, None).unwrap_err(),
            DiscountRejection::Misconfigured
        );
    }

    #[test]
    fn invalid_result_serializes_with_an_error_message() {
        let dto = DiscountValidationDto::from(DiscountValidation::Invalid(
            DiscountRejection::NotFound,
        ));
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "valid": false, "error": "Deze kortingscode bestaat niet" })
        );
    }
}
