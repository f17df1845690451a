use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::enums::{
    billing_periods::BillingPeriod, plans::Plan, subscription_statuses::SubscriptionStatus,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutRequest {
    pub plan: String,
    pub billing_period: String,
    #[serde(default)]
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateCheckoutResponse {
    pub checkout_url: String,
    pub payment_id: String,
    pub amount_minor: i32,
    pub original_price_minor: i32,
    pub discount_amount_minor: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutStatusDto {
    pub payment_id: String,
    pub status: SubscriptionStatus,
    pub amount_minor: i32,
    pub is_final: bool,
}

/// Pricing snapshot stored in the Mollie payment metadata at checkout and read back
/// by the webhook. The webhook never trusts anything but this and the fetched payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutMetadata {
    pub user_id: Uuid,
    pub plan: Plan,
    pub billing_period: BillingPeriod,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub discount_amount: i32,
    pub original_price: i32,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl CheckoutMetadata {
    pub fn description(&self) -> String {
        format!(
            "{} abonnement ({})",
            self.plan.display_name(),
            self.billing_period.display_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_tolerates_missing_optional_fields() {
        let user_id = Uuid::new_v4();
        let raw = serde_json::json!({
            "user_id": user_id,
            "plan": "solo",
            "billing_period": "yearly",
            "original_price": 34900
        });

        let metadata: CheckoutMetadata = serde_json::from_value(raw).unwrap();
        assert_eq!(metadata.user_id, user_id);
        assert_eq!(metadata.plan, Plan::Solo);
        assert_eq!(metadata.billing_period, BillingPeriod::Yearly);
        assert_eq!(metadata.discount_amount, 0);
        assert_eq!(metadata.discount_code, None);
        assert_eq!(metadata.description(), "Solo abonnement (jaarlijks)");
    }
}
