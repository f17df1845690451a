use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Subscription metadata key holding the id of the first payment that created it.
pub const FIRST_PAYMENT_METADATA_KEY: &str = "first_payment_id";

/// Payment as fetched from the provider. Amounts are in cents.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPayment {
    pub id: String,
    pub status: String,
    pub amount_minor: i32,
    pub description: String,
    pub sequence_type: String,
    pub customer_id: Option<String>,
    pub mandate_id: Option<String>,
    pub subscription_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub checkout_url: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCustomer {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSubscription {
    pub id: String,
    pub status: String,
    pub customer_id: String,
    pub first_payment_id: Option<String>,
}

impl ProviderSubscription {
    pub fn is_canceled(&self) -> bool {
        self.status == "canceled"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePaymentRequest {
    pub amount_minor: i32,
    pub description: String,
    pub redirect_url: String,
    pub webhook_url: String,
    pub customer_id: Option<String>,
    pub sequence_type: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSubscriptionRequest {
    pub customer_id: String,
    pub mandate_id: Option<String>,
    pub amount_minor: i32,
    pub interval: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub webhook_url: String,
    pub metadata: serde_json::Value,
    /// Sent as `Idempotency-Key`; a retried request returns the original subscription.
    pub idempotency_key: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(&self, name: &str, email: &str, user_id: Uuid) -> Result<ProviderCustomer>;

    /// `Ok(None)` when the provider no longer knows the customer.
    async fn get_customer(&self, customer_id: &str) -> Result<Option<ProviderCustomer>>;

    async fn create_payment(&self, request: CreatePaymentRequest) -> Result<ProviderPayment>;

    async fn get_payment(&self, payment_id: &str) -> Result<ProviderPayment>;

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<ProviderSubscription>;

    async fn list_subscriptions(&self, customer_id: &str) -> Result<Vec<ProviderSubscription>>;

    async fn cancel_subscription(&self, customer_id: &str, subscription_id: &str) -> Result<()>;
}
