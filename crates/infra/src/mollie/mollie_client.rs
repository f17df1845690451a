use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use moka::future::Cache;
use reqwest::{StatusCode, header::AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use application::interfaces::payment_gateway::{
    CreatePaymentRequest, CreateSubscriptionRequest, FIRST_PAYMENT_METADATA_KEY, PaymentGateway,
    ProviderCustomer, ProviderPayment, ProviderSubscription,
};
use domain::value_objects::pricing::{CURRENCY, format_amount, parse_amount};

pub const MOLLIE_API_BASE: &str = "https://api.mollie.com/v2";
const CUSTOMER_CACHE_CAPACITY: u64 = 10_000;
const CUSTOMER_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const IDEMPOTENCY_KEY: &str = "Idempotency-Key";
// A customer holds a handful of subscriptions at most.
const SUBSCRIPTION_PAGE_LIMIT: u32 = 250;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MollieAmount {
    pub currency: String,
    pub value: String,
}

impl MollieAmount {
    pub fn euro(minor: i32) -> Self {
        Self {
            currency: CURRENCY.to_string(),
            value: format_amount(minor),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MollieLink {
    href: String,
}

#[derive(Debug, Default, Deserialize)]
struct MolliePaymentLinks {
    checkout: Option<MollieLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MolliePayment {
    id: String,
    status: String,
    amount: MollieAmount,
    #[serde(default)]
    description: String,
    #[serde(default = "default_sequence_type")]
    sequence_type: String,
    customer_id: Option<String>,
    mandate_id: Option<String>,
    subscription_id: Option<String>,
    metadata: Option<serde_json::Value>,
    paid_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "_links")]
    links: MolliePaymentLinks,
}

fn default_sequence_type() -> String {
    "oneoff".to_string()
}

impl TryFrom<MolliePayment> for ProviderPayment {
    type Error = anyhow::Error;

    fn try_from(value: MolliePayment) -> Result<Self> {
        let amount_minor = parse_amount(&value.amount.value)
            .with_context(|| format!("payment {} has an unreadable amount", value.id))?;
        Ok(Self {
            id: value.id,
            status: value.status,
            amount_minor,
            description: value.description,
            sequence_type: value.sequence_type,
            customer_id: value.customer_id,
            mandate_id: value.mandate_id,
            subscription_id: value.subscription_id,
            // Mollie sends `null` for payments created without metadata.
            metadata: value.metadata.filter(|m| !m.is_null()),
            checkout_url: value.links.checkout.map(|link| link.href),
            paid_at: value.paid_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct MollieCustomer {
    id: String,
    name: Option<String>,
    email: Option<String>,
}

impl From<MollieCustomer> for ProviderCustomer {
    fn from(value: MollieCustomer) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MollieSubscription {
    id: String,
    status: String,
    customer_id: String,
    metadata: Option<serde_json::Value>,
}

impl From<MollieSubscription> for ProviderSubscription {
    fn from(value: MollieSubscription) -> Self {
        let first_payment_id = value
            .metadata
            .as_ref()
            .and_then(|m| m.get(FIRST_PAYMENT_METADATA_KEY))
            .and_then(|id| id.as_str())
            .map(str::to_string);
        Self {
            id: value.id,
            status: value.status,
            customer_id: value.customer_id,
            first_payment_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MollieSubscriptionsEmbedded {
    #[serde(default)]
    subscriptions: Vec<MollieSubscription>,
}

#[derive(Debug, Deserialize)]
struct MollieSubscriptionList {
    #[serde(default, rename = "_embedded")]
    embedded: MollieSubscriptionsEmbedded,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentBody<'a> {
    amount: MollieAmount,
    description: &'a str,
    redirect_url: &'a str,
    webhook_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_id: Option<&'a str>,
    sequence_type: &'a str,
    metadata: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSubscriptionBody<'a> {
    amount: MollieAmount,
    interval: &'a str,
    description: &'a str,
    start_date: NaiveDate,
    webhook_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mandate_id: Option<&'a str>,
    metadata: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MollieErrorBody {
    title: Option<String>,
    detail: Option<String>,
    field: Option<String>,
}

/// Mollie v2 REST client. Customers created here are remembered per user for an hour so
/// a retried checkout does not create duplicates before the profile row is updated.
pub struct MollieClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    customers: Cache<Uuid, ProviderCustomer>,
}

impl MollieClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, MOLLIE_API_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let customers = Cache::builder()
            .max_capacity(CUSTOMER_CACHE_CAPACITY)
            .time_to_live(CUSTOMER_CACHE_TTL)
            .build();

        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            customers,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (title, detail, field) = match serde_json::from_str::<MollieErrorBody>(&body) {
            Ok(parsed) => (parsed.title, parsed.detail, parsed.field),
            Err(_) => (None, None, None),
        };

        error!(
            %status,
            mollie_error_title = ?title,
            mollie_error_detail = ?detail,
            mollie_error_field = ?field,
            response_body = %body,
            %context,
            "mollie api request failed"
        );

        anyhow::bail!(
            "Mollie API request failed: {} (status {}, detail={:?})",
            context,
            status,
            detail
        );
    }
}

#[async_trait]
impl PaymentGateway for MollieClient {
    async fn create_customer(
        &self,
        name: &str,
        email: &str,
        user_id: Uuid,
    ) -> Result<ProviderCustomer> {
        if let Some(cached) = self.customers.get(&user_id).await {
            return Ok(cached);
        }

        // https://docs.mollie.com/reference/create-customer
        let body = serde_json::json!({
            "name": name,
            "email": email,
            "metadata": { "user_id": user_id },
        });

        let resp = self
            .http
            .post(self.url("/customers"))
            .header(AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create customer").await?;

        let customer: ProviderCustomer = resp.json::<MollieCustomer>().await?.into();
        self.customers.insert(user_id, customer.clone()).await;
        info!(%user_id, customer_id = %customer.id, "mollie: customer created");

        Ok(customer)
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<ProviderCustomer>> {
        let resp = self
            .http
            .get(self.url(&format!("/customers/{customer_id}")))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await?;
        // Deleted customers answer 410 Gone.
        if matches!(resp.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            info!(%customer_id, status = %resp.status(), "mollie: customer no longer exists");
            return Ok(None);
        }
        let resp = Self::ensure_success(resp, "get customer").await?;

        Ok(Some(resp.json::<MollieCustomer>().await?.into()))
    }

    async fn create_payment(&self, request: CreatePaymentRequest) -> Result<ProviderPayment> {
        // https://docs.mollie.com/reference/create-payment
        let body = CreatePaymentBody {
            amount: MollieAmount::euro(request.amount_minor),
            description: &request.description,
            redirect_url: &request.redirect_url,
            webhook_url: &request.webhook_url,
            customer_id: request.customer_id.as_deref(),
            sequence_type: &request.sequence_type,
            metadata: &request.metadata,
        };

        let resp = self
            .http
            .post(self.url("/payments"))
            .header(AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create payment").await?;

        resp.json::<MolliePayment>().await?.try_into()
    }

    async fn get_payment(&self, payment_id: &str) -> Result<ProviderPayment> {
        let resp = self
            .http
            .get(self.url(&format!("/payments/{payment_id}")))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "get payment").await?;

        resp.json::<MolliePayment>().await?.try_into()
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<ProviderSubscription> {
        // https://docs.mollie.com/reference/create-subscription
        let body = CreateSubscriptionBody {
            amount: MollieAmount::euro(request.amount_minor),
            interval: &request.interval,
            description: &request.description,
            start_date: request.start_date,
            webhook_url: &request.webhook_url,
            mandate_id: request.mandate_id.as_deref(),
            metadata: &request.metadata,
        };

        let resp = self
            .http
            .post(self.url(&format!("/customers/{}/subscriptions", request.customer_id)))
            .header(AUTHORIZATION, self.bearer())
            .header(IDEMPOTENCY_KEY, &request.idempotency_key)
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create subscription").await?;

        Ok(resp.json::<MollieSubscription>().await?.into())
    }

    async fn list_subscriptions(&self, customer_id: &str) -> Result<Vec<ProviderSubscription>> {
        // https://docs.mollie.com/reference/list-subscriptions
        let resp = self
            .http
            .get(self.url(&format!("/customers/{customer_id}/subscriptions")))
            .query(&[("limit", SUBSCRIPTION_PAGE_LIMIT)])
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "list subscriptions").await?;

        let list: MollieSubscriptionList = resp.json().await?;
        Ok(list
            .embedded
            .subscriptions
            .into_iter()
            .map(ProviderSubscription::from)
            .collect())
    }

    async fn cancel_subscription(&self, customer_id: &str, subscription_id: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!(
                "/customers/{customer_id}/subscriptions/{subscription_id}"
            )))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await?;
        Self::ensure_success(resp, "cancel subscription").await?;

        Ok(())
    }
}
