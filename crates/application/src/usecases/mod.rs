pub mod auth;
pub mod chat;
pub mod checkout;
pub mod contact;
pub mod discounts;
pub mod mollie_webhook;
mod payment_cache;
pub mod subscriptions;
