pub mod auth;
pub mod chat;
pub mod checkout;
pub mod contact;
pub mod discounts;
pub mod mollie_webhook;
pub mod subscriptions;
