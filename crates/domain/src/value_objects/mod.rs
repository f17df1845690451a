pub mod auth;
pub mod chat;
pub mod checkout;
pub mod contact;
pub mod contracts;
pub mod discounts;
pub mod enums;
pub mod pricing;
pub mod subscriptions;
