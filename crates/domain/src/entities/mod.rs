pub mod discount_codes;
pub mod payments;
pub mod profiles;
pub mod subscriptions;
