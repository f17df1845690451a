pub mod billing_periods;
pub mod plans;
pub mod profile_subscription_statuses;
pub mod sequence_types;
pub mod subscription_statuses;
