use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSubscriptionStatus {
    #[default]
    Inactive,
    Active,
    Canceled,
    PastDue,
}

impl Display for ProfileSubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            ProfileSubscriptionStatus::Inactive => "inactive",
            ProfileSubscriptionStatus::Active => "active",
            ProfileSubscriptionStatus::Canceled => "canceled",
            ProfileSubscriptionStatus::PastDue => "past_due",
        };
        write!(f, "{}", status)
    }
}

impl ProfileSubscriptionStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "active" => ProfileSubscriptionStatus::Active,
            "canceled" => ProfileSubscriptionStatus::Canceled,
            "past_due" => ProfileSubscriptionStatus::PastDue,
            _ => ProfileSubscriptionStatus::Inactive,
        }
    }
}
