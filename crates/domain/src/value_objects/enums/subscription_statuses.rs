use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Payment status as reported by Mollie, stored on the subscription row.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Open,
    Pending,
    Authorized,
    Paid,
    Failed,
    Canceled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Open => "open",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Authorized => "authorized",
            SubscriptionStatus::Paid => "paid",
            SubscriptionStatus::Failed => "failed",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "open" => Some(SubscriptionStatus::Open),
            "pending" => Some(SubscriptionStatus::Pending),
            "authorized" => Some(SubscriptionStatus::Authorized),
            "paid" => Some(SubscriptionStatus::Paid),
            "failed" => Some(SubscriptionStatus::Failed),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }

    /// `true` once Mollie will not move the payment to another state.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Paid
                | SubscriptionStatus::Failed
                | SubscriptionStatus::Canceled
                | SubscriptionStatus::Expired
        )
    }

    pub fn is_unsuccessful(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Failed | SubscriptionStatus::Canceled | SubscriptionStatus::Expired
        )
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mollie_status_round_trips_through_its_name() {
        for status in [
            SubscriptionStatus::Open,
            SubscriptionStatus::Pending,
            SubscriptionStatus::Authorized,
            SubscriptionStatus::Paid,
            SubscriptionStatus::Failed,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Expired,
        ] {
            assert_eq!(SubscriptionStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(SubscriptionStatus::from_str("refunded"), None);
    }

    #[test]
    fn only_terminal_states_are_final() {
        assert!(!SubscriptionStatus::Open.is_final());
        assert!(!SubscriptionStatus::Pending.is_final());
        assert!(!SubscriptionStatus::Authorized.is_final());
        assert!(SubscriptionStatus::Paid.is_final());
        assert!(SubscriptionStatus::Expired.is_final());
        assert!(!SubscriptionStatus::Paid.is_unsuccessful());
    }
}
