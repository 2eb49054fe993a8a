use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription tier selected at signup
///
/// The tier determines the monthly price and the Stripe price id used when
/// the initial subscription is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Starter,
    Growth,
    Enterprise,
}

impl SubscriptionTier {
    /// Monthly price in USD for the first charge
    pub fn monthly_amount(&self) -> Decimal {
        match self {
            SubscriptionTier::Starter => Decimal::new(4900, 2),
            SubscriptionTier::Growth => Decimal::new(9900, 2),
            SubscriptionTier::Enterprise => Decimal::new(19900, 2),
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionTier::Starter => write!(f, "starter"),
            SubscriptionTier::Growth => write!(f, "growth"),
            SubscriptionTier::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starter" => Ok(SubscriptionTier::Starter),
            "growth" => Ok(SubscriptionTier::Growth),
            "enterprise" => Ok(SubscriptionTier::Enterprise),
            other => Err(format!(
                "Unknown subscription tier: {} (expected starter, growth or enterprise)",
                other
            )),
        }
    }
}

/// Lifecycle status of a company's subscription
///
/// # Status Transitions
/// ```text
/// Pending -> Active -> PastDue -> Active
///                 `--> Cancelled     `--> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// First charge submitted but not yet settled
    Pending,
    /// Subscription is paid up
    Active,
    /// A renewal charge failed
    PastDue,
    /// Subscription was cancelled
    Cancelled,
}

impl SubscriptionStatus {
    /// Checks if a transition from current status to next status is valid
    pub fn can_transition_to(&self, next: SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, next),
            (Pending, Active)
                | (Pending, Cancelled)
                | (Active, PastDue)
                | (Active, Cancelled)
                | (PastDue, Active)
                | (PastDue, Cancelled)
        )
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionStatus::Pending => write!(f, "pending"),
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::PastDue => write!(f, "past_due"),
            SubscriptionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(format!("Unknown subscription status: {}", other)),
        }
    }
}
