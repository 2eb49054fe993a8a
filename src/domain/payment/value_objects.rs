use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a payment record
///
/// # Status Transitions
/// ```text
/// Pending -> Processing -> Succeeded
///       |            `---> Failed | Cancelled
///       `-> Succeeded | Failed | Cancelled
/// ```
///
/// Records are never deleted; they only ever move forward to a terminal
/// state, which is what makes them usable as an audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Row created, charge not yet resolved
    Pending,
    /// Charge submitted, awaiting ACH settlement
    Processing,
    /// Charge settled
    Succeeded,
    /// Charge declined or settlement failed
    Failed,
    /// Transfer cancelled before settlement
    Cancelled,
}

impl PaymentStatus {
    /// Checks if a transition from current status to next status is valid
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Succeeded)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Processing, Succeeded)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }

    /// Terminal statuses can never change again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Succeeded | PaymentStatus::Failed | PaymentStatus::Cancelled
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Processing => write!(f, "processing"),
            PaymentStatus::Succeeded => write!(f, "succeeded"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "processing" => Ok(PaymentStatus::Processing),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(format!("Unknown payment status: {}", other)),
        }
    }
}

/// What a payment record represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Setup-intent style confirmation before the first invoice
    SubscriptionSetup,
    /// The first subscription charge made during signup
    InitialSubscription,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentType::SubscriptionSetup => write!(f, "subscription_setup"),
            PaymentType::InitialSubscription => write!(f, "initial_subscription"),
        }
    }
}

impl FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription_setup" => Ok(PaymentType::SubscriptionSetup),
            "initial_subscription" => Ok(PaymentType::InitialSubscription),
            other => Err(format!("Unknown payment type: {}", other)),
        }
    }
}

/// ACH settlement sub-status, tracked separately from the payment status
/// because a `succeeded` intent and a cleared transfer arrive at different
/// times on ACH rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchStatus {
    Pending,
    Cleared,
}

impl fmt::Display for AchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AchStatus::Pending => write!(f, "pending"),
            AchStatus::Cleared => write!(f, "cleared"),
        }
    }
}

impl FromStr for AchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AchStatus::Pending),
            "cleared" => Ok(AchStatus::Cleared),
            other => Err(format!("Unknown ACH status: {}", other)),
        }
    }
}
