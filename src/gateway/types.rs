use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A bank-link session issued to the client to start account linking.
/// The token is single-use and expires after a fixed four-hour window.
#[derive(Debug, Clone, Serialize)]
pub struct LinkSession {
    pub link_token: String,
    pub expiration: DateTime<Utc>,
}

/// Result of exchanging a short-lived public token for long-lived access
#[derive(Debug, Clone)]
pub struct LinkExchange {
    pub access_token: String,
    pub item_id: String,
}

/// Immediate outcome of a charge submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Succeeded,
    /// The common immediate outcome on ACH rails; settlement is confirmed
    /// later via webhook
    Processing,
    RequiresAction,
    Failed,
}

impl ChargeStatus {
    /// Maps a Stripe payment-intent status string
    pub fn from_intent_status(status: &str) -> Self {
        match status {
            "succeeded" => ChargeStatus::Succeeded,
            "processing" => ChargeStatus::Processing,
            "requires_action" | "requires_confirmation" | "requires_payment_method" => {
                ChargeStatus::RequiresAction
            }
            _ => ChargeStatus::Failed,
        }
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargeStatus::Succeeded => write!(f, "succeeded"),
            ChargeStatus::Processing => write!(f, "processing"),
            ChargeStatus::RequiresAction => write!(f, "requires_action"),
            ChargeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Result of a charge submission
#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    pub payment_intent_id: String,
    pub status: ChargeStatus,
}

/// Result of creating a default-incomplete subscription
#[derive(Debug, Clone)]
pub struct SubscriptionOutcome {
    pub subscription_id: String,
    pub status: String,
    /// Client secret of the pending setup/payment intent whose confirmation
    /// completes activation
    pub client_secret: Option<String>,
}

/// Bank account holder type forwarded when creating a payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountHolderType {
    Individual,
    Company,
}

impl AccountHolderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountHolderType::Individual => "individual",
            AccountHolderType::Company => "company",
        }
    }
}
