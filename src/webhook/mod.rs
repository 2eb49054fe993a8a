//! Asynchronous settlement ingestion.
//!
//! The payment provider delivers transfer lifecycle events at least once;
//! this module verifies them and parses the envelope. Event handling lives
//! in the webhook HTTP handler, which drives the same provisioning path as
//! the synchronous signup flow.

pub mod signature;

pub use signature::{verify, SignatureError, FRESHNESS_WINDOW_SECS};

use serde::Deserialize;

/// Transfer lifecycle events this system acts on. Everything else is
/// acknowledged and ignored so at-least-once delivery never sees an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Completed,
    Failed,
    Cancelled,
    /// Acknowledged but outside this system's scope
    Unrecognized,
}

impl TransferEvent {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "transfer.completed" => TransferEvent::Completed,
            "transfer.failed" => TransferEvent::Failed,
            "transfer.cancelled" => TransferEvent::Cancelled,
            _ => TransferEvent::Unrecognized,
        }
    }
}

/// Wire envelope for a transfer event
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Deserialize, Default)]
pub struct WebhookData {
    /// The provider's transfer/intent id the payment record was keyed on
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub transfer_id: Option<String>,
    #[serde(default)]
    pub failure_code: Option<String>,
    #[serde(default)]
    pub failure_message: Option<String>,
}

impl WebhookEnvelope {
    /// The id used to look up the payment record: intent id when present,
    /// otherwise the transfer id.
    pub fn reference_id(&self) -> Option<&str> {
        self.data
            .payment_intent_id
            .as_deref()
            .or(self.data.transfer_id.as_deref())
    }
}
