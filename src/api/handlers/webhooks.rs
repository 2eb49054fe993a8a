use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Serialize;

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::domain::repositories::RepositoryError;
use crate::orchestrator::SignupError;
use crate::webhook::{self, TransferEvent, WebhookEnvelope};

/// Signature header the provider sends with each delivery
pub const SIGNATURE_HEADER: &str = "webhook-signature";

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub processed: String,
}

/// Receive an asynchronous transfer-settlement notification
///
/// POST /api/webhooks/transfers
///
/// The raw body is verified before any parsing; 401 on a missing or
/// invalid signature, 401 on payloads outside the freshness window.
/// Unrecognized event types are acknowledged with 200 so the provider's
/// at-least-once delivery never retries events outside this system's
/// scope.
pub async fn transfers(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing webhook signature"))?;

    webhook::verify(&body, signature, &state.config.webhook_signing_secret)
        .map_err(|err| {
            tracing::warn!("webhook signature rejected: {}", err);
            ApiError::unauthorized("Invalid webhook signature")
        })?;

    let envelope: WebhookEnvelope = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Malformed webhook payload: {}", e)))?;
    let event = TransferEvent::from_type(&envelope.event_type);

    match event {
        TransferEvent::Completed => {
            let reference = envelope.reference_id().ok_or_else(|| {
                ApiError::bad_request("transfer.completed event missing a transfer id")
            })?;
            match state.orchestrator.settle_transfer(reference).await {
                Ok(outcome) => {
                    tracing::info!(
                        payment_id = %outcome.payment_id,
                        company_created = outcome.company_created,
                        "settlement processed"
                    );
                }
                // There is no caller to respond to on this path; log for
                // manual remediation and acknowledge so the provider does
                // not redeliver a payload we cannot use.
                Err(SignupError::Persistence(RepositoryError::NotFound(reference))) => {
                    tracing::warn!("settlement for unknown payment: {}", reference);
                }
                Err(err) => {
                    tracing::error!("settlement processing failed: {}", err);
                    return Err(err.into());
                }
            }
        }
        TransferEvent::Failed => {
            if let Some(reference) = envelope.reference_id() {
                let code = envelope.data.failure_code.as_deref().unwrap_or("transfer_failed");
                let message = envelope
                    .data
                    .failure_message
                    .as_deref()
                    .unwrap_or("The bank transfer failed");
                if let Err(err) = state.orchestrator.fail_transfer(reference, code, message).await
                {
                    tracing::warn!("failed-transfer update skipped: {}", err);
                }
            }
        }
        TransferEvent::Cancelled => {
            if let Some(reference) = envelope.reference_id() {
                if let Err(err) = state.orchestrator.cancel_transfer(reference).await {
                    tracing::warn!("cancelled-transfer update skipped: {}", err);
                }
            }
        }
        TransferEvent::Unrecognized => {
            tracing::info!(event_type = %envelope.event_type, "ignoring unrecognized webhook event");
        }
    }

    Ok(Json(WebhookResponse {
        success: true,
        processed: envelope.event_type,
    }))
}
