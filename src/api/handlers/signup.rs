use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::domain::payment::value_objects::PaymentStatus;
use crate::validation::{
    validate_complete_signup, validate_signup, CompleteSignupRequest, SignupRequest,
};

/// Request body for issuing a bank-link session
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTokenRequest {
    pub company_name: Option<String>,
}

/// Response carrying the single-use link session token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTokenResponse {
    pub link_token: String,
    pub expiration: chrono::DateTime<chrono::Utc>,
}

/// Response from signup initiation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub customer_id: String,
    pub subscription_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// Response from charge completion
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSignupResponse {
    pub success: bool,
    pub payment_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub company_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Issue a bank-link session
///
/// POST /api/signup/link-token
pub async fn create_link_token(
    State(state): State<AppState>,
    Json(req): Json<LinkTokenRequest>,
) -> Result<Json<LinkTokenResponse>, ApiError> {
    let company_name = req
        .company_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Crewbase")
        .to_string();

    // Sessions are keyed on a fresh reference; the client has no account yet
    let user_ref = Uuid::new_v4().to_string();
    let session = state
        .orchestrator
        .create_link_session(&user_ref, &company_name)
        .await?;

    Ok(Json(LinkTokenResponse {
        link_token: session.link_token,
        expiration: session.expiration,
    }))
}

/// Start a signup: create-or-reuse the customer and open a
/// default-incomplete subscription
///
/// POST /api/signup
pub async fn initiate_signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let validated = validate_signup(&req)?;
    let price_id = state.config.price_id(validated.subscription_tier).to_string();

    let initiated = state.orchestrator.initiate(&validated, &price_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            customer_id: initiated.customer_id,
            subscription_id: initiated.subscription_id,
            client_secret: initiated.client_secret,
        }),
    ))
}

/// Complete a signup: link the bank account, submit the first charge and
/// provision the company when the charge settles immediately
///
/// POST /api/signup/complete
pub async fn complete_signup(
    State(state): State<AppState>,
    Json(req): Json<CompleteSignupRequest>,
) -> Result<Json<CompleteSignupResponse>, ApiError> {
    let validated = validate_complete_signup(&req)?;

    let outcome = state.orchestrator.complete(&validated).await?;

    let message = match outcome.payment_status {
        PaymentStatus::Processing => Some(
            "Your first payment is processing. Your account will be activated once the bank \
             transfer settles (typically 3-5 business days)."
                .to_string(),
        ),
        _ => None,
    };

    Ok(Json(CompleteSignupResponse {
        success: true,
        payment_id: outcome.payment_id,
        payment_intent_id: outcome.payment_intent_id,
        payment_status: outcome.payment_status,
        company_created: outcome.company_created,
        company_id: outcome.company_id,
        user_id: outcome.user_id,
        message,
    }))
}

/// Health check endpoint
///
/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}
