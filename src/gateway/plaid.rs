//! Minimal Plaid REST client for bank-account linking.
//!
//! Covers the three calls the signup flow needs: issuing a link token,
//! exchanging the client's public token, and deriving a Stripe processor
//! token from the verified account.

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::error::{classify_plaid_error, mask_secrets, GatewayError};
use super::types::{LinkExchange, LinkSession};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Link tokens are valid for four hours from issuance
const LINK_SESSION_HOURS: i64 = 4;

#[derive(Clone)]
pub struct PlaidClient {
    http: Client,
    client_id: String,
    secret: String,
    base_url: String,
}

#[derive(Debug, Deserialize, Default)]
struct PlaidErrorBody {
    #[serde(default)]
    error_type: String,
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    display_message: Option<String>,
    #[serde(default)]
    error_message: String,
}

#[derive(Debug, Deserialize)]
struct LinkTokenResponse {
    link_token: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    access_token: String,
    item_id: String,
}

#[derive(Debug, Deserialize)]
struct ProcessorTokenResponse {
    stripe_bank_account_token: String,
}

impl PlaidClient {
    /// `environment` selects the Plaid host: sandbox, development or
    /// production.
    pub fn new(
        client_id: impl Into<String>,
        secret: impl Into<String>,
        environment: &str,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Transient(e.to_string()))?;

        Ok(Self {
            http,
            client_id: client_id.into(),
            secret: secret.into(),
            base_url: format!("https://{}.plaid.com", environment),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        mut body: serde_json::Value,
    ) -> Result<T, GatewayError> {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("client_id".to_string(), json!(self.client_id));
            obj.insert("secret".to_string(), json!(self.secret));
        }

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transient(format!("plaid request failed: {}", e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transient(e.to_string()))?;

        if (200..300).contains(&status) {
            return serde_json::from_str(&text)
                .map_err(|e| GatewayError::Transient(format!("plaid response decode: {}", e)));
        }

        let error: PlaidErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = error
            .display_message
            .unwrap_or_else(|| error.error_message.clone());
        tracing::warn!(
            status = status,
            error_type = %error.error_type,
            error_code = %error.error_code,
            "plaid error: {}",
            mask_secrets(&message)
        );
        Err(classify_plaid_error(
            &error.error_type,
            &error.error_code,
            &message,
        ))
    }

    pub async fn create_link_token(
        &self,
        user_ref: &str,
        company_name: &str,
    ) -> Result<LinkSession, GatewayError> {
        let body = json!({
            "user": { "client_user_id": user_ref },
            "client_name": company_name,
            "products": ["auth"],
            "country_codes": ["US"],
            "language": "en",
        });
        let response: LinkTokenResponse = self.post("/link/token/create", body).await?;
        Ok(LinkSession {
            link_token: response.link_token,
            expiration: Utc::now() + ChronoDuration::hours(LINK_SESSION_HOURS),
        })
    }

    pub async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<LinkExchange, GatewayError> {
        let body = json!({ "public_token": public_token });
        let response: ExchangeResponse = self.post("/item/public_token/exchange", body).await?;
        Ok(LinkExchange {
            access_token: response.access_token,
            item_id: response.item_id,
        })
    }

    pub async fn create_stripe_processor_token(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "access_token": access_token,
            "account_id": account_id,
        });
        let response: ProcessorTokenResponse = self
            .post("/processor/stripe/bank_account_token/create", body)
            .await?;
        Ok(response.stripe_bank_account_token)
    }
}
