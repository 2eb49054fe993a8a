//! Minimal Stripe REST client for the operations the signup flow needs.
//!
//! Talks to the form-encoded v1 API directly over reqwest with rustls.
//! Every non-2xx response is parsed into Stripe's error envelope and
//! classified into the gateway taxonomy before it leaves this module.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::error::{classify_stripe_error, mask_secrets, GatewayError};
use super::types::{AccountHolderType, ChargeOutcome, ChargeStatus, SubscriptionOutcome};

const DEFAULT_BASE_URL: &str = "https://api.stripe.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    secret_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize, Default)]
struct StripeErrorBody {
    #[serde(default)]
    r#type: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    decline_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CustomerList {
    data: Vec<IdObject>,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentObject {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    status: String,
    latest_invoice: Option<LatestInvoice>,
    pending_setup_intent: Option<IntentRef>,
}

#[derive(Debug, Deserialize)]
struct LatestInvoice {
    payment_intent: Option<IntentRef>,
}

#[derive(Debug, Deserialize)]
struct IntentRef {
    #[allow(dead_code)]
    id: String,
    client_secret: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Transient(e.to_string()))?;

        Ok(Self {
            http,
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the client at a different host; used by sandbox setups
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T, GatewayError> {
        let mut request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transient(format!("stripe request failed: {}", e)))?;

        self.decode(response).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, GatewayError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(query)
            .send()
            .await
            .map_err(|e| GatewayError::Transient(format!("stripe request failed: {}", e)))?;

        self.decode(response).await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transient(e.to_string()))?;

        if (200..300).contains(&status) {
            return serde_json::from_str(&body)
                .map_err(|e| GatewayError::Transient(format!("stripe response decode: {}", e)));
        }

        let envelope: StripeErrorEnvelope =
            serde_json::from_str(&body).unwrap_or(StripeErrorEnvelope {
                error: StripeErrorBody::default(),
            });
        let code = envelope
            .error
            .decline_code
            .or(envelope.error.code)
            .unwrap_or_default();
        let message = envelope.error.message.unwrap_or_default();
        tracing::warn!(
            status = status,
            error_type = %envelope.error.r#type,
            code = %code,
            "stripe error: {}",
            mask_secrets(&message)
        );
        Err(classify_stripe_error(
            status,
            &envelope.error.r#type,
            &code,
            &message,
        ))
    }

    pub async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<String>, GatewayError> {
        let list: CustomerList = self
            .get(
                "/v1/customers",
                &[
                    ("email".to_string(), email.to_string()),
                    ("limit".to_string(), "1".to_string()),
                ],
            )
            .await?;
        Ok(list.data.into_iter().next().map(|c| c.id))
    }

    pub async fn create_customer(
        &self,
        email: &str,
        display_name: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, GatewayError> {
        let mut form = vec![
            ("email".to_string(), email.to_string()),
            ("name".to_string(), display_name.to_string()),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{}]", key), value));
        }
        let customer: IdObject = self.post_form("/v1/customers", &form, None).await?;
        Ok(customer.id)
    }

    pub async fn create_bank_payment_method(
        &self,
        processor_token: &str,
        holder_type: AccountHolderType,
    ) -> Result<String, GatewayError> {
        let form = vec![
            ("type".to_string(), "us_bank_account".to_string()),
            (
                "us_bank_account[account_holder_type]".to_string(),
                holder_type.as_str().to_string(),
            ),
            (
                "us_bank_account[financial_connections_account]".to_string(),
                processor_token.to_string(),
            ),
        ];
        let pm: IdObject = self.post_form("/v1/payment_methods", &form, None).await?;
        Ok(pm.id)
    }

    pub async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<(), GatewayError> {
        let form = vec![("customer".to_string(), customer_id.to_string())];
        let _: IdObject = self
            .post_form(
                &format!("/v1/payment_methods/{}/attach", payment_method_id),
                &form,
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), GatewayError> {
        let form = vec![(
            "invoice_settings[default_payment_method]".to_string(),
            payment_method_id.to_string(),
        )];
        let _: IdObject = self
            .post_form(&format!("/v1/customers/{}", customer_id), &form, None)
            .await?;
        Ok(())
    }

    pub async fn create_payment_intent(
        &self,
        customer_id: &str,
        payment_method_id: &str,
        amount_cents: i64,
        idempotency_key: &str,
        metadata: HashMap<String, String>,
    ) -> Result<ChargeOutcome, GatewayError> {
        let mut form = vec![
            ("amount".to_string(), amount_cents.to_string()),
            ("currency".to_string(), "usd".to_string()),
            ("customer".to_string(), customer_id.to_string()),
            ("payment_method".to_string(), payment_method_id.to_string()),
            (
                "payment_method_types[]".to_string(),
                "us_bank_account".to_string(),
            ),
            ("confirm".to_string(), "true".to_string()),
            (
                "mandate_data[customer_acceptance][type]".to_string(),
                "online".to_string(),
            ),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{}]", key), value));
        }

        let intent: PaymentIntentObject = self
            .post_form("/v1/payment_intents", &form, Some(idempotency_key))
            .await?;
        Ok(ChargeOutcome {
            payment_intent_id: intent.id,
            status: ChargeStatus::from_intent_status(&intent.status),
        })
    }

    pub async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        payment_method_types: &[&str],
    ) -> Result<SubscriptionOutcome, GatewayError> {
        let mut form = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("items[0][price]".to_string(), price_id.to_string()),
            (
                "payment_behavior".to_string(),
                "default_incomplete".to_string(),
            ),
            (
                "expand[]".to_string(),
                "latest_invoice.payment_intent".to_string(),
            ),
            ("expand[]".to_string(), "pending_setup_intent".to_string()),
        ];
        for (i, pm_type) in payment_method_types.iter().enumerate() {
            form.push((
                format!("payment_settings[payment_method_types][{}]", i),
                pm_type.to_string(),
            ));
        }

        let sub: SubscriptionObject = self.post_form("/v1/subscriptions", &form, None).await?;
        let client_secret = sub
            .latest_invoice
            .and_then(|inv| inv.payment_intent)
            .and_then(|pi| pi.client_secret)
            .or(sub.pending_setup_intent.and_then(|si| si.client_secret));

        Ok(SubscriptionOutcome {
            subscription_id: sub.id,
            status: sub.status,
            client_secret,
        })
    }
}
