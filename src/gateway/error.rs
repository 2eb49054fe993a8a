use thiserror::Error;

/// Closed error taxonomy every provider-specific failure is classified into
///
/// The orchestrator only ever pattern-matches over these four variants;
/// raw provider codes never cross this boundary except inside the
/// `Terminal` payload, which is mapped to a static user-facing message
/// before it reaches a client.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bad input caught by the provider
    #[error("provider rejected input: {0}")]
    Validation(String),

    /// Network / rate-limit class failure; the single call may be retried
    #[error("transient provider error: {0}")]
    Transient(String),

    /// Declined, closed account, invalid routing; not retryable without
    /// new input
    #[error("terminal provider error [{code}]: {message}")]
    Terminal { code: String, message: String },

    /// Token or session expired; the caller must restart the link flow
    #[error("expired artifact: {0}")]
    ExpiredArtifact(String),
}

/// Static code -> user-facing message table for declined charges.
/// Raw provider text is never shown to callers.
const DECLINE_MESSAGES: &[(&str, &str)] = &[
    ("insufficient_funds", "Your bank account has insufficient funds."),
    ("account_closed", "This bank account is closed."),
    ("debit_not_authorized", "Your bank declined the debit authorization."),
    ("invalid_routing", "The routing number is not valid."),
    ("no_account", "We could not find this bank account."),
    ("bank_account_restricted", "This bank account cannot accept debits."),
    ("payment_intent_payment_attempt_failed", "The payment attempt failed."),
];

const DEFAULT_DECLINE_MESSAGE: &str =
    "Your payment could not be processed. Please try a different bank account.";

/// Looks up the sanitized user-facing message for a decline code
pub fn decline_message(code: &str) -> &'static str {
    DECLINE_MESSAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, m)| *m)
        .unwrap_or(DEFAULT_DECLINE_MESSAGE)
}

/// Prefixes that mark a word as a provider secret or token
const TOKEN_PREFIXES: &[&str] = &[
    "sk_", "pk_", "whsec_", "btok_", "pm_", "seti_", "acct_",
    "access-", "public-", "link-", "processor-",
];

/// Masks token-like substrings before a string is logged.
///
/// Keeps the first four characters of anything that looks like a provider
/// token so log lines stay correlatable without leaking credentials.
pub fn mask_secrets(input: &str) -> String {
    input
        .split(' ')
        .map(|word| {
            let looks_like_token = TOKEN_PREFIXES.iter().any(|p| word.starts_with(p));
            if looks_like_token && word.len() > 8 {
                // Cut on a char boundary; token values are not always ASCII
                let prefix: String = word
                    .char_indices()
                    .take_while(|(i, _)| *i < 8)
                    .map(|(_, c)| c)
                    .collect();
                format!("{}****", prefix)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classifies a Stripe REST error into the closed taxonomy
///
/// * `http_status` - response status code
/// * `error_type` - Stripe's `error.type`
/// * `code` - Stripe's `error.code` or `error.decline_code`
pub fn classify_stripe_error(
    http_status: u16,
    error_type: &str,
    code: &str,
    message: &str,
) -> GatewayError {
    if http_status == 429 || error_type == "rate_limit_error" || error_type == "api_connection_error"
    {
        return GatewayError::Transient(message.to_string());
    }
    if code == "expired_card" || code == "setup_intent_setup_attempt_expired" {
        return GatewayError::ExpiredArtifact(message.to_string());
    }
    match error_type {
        "card_error" | "bank_account_error" => GatewayError::Terminal {
            code: code.to_string(),
            message: message.to_string(),
        },
        "invalid_request_error" => GatewayError::Validation(message.to_string()),
        "api_error" => GatewayError::Transient(message.to_string()),
        _ => GatewayError::Terminal {
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}

/// Classifies a Plaid REST error into the closed taxonomy
pub fn classify_plaid_error(error_type: &str, error_code: &str, message: &str) -> GatewayError {
    match error_code {
        "INVALID_PUBLIC_TOKEN" | "PUBLIC_TOKEN_EXPIRED" | "ITEM_LOGIN_REQUIRED"
        | "ACCESS_TOKEN_EXPIRED" => GatewayError::ExpiredArtifact(message.to_string()),
        "RATE_LIMIT_EXCEEDED" | "INTERNAL_SERVER_ERROR" | "PLANNED_MAINTENANCE" => {
            GatewayError::Transient(message.to_string())
        }
        _ => match error_type {
            "INVALID_REQUEST" | "INVALID_INPUT" => GatewayError::Validation(message.to_string()),
            "API_ERROR" => GatewayError::Transient(message.to_string()),
            _ => GatewayError::Terminal {
                code: error_code.to_string(),
                message: message.to_string(),
            },
        },
    }
}
