//! Request validation for the signup funnel.
//!
//! Every validator accumulates all failing fields rather than stopping at
//! the first, so the client gets a complete `details[]` list in one round
//! trip. Nothing in this module performs I/O.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::company::value_objects::SubscriptionTier;
use crate::domain::payment::payment::MAX_CHARGE_AMOUNT;
use crate::domain::user::value_objects::Email;

/// A single failing field with a client-facing message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Accumulated validation failures for one request
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_fields(self) -> Vec<FieldError> {
        self.errors
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns Ok(value) only when no errors were accumulated
    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed for {} field(s)", self.errors.len())
    }
}

impl std::error::Error for ValidationErrors {}

/// Inbound body for POST /api/signup
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub company_name: Option<String>,
    pub company_email: Option<String>,
    pub owner_name: Option<String>,
    pub phone: Option<String>,
    pub subscription_tier: Option<String>,
}

/// Fully-typed, constraint-checked signup initiation
#[derive(Debug, Clone)]
pub struct ValidatedSignup {
    pub company_name: String,
    pub company_email: Email,
    pub owner_name: String,
    pub phone: Option<String>,
    pub subscription_tier: SubscriptionTier,
}

/// Inbound body for POST /api/signup/complete
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSignupRequest {
    pub customer_id: Option<String>,
    pub public_token: Option<String>,
    pub account_id: Option<String>,
    pub company_name: Option<String>,
    pub company_email: Option<String>,
    pub owner_name: Option<String>,
    pub subscription_tier: Option<String>,
    /// Client-stable id for this logical attempt; feeds the charge
    /// idempotency key. Defaults to the linked account id.
    pub session_id: Option<String>,
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(default)]
    pub ach_authorized: bool,
}

/// Fully-typed, constraint-checked charge completion
#[derive(Debug, Clone)]
pub struct ValidatedCompleteSignup {
    pub customer_id: Option<String>,
    pub public_token: String,
    pub account_id: String,
    pub company_name: String,
    pub company_email: Email,
    pub owner_name: String,
    pub subscription_tier: SubscriptionTier,
    pub session_id: String,
}

fn require<'a>(
    value: &'a Option<String>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.push(field, format!("{} is required", field));
            None
        }
    }
}

fn check_company_name(name: &str, errors: &mut ValidationErrors) -> Option<String> {
    let chars = name.chars().count();
    if chars < 2 || chars > 100 {
        errors.push(
            "companyName",
            "companyName must be between 2 and 100 characters",
        );
        None
    } else {
        Some(name.to_string())
    }
}

fn check_email(raw: &str, field: &str, errors: &mut ValidationErrors) -> Option<Email> {
    match Email::new(raw) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.push(field, format!("{} must be a valid email address", field));
            None
        }
    }
}

fn check_tier(raw: &str, errors: &mut ValidationErrors) -> Option<SubscriptionTier> {
    match raw.parse::<SubscriptionTier>() {
        Ok(tier) => Some(tier),
        Err(_) => {
            errors.push(
                "subscriptionTier",
                "subscriptionTier must be one of: starter, growth, enterprise",
            );
            None
        }
    }
}

/// Validates a signup initiation request, reporting every failing field
pub fn validate_signup(req: &SignupRequest) -> Result<ValidatedSignup, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let company_name = require(&req.company_name, "companyName", &mut errors)
        .and_then(|name| check_company_name(name, &mut errors));
    let company_email = require(&req.company_email, "companyEmail", &mut errors)
        .and_then(|raw| check_email(raw, "companyEmail", &mut errors));
    let owner_name = require(&req.owner_name, "ownerName", &mut errors).map(str::to_string);
    let subscription_tier = require(&req.subscription_tier, "subscriptionTier", &mut errors)
        .and_then(|raw| check_tier(raw, &mut errors));

    let phone = req
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    match (company_name, company_email, owner_name, subscription_tier) {
        (Some(company_name), Some(company_email), Some(owner_name), Some(subscription_tier))
            if errors.is_empty() =>
        {
            Ok(ValidatedSignup {
                company_name,
                company_email,
                owner_name,
                phone,
                subscription_tier,
            })
        }
        _ => Err(errors),
    }
}

/// Validates a charge-completion request, reporting every failing field
///
/// Both acceptance flags must be true before any charge is attempted.
pub fn validate_complete_signup(
    req: &CompleteSignupRequest,
) -> Result<ValidatedCompleteSignup, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let public_token = require(&req.public_token, "publicToken", &mut errors).map(str::to_string);
    let account_id = require(&req.account_id, "accountId", &mut errors).map(str::to_string);
    let company_name = require(&req.company_name, "companyName", &mut errors)
        .and_then(|name| check_company_name(name, &mut errors));
    let company_email = require(&req.company_email, "companyEmail", &mut errors)
        .and_then(|raw| check_email(raw, "companyEmail", &mut errors));
    let owner_name = require(&req.owner_name, "ownerName", &mut errors).map(str::to_string);
    let subscription_tier = require(&req.subscription_tier, "subscriptionTier", &mut errors)
        .and_then(|raw| check_tier(raw, &mut errors));

    if !req.terms_accepted {
        errors.push("termsAccepted", "You must accept the terms of service");
    }
    if !req.ach_authorized {
        errors.push("achAuthorized", "You must authorize ACH debits");
    }

    let session_id = req
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| account_id.clone());

    match (
        public_token,
        account_id,
        company_name,
        company_email,
        owner_name,
        subscription_tier,
        session_id,
    ) {
        (
            Some(public_token),
            Some(account_id),
            Some(company_name),
            Some(company_email),
            Some(owner_name),
            Some(subscription_tier),
            Some(session_id),
        ) if errors.is_empty() => Ok(ValidatedCompleteSignup {
            customer_id: req
                .customer_id
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            public_token,
            account_id,
            company_name,
            company_email,
            owner_name,
            subscription_tier,
            session_id,
        }),
        _ => Err(errors),
    }
}

/// Validates a charge amount: positive and at most the hard ceiling
pub fn validate_amount(amount: Decimal) -> Result<(), String> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero".to_string());
    }
    if amount > Decimal::from(MAX_CHARGE_AMOUNT) {
        return Err(format!("Amount must not exceed {}", MAX_CHARGE_AMOUNT));
    }
    Ok(())
}

/// Validates an ABA routing number
///
/// Length and digit checks run first; the checksum (weights
/// [3,7,1,3,7,1,3,7,1], sum mod 10 == 0) is only evaluated on a
/// well-formed 9-digit string.
///
/// The link flow verifies accounts at the provider, so this is only for
/// surfaces that collect routing details directly (manual account entry).
pub fn validate_routing_number(routing: &str) -> Result<(), String> {
    if routing.len() != 9 || !routing.chars().all(|c| c.is_ascii_digit()) {
        return Err("Routing number must be exactly 9 digits".to_string());
    }

    const WEIGHTS: [u32; 9] = [3, 7, 1, 3, 7, 1, 3, 7, 1];
    let sum: u32 = routing
        .chars()
        .zip(WEIGHTS.iter())
        .map(|(c, w)| c.to_digit(10).unwrap_or(0) * w)
        .sum();

    if sum % 10 != 0 {
        return Err("Routing number failed checksum validation".to_string());
    }
    Ok(())
}
