//! Nested records of a billing plan.
//!
//! The vendor sends counts and intervals as strings ("12", "2"), so they are
//! kept as strings here to round-trip unchanged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub currency: String,
    pub value: String,
}

impl Currency {
    pub fn new(currency: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// SHIPPING or TAX
    #[serde(rename = "type")]
    pub charge_type: String,
    pub amount: Currency,
}

/// One payment schedule of a plan (trial or regular).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// TRIAL or REGULAR
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub definition_type: Option<String>,
    /// DAY, WEEK, MONTH or YEAR
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycles: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Currency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charge_models: Vec<ChargeModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_fee: Option<Currency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fail_attempts: Option<String>,
    /// YES or NO
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_bill_amount: Option<String>,
    /// CONTINUE or CANCEL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_fail_amount_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_payment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_set: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terms {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub terms_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_billing_amount: Option<Currency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_range: Option<Currency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_editable: Option<String>,
}
