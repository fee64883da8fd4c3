use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payment::{MerchantPreferences, PaymentDefinition, Terms};
use crate::json::JsonResource;

/// Plan states the service reports. Not validated locally.
pub mod plan_state {
    pub const CREATED: &str = "CREATED";
    pub const ACTIVE: &str = "ACTIVE";
    pub const INACTIVE: &str = "INACTIVE";
    pub const DELETED: &str = "DELETED";
}

/// Plan types the service accepts. Not validated locally.
pub mod plan_type {
    pub const FIXED: &str = "FIXED";
    pub const INFINITE: &str = "INFINITE";
}

/// HATEOAS link returned alongside a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Billing plan resource.
///
/// `id` stays `None` until the service has created the plan. `plan_type` and
/// `state` are free text owned by the service, see [`plan_type`] and
/// [`plan_state`] for the values it uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payment_definitions: Vec<PaymentDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terms: Vec<Terms>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_preferences: Option<MerchantPreferences>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Plan {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        plan_type: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description.into()),
            plan_type: Some(plan_type.into()),
            ..Default::default()
        }
    }

    /// Server-assigned id, `None` when absent or empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_deleted(&self) -> bool {
        self.state
            .as_deref()
            .is_some_and(|state| state.eq_ignore_ascii_case(plan_state::DELETED))
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_pretty())
    }
}

/// One page of plans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanList {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl PlanList {
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN_JSON: &str = r#"{
        "name": "T-Shirt of the Month Club Plan",
        "description": "Template creation.",
        "type": "FIXED",
        "payment_definitions": [{
            "name": "Regular Payments",
            "type": "REGULAR",
            "frequency": "MONTH",
            "frequency_interval": "2",
            "amount": {"value": "100", "currency": "USD"},
            "cycles": "12",
            "charge_models": [
                {"type": "SHIPPING", "amount": {"value": "10", "currency": "USD"}},
                {"type": "TAX", "amount": {"value": "12", "currency": "USD"}}
            ]
        }],
        "merchant_preferences": {
            "setup_fee": {"value": "1", "currency": "USD"},
            "return_url": "http://www.return.com",
            "cancel_url": "http://www.cancel.com",
            "auto_bill_amount": "YES",
            "initial_fail_amount_action": "CONTINUE",
            "max_fail_attempts": "0"
        }
    }"#;

    fn sample_plan() -> Plan {
        Plan::from_json(PLAN_JSON).expect("plan fixture")
    }

    #[test]
    fn plan_object_fields() {
        let plan = sample_plan();
        assert_eq!(plan.name.as_deref(), Some("T-Shirt of the Month Club Plan"));
        assert_eq!(plan.description.as_deref(), Some("Template creation."));
        assert_eq!(plan.plan_type.as_deref(), Some(plan_type::FIXED));
        assert_eq!(plan.payment_definitions.len(), 1);
        assert!(plan.merchant_preferences.is_some());
        assert!(plan.id().is_none());
    }

    #[test]
    fn plan_to_json_is_not_empty() {
        assert!(!sample_plan().to_json().is_empty());
    }

    #[test]
    fn plan_display_is_not_empty() {
        let rendered = sample_plan().to_string();
        assert!(!rendered.is_empty());
        assert!(rendered.contains("T-Shirt of the Month Club Plan"));
    }

    #[test]
    fn plan_round_trips_through_json() {
        let plan = sample_plan();
        let decoded = Plan::from_json(&plan.to_json()).unwrap();
        assert_eq!(plan, decoded);
    }

    #[test]
    fn server_fields_round_trip() {
        let json = r#"{
            "id": "P-94458432VR012762KRWBZEUA",
            "state": "CREATED",
            "name": "Plan",
            "create_time": "2014-07-31T17:41:55.920Z",
            "update_time": "2014-07-31T17:41:55.920Z",
            "links": [{
                "href": "https://api.sandbox.paypal.com/v1/payments/billing-plans/P-94458432VR012762KRWBZEUA",
                "rel": "self",
                "method": "GET"
            }]
        }"#;
        let plan = Plan::from_json(json).unwrap();
        assert_eq!(plan.id(), Some("P-94458432VR012762KRWBZEUA"));
        assert_eq!(plan.links[0].rel, "self");
        assert!(plan.create_time.is_some());

        let again = Plan::from_json(&plan.to_json()).unwrap();
        assert_eq!(plan, again);
    }

    #[test]
    fn empty_id_counts_as_absent() {
        let plan = Plan {
            id: Some(String::new()),
            ..Default::default()
        };
        assert!(plan.id().is_none());
    }

    #[test]
    fn deleted_state_detection() {
        let mut plan = Plan::new("n", "d", plan_type::INFINITE);
        assert!(!plan.is_deleted());
        plan.state = Some(plan_state::DELETED.to_string());
        assert!(plan.is_deleted());
        plan.state = Some("deleted".to_string());
        assert!(plan.is_deleted());
    }

    #[test]
    fn payment_definitions_must_be_a_list() {
        let err = Plan::from_json(r#"{"payment_definitions": {"name": "x"}}"#).unwrap_err();
        assert_eq!(err.resource, "Plan");
    }

    #[test]
    fn plan_list_defaults_to_empty() {
        let list = PlanList::from_json("{}").unwrap();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);

        let list = PlanList::from_json(&format!(
            r#"{{"plans": [{PLAN_JSON}], "total_items": "1", "total_pages": "1"}}"#
        ))
        .unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.total_items.as_deref(), Some("1"));
    }
}
