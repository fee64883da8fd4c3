//! billing_core - Resource model and shared types for the billing plans client
//!
//! This crate provides the types used by the HTTP client crate:
//! - `models` - Plan, PaymentDefinition, MerchantPreferences, Patch, PatchRequest
//! - `json` - JSON codec shared by every resource
//! - `config` - Client configuration loaded from files and environment

pub mod config;
pub mod json;
pub mod models;
pub mod paths;

// Re-export commonly used types
pub use config::{Config, Mode, ProxyAuth};
pub use json::{JsonResource, ParseError};
pub use models::{
    plan_state, plan_type, ChargeModel, Currency, ErrorDetails, ErrorResponse, Link,
    MerchantPreferences, Patch, PatchOperation, PatchRequest, PaymentDefinition, Plan, PlanList,
    Terms,
};
