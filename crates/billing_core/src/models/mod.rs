pub mod error;
pub mod patch;
pub mod payment;
pub mod plan;

pub use error::{ErrorDetails, ErrorResponse};
pub use patch::{Patch, PatchOperation, PatchRequest};
pub use payment::{ChargeModel, Currency, MerchantPreferences, PaymentDefinition, Terms};
pub use plan::{plan_state, plan_type, Link, Plan, PlanList};
