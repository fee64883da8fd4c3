pub mod api;
pub mod auth;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod utils;

pub use api::plans::{PlanClient, PlanListQuery, PlanOperations, PlanStatusFilter};
pub use billing_core::{Config, JsonResource, Mode, Patch, PatchOperation, PatchRequest, Plan, PlanList};
pub use context::ApiContext;
pub use diagnostics::{ConnectionDiagnostics, DiagnosticsScope, ExchangeRecord, ScenarioReport};
pub use error::{BillingError, ErrorKind, Result, ServiceError};
