//! Billing plan operations: create, get, update (JSON patch) and list.
//!
//! There is no delete verb. A plan is soft-deleted by patching its state to
//! `DELETED`, after which `get` reports it as not found.

use async_trait::async_trait;
use billing_core::{JsonResource, PatchRequest, Plan, PlanList};
use log::{info, warn};
use reqwest::{Method, Response, StatusCode, Url};

use crate::context::ApiContext;
use crate::error::{BillingError, Result, ServiceError};
use crate::utils::http_utils::{debug_id, error_from_response};

const PLANS_PATH: &str = "v1/payments/billing-plans";

/// Status filter accepted by the list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatusFilter {
    Created,
    Active,
    Inactive,
    All,
}

impl PlanStatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatusFilter::Created => "CREATED",
            PlanStatusFilter::Active => "ACTIVE",
            PlanStatusFilter::Inactive => "INACTIVE",
            PlanStatusFilter::All => "ALL",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub status: Option<PlanStatusFilter>,
    pub total_required: Option<bool>,
}

impl PlanListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn status(mut self, status: PlanStatusFilter) -> Self {
        self.status = Some(status);
        self
    }

    pub fn total_required(mut self, total_required: bool) -> Self {
        self.total_required = Some(total_required);
        self
    }

    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            query.push(("page_size", page_size.to_string()));
        }
        if let Some(status) = self.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(total_required) = self.total_required {
            let value = if total_required { "yes" } else { "no" };
            query.push(("total_required", value.to_string()));
        }
        query
    }
}

#[async_trait]
pub trait PlanOperations: Send + Sync {
    /// Creates the plan remotely and returns it with its assigned id.
    async fn create(&self, plan: &Plan) -> Result<Plan>;

    /// Fetches a plan. Absent and deleted plans are `NotFound`.
    async fn get(&self, plan_id: &str) -> Result<Plan>;

    /// Applies the patches in order, atomically on the service side.
    async fn update(&self, plan_id: &str, patch_request: &PatchRequest) -> Result<()>;

    /// Lists plans. An empty page is not an error.
    async fn list(&self, query: &PlanListQuery) -> Result<PlanList>;
}

/// Plan operations bound to an [`ApiContext`].
#[derive(Debug, Clone, Copy)]
pub struct PlanClient<'a> {
    ctx: &'a ApiContext,
}

impl<'a> PlanClient<'a> {
    pub fn new(ctx: &'a ApiContext) -> Self {
        Self { ctx }
    }

    fn plan_url(&self, plan_id: &str) -> Result<Url> {
        Self::require_id(plan_id)?;
        self.ctx.endpoint(PLANS_PATH, Some(plan_id))
    }

    fn require_id(plan_id: &str) -> Result<()> {
        if plan_id.trim().is_empty() {
            return Err(BillingError::InvalidRequest("plan id must not be empty".into()));
        }
        // Dot segments are dropped by URL normalization.
        if matches!(plan_id, "." | "..") {
            return Err(BillingError::InvalidRequest(format!(
                "invalid plan id {plan_id:?}"
            )));
        }
        Ok(())
    }
}

/// Reads a success body and decodes it, or converts the failure.
async fn decode_response<T: JsonResource>(
    response: Response,
    resource_id: Option<&str>,
) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response, resource_id).await);
    }
    let body = response.bytes().await?;
    Ok(T::from_slice(&body)?)
}

#[async_trait]
impl PlanOperations for PlanClient<'_> {
    async fn create(&self, plan: &Plan) -> Result<Plan> {
        if plan.id().is_some() {
            warn!("Creating a plan that already carries id {:?}", plan.id);
        }
        info!("=== CREATE_PLAN START ===");
        let request_id = self.ctx.next_request_id();
        let url = self.ctx.endpoint(PLANS_PATH, None)?;
        let response = self
            .ctx
            .send(Method::POST, url, &[], Some(plan), Some(&request_id))
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, None).await);
        }
        let status = response.status().as_u16();
        let debug_id = debug_id(&response);
        let body = response.bytes().await?;

        // Anything but a plan with an id is a failed creation.
        match Plan::from_slice(&body) {
            Ok(created) if created.id().is_some() => {
                info!("Created plan {}", created.id.as_deref().unwrap_or_default());
                Ok(created)
            }
            outcome => {
                if let Err(e) = outcome {
                    warn!("Create response is not a plan: {}", e);
                }
                Err(BillingError::Service(ServiceError::from_body(
                    status,
                    String::from_utf8_lossy(&body).into_owned(),
                    debug_id,
                )))
            }
        }
    }

    async fn get(&self, plan_id: &str) -> Result<Plan> {
        let url = self.plan_url(plan_id)?;
        let response = self
            .ctx
            .send::<()>(Method::GET, url, &[], None, None)
            .await?;

        let status = response.status().as_u16();
        let debug_id = debug_id(&response);
        let plan: Plan = decode_response(response, Some(plan_id)).await?;
        if plan.id() != Some(plan_id) {
            warn!("Requested plan {} but got {:?}", plan_id, plan.id);
            let mut err = ServiceError::new(status, plan.to_json());
            err.message = Some(format!("response does not describe plan {plan_id}"));
            err.debug_id = debug_id;
            return Err(BillingError::Service(err));
        }
        if plan.is_deleted() {
            info!("Plan {} is deleted", plan_id);
            return Err(BillingError::NotFound {
                resource_id: plan_id.to_string(),
                debug_id,
            });
        }
        Ok(plan)
    }

    async fn update(&self, plan_id: &str, patch_request: &PatchRequest) -> Result<()> {
        let url = self.plan_url(plan_id)?;
        if patch_request.is_empty() {
            return Err(BillingError::InvalidRequest(
                "patch request must contain at least one patch".into(),
            ));
        }
        info!(
            "Updating plan {} with {} patch(es)",
            plan_id,
            patch_request.len()
        );
        let response = self
            .ctx
            .send(
                Method::PATCH,
                url,
                &[],
                Some(patch_request),
                None,
            )
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, Some(plan_id)).await);
        }
        Ok(())
    }

    async fn list(&self, query: &PlanListQuery) -> Result<PlanList> {
        let url = self.ctx.endpoint(PLANS_PATH, None)?;
        let response = self
            .ctx
            .send::<()>(Method::GET, url, &query.to_query(), None, None)
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(PlanList::default());
        }
        if !response.status().is_success() {
            return Err(error_from_response(response, None).await);
        }
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(PlanList::default());
        }
        let list = PlanList::from_slice(&body)?;
        info!("Listed {} plan(s)", list.len());
        Ok(list)
    }
}
