//! Scenarios against the real sandbox.
//!
//! Ignored by default. Run with credentials configured through
//! `~/.billing/config.json`, `config.toml` or `BILLING_CLIENT_ID` /
//! `BILLING_CLIENT_SECRET`:
//!
//! cargo test -p billing_client --test live_sandbox_test -- --ignored


use billing_client::{ApiContext, Patch, PatchRequest, Plan, PlanListQuery, PlanOperations};
use billing_core::plan_state;
use test_utils::{get_plan, init_logging, scenario};

fn sandbox_context() -> ApiContext {
    init_logging();
    ApiContext::from_env().expect("sandbox credentials must be configured")
}

#[tokio::test]
#[ignore = "requires sandbox credentials"]
async fn sandbox_plan_lifecycle() {
    let ctx = sandbox_context();
    let _scope = scenario(&ctx, "sandbox_plan_lifecycle");

    let created = ctx.plans().create(&get_plan()).await.expect("create");
    let plan_id = created.id().expect("id").to_string();

    let retrieved = ctx.plans().get(&plan_id).await.expect("get");
    assert_eq!(retrieved.name, created.name);

    let updated_description = uuid::Uuid::new_v4().to_string();
    let patch = PatchRequest::new().with(
        Patch::replace(
            "/",
            &Plan {
                description: Some(updated_description.clone()),
                ..Default::default()
            },
        )
        .expect("patch"),
    );
    ctx.plans().update(&plan_id, &patch).await.expect("update");
    let updated = ctx.plans().get(&plan_id).await.expect("get");
    assert_eq!(updated.description.as_deref(), Some(updated_description.as_str()));

    let delete = PatchRequest::new().with(
        Patch::replace(
            "/",
            &Plan {
                state: Some(plan_state::DELETED.to_string()),
                ..Default::default()
            },
        )
        .expect("patch"),
    );
    ctx.plans().update(&plan_id, &delete).await.expect("delete");
    assert!(ctx.plans().get(&plan_id).await.unwrap_err().is_not_found());
}

#[tokio::test]
#[ignore = "requires sandbox credentials"]
async fn sandbox_plan_list() {
    let ctx = sandbox_context();
    let _scope = scenario(&ctx, "sandbox_plan_list");

    let plans = ctx
        .plans()
        .list(&PlanListQuery::new().page_size(5).total_required(true))
        .await
        .expect("list");
    assert!(!plans.is_empty());
}
