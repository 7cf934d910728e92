//! Plan catalog and vendor subscription status.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Page, Pagination, VendorId};
use domain::subscription::{NewPlan, PlanFilter, SubscriptionStatus, VendorPlan};
use serde::Deserialize;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub is_active: Option<bool>,
    pub name: Option<String>,
}

/// GET /subscriptions/plans
#[tracing::instrument(skip(state))]
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlanQuery>,
) -> Result<Json<Page<VendorPlan>>, ApiError> {
    let filter = PlanFilter {
        is_active: query.is_active,
        name: query.name.filter(|n| !n.trim().is_empty()),
    };
    let pagination = Pagination::from_query(query.limit, query.offset, Pagination::DEFAULT_LIMIT);
    Ok(Json(state.subscriptions.list_plans(&filter, pagination).await?))
}

/// POST /subscriptions/plans
#[tracing::instrument(skip(state, plan), fields(name = %plan.name))]
pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    Json(plan): Json<NewPlan>,
) -> Result<(StatusCode, Json<VendorPlan>), ApiError> {
    let plan = state.subscriptions.create_vendor_plan(plan).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /subscriptions/vendors/{vendor_id}/status: admission check.
#[tracing::instrument(skip(state))]
pub async fn vendor_status(
    State(state): State<Arc<AppState>>,
    Path(vendor_id): Path<String>,
) -> Result<Json<SubscriptionStatus>, ApiError> {
    let vendor_id = parse_id(&vendor_id, VendorId::parse)?;
    Ok(Json(
        state
            .subscriptions
            .verify_vendor_subscription_status(vendor_id)
            .await?,
    ))
}
