//! Payment webhooks and transaction queries.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use common::{Page, Pagination, TransactionId};
use domain::payment::{
    EntityType, Transaction, TransactionFilter, TransactionStatus, WebhookHeaders, WebhookReceipt,
};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::context::Ctx;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_status: Option<TransactionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl From<WebhookReceipt> for WebhookResponse {
    fn from(receipt: WebhookReceipt) -> Self {
        match receipt {
            WebhookReceipt::Applied {
                transaction_id,
                status,
            } => Self {
                status: "applied",
                transaction_id: Some(transaction_id),
                transaction_status: Some(status),
                event: None,
            },
            WebhookReceipt::Duplicate { transaction_id } => Self {
                status: "duplicate",
                transaction_id: Some(transaction_id),
                transaction_status: None,
                event: None,
            },
            WebhookReceipt::Ignored { event } => Self {
                status: "ignored",
                transaction_id: None,
                transaction_status: None,
                event: Some(event),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<String>,
    pub provider: Option<String>,
    pub entity_type: Option<String>,
}

impl TransactionQuery {
    fn filter(&self) -> Result<TransactionFilter, ApiError> {
        Ok(TransactionFilter {
            status: self
                .status
                .as_deref()
                .map(str::parse::<TransactionStatus>)
                .transpose()
                .map_err(ApiError::BadRequest)?,
            provider: self.provider.clone().filter(|p| !p.trim().is_empty()),
            entity_type: self
                .entity_type
                .as_deref()
                .map(str::parse::<EntityType>)
                .transpose()
                .map_err(ApiError::BadRequest)?,
        })
    }
}

/// POST /payments/webhook: verify and apply a provider notification.
///
/// The raw body is passed through untouched; signatures cover its bytes.
#[tracing::instrument(skip_all, fields(correlation_id = %ctx.correlation_id()))]
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let mut webhook_headers = WebhookHeaders::new();
    for (name, value) in &headers {
        if let Ok(value) = value.to_str() {
            webhook_headers.insert(name.as_str(), value);
        }
    }

    let receipt = state
        .payments
        .handle_webhook(&ctx, &webhook_headers, &body)
        .await?;
    Ok(Json(receipt.into()))
}

/// GET /payments/transactions: filtered, paginated ledger listing.
#[tracing::instrument(skip(state))]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Page<Transaction>>, ApiError> {
    let filter = query.filter()?;
    let pagination = Pagination::from_query(query.limit, query.offset, Pagination::DEFAULT_LIMIT);
    Ok(Json(
        state.payments.list_transactions(&filter, pagination).await?,
    ))
}

/// GET /payments/transactions/{id}
#[tracing::instrument(skip(state))]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    let id = parse_id(&id, TransactionId::parse)?;
    Ok(Json(state.payments.get_transaction(id).await?))
}
