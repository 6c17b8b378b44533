//! HTTP handlers for the report API.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::error::ReportError;
use crate::report::{FetchResult, PageResult};
use crate::server::state::AppState;

/// Error body returned with status 500: `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub ReportError);

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(category = self.0.category(), "Request failed: {}", self.0);
        let body = Json(json!({ "error": self.0.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Query parameters for `/report/page`.
///
/// Values are kept as text so that garbage falls back to the defaults
/// instead of rejecting the request.
#[derive(Debug, Deserialize, Default)]
pub struct PageParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PageParams {
    fn parse(value: Option<&str>) -> i64 {
        value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
    }

    pub fn limit(&self) -> i64 {
        Self::parse(self.limit.as_deref())
    }

    pub fn offset(&self) -> i64 {
        Self::parse(self.offset.as_deref())
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// GET /report
pub async fn report(State(state): State<Arc<AppState>>) -> ApiResult<FetchResult> {
    let ctx = state.long_context();
    let result = state.service.fetch_all(&ctx).await?;
    info!(
        rows = result.rows.len(),
        count = result.count,
        "Served /report"
    );
    Ok(Json(result))
}

/// GET /report/raw
pub async fn report_raw(State(state): State<Arc<AppState>>) -> ApiResult<FetchResult> {
    let ctx = state.short_context();
    let result = state.service.fetch_raw(&ctx).await?;
    info!(rows = result.rows.len(), "Served /report/raw");
    Ok(Json(result))
}

/// GET /report/page?limit=&offset=
pub async fn report_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> ApiResult<PageResult> {
    let ctx = state.short_context();
    let page = state
        .service
        .fetch_page(params.limit(), params.offset(), &ctx)
        .await?;
    info!(
        rows = page.rows.len(),
        limit = page.limit,
        offset = page.offset,
        "Served /report/page"
    );
    Ok(Json(page))
}

/// GET /report/count
pub async fn report_count(State(state): State<Arc<AppState>>) -> ApiResult<CountResponse> {
    let ctx = state.short_context();
    let count = state.service.fetch_count(&ctx).await?;
    Ok(Json(CountResponse { count }))
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}
