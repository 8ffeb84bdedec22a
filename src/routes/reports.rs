use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::reports::{SalesReport, SalesReportQuery},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::report_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/sales", get(sales_report))
}

#[utoipa::path(
    get,
    path = "/api/reports/sales",
    params(
        ("from" = Option<String>, Query, description = "First day, YYYY-MM-DD; default 30 days before `to`"),
        ("to" = Option<String>, Query, description = "Last day, YYYY-MM-DD; default today (UTC)")
    ),
    responses(
        (status = 200, description = "Completed sales per day", body = ApiResponse<SalesReport>),
        (status = 400, description = "Invalid range")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn sales_report(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<SalesReportQuery>,
) -> AppResult<Json<ApiResponse<SalesReport>>> {
    let resp = report_service::sales_summary(&state, query).await?;
    Ok(Json(resp))
}
