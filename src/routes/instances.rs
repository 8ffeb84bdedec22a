use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::instances::{InstanceList, ReceiveInstancesRequest, UpdateInstanceRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::ProductInstance,
    response::ApiResponse,
    routes::params::InstanceQuery,
    services::instance_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_instances).post(receive_instances))
        .route(
            "/{id}",
            get(get_instance).patch(update_instance).delete(delete_instance),
        )
}

#[utoipa::path(
    get,
    path = "/api/product-instances",
    params(InstanceQuery),
    responses(
        (status = 200, description = "List units", body = ApiResponse<InstanceList>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_instances(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<InstanceQuery>,
) -> AppResult<Json<ApiResponse<InstanceList>>> {
    let resp = instance_service::list_instances(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/product-instances",
    request_body = ReceiveInstancesRequest,
    responses(
        (status = 201, description = "Receive units into stock", body = ApiResponse<InstanceList>),
        (status = 400, description = "Invalid quantity, cost or product")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn receive_instances(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ReceiveInstancesRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<InstanceList>>)> {
    let resp = instance_service::receive_instances(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/product-instances/{id}",
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Get unit", body = ApiResponse<ProductInstance>),
        (status = 404, description = "Unit not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn get_instance(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductInstance>>> {
    let resp = instance_service::get_instance(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/product-instances/{id}",
    params(("id" = Uuid, Path, description = "Unit ID")),
    request_body = UpdateInstanceRequest,
    responses(
        (status = 200, description = "Updated unit", body = ApiResponse<ProductInstance>),
        (status = 400, description = "Invalid values or unit already sold"),
        (status = 404, description = "Unit not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn update_instance(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInstanceRequest>,
) -> AppResult<Json<ApiResponse<ProductInstance>>> {
    let resp = instance_service::update_instance(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/product-instances/{id}",
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 204, description = "Deleted unit"),
        (status = 400, description = "Unit is assigned to a sale"),
        (status = 404, description = "Unit not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn delete_instance(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    instance_service::delete_instance(&state, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
