use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::sales::{
        AddToCartRequest, Cart, CartChange, CompleteTransactionRequest, EditCartItemRequest,
        OpenTransactionRequest, TransactionList, TransactionWithCart,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::SaleTransaction,
    response::ApiResponse,
    routes::params::TransactionQuery,
    services::{cart_service, sale_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions).post(open_transaction))
        .route("/{id}", get(get_transaction).delete(cancel_transaction))
        .route("/{id}/complete", post(complete_transaction))
        .route("/{id}/cart", get(list_cart).post(add_to_cart))
        .route(
            "/{id}/cart/{product_id}",
            put(edit_cart_item).delete(remove_from_cart),
        )
}

#[utoipa::path(
    get,
    path = "/api/sale-transactions",
    params(TransactionQuery),
    responses(
        (status = 200, description = "List sale transactions", body = ApiResponse<TransactionList>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<ApiResponse<TransactionList>>> {
    let resp = sale_service::list_transactions(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/sale-transactions",
    request_body = OpenTransactionRequest,
    responses(
        (status = 201, description = "Open a new cart", body = ApiResponse<SaleTransaction>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales"
)]
pub async fn open_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<OpenTransactionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<SaleTransaction>>)> {
    let resp = sale_service::open_transaction(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/sale-transactions/{id}",
    params(("id" = Uuid, Path, description = "Sale transaction ID")),
    responses(
        (status = 200, description = "Sale transaction with its cart", body = ApiResponse<TransactionWithCart>),
        (status = 404, description = "Sale transaction not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TransactionWithCart>>> {
    let resp = sale_service::get_transaction(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/sale-transactions/{id}",
    params(("id" = Uuid, Path, description = "Sale transaction ID")),
    responses(
        (status = 204, description = "Cart cancelled, units returned to stock"),
        (status = 400, description = "Sale is already complete"),
        (status = 404, description = "Sale transaction not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales"
)]
pub async fn cancel_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    cart_service::cancel_transaction(&state, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/sale-transactions/{id}/complete",
    params(("id" = Uuid, Path, description = "Sale transaction ID")),
    request_body = CompleteTransactionRequest,
    responses(
        (status = 200, description = "Sale completed", body = ApiResponse<TransactionWithCart>),
        (status = 400, description = "Empty cart, invalid discount or sale not open"),
        (status = 404, description = "Sale transaction not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Sales"
)]
pub async fn complete_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteTransactionRequest>,
) -> AppResult<Json<ApiResponse<TransactionWithCart>>> {
    let resp = cart_service::complete_transaction(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/sale-transactions/{id}/cart",
    params(("id" = Uuid, Path, description = "Sale transaction ID")),
    responses(
        (status = 200, description = "Cart lines grouped by product", body = ApiResponse<Cart>),
        (status = 404, description = "Sale transaction not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn list_cart(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp = cart_service::list_cart(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/sale-transactions/{id}/cart",
    params(("id" = Uuid, Path, description = "Sale transaction ID")),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Units moved into the cart", body = ApiResponse<CartChange>),
        (status = 400, description = "Invalid quantity, out of stock or sale not open"),
        (status = 404, description = "Sale transaction or product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartChange>>> {
    let resp = cart_service::add_to_cart(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/sale-transactions/{id}/cart/{product_id}",
    params(
        ("id" = Uuid, Path, description = "Sale transaction ID"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    request_body = EditCartItemRequest,
    responses(
        (status = 200, description = "Cart quantity set", body = ApiResponse<CartChange>),
        (status = 400, description = "Invalid quantity, out of stock or sale not open"),
        (status = 404, description = "Sale transaction or product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn edit_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<EditCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartChange>>> {
    let resp = cart_service::edit_cart_item(&state, &user, id, product_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/sale-transactions/{id}/cart/{product_id}",
    params(
        ("id" = Uuid, Path, description = "Sale transaction ID"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product removed from the cart", body = ApiResponse<CartChange>),
        (status = 400, description = "Sale not open"),
        (status = 404, description = "Product not in this cart")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<CartChange>>> {
    let resp = cart_service::remove_from_cart(&state, &user, id, product_id).await?;
    Ok(Json(resp))
}
