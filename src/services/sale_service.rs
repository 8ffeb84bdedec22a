use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::sales::{OpenTransactionRequest, TransactionList, TransactionWithCart},
    entity::sale_transactions::{ActiveModel, Column, Entity as Sales},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{SaleStatus, SaleTransaction},
    response::{ApiResponse, Meta},
    routes::params::{SortOrder, TransactionQuery},
    services::cart_service,
    state::AppState,
};

/// Opens an empty cart. The caller is recorded as the source person unless another is given.
pub async fn open_transaction(
    state: &AppState,
    user: &AuthUser,
    payload: OpenTransactionRequest,
) -> AppResult<ApiResponse<SaleTransaction>> {
    let location = payload
        .location
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());

    let sale = ActiveModel {
        id: Set(Uuid::new_v4()),
        status: Set(SaleStatus::Open.as_str().to_string()),
        date_time: Set(None),
        customer_id: Set(payload.customer_id),
        source_person_id: Set(Some(payload.source_person_id.unwrap_or(user.person_id))),
        location: Set(location),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::debug!(sale_id = %sale.id, "sale opened");
    audit::record(
        state,
        user,
        "sale_open",
        "sale_transactions",
        serde_json::json!({ "sale_transaction_id": sale.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Sale opened",
        SaleTransaction::try_from(sale)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_transactions(
    state: &AppState,
    query: TransactionQuery,
) -> AppResult<ApiResponse<TransactionList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }

    let mut finder = Sales::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(Column::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(Column::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(SaleTransaction::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Sale transactions",
        TransactionList { items },
        Some(meta),
    ))
}

pub async fn get_transaction(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<TransactionWithCart>> {
    let sale = Sales::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let cart = cart_service::load_cart(&state.orm, sale.id).await?;

    Ok(ApiResponse::success(
        "OK",
        TransactionWithCart {
            transaction: SaleTransaction::try_from(sale)?,
            cart,
        },
        Some(Meta::empty()),
    ))
}
