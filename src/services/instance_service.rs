use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::instances::{InstanceList, ReceiveInstancesRequest, UpdateInstanceRequest},
    entity::{
        product_instances::{ActiveModel, Column, Entity as Instances},
        products::Entity as Products,
        sale_transactions::Entity as Sales,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{DiscountType, ProductInstance, ProductType, SaleStatus},
    pricing::percent_of,
    response::{ApiResponse, Meta},
    routes::params::InstanceQuery,
    state::AppState,
};

const MAX_RECEIVE: i32 = 1000;

/// Inventory ingestion: records `quantity` new units of a product, all in stock.
pub async fn receive_instances(
    state: &AppState,
    user: &AuthUser,
    payload: ReceiveInstancesRequest,
) -> AppResult<ApiResponse<InstanceList>> {
    if payload.quantity <= 0 || payload.quantity > MAX_RECEIVE {
        return Err(AppError::BadRequest(format!(
            "quantity must be between 1 and {MAX_RECEIVE}"
        )));
    }
    if payload.invoice_cost < 0 {
        return Err(AppError::BadRequest("invoice cost cannot be negative".into()));
    }

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("product not found".into()))?;
    if !ProductType::parse(&product.product_type)?.is_stocked() {
        return Err(AppError::BadRequest(
            "units must be received against a variation, not a variable product".into(),
        ));
    }

    let purchase_order = payload
        .purchase_order
        .map(|po| po.trim().to_string())
        .filter(|po| !po.is_empty());

    let txn = state.orm.begin().await?;
    let mut items = Vec::with_capacity(payload.quantity as usize);
    for _ in 0..payload.quantity {
        let instance = ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            invoice_cost: Set(payload.invoice_cost),
            discount: Set(0),
            discount_type: Set(None),
            final_sale_price: Set(None),
            sale_transaction_id: Set(None),
            purchase_order: Set(purchase_order.clone()),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(ProductInstance::try_from(instance)?);
    }
    txn.commit().await?;

    tracing::debug!(product_id = %product.id, quantity = payload.quantity, "units received");
    audit::record(
        state,
        user,
        "instances_receive",
        "product_instances",
        serde_json::json!({
            "product_id": product.id,
            "quantity": payload.quantity,
            "purchase_order": purchase_order,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Units received",
        InstanceList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_instances(
    state: &AppState,
    query: InstanceQuery,
) -> AppResult<ApiResponse<InstanceList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(product_id) = query.product_id {
        condition = condition.add(Column::ProductId.eq(product_id));
    }
    if let Some(sale_id) = query.sale_transaction_id {
        condition = condition.add(Column::SaleTransactionId.eq(sale_id));
    }
    match query.in_stock {
        Some(true) => condition = condition.add(Column::SaleTransactionId.is_null()),
        Some(false) => condition = condition.add(Column::SaleTransactionId.is_not_null()),
        None => {}
    }

    let finder = Instances::find()
        .filter(condition)
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ProductInstance::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Units", InstanceList { items }, Some(meta)))
}

pub async fn get_instance(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductInstance>> {
    let instance = Instances::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Unit",
        ProductInstance::try_from(instance)?,
        None,
    ))
}

/// Per-unit adjustments ahead of checkout. A `PERCENT` discount is given in
/// whole percent and stored as cents of the product's target price.
pub async fn update_instance(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateInstanceRequest,
) -> AppResult<ApiResponse<ProductInstance>> {
    let txn = state.orm.begin().await?;
    let sale_id = Instances::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?
        .sale_transaction_id;
    // Sale row before unit row, the same order checkout takes them in.
    if let Some(sale_id) = sale_id {
        if let Some(sale) = Sales::find_by_id(sale_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
        {
            if SaleStatus::parse(&sale.status)? == SaleStatus::Complete {
                return Err(AppError::BadRequest("unit has already been sold".into()));
            }
        }
    }
    let existing = Instances::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if existing.sale_transaction_id != sale_id {
        return Err(AppError::BadRequest(
            "unit was moved to another sale while updating, try again".into(),
        ));
    }

    let product = Products::find_by_id(existing.product_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(cost) = payload.invoice_cost {
        if cost < 0 {
            return Err(AppError::BadRequest("invoice cost cannot be negative".into()));
        }
        active.invoice_cost = Set(cost);
    }
    if let Some(discount) = payload.discount {
        let kind = payload.discount_type.unwrap_or(DiscountType::Dollar);
        let cents = unit_discount(kind, discount, product.target_price)?;
        active.discount = Set(cents);
        active.discount_type = Set(Some(kind.as_str().to_string()));
    }
    if let Some(po) = payload.purchase_order {
        active.purchase_order = Set(Some(po.trim().to_string()).filter(|po| !po.is_empty()));
    }
    active.updated_at = Set(Utc::now().into());
    let instance = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        state,
        user,
        "instance_update",
        "product_instances",
        serde_json::json!({ "instance_id": instance.id, "discount": instance.discount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        ProductInstance::try_from(instance)?,
        Some(Meta::empty()),
    ))
}

/// Only units still in stock can be deleted.
pub async fn delete_instance(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let instance = Instances::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if instance.sale_transaction_id.is_some() {
        return Err(AppError::BadRequest(
            "unit is assigned to a sale".into(),
        ));
    }

    let result = Instances::delete_many()
        .filter(Column::Id.eq(id))
        .filter(Column::SaleTransactionId.is_null())
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::BadRequest(
            "unit is assigned to a sale".into(),
        ));
    }

    audit::record(
        state,
        user,
        "instance_delete",
        "product_instances",
        serde_json::json!({ "instance_id": id }),
    )
    .await;
    Ok(())
}

fn unit_discount(kind: DiscountType, value: i64, target_price: i64) -> AppResult<i64> {
    match kind {
        DiscountType::Dollar if value < 0 => {
            Err(AppError::BadRequest("discount cannot be negative".into()))
        }
        DiscountType::Dollar => Ok(value.min(target_price)),
        DiscountType::Percent if !(0..=100).contains(&value) => Err(AppError::BadRequest(
            "discount percent must be between 0 and 100".into(),
        )),
        DiscountType::Percent => Ok(percent_of(target_price, value)),
    }
}
