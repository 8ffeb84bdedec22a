//! Cart reconciliation.
//!
//! A cart is never stored: it is the set of product instances whose
//! `sale_transaction_id` points at an open sale. Every mutation here runs in a
//! single database transaction that first locks the sale row, so two edits of
//! the same cart are applied one after the other.

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockBehavior, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::sales::{
        AddToCartRequest, Cart, CartChange, CartLine, CartTotals, CompleteTransactionRequest,
        EditCartItemRequest, TransactionWithCart,
    },
    entity::{
        product_instances::{
            ActiveModel as InstanceActive, Column as InstanceCol, Entity as Instances,
            Model as InstanceModel,
        },
        products::{Entity as Products, Model as ProductModel},
        sale_transactions::{ActiveModel as SaleActive, Entity as Sales, Model as SaleModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Product, ProductType, SaleStatus, SaleTransaction},
    pricing::{CartDiscount, final_price},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// How a quantity edit maps onto instance reassignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAdjustment {
    Assign(u64),
    Release(u64),
    Unchanged,
}

pub fn plan_adjustment(current: i64, requested: i64) -> CartAdjustment {
    match requested - current {
        0 => CartAdjustment::Unchanged,
        delta if delta > 0 => CartAdjustment::Assign(delta as u64),
        delta => CartAdjustment::Release(delta.unsigned_abs()),
    }
}

pub async fn list_cart(state: &AppState, sale_id: Uuid) -> AppResult<ApiResponse<Cart>> {
    if Sales::find_by_id(sale_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let cart = load_cart(&state.orm, sale_id).await?;
    Ok(ApiResponse::success("OK", cart, Some(Meta::empty())))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    sale_id: Uuid,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartChange>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;
    lock_open_sale(&txn, sale_id).await?;
    let product = find_stocked_product(&txn, payload.product_id).await?;

    let assigned = assign_free(&txn, sale_id, product.id, payload.quantity as u64).await?;
    if assigned == 0 {
        return Err(AppError::BadRequest(format!(
            "product {} is out of stock",
            product.sku
        )));
    }
    let quantity = count_in_cart(&txn, sale_id, product.id).await?;
    txn.commit().await?;

    tracing::debug!(
        sale_id = %sale_id,
        product_id = %product.id,
        requested = payload.quantity,
        assigned,
        "cart add"
    );
    audit::record(
        state,
        user,
        "cart_add",
        "product_instances",
        serde_json::json!({ "sale_transaction_id": sale_id, "product_id": product.id, "assigned": assigned }),
    )
    .await;

    let change = CartChange {
        product_id: product.id,
        requested: payload.quantity as i64,
        assigned,
        released: 0,
        quantity,
    };
    Ok(ApiResponse::success("Added to cart", change, Some(Meta::empty())))
}

pub async fn edit_cart_item(
    state: &AppState,
    user: &AuthUser,
    sale_id: Uuid,
    product_id: Uuid,
    payload: EditCartItemRequest,
) -> AppResult<ApiResponse<CartChange>> {
    if payload.quantity < 0 {
        return Err(AppError::BadRequest(
            "quantity cannot be negative".to_string(),
        ));
    }
    if payload.quantity == 0 {
        return remove_from_cart(state, user, sale_id, product_id).await;
    }

    let txn = state.orm.begin().await?;
    lock_open_sale(&txn, sale_id).await?;
    let product = find_stocked_product(&txn, product_id).await?;
    let current = count_in_cart(&txn, sale_id, product.id).await?;

    let (assigned, released) = match plan_adjustment(current, payload.quantity as i64) {
        CartAdjustment::Assign(n) => {
            let assigned = assign_free(&txn, sale_id, product.id, n).await?;
            if assigned == 0 {
                return Err(AppError::BadRequest(format!(
                    "product {} is out of stock",
                    product.sku
                )));
            }
            (assigned, 0)
        }
        CartAdjustment::Release(n) => (0, release(&txn, sale_id, product.id, Some(n)).await?),
        CartAdjustment::Unchanged => (0, 0),
    };
    txn.commit().await?;

    tracing::debug!(
        sale_id = %sale_id,
        product_id = %product.id,
        current,
        requested = payload.quantity,
        assigned,
        released,
        "cart edit"
    );
    if assigned + released > 0 {
        audit::record(
            state,
            user,
            "cart_edit",
            "product_instances",
            serde_json::json!({
                "sale_transaction_id": sale_id,
                "product_id": product.id,
                "assigned": assigned,
                "released": released,
            }),
        )
        .await;
    }

    let change = CartChange {
        product_id: product.id,
        requested: payload.quantity as i64,
        assigned,
        released,
        quantity: current + assigned - released,
    };
    Ok(ApiResponse::success("Cart updated", change, Some(Meta::empty())))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    sale_id: Uuid,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartChange>> {
    let txn = state.orm.begin().await?;
    lock_open_sale(&txn, sale_id).await?;
    let released = release(&txn, sale_id, product_id, None).await?;
    if released == 0 {
        return Err(AppError::NotFound);
    }
    txn.commit().await?;

    tracing::debug!(sale_id = %sale_id, product_id = %product_id, released, "cart remove");
    audit::record(
        state,
        user,
        "cart_remove",
        "product_instances",
        serde_json::json!({ "sale_transaction_id": sale_id, "product_id": product_id, "released": released }),
    )
    .await;

    let change = CartChange {
        product_id,
        requested: 0,
        assigned: 0,
        released,
        quantity: 0,
    };
    Ok(ApiResponse::success(
        "Removed from cart",
        change,
        Some(Meta::empty()),
    ))
}

pub async fn complete_transaction(
    state: &AppState,
    user: &AuthUser,
    sale_id: Uuid,
    payload: CompleteTransactionRequest,
) -> AppResult<ApiResponse<TransactionWithCart>> {
    let discount = payload.discount.map(|d| CartDiscount {
        kind: d.discount_type,
        value: d.value,
    });
    if let Some(discount) = &discount {
        discount.validate().map_err(AppError::BadRequest)?;
    }

    let txn = state.orm.begin().await?;
    let sale = lock_open_sale(&txn, sale_id).await?;
    let rows = cart_rows(&txn, sale_id).await?;
    if rows.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let targets: Vec<i64> = rows.iter().map(|(_, p)| p.target_price).collect();
    if let Some(discount) = &discount {
        discount
            .check_within(targets.iter().sum())
            .map_err(AppError::BadRequest)?;
    }
    let discounts = match &discount {
        Some(d) => d.allocate(&targets),
        None => rows.iter().map(|(i, _)| i.discount).collect(),
    };

    let now = Utc::now();
    let mut priced = Vec::with_capacity(rows.len());
    for ((instance, product), unit_discount) in rows.into_iter().zip(discounts) {
        let discount_type = match &discount {
            Some(d) => Some(d.kind.as_str().to_string()),
            None => instance.discount_type.clone(),
        };
        let mut active: InstanceActive = instance.into();
        active.discount = Set(unit_discount);
        active.discount_type = Set(discount_type);
        active.final_sale_price = Set(Some(final_price(product.target_price, unit_discount)));
        active.updated_at = Set(now.into());
        priced.push((active.update(&txn).await?, product));
    }

    let mut active: SaleActive = sale.into();
    active.status = Set(SaleStatus::Complete.as_str().to_string());
    active.date_time = Set(Some(now.into()));
    let sale = active.update(&txn).await?;

    txn.commit().await?;

    let cart = build_cart(sale_id, priced)?;
    tracing::info!(
        sale_id = %sale_id,
        units = cart.totals.units,
        net = cart.totals.net,
        "sale completed"
    );
    audit::record(
        state,
        user,
        "sale_complete",
        "sale_transactions",
        serde_json::json!({
            "sale_transaction_id": sale_id,
            "units": cart.totals.units,
            "discount": cart.totals.discount,
            "net": cart.totals.net,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Sale completed",
        TransactionWithCart {
            transaction: SaleTransaction::try_from(sale)?,
            cart,
        },
        Some(Meta::empty()),
    ))
}

/// Returns every unit to stock and deletes the sale. Only open sales can be cancelled.
pub async fn cancel_transaction(
    state: &AppState,
    user: &AuthUser,
    sale_id: Uuid,
) -> AppResult<u64> {
    let txn = state.orm.begin().await?;
    lock_open_sale(&txn, sale_id).await?;

    let released = release_query()
        .filter(InstanceCol::SaleTransactionId.eq(sale_id))
        .exec(&txn)
        .await?
        .rows_affected;
    Sales::delete_by_id(sale_id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(sale_id = %sale_id, released, "sale cancelled");
    audit::record(
        state,
        user,
        "sale_cancel",
        "sale_transactions",
        serde_json::json!({ "sale_transaction_id": sale_id, "released": released }),
    )
    .await;

    Ok(released)
}

/// Cart contents of a sale, grouped by product.
pub async fn load_cart<C: ConnectionTrait>(conn: &C, sale_id: Uuid) -> AppResult<Cart> {
    let rows = cart_rows(conn, sale_id).await?;
    build_cart(sale_id, rows)
}

async fn cart_rows<C: ConnectionTrait>(
    conn: &C,
    sale_id: Uuid,
) -> AppResult<Vec<(InstanceModel, ProductModel)>> {
    let rows = Instances::find()
        .find_also_related(Products)
        .filter(InstanceCol::SaleTransactionId.eq(sale_id))
        .order_by_asc(InstanceCol::CreatedAt)
        .order_by_asc(InstanceCol::Id)
        .all(conn)
        .await?;

    rows.into_iter()
        .map(|(instance, product)| {
            product.map(|p| (instance, p)).ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("instance without product"))
            })
        })
        .collect()
}

/// Groups instance rows into one line per product, keeping first-seen order.
pub fn build_cart(sale_id: Uuid, rows: Vec<(InstanceModel, ProductModel)>) -> AppResult<Cart> {
    let mut lines: Vec<CartLine> = Vec::new();
    let mut totals = CartTotals::default();

    for (instance, product) in rows {
        let unit_net = instance
            .final_sale_price
            .unwrap_or_else(|| final_price(product.target_price, instance.discount));
        totals.units += 1;
        totals.gross += product.target_price;
        totals.discount += instance.discount;
        totals.net += unit_net;

        match lines.iter_mut().find(|line| line.product.id == product.id) {
            Some(line) => {
                line.quantity += 1;
                line.subtotal += product.target_price;
                line.discount += instance.discount;
                line.total = match (line.total, instance.final_sale_price) {
                    (Some(total), Some(price)) => Some(total + price),
                    _ => None,
                };
                line.instance_ids.push(instance.id);
            }
            None => lines.push(CartLine {
                subtotal: product.target_price,
                discount: instance.discount,
                total: instance.final_sale_price,
                quantity: 1,
                instance_ids: vec![instance.id],
                product: Product::try_from(product)?,
            }),
        }
    }

    Ok(Cart {
        sale_transaction_id: sale_id,
        lines,
        totals,
    })
}

async fn lock_open_sale<C: ConnectionTrait>(conn: &C, sale_id: Uuid) -> AppResult<SaleModel> {
    let sale = Sales::find_by_id(sale_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    if SaleStatus::parse(&sale.status)? != SaleStatus::Open {
        return Err(AppError::BadRequest(
            "sale transaction is not open".into(),
        ));
    }
    Ok(sale)
}

async fn find_stocked_product<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> AppResult<ProductModel> {
    let product = Products::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    if !ProductType::parse(&product.product_type)?.is_stocked() {
        return Err(AppError::BadRequest(
            "variable products cannot be sold directly, pick a variation".into(),
        ));
    }
    Ok(product)
}

async fn count_in_cart<C: ConnectionTrait>(
    conn: &C,
    sale_id: Uuid,
    product_id: Uuid,
) -> AppResult<i64> {
    let count = Instances::find()
        .filter(InstanceCol::SaleTransactionId.eq(sale_id))
        .filter(InstanceCol::ProductId.eq(product_id))
        .count(conn)
        .await?;
    Ok(count as i64)
}

/// Moves up to `limit` free units, oldest first, into the sale.
///
/// Rows another cart is already claiming are skipped rather than waited on.
async fn assign_free<C: ConnectionTrait>(
    conn: &C,
    sale_id: Uuid,
    product_id: Uuid,
    limit: u64,
) -> AppResult<i64> {
    let ids: Vec<Uuid> = Instances::find()
        .select_only()
        .column(InstanceCol::Id)
        .filter(InstanceCol::ProductId.eq(product_id))
        .filter(InstanceCol::SaleTransactionId.is_null())
        .order_by_asc(InstanceCol::CreatedAt)
        .order_by_asc(InstanceCol::Id)
        .limit(limit)
        .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
        .into_tuple()
        .all(conn)
        .await?;
    if ids.is_empty() {
        return Ok(0);
    }

    let result = Instances::update_many()
        .col_expr(InstanceCol::SaleTransactionId, Expr::value(Some(sale_id)))
        .col_expr(InstanceCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(InstanceCol::Id.is_in(ids))
        .exec(conn)
        .await?;
    Ok(result.rows_affected as i64)
}

/// Returns units of a product to stock, most recently received first.
/// `None` releases all of them.
async fn release<C: ConnectionTrait>(
    conn: &C,
    sale_id: Uuid,
    product_id: Uuid,
    limit: Option<u64>,
) -> AppResult<i64> {
    let mut finder = Instances::find()
        .select_only()
        .column(InstanceCol::Id)
        .filter(InstanceCol::SaleTransactionId.eq(sale_id))
        .filter(InstanceCol::ProductId.eq(product_id))
        .order_by_desc(InstanceCol::CreatedAt)
        .order_by_desc(InstanceCol::Id);
    if let Some(limit) = limit {
        finder = finder.limit(limit);
    }
    let ids: Vec<Uuid> = finder.into_tuple().all(conn).await?;
    if ids.is_empty() {
        return Ok(0);
    }

    let result = release_query()
        .filter(InstanceCol::Id.is_in(ids))
        .exec(conn)
        .await?;
    Ok(result.rows_affected as i64)
}

/// Clears the sale link and any checkout pricing.
fn release_query() -> sea_orm::UpdateMany<Instances> {
    Instances::update_many()
        .col_expr(
            InstanceCol::SaleTransactionId,
            Expr::value(Option::<Uuid>::None),
        )
        .col_expr(InstanceCol::Discount, Expr::value(0_i64))
        .col_expr(InstanceCol::DiscountType, Expr::value(Option::<String>::None))
        .col_expr(InstanceCol::FinalSalePrice, Expr::value(Option::<i64>::None))
        .col_expr(InstanceCol::UpdatedAt, Expr::value(Utc::now()))
}
