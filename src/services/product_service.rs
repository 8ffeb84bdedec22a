use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
    entity::{
        product_categories::Entity as Categories,
        product_instances::{Column as InstanceCol, Entity as Instances},
        products::{ActiveModel, Column, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Product, ProductType},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Sku).ilike(pattern)),
        );
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }
    if let Some(product_type) = query.product_type {
        condition = condition.add(Column::ProductType.eq(product_type.as_str()));
    }
    if let Some(parent_id) = query.parent_id {
        condition = condition.add(Column::ParentId.eq(parent_id));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::TargetPrice.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::TargetPrice.lte(max_price));
    }

    let sort_col = match query.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::TargetPrice,
        ProductSortBy::Name => Column::Name,
        ProductSortBy::Sku => Column::Sku,
    };

    let mut finder = Products::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let in_stock = free_units(&state.orm, product.id).await?;

    let detail = ProductDetail {
        product: Product::try_from(product)?,
        in_stock,
    };
    Ok(ApiResponse::success("Product", detail, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let sku = required("sku", &payload.sku)?;
    let name = required("name", &payload.name)?;
    if payload.target_price < 0 {
        return Err(AppError::BadRequest("target price cannot be negative".into()));
    }
    ensure_unique_sku(&state.orm, &sku, None).await?;
    let parent_type = parent_type_of(&state.orm, payload.parent_id).await?;
    check_hierarchy(payload.product_type, parent_type).map_err(AppError::BadRequest)?;
    ensure_category(&state.orm, payload.category_id).await?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        sku: Set(sku),
        name: Set(name),
        product_type: Set(payload.product_type.as_str().to_string()),
        target_price: Set(payload.target_price),
        parent_id: Set(payload.parent_id),
        variation: Set(payload.variation),
        category_id: Set(payload.category_id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        user,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id, "sku": product.sku }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        Product::try_from(product)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let product_type = match payload.product_type {
        Some(ty) => ty,
        None => ProductType::parse(&existing.product_type)?,
    };
    let parent_id = resolve_parent(product_type, payload.parent_id, existing.parent_id);
    if parent_id == Some(id) {
        return Err(AppError::BadRequest("a product cannot be its own parent".into()));
    }
    let parent_type = parent_type_of(&state.orm, parent_id).await?;
    check_hierarchy(product_type, parent_type).map_err(AppError::BadRequest)?;
    if !product_type.is_stocked() {
        let units = Instances::find()
            .filter(InstanceCol::ProductId.eq(id))
            .count(&state.orm)
            .await?;
        if units > 0 {
            return Err(AppError::BadRequest(
                "a product with units on record cannot become variable".into(),
            ));
        }
    } else {
        let variations = Products::find()
            .filter(Column::ParentId.eq(id))
            .count(&state.orm)
            .await?;
        if variations > 0 {
            return Err(AppError::BadRequest(format!(
                "product has {variations} variations and must stay VARIABLE"
            )));
        }
    }

    let mut active: ActiveModel = existing.into();
    if let Some(sku) = payload.sku {
        let sku = required("sku", &sku)?;
        ensure_unique_sku(&state.orm, &sku, Some(id)).await?;
        active.sku = Set(sku);
    }
    if let Some(name) = payload.name {
        active.name = Set(required("name", &name)?);
    }
    if let Some(price) = payload.target_price {
        if price < 0 {
            return Err(AppError::BadRequest("target price cannot be negative".into()));
        }
        active.target_price = Set(price);
    }
    if let Some(variation) = payload.variation {
        active.variation = Set(Some(variation));
    }
    if let Some(category_id) = payload.category_id {
        ensure_category(&state.orm, Some(category_id)).await?;
        active.category_id = Set(Some(category_id));
    }
    active.product_type = Set(product_type.as_str().to_string());
    active.parent_id = Set(parent_id);

    let product = active.update(&state.orm).await?;

    audit::record(
        state,
        user,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Product::try_from(product)?,
        Some(Meta::empty()),
    ))
}

/// Refused while units or variations still reference the product.
pub async fn delete_product(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    if Products::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let units = Instances::find()
        .filter(InstanceCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;
    if units > 0 {
        return Err(AppError::BadRequest(format!(
            "product has {units} units on record"
        )));
    }
    let variations = Products::find()
        .filter(Column::ParentId.eq(id))
        .count(&state.orm)
        .await?;
    if variations > 0 {
        return Err(AppError::BadRequest(format!(
            "product has {variations} variations"
        )));
    }

    Products::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        state,
        user,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;
    Ok(())
}

/// Units of a product not assigned to any sale.
pub async fn free_units<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> AppResult<i64> {
    let count = Instances::find()
        .filter(InstanceCol::ProductId.eq(product_id))
        .filter(InstanceCol::SaleTransactionId.is_null())
        .count(conn)
        .await?;
    Ok(count as i64)
}

/// Variations hang off a variable parent; nothing else has a parent.
pub fn check_hierarchy(
    product_type: ProductType,
    parent_type: Option<ProductType>,
) -> Result<(), String> {
    match (product_type, parent_type) {
        (ProductType::Variation, Some(ProductType::Variable)) => Ok(()),
        (ProductType::Variation, Some(_)) => {
            Err("a variation's parent must be a variable product".into())
        }
        (ProductType::Variation, None) => Err("a variation requires a parent".into()),
        (_, Some(_)) => Err(format!(
            "{} products cannot have a parent",
            product_type.as_str()
        )),
        (_, None) => Ok(()),
    }
}

/// Parent after an update. Only variations keep a parent, so changing the type
/// of a variation to anything else detaches it.
pub fn resolve_parent(
    product_type: ProductType,
    requested: Option<Uuid>,
    current: Option<Uuid>,
) -> Option<Uuid> {
    match product_type {
        ProductType::Variation => requested.or(current),
        _ => requested,
    }
}

fn required(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

async fn parent_type_of<C: ConnectionTrait>(
    conn: &C,
    parent_id: Option<Uuid>,
) -> AppResult<Option<ProductType>> {
    let Some(parent_id) = parent_id else {
        return Ok(None);
    };
    let parent = Products::find_by_id(parent_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::BadRequest("parent product not found".into()))?;
    Ok(Some(ProductType::parse(&parent.product_type)?))
}

async fn ensure_unique_sku<C: ConnectionTrait>(
    conn: &C,
    sku: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut finder = Products::find().filter(Column::Sku.eq(sku));
    if let Some(id) = except {
        finder = finder.filter(Column::Id.ne(id));
    }
    if finder.count(conn).await? > 0 {
        return Err(AppError::BadRequest(format!("sku {sku} is already taken")));
    }
    Ok(())
}

async fn ensure_category<C: ConnectionTrait>(conn: &C, category_id: Option<Uuid>) -> AppResult<()> {
    if let Some(category_id) = category_id {
        if Categories::find_by_id(category_id).one(conn).await?.is_none() {
            return Err(AppError::BadRequest("category not found".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variation_needs_variable_parent() {
        assert!(check_hierarchy(ProductType::Variation, Some(ProductType::Variable)).is_ok());
        assert!(check_hierarchy(ProductType::Variation, None).is_err());
        assert!(check_hierarchy(ProductType::Variation, Some(ProductType::Simple)).is_err());
    }

    #[test]
    fn only_variations_have_parents() {
        assert!(check_hierarchy(ProductType::Simple, None).is_ok());
        assert!(check_hierarchy(ProductType::Variable, None).is_ok());
        let err = check_hierarchy(ProductType::Simple, Some(ProductType::Variable)).unwrap_err();
        assert_eq!(err, "SIMPLE products cannot have a parent");
    }

    #[test]
    fn retyping_a_variation_detaches_it() {
        let parent = Uuid::new_v4();
        assert_eq!(resolve_parent(ProductType::Simple, None, Some(parent)), None);
        assert_eq!(
            resolve_parent(ProductType::Variation, None, Some(parent)),
            Some(parent)
        );
        let other = Uuid::new_v4();
        assert_eq!(
            resolve_parent(ProductType::Variation, Some(other), Some(parent)),
            Some(other)
        );
        // An explicit parent on a non-variation is still rejected by check_hierarchy.
        assert_eq!(
            resolve_parent(ProductType::Simple, Some(other), None),
            Some(other)
        );
    }

    #[test]
    fn required_fields_are_trimmed() {
        assert_eq!(required("sku", " HBC-001 ").unwrap(), "HBC-001");
        assert!(required("name", "").is_err());
    }
}
