use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use retail_pos_api::{
    db::{create_pool, orm_from_pool, run_migrations},
    entity::{
        product_categories::{ActiveModel as CategoryActive, Column as CategoryCol},
        product_instances::ActiveModel as InstanceActive,
        products::{ActiveModel as ProductActive, Column as ProductCol, Model as ProductModel},
        ProductCategories, Products,
    },
    models::ProductType,
    services::product_service::free_units,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")?;
    let orm = orm_from_pool(create_pool(&database_url).await?);
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let health = ensure_category(&orm, "Health & Beauty").await?;
    let grocery = ensure_category(&orm, "Grocery").await?;

    let lotion = ensure_product(&orm, "HBC-1001", "Hand Lotion", ProductType::Simple, 899, None, Some(health)).await?;
    let tea = ensure_product(&orm, "GRO-2001", "Green Tea 20ct", ProductType::Simple, 450, None, Some(grocery)).await?;
    let shampoo = ensure_product(&orm, "HBC-1100", "Shampoo", ProductType::Variable, 0, None, Some(health)).await?;
    let small = ensure_product(&orm, "HBC-1100-S", "Shampoo 250ml", ProductType::Variation, 699, Some(shampoo.id), Some(health)).await?;
    let large = ensure_product(&orm, "HBC-1100-L", "Shampoo 500ml", ProductType::Variation, 1199, Some(shampoo.id), Some(health)).await?;

    for (product, units, cost) in [(&lotion, 12, 420), (&tea, 30, 180), (&small, 8, 300), (&large, 6, 520)] {
        if free_units(&orm, product.id).await? == 0 {
            receive(&orm, product, units, cost).await?;
        }
    }

    println!("Seed completed");
    Ok(())
}

async fn ensure_category(orm: &sea_orm::DatabaseConnection, name: &str) -> anyhow::Result<Uuid> {
    if let Some(existing) = ProductCategories::find()
        .filter(CategoryCol::Name.eq(name))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;
    println!("Seeded category {name}");
    Ok(category.id)
}

async fn ensure_product(
    orm: &sea_orm::DatabaseConnection,
    sku: &str,
    name: &str,
    product_type: ProductType,
    target_price: i64,
    parent_id: Option<Uuid>,
    category_id: Option<Uuid>,
) -> anyhow::Result<ProductModel> {
    if let Some(existing) = Products::find()
        .filter(ProductCol::Sku.eq(sku))
        .one(orm)
        .await?
    {
        return Ok(existing);
    }
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        sku: Set(sku.to_string()),
        name: Set(name.to_string()),
        product_type: Set(product_type.as_str().to_string()),
        target_price: Set(target_price),
        parent_id: Set(parent_id),
        variation: Set(None),
        category_id: Set(category_id),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;
    println!("Seeded product {sku}");
    Ok(product)
}

async fn receive(
    orm: &sea_orm::DatabaseConnection,
    product: &ProductModel,
    units: usize,
    invoice_cost: i64,
) -> anyhow::Result<()> {
    for _ in 0..units {
        InstanceActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            invoice_cost: Set(invoice_cost),
            discount: Set(0),
            discount_type: Set(None),
            final_sale_price: Set(None),
            sale_transaction_id: Set(None),
            purchase_order: Set(Some("SEED".into())),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(orm)
        .await?;
    }
    println!("Received {units} units of {}", product.sku);
    Ok(())
}
