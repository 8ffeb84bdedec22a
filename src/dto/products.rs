use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Product, ProductType};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default = "default_product_type")]
    pub product_type: ProductType,
    pub target_price: i64,
    pub parent_id: Option<Uuid>,
    pub variation: Option<String>,
    pub category_id: Option<Uuid>,
}

fn default_product_type() -> ProductType {
    ProductType::Simple
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub product_type: Option<ProductType>,
    pub target_price: Option<i64>,
    pub parent_id: Option<Uuid>,
    pub variation: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    /// Units not assigned to any sale.
    pub in_stock: i64,
}
