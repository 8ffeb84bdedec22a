use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::ProductCategory;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<ProductCategory>)]
    pub items: Vec<ProductCategory>,
}
