use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{DiscountType, ProductInstance};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReceiveInstancesRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Cents per unit.
    pub invoice_cost: i64,
    pub purchase_order: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateInstanceRequest {
    pub invoice_cost: Option<i64>,
    pub discount: Option<i64>,
    pub discount_type: Option<DiscountType>,
    pub purchase_order: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct InstanceList {
    #[schema(value_type = Vec<ProductInstance>)]
    pub items: Vec<ProductInstance>,
}
