use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{DiscountType, Product, SaleTransaction};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OpenTransactionRequest {
    pub customer_id: Option<Uuid>,
    pub source_person_id: Option<Uuid>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DiscountRequest {
    pub discount_type: DiscountType,
    /// Cents for `DOLLAR`, whole percent for `PERCENT`.
    pub value: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CompleteTransactionRequest {
    pub discount: Option<DiscountRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLine {
    pub product: Product,
    pub quantity: i64,
    /// `target_price * quantity`, before any discount.
    pub subtotal: i64,
    pub discount: i64,
    /// Set once the sale is complete.
    pub total: Option<i64>,
    pub instance_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Serialize, ToSchema, PartialEq)]
pub struct CartTotals {
    pub units: i64,
    pub gross: i64,
    pub discount: i64,
    pub net: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Cart {
    pub sale_transaction_id: Uuid,
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartChange {
    pub product_id: Uuid,
    pub requested: i64,
    /// Units moved into the cart by this call.
    pub assigned: i64,
    /// Units moved back to stock by this call.
    pub released: i64,
    /// Units of the product now in the cart.
    pub quantity: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionWithCart {
    pub transaction: SaleTransaction,
    pub cart: Cart,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TransactionList {
    #[schema(value_type = Vec<SaleTransaction>)]
    pub items: Vec<SaleTransaction>,
}
