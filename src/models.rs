use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{product_categories, product_instances, products, sale_transactions},
    error::AppError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Simple,
    Variable,
    Variation,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Simple => "SIMPLE",
            ProductType::Variable => "VARIABLE",
            ProductType::Variation => "VARIATION",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "SIMPLE" => Ok(ProductType::Simple),
            "VARIABLE" => Ok(ProductType::Variable),
            "VARIATION" => Ok(ProductType::Variation),
            other => Err(AppError::BadRequest(format!("invalid product type {other}"))),
        }
    }

    /// Whether physical units of this product can exist.
    pub fn is_stocked(&self) -> bool {
        !matches!(self, ProductType::Variable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Open,
    Complete,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Open => "OPEN",
            SaleStatus::Complete => "COMPLETE",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "OPEN" => Ok(SaleStatus::Open),
            "COMPLETE" => Ok(SaleStatus::Complete),
            other => Err(AppError::BadRequest(format!("invalid sale status {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Dollar,
    Percent,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Dollar => "DOLLAR",
            DiscountType::Percent => "PERCENT",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "DOLLAR" => Ok(DiscountType::Dollar),
            "PERCENT" => Ok(DiscountType::Percent),
            other => Err(AppError::BadRequest(format!("invalid discount type {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductCategory {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub product_type: ProductType,
    /// Cents.
    pub target_price: i64,
    pub parent_id: Option<Uuid>,
    pub variation: Option<String>,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductInstance {
    pub id: Uuid,
    pub product_id: Uuid,
    pub invoice_cost: i64,
    pub discount: i64,
    pub discount_type: Option<DiscountType>,
    pub final_sale_price: Option<i64>,
    pub sale_transaction_id: Option<Uuid>,
    pub purchase_order: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleTransaction {
    pub id: Uuid,
    pub status: SaleStatus,
    pub date_time: Option<DateTime<Utc>>,
    pub customer_id: Option<Uuid>,
    pub source_person_id: Option<Uuid>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<product_categories::Model> for ProductCategory {
    fn from(model: product_categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl TryFrom<products::Model> for Product {
    type Error = AppError;

    fn try_from(model: products::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            sku: model.sku,
            name: model.name,
            product_type: ProductType::parse(&model.product_type)?,
            target_price: model.target_price,
            parent_id: model.parent_id,
            variation: model.variation,
            category_id: model.category_id,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

impl TryFrom<product_instances::Model> for ProductInstance {
    type Error = AppError;

    fn try_from(model: product_instances::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            product_id: model.product_id,
            invoice_cost: model.invoice_cost,
            discount: model.discount,
            discount_type: model
                .discount_type
                .as_deref()
                .map(DiscountType::parse)
                .transpose()?,
            final_sale_price: model.final_sale_price,
            sale_transaction_id: model.sale_transaction_id,
            purchase_order: model.purchase_order,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

impl TryFrom<sale_transactions::Model> for SaleTransaction {
    type Error = AppError;

    fn try_from(model: sale_transactions::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            status: SaleStatus::parse(&model.status)?,
            date_time: model.date_time.map(|dt| dt.with_timezone(&Utc)),
            customer_id: model.customer_id,
            source_person_id: model.source_person_id,
            location: model.location,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}
