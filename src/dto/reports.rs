use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SalesReportQuery {
    /// Inclusive, defaults to 30 days before `to`.
    pub from: Option<NaiveDate>,
    /// Inclusive, defaults to today (UTC).
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema, PartialEq)]
pub struct SalesFigures {
    pub transactions: i64,
    pub units: i64,
    pub gross: i64,
    pub discounts: i64,
    pub net: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailySales {
    pub day: NaiveDate,
    #[serde(flatten)]
    pub figures: SalesFigures,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<DailySales>,
    pub totals: SalesFigures,
}
