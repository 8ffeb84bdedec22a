use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{ProductType, SaleStatus};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
    Name,
    Sku,
}

// Query structs repeat `page`/`per_page` instead of flattening `Pagination`:
// the query-string deserializer cannot parse numbers inside a flattened struct.

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Matches name or SKU, case-insensitive.
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub product_type: Option<ProductType>,
    pub parent_id: Option<Uuid>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InstanceQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub product_id: Option<Uuid>,
    pub sale_transaction_id: Option<Uuid>,
    /// `true` keeps only units not assigned to a sale.
    pub in_stock: Option<bool>,
}

impl InstanceQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<SaleStatus>,
    pub sort_order: Option<SortOrder>,
}

impl TransactionQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::Uri};

    fn parse<T: serde::de::DeserializeOwned>(query: &str) -> T {
        let uri: Uri = format!("/?{query}").parse().unwrap();
        Query::<T>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (3, 100, 200));
        let p = Pagination {
            page: Some(-4),
            per_page: Some(0),
        };
        assert_eq!(p.normalize(), (1, 1, 0));
    }

    #[test]
    fn product_query_parses_from_query_string() {
        let query: ProductQuery =
            parse("page=2&per_page=5&product_type=VARIATION&sort_by=price&sort_order=asc");
        assert_eq!(query.pagination().normalize(), (2, 5, 5));
        assert_eq!(query.product_type, Some(ProductType::Variation));
        assert!(matches!(query.sort_by, Some(ProductSortBy::Price)));
    }

    #[test]
    fn instance_query_parses_stock_flag() {
        let query: InstanceQuery = parse("in_stock=true");
        assert_eq!(query.in_stock, Some(true));
    }
}
