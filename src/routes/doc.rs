use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        categories::{CategoryList, CategoryRequest},
        instances::{InstanceList, ReceiveInstancesRequest, UpdateInstanceRequest},
        products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
        reports::{DailySales, SalesFigures, SalesReport},
        sales::{
            AddToCartRequest, Cart, CartChange, CartLine, CartTotals, CompleteTransactionRequest,
            DiscountRequest, EditCartItemRequest, OpenTransactionRequest, TransactionList,
            TransactionWithCart,
        },
    },
    models::{
        DiscountType, Product, ProductCategory, ProductInstance, ProductType, SaleStatus,
        SaleTransaction,
    },
    response::{ApiResponse, Meta},
    routes::{categories, health, instances, params, products, reports, sales},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        instances::list_instances,
        instances::receive_instances,
        instances::get_instance,
        instances::update_instance,
        instances::delete_instance,
        sales::list_transactions,
        sales::open_transaction,
        sales::get_transaction,
        sales::cancel_transaction,
        sales::complete_transaction,
        sales::list_cart,
        sales::add_to_cart,
        sales::edit_cart_item,
        sales::remove_from_cart,
        reports::sales_report
    ),
    components(
        schemas(
            ProductType,
            SaleStatus,
            DiscountType,
            ProductCategory,
            Product,
            ProductInstance,
            SaleTransaction,
            CategoryRequest,
            CategoryList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ProductDetail,
            ReceiveInstancesRequest,
            UpdateInstanceRequest,
            InstanceList,
            OpenTransactionRequest,
            AddToCartRequest,
            EditCartItemRequest,
            DiscountRequest,
            CompleteTransactionRequest,
            CartLine,
            CartTotals,
            Cart,
            CartChange,
            TransactionWithCart,
            TransactionList,
            DailySales,
            SalesFigures,
            SalesReport,
            params::Pagination,
            params::SortOrder,
            params::ProductSortBy,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Cart>,
            ApiResponse<CartChange>,
            ApiResponse<TransactionWithCart>,
            ApiResponse<SalesReport>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Categories", description = "Product category endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Inventory", description = "Individually tracked units"),
        (name = "Sales", description = "Sale transaction lifecycle"),
        (name = "Cart", description = "Cart reconciliation for open sales"),
        (name = "Reports", description = "Sales reporting"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
