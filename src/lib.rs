pub mod audit;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod models;
pub mod pricing;
pub mod response;
pub mod routes;
pub mod state;

pub mod dto {
    pub mod categories;
    pub mod instances;
    pub mod products;
    pub mod reports;
    pub mod sales;
}

pub mod middleware {
    pub mod auth;
}

pub mod services {
    pub mod cart_service;
    pub mod category_service;
    pub mod instance_service;
    pub mod product_service;
    pub mod report_service;
    pub mod sale_service;
}
