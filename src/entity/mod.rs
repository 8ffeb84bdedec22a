pub mod audit_logs;
pub mod product_categories;
pub mod product_instances;
pub mod products;
pub mod sale_transactions;

pub use audit_logs::Entity as AuditLogs;
pub use product_categories::Entity as ProductCategories;
pub use product_instances::Entity as ProductInstances;
pub use products::Entity as Products;
pub use sale_transactions::Entity as SaleTransactions;
