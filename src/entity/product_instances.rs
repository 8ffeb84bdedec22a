use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "product_instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub invoice_cost: i64,
    pub discount: i64,
    pub discount_type: Option<String>,
    pub final_sale_price: Option<i64>,
    /// `None` while the unit is in stock.
    pub sale_transaction_id: Option<Uuid>,
    pub purchase_order: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id",
        on_delete = "Restrict"
    )]
    Products,
    #[sea_orm(
        belongs_to = "super::sale_transactions::Entity",
        from = "Column::SaleTransactionId",
        to = "super::sale_transactions::Column::Id",
        on_delete = "SetNull"
    )]
    SaleTransactions,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::sale_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
