use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sale_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// `OPEN` or `COMPLETE`.
    pub status: String,
    pub date_time: Option<DateTimeWithTimeZone>,
    pub customer_id: Option<Uuid>,
    pub source_person_id: Option<Uuid>,
    pub location: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_instances::Entity")]
    ProductInstances,
}

impl Related<super::product_instances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductInstances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
