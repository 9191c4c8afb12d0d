use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    #[sea_orm(column_type = "Decimal(Some((14, 3)))")]
    pub stock_quantity: Decimal,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_imports::Entity")]
    InventoryImports,
}

impl Related<super::inventory_imports::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryImports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
