use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub picture: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::subcategory::Entity")]
    Subcategory,
}

impl Related<super::subcategory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subcategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
