use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "genres")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::series_genres::Entity")]
    SeriesGenres,
}

impl Related<super::series::Entity> for Entity {
    fn to() -> RelationDef {
        super::series_genres::Relation::Series.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::series_genres::Relation::Genres.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
