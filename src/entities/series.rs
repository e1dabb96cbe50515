use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "series")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// ISO date (`YYYY-MM-DD`)
    pub air_date: Option<String>,
    pub in_production: bool,
    pub tagline: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub language: String,
    pub network: Option<String>,
    pub homepage: Option<String>,
    pub created: String,
    pub updated: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::seasons::Entity")]
    Seasons,
    #[sea_orm(has_many = "super::episodes::Entity")]
    Episodes,
    #[sea_orm(has_many = "super::series_genres::Entity")]
    SeriesGenres,
    #[sea_orm(has_many = "super::user_series::Entity")]
    UserSeries,
}

impl Related<super::seasons::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seasons.def()
    }
}

impl Related<super::episodes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Episodes.def()
    }
}

impl Related<super::genres::Entity> for Entity {
    fn to() -> RelationDef {
        super::series_genres::Relation::Genres.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::series_genres::Relation::Series.def().rev())
    }
}

impl Related<super::user_series::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserSeries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
