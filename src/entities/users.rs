use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub admin: bool,

    pub created: String,

    pub updated: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_series::Entity")]
    UserSeries,
}

impl Related<super::user_series::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserSeries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
