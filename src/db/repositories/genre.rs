use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, Set};

use crate::db::{PageWindow, Paged, StoreResult, paged_query};
use crate::entities::{genres, prelude::*};

pub struct GenreRepository {
    conn: DatabaseConnection,
}

impl GenreRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, window: PageWindow) -> StoreResult<Paged<genres::Model>> {
        let select = Genres::find().order_by_asc(genres::Column::Name);
        Ok(paged_query(&self.conn, select, window).await?)
    }

    pub async fn create(&self, name: &str) -> StoreResult<genres::Model> {
        let model = genres::Model {
            name: name.to_string(),
        };

        Genres::insert(genres::ActiveModel {
            name: Set(model.name.clone()),
        })
        .exec_without_returning(&self.conn)
        .await?;

        Ok(model)
    }

    pub async fn delete(&self, name: &str) -> StoreResult<()> {
        Genres::delete_by_id(name.to_string())
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}
