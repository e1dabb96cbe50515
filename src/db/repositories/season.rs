use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Expr,
};

use crate::db::{PageWindow, Paged, StoreError, StoreResult, now, paged_query};
use crate::entities::{episodes, prelude::*, seasons};
use crate::resource::Validated;

pub struct SeasonRepository {
    conn: DatabaseConnection,
}

impl SeasonRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(
        &self,
        series_id: i32,
        window: PageWindow,
    ) -> StoreResult<Paged<seasons::Model>> {
        let select = Seasons::find()
            .filter(seasons::Column::SeriesId.eq(series_id))
            .order_by_asc(seasons::Column::Number);
        Ok(paged_query(&self.conn, select, window).await?)
    }

    pub async fn all_for_series(&self, series_id: i32) -> StoreResult<Vec<seasons::Model>> {
        Ok(Seasons::find()
            .filter(seasons::Column::SeriesId.eq(series_id))
            .order_by_asc(seasons::Column::Number)
            .all(&self.conn)
            .await?)
    }

    pub async fn get(&self, series_id: i32, number: i32) -> StoreResult<Option<seasons::Model>> {
        Ok(Seasons::find()
            .filter(seasons::Column::SeriesId.eq(series_id))
            .filter(seasons::Column::Number.eq(number))
            .one(&self.conn)
            .await?)
    }

    /// Fails with [`StoreError::Duplicate`] when the series already has a
    /// season with that number.
    pub async fn create(
        &self,
        series_id: i32,
        fields: &Validated,
        poster: Option<String>,
    ) -> StoreResult<seasons::Model> {
        let now = now();
        let mut active = seasons::ActiveModel {
            series_id: Set(series_id),
            poster: Set(poster),
            created: Set(now.clone()),
            updated: Set(now),
            ..Default::default()
        };
        fields.apply_to(&mut active)?;

        Ok(active.insert(&self.conn).await?)
    }

    /// Renumbering a season also renumbers its episodes.
    pub async fn update(
        &self,
        series_id: i32,
        number: i32,
        fields: &Validated,
        poster: Option<String>,
    ) -> StoreResult<seasons::Model> {
        let existing = self.get(series_id, number).await?.ok_or(StoreError::NotFound)?;

        let mut active = seasons::ActiveModel {
            id: Unchanged(existing.id),
            updated: Set(now()),
            ..Default::default()
        };
        fields.apply_to(&mut active)?;
        if let Some(poster) = poster {
            active.poster = Set(Some(poster));
        }

        let txn = self.conn.begin().await?;
        let updated = active.update(&txn).await?;

        if updated.number != existing.number {
            Episodes::update_many()
                .col_expr(episodes::Column::SeasonNumber, Expr::value(updated.number))
                .filter(episodes::Column::SeasonId.eq(existing.id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(updated)
    }

    pub async fn delete(&self, series_id: i32, number: i32) -> StoreResult<()> {
        Seasons::delete_many()
            .filter(seasons::Column::SeriesId.eq(series_id))
            .filter(seasons::Column::Number.eq(number))
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}
